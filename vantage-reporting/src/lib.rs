#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::sync::Arc;

use chrono::Datelike;
use chrono::NaiveDate;
use dashmap::DashMap;
use regex_lite::Regex;
use rust_decimal::Decimal;
use thiserror::Error;
use vantage_ledger::CategoryKind;
use vantage_ledger::CompanyId;
use vantage_ledger::LedgerError;
use vantage_ledger::LedgerStore;

#[derive(Debug, Error)]
pub enum ReportingError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryBreakdownRow {
    pub name: String,
    pub amount: Decimal,
    pub kind: CategoryKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PnLReport {
    pub income: Decimal,
    pub expense: Decimal,
    pub net: Decimal,
    pub categories: Vec<CategoryBreakdownRow>,
}

fn month_regex() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}$").unwrap_or_else(|_| unreachable!("pattern is a compile-time constant"))
    })
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap_or_else(|| unreachable!("month arithmetic stays in range"))
        .pred_opt()
        .unwrap_or_else(|| unreachable!("first of month always has a predecessor"))
}

/// Resolves a period spec to an inclusive `[start, end]` range. Anything
/// that doesn't match a known shape falls back to the current month, with a
/// warning logged by the caller rather than here (this function stays pure).
#[must_use]
pub fn resolve_period(spec: &str, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    match spec {
        "month" => {
            let start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
                .unwrap_or_else(|| unreachable!("today's own month is valid"));
            (start, last_day_of_month(today.year(), today.month()))
        }
        "quarter" => {
            let quarter_start_month = ((today.month() - 1) / 3) * 3 + 1;
            let start = NaiveDate::from_ymd_opt(today.year(), quarter_start_month, 1)
                .unwrap_or_else(|| unreachable!("quarter start month is always 1,4,7,10"));
            (start, last_day_of_month(today.year(), quarter_start_month + 2))
        }
        "year" => (
            NaiveDate::from_ymd_opt(today.year(), 1, 1)
                .unwrap_or_else(|| unreachable!("jan 1 is always valid")),
            NaiveDate::from_ymd_opt(today.year(), 12, 31)
                .unwrap_or_else(|| unreachable!("dec 31 is always valid")),
        ),
        other if month_regex().is_match(other) => {
            let parts: Vec<&str> = other.split('-').collect();
            let year: i32 = parts[0].parse().unwrap_or(today.year());
            let month: u32 = parts[1].parse().unwrap_or(today.month());
            match NaiveDate::from_ymd_opt(year, month, 1) {
                Some(start) => (start, last_day_of_month(year, month)),
                None => resolve_period("month", today),
            }
        }
        _ => {
            tracing::warn!(spec, "unrecognized period spec, defaulting to current month");
            resolve_period("month", today)
        }
    }
}

/// Read-through cache keyed by `(company_id, period_spec)`. Any write to a
/// tenant's ledger evicts all of that tenant's entries wholesale.
pub struct ReportingEngine {
    ledger: Arc<dyn LedgerStore>,
    cache: DashMap<(CompanyId, String), PnLReport>,
}

impl ReportingEngine {
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            ledger,
            cache: DashMap::new(),
        }
    }

    pub fn evict(&self, company_id: &CompanyId) {
        self.cache.retain(|(cached_company, _), _| cached_company != company_id);
    }

    pub async fn pnl(
        &self,
        company_id: &CompanyId,
        period_spec: &str,
        today: NaiveDate,
    ) -> Result<PnLReport, ReportingError> {
        let key = (company_id.clone(), period_spec.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        let (start, end) = resolve_period(period_spec, today);
        let income = self.ledger.sum_positive(company_id, start, end).await?;
        let raw_expense = self.ledger.sum_negative(company_id, start, end).await?;
        let expense = raw_expense.abs();
        let net = income - expense;

        let mut categories = Vec::new();
        for row in self.ledger.sum_by_category(company_id, start, end).await? {
            let kind = if row.amount >= Decimal::ZERO {
                CategoryKind::Income
            } else {
                CategoryKind::Expense
            };
            categories.push(CategoryBreakdownRow {
                name: row.name,
                amount: row.amount.abs(),
                kind,
            });
        }

        let report = PnLReport {
            income,
            expense,
            net,
            categories,
        };
        self.cache.insert(key, report.clone());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use vantage_ledger::Category;
    use vantage_ledger::InMemoryLedgerStore;
    use vantage_ledger::NewTransaction;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn month_resolves_to_first_and_last_day() {
        let (start, end) = resolve_period("month", date(2026, 2, 15));
        assert_eq!(start, date(2026, 2, 1));
        assert_eq!(end, date(2026, 2, 28));
    }

    #[test]
    fn quarter_resolves_correctly() {
        let (start, end) = resolve_period("quarter", date(2026, 5, 10));
        assert_eq!(start, date(2026, 4, 1));
        assert_eq!(end, date(2026, 6, 30));
    }

    #[test]
    fn explicit_year_month_pattern_resolves() {
        let (start, end) = resolve_period("2026-01", date(2026, 6, 1));
        assert_eq!(start, date(2026, 1, 1));
        assert_eq!(end, date(2026, 1, 31));
    }

    #[test]
    fn unrecognized_spec_defaults_to_current_month() {
        let (start, end) = resolve_period("bogus", date(2026, 3, 10));
        assert_eq!(start, date(2026, 3, 1));
        assert_eq!(end, date(2026, 3, 31));
    }

    #[tokio::test]
    async fn pnl_computes_income_expense_net_and_caches() {
        let ledger = Arc::new(InMemoryLedgerStore::with_categories(vec![Category {
            id: "cat-1".into(),
            company_id: None,
            name: "Sales".into(),
            kind: CategoryKind::Income,
        }]));
        let company = "company-1".to_string();
        ledger
            .insert_transaction(NewTransaction {
                company_id: company.clone(),
                date: date(2026, 1, 10),
                amount: dec!(1000.00),
                description: "sale".into(),
                category_id: Some("cat-1".into()),
            })
            .await
            .expect("insert");
        ledger
            .insert_transaction(NewTransaction {
                company_id: company.clone(),
                date: date(2026, 1, 12),
                amount: dec!(-300.00),
                description: "rent".into(),
                category_id: None,
            })
            .await
            .expect("insert");

        let engine = ReportingEngine::new(ledger.clone());
        let report = engine.pnl(&company, "2026-01", date(2026, 1, 20)).await.expect("report");
        assert_eq!(report.income, dec!(1000.00));
        assert_eq!(report.expense, dec!(300.00));
        assert_eq!(report.net, dec!(700.00));
        assert_eq!(report.categories.len(), 2);

        ledger
            .insert_transaction(NewTransaction {
                company_id: company.clone(),
                date: date(2026, 1, 15),
                amount: dec!(500.00),
                description: "more sales, not yet visible from cache".into(),
                category_id: None,
            })
            .await
            .expect("insert");
        let cached = engine.pnl(&company, "2026-01", date(2026, 1, 20)).await.expect("report");
        assert_eq!(cached.income, dec!(1000.00));

        engine.evict(&company);
        let fresh = engine.pnl(&company, "2026-01", date(2026, 1, 20)).await.expect("report");
        assert_eq!(fresh.income, dec!(1500.00));
    }
}
