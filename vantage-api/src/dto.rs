use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::Serialize;
use vantage_ledger::CategoryKind;
use vantage_subscription::Tier;
use vantage_tenancy::SubscriptionStatus;

pub fn tier_str(tier: Tier) -> &'static str {
    match tier {
        Tier::Active => "ACTIVE",
        Tier::Trial => "TRIAL",
        Tier::Free => "FREE",
    }
}

fn status_str(status: SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Free => "FREE",
        SubscriptionStatus::Trial => "TRIAL",
        SubscriptionStatus::Active => "ACTIVE",
        SubscriptionStatus::Expired => "EXPIRED",
        SubscriptionStatus::Cancelled => "CANCELLED",
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub company_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub company_id: String,
    pub email: String,
    pub subscription_status: &'static str,
    pub trial_days_remaining: i64,
    pub ai_chats_remaining: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub email: String,
    pub company_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTrialResponse {
    pub tier: &'static str,
    pub trial_days_remaining: i64,
    pub ai_chats_remaining: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusResponse {
    pub tier: &'static str,
    pub status: &'static str,
    pub trial_days_remaining: i64,
    pub ai_chats_remaining: u32,
    pub ai_chat_daily_limit: u32,
    pub has_premium_access: bool,
    pub trial_already_used: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownRow {
    pub category_name: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl From<vantage_reporting::CategoryBreakdownRow> for BreakdownRow {
    fn from(row: vantage_reporting::CategoryBreakdownRow) -> Self {
        Self {
            category_name: row.name,
            amount: row.amount,
            kind: match row.kind {
                CategoryKind::Income => "INCOME",
                CategoryKind::Expense => "EXPENSE",
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PnLReportView {
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_profit: Decimal,
    pub breakdown: Vec<BreakdownRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyView {
    pub id: String,
    pub company_id: String,
    pub transaction_id: Option<String>,
    pub amount: Decimal,
    pub detected_at: DateTime<Utc>,
}

impl From<vantage_anomaly::Anomaly> for AnomalyView {
    fn from(anomaly: vantage_anomaly::Anomaly) -> Self {
        Self {
            id: anomaly.id,
            company_id: anomaly.company_id,
            transaction_id: anomaly.transaction_id,
            amount: anomaly.amount,
            detected_at: anomaly.detected_at,
        }
    }
}

pub fn subscription_status_str(status: SubscriptionStatus) -> &'static str {
    status_str(status)
}
