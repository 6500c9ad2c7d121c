use std::sync::Arc;

use vantage_anomaly::AnomalyStore;
use vantage_auth::AuthService;
use vantage_ledger::LedgerStore;
use vantage_ratelimit::RateLimiterRegistry;
use vantage_reporting::ReportingEngine;
use vantage_subscription::Clock;
use vantage_subscription::SubscriptionService;
use vantage_tenancy::CredentialStore;
use vantage_tenancy::TenantStore;
use vantage_tokens::TokenService;
use vantage_transactions::TransactionService;

/// Everything a handler or pipeline stage needs, shared behind `Arc` clones.
/// `Clone` is implemented by hand because `#[derive(Clone)]` would add an
/// unwanted `C: Clone` bound on the struct itself.
pub struct ApiState<C: Clock> {
    pub credentials: Arc<dyn CredentialStore>,
    pub tenants: Arc<dyn TenantStore>,
    pub tokens: Arc<TokenService>,
    pub auth: Arc<AuthService<C>>,
    pub subscriptions: Arc<SubscriptionService<C>>,
    pub transactions: Arc<TransactionService>,
    pub ledger: Arc<dyn LedgerStore>,
    pub reporting: Arc<ReportingEngine>,
    pub anomalies: Arc<dyn AnomalyStore>,
    pub rate_limiter: Arc<RateLimiterRegistry>,
}

impl<C: Clock> Clone for ApiState<C> {
    fn clone(&self) -> Self {
        Self {
            credentials: self.credentials.clone(),
            tenants: self.tenants.clone(),
            tokens: self.tokens.clone(),
            auth: self.auth.clone(),
            subscriptions: self.subscriptions.clone(),
            transactions: self.transactions.clone(),
            ledger: self.ledger.clone(),
            reporting: self.reporting.clone(),
            anomalies: self.anomalies.clone(),
            rate_limiter: self.rate_limiter.clone(),
        }
    }
}
