use std::sync::Arc;

use vantage_anomaly_loop::OwnerLookup;
use vantage_tenancy::CredentialStore;
use vantage_tenancy::TenantStore;

/// Bridges the anomaly loop's synchronous [`OwnerLookup`] to the async
/// tenancy stores. The anomaly loop runs as its own spawned task on the
/// multi-thread runtime, so blocking a worker thread for the duration of
/// two in-memory HashMap reads is an acceptable trade for keeping the
/// trait synchronous at its only call site.
pub struct TenancyOwnerLookup {
    tenants: Arc<dyn TenantStore>,
    credentials: Arc<dyn CredentialStore>,
}

impl TenancyOwnerLookup {
    #[must_use]
    pub fn new(tenants: Arc<dyn TenantStore>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { tenants, credentials }
    }
}

impl OwnerLookup for TenancyOwnerLookup {
    fn resolve(&self, company_id: &str) -> Option<(String, String)> {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let company = self
                    .tenants
                    .find_company_by_id(&company_id.to_string())
                    .await
                    .ok()??;
                let owner = self
                    .credentials
                    .find_user_by_id(&company.owner_user_id)
                    .await
                    .ok()??;
                Some((company.name, owner.email))
            })
        })
    }
}
