use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::Company;
use crate::CompanyId;
use crate::CredentialStore;
use crate::NewCompany;
use crate::NewUser;
use crate::TenancyError;
use crate::TenancyResult;
use crate::TenantStore;
use crate::User;
use crate::UserId;

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    email_index: HashMap<String, UserId>,
    companies: HashMap<CompanyId, Company>,
    companies_by_owner: HashMap<UserId, Vec<CompanyId>>,
}

/// In-memory credential/tenant registry. Both traits share one guarded
/// `State` because registration needs to create a user and its first
/// company as a single atomic step: there is no cross-store transaction
/// primitive to coordinate two separate locks, so the store that backs both
/// traits also serializes both writes.
#[derive(Default)]
pub struct InMemoryTenancyStore {
    state: RwLock<State>,
}

impl InMemoryTenancyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryTenancyStore {
    async fn find_user_by_email(&self, email: &str) -> TenancyResult<Option<User>> {
        let normalized = email.trim().to_ascii_lowercase();
        let state = self.state.read().await;
        Ok(state
            .email_index
            .get(&normalized)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, id: &UserId) -> TenancyResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(id).cloned())
    }

    async fn create_user(&self, request: NewUser) -> TenancyResult<User> {
        let request = request.normalize()?;
        let mut state = self.state.write().await;
        if state.email_index.contains_key(&request.email) {
            return Err(TenancyError::Conflict(format!(
                "user with email {} already exists",
                request.email
            )));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: request.email.clone(),
            password_hash: request.password_hash,
            role: "owner".to_string(),
            created_at: Utc::now(),
            subscription: crate::SubscriptionState::default(),
        };

        state.email_index.insert(request.email, user.id.clone());
        state.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn save_user(&self, user: User) -> TenancyResult<User> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user.id) {
            return Err(TenancyError::NotFound(format!("user {}", user.id)));
        }
        state.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }
}

#[async_trait]
impl TenantStore for InMemoryTenancyStore {
    async fn find_company_by_id(&self, id: &CompanyId) -> TenancyResult<Option<Company>> {
        let state = self.state.read().await;
        Ok(state.companies.get(id).cloned())
    }

    async fn create_company(&self, request: NewCompany) -> TenancyResult<Company> {
        let request = request.normalize()?;
        let mut state = self.state.write().await;
        if !state.users.contains_key(&request.owner_user_id) {
            return Err(TenancyError::Validation(format!(
                "owner {} does not exist",
                request.owner_user_id
            )));
        }

        let company = Company {
            id: Uuid::new_v4().to_string(),
            owner_user_id: request.owner_user_id.clone(),
            name: request.name,
            currency: request.currency,
            created_at: Utc::now(),
        };

        state
            .companies_by_owner
            .entry(request.owner_user_id)
            .or_default()
            .push(company.id.clone());
        state.companies.insert(company.id.clone(), company.clone());
        Ok(company)
    }

    async fn find_first_company_by_owner(
        &self,
        owner_id: &UserId,
    ) -> TenancyResult<Option<Company>> {
        let state = self.state.read().await;
        Ok(state
            .companies_by_owner
            .get(owner_id)
            .and_then(|ids| ids.first())
            .and_then(|id| state.companies.get(id))
            .cloned())
    }

    async fn exists_company_with_owner(&self, owner_id: &UserId) -> TenancyResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .companies_by_owner
            .get(owner_id)
            .is_some_and(|ids| !ids.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn create_user_is_case_insensitive_unique() {
        let store = InMemoryTenancyStore::new();
        store
            .create_user(NewUser {
                email: "Owner@Example.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .expect("first create succeeds");

        let err = store
            .create_user(NewUser {
                email: "owner@example.com".into(),
                password_hash: "hash2".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TenancyError::Conflict(_)));
    }

    #[tokio::test]
    async fn find_user_by_email_normalizes_lookup() {
        let store = InMemoryTenancyStore::new();
        let created = store
            .create_user(NewUser {
                email: "owner@example.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .expect("create succeeds");

        let found = store
            .find_user_by_email("  OWNER@EXAMPLE.COM  ")
            .await
            .expect("lookup succeeds")
            .expect("user found");
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn create_company_requires_existing_owner() {
        let store = InMemoryTenancyStore::new();
        let err = store
            .create_company(NewCompany {
                owner_user_id: "missing".into(),
                name: "Acme".into(),
                currency: "USD".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TenancyError::Validation(_)));
    }

    #[tokio::test]
    async fn first_company_by_owner_returns_earliest() {
        let store = InMemoryTenancyStore::new();
        let user = store
            .create_user(NewUser {
                email: "owner@example.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .expect("create user");

        let first = store
            .create_company(NewCompany {
                owner_user_id: user.id.clone(),
                name: "First Co".into(),
                currency: "USD".into(),
            })
            .await
            .expect("create first company");
        store
            .create_company(NewCompany {
                owner_user_id: user.id.clone(),
                name: "Second Co".into(),
                currency: "USD".into(),
            })
            .await
            .expect("create second company");

        let found = store
            .find_first_company_by_owner(&user.id)
            .await
            .expect("lookup succeeds")
            .expect("company found");
        assert_eq!(found.id, first.id);
        assert!(
            store
                .exists_company_with_owner(&user.id)
                .await
                .expect("exists check")
        );
    }
}
