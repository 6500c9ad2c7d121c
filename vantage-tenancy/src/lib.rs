#![deny(clippy::print_stdout, clippy::print_stderr)]

use async_trait::async_trait;
use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

mod in_memory;

pub use crate::in_memory::InMemoryTenancyStore;

pub type UserId = String;
pub type CompanyId = String;

pub type TenancyResult<T> = Result<T, TenancyError>;

#[derive(Debug, Error)]
pub enum TenancyError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("resource already exists: {0}")]
    Conflict(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Status of a user's paid-subscription lifecycle. See [`SubscriptionState`]
/// for the fields this drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionStatus {
    Free,
    Trial,
    Active,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionState {
    pub status: SubscriptionStatus,
    pub trial_started_at: Option<DateTime<Utc>>,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub external_subscription_ref: Option<String>,
    pub ai_chats_used_today: u32,
    pub ai_chat_reset_date: Option<NaiveDate>,
}

impl Default for SubscriptionState {
    fn default() -> Self {
        Self {
            status: SubscriptionStatus::Free,
            trial_started_at: None,
            subscription_expires_at: None,
            external_subscription_ref: None,
            ai_chats_used_today: 0,
            ai_chat_reset_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub subscription: SubscriptionState,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    /// Case-normalizes the email the way every lookup must also normalize it.
    pub fn normalize(mut self) -> TenancyResult<Self> {
        let email = self.email.trim().to_ascii_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(TenancyError::Validation(
                "email must be a non-empty address".into(),
            ));
        }
        if self.password_hash.is_empty() {
            return Err(TenancyError::Validation(
                "password digest must not be empty".into(),
            ));
        }
        self.email = email;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    pub id: CompanyId,
    pub owner_user_id: UserId,
    pub name: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCompany {
    pub owner_user_id: UserId,
    pub name: String,
    pub currency: String,
}

impl NewCompany {
    pub fn normalize(mut self) -> TenancyResult<Self> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(TenancyError::Validation(
                "company name must not be empty".into(),
            ));
        }
        let currency = self.currency.trim().to_ascii_uppercase();
        if currency.len() != 3 {
            return Err(TenancyError::Validation(
                "currency must be a 3-letter ISO code".into(),
            ));
        }
        self.currency = currency;
        Ok(self)
    }
}

/// User registry: email lookup, creation, and in-place updates. Reads that
/// precede a mutation (e.g. the uniqueness check in registration) are
/// expected to run in the same logical transaction as the write that
/// follows, per the store's own locking.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> TenancyResult<Option<User>>;

    async fn find_user_by_id(&self, id: &UserId) -> TenancyResult<Option<User>>;

    async fn create_user(&self, request: NewUser) -> TenancyResult<User>;

    async fn save_user(&self, user: User) -> TenancyResult<User>;
}

/// Company registry and ownership edges.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find_company_by_id(&self, id: &CompanyId) -> TenancyResult<Option<Company>>;

    async fn create_company(&self, request: NewCompany) -> TenancyResult<Company>;

    async fn find_first_company_by_owner(
        &self,
        owner_id: &UserId,
    ) -> TenancyResult<Option<Company>>;

    async fn exists_company_with_owner(&self, owner_id: &UserId) -> TenancyResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_normalizes_email_case() {
        let request = NewUser {
            email: "  USER@Example.COM  ".into(),
            password_hash: "hash".into(),
        }
        .normalize()
        .expect("should normalize");

        assert_eq!(request.email, "user@example.com");
    }

    #[test]
    fn new_user_rejects_missing_at_sign() {
        let err = NewUser {
            email: "not-an-email".into(),
            password_hash: "hash".into(),
        }
        .normalize()
        .unwrap_err();
        assert!(matches!(err, TenancyError::Validation(_)));
    }

    #[test]
    fn new_company_normalizes_currency() {
        let request = NewCompany {
            owner_user_id: "user-1".into(),
            name: "  Acme  ".into(),
            currency: " usd ".into(),
        }
        .normalize()
        .expect("should normalize");

        assert_eq!(request.name, "Acme");
        assert_eq!(request.currency, "USD");
    }

    #[test]
    fn new_company_rejects_bad_currency_code() {
        let err = NewCompany {
            owner_user_id: "user-1".into(),
            name: "Acme".into(),
            currency: "US".into(),
        }
        .normalize()
        .unwrap_err();
        assert!(matches!(err, TenancyError::Validation(_)));
    }
}
