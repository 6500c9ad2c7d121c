#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::sync::Arc;

use thiserror::Error;
use vantage_subscription::Clock;
use vantage_subscription::SubscriptionService;
use vantage_subscription::Tier;
use vantage_tenancy::CredentialStore;
use vantage_tenancy::NewCompany;
use vantage_tenancy::NewUser;
use vantage_tenancy::TenancyError;
use vantage_tenancy::TenantStore;
use vantage_tenancy::User;
use vantage_tokens::TokenService;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("password does not meet the minimum policy")]
    WeakPassword,
    #[error("invalid email or password")]
    BadCredentials,
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),
    #[error(transparent)]
    Tenancy(#[from] TenancyError),
    #[error(transparent)]
    Token(#[from] vantage_tokens::TokenError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionView {
    pub tier: Tier,
    pub status: vantage_tenancy::SubscriptionStatus,
    pub trial_days_remaining: i64,
    pub has_premium_access: bool,
    pub ai_chats_remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub token: String,
    pub company_id: String,
    pub subscription: SubscriptionView,
}

/// A pre-computed cost-12 bcrypt hash with no corresponding account.
/// `login` verifies against this on an unknown email so that path pays the
/// same hashing cost as a known email with the wrong password, instead of
/// returning early and leaking which emails are registered through timing.
const UNKNOWN_EMAIL_DUMMY_HASH: &str = "$2b$12$RtnBO4THwLiToWrI5YuMg.o.gjAB.WwTWnZdHdH4QVcWu.BYn9Gji";

fn validate_password(password: &str) -> bool {
    let len_ok = (8..=128).contains(&password.chars().count());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    len_ok && has_lower && has_upper && has_digit
}

/// Wires credential/tenant storage, password hashing, token issuance, and
/// subscription-view assembly behind the two entry points a session
/// actually needs: `register` and `login`. `logout` only needs the token
/// service, so it is exposed directly rather than duplicated here.
pub struct AuthService<C: Clock> {
    credentials: Arc<dyn CredentialStore>,
    tenants: Arc<dyn TenantStore>,
    tokens: Arc<TokenService>,
    subscriptions: Arc<SubscriptionService<C>>,
    default_currency: String,
    bcrypt_cost: u32,
}

impl<C: Clock> AuthService<C> {
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        tenants: Arc<dyn TenantStore>,
        tokens: Arc<TokenService>,
        subscriptions: Arc<SubscriptionService<C>>,
        default_currency: String,
    ) -> Self {
        Self {
            credentials,
            tenants,
            tokens,
            subscriptions,
            default_currency,
            bcrypt_cost: 12,
        }
    }

    fn subscription_view(&self, user: &User) -> SubscriptionView {
        SubscriptionView {
            tier: self.subscriptions.effective_tier(&user.subscription),
            status: user.subscription.status,
            trial_days_remaining: self.subscriptions.trial_days_remaining(&user.subscription),
            has_premium_access: self.subscriptions.has_premium_access(&user.subscription),
            ai_chats_remaining: self.subscriptions.ai_chats_remaining(&user.subscription),
        }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        company_name: &str,
    ) -> Result<AuthResult, AuthError> {
        let normalized_email = email.trim().to_ascii_lowercase();
        if self
            .credentials
            .find_user_by_email(&normalized_email)
            .await?
            .is_some()
        {
            return Err(AuthError::EmailTaken);
        }

        if !validate_password(password) {
            return Err(AuthError::WeakPassword);
        }

        let password_hash = bcrypt::hash(password, self.bcrypt_cost)
            .map_err(|err| AuthError::InternalInconsistency(err.to_string()))?;

        let user = self
            .credentials
            .create_user(NewUser {
                email: normalized_email,
                password_hash,
            })
            .await?;

        let company = self
            .tenants
            .create_company(NewCompany {
                owner_user_id: user.id.clone(),
                name: company_name.to_string(),
                currency: self.default_currency.clone(),
            })
            .await?;

        let token = self.tokens.issue(&user.email, &company.id)?;
        Ok(AuthResult {
            token,
            company_id: company.id,
            subscription: self.subscription_view(&user),
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResult, AuthError> {
        let normalized_email = email.trim().to_ascii_lowercase();
        let user = match self.credentials.find_user_by_email(&normalized_email).await? {
            Some(user) => user,
            None => {
                // Hash against a fixed dummy so an unknown email pays the same
                // bcrypt cost as a known email with the wrong password.
                let _ = bcrypt::verify(password, UNKNOWN_EMAIL_DUMMY_HASH);
                return Err(AuthError::BadCredentials);
            }
        };

        let matches = bcrypt::verify(password, &user.password_hash)
            .map_err(|err| AuthError::InternalInconsistency(err.to_string()))?;
        if !matches {
            return Err(AuthError::BadCredentials);
        }

        let company = self
            .tenants
            .find_first_company_by_owner(&user.id)
            .await?
            .ok_or_else(|| {
                AuthError::InternalInconsistency(format!("user {} owns no company", user.id))
            })?;

        let token = self.tokens.issue(&user.email, &company.id)?;
        Ok(AuthResult {
            token,
            company_id: company.id,
            subscription: self.subscription_view(&user),
        })
    }

    pub async fn logout(&self, token: &str) {
        self.tokens.revoke(token).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use chrono::Utc;
    use vantage_subscription::FixedClock;
    use vantage_tenancy::InMemoryTenancyStore;
    use vantage_tokens::InMemoryRevocationStore;

    fn service() -> AuthService<FixedClock> {
        let store = Arc::new(InMemoryTenancyStore::new());
        let secret = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [9u8; 32]);
        let tokens = Arc::new(
            TokenService::new(
                &secret,
                chrono::Duration::hours(24),
                Arc::new(InMemoryRevocationStore::new()),
            )
            .expect("valid token service"),
        );
        let subscriptions = Arc::new(SubscriptionService::new(FixedClock::new(
            DateTime::<Utc>::UNIX_EPOCH,
        )));
        AuthService::new(
            store.clone(),
            store,
            tokens,
            subscriptions,
            "USD".to_string(),
        )
    }

    #[tokio::test]
    async fn register_then_login_round_trips() {
        let auth = service();
        let registered = auth
            .register("Owner@Example.com", "Passw0rd!", "Acme Inc")
            .await
            .expect("register succeeds");
        assert!(!registered.token.is_empty());
        assert_eq!(registered.subscription.tier, Tier::Free);

        let logged_in = auth
            .login("owner@example.com", "Passw0rd!")
            .await
            .expect("login succeeds");
        assert_eq!(logged_in.company_id, registered.company_id);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let auth = service();
        auth.register("dup@example.com", "Passw0rd!", "Co")
            .await
            .expect("first register succeeds");

        let err = auth
            .register("DUP@example.com", "Passw0rd!", "Co2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn register_rejects_weak_password() {
        let auth = service();
        let err = auth
            .register("weak@example.com", "alllowercase", "Co")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword));
    }

    #[tokio::test]
    async fn login_with_wrong_password_and_unknown_email_both_fail_identically() {
        let auth = service();
        auth.register("real@example.com", "Passw0rd!", "Co")
            .await
            .expect("register succeeds");

        let wrong_password_started = std::time::Instant::now();
        let wrong_password = auth.login("real@example.com", "WrongPass1").await.unwrap_err();
        let wrong_password_elapsed = wrong_password_started.elapsed();

        let unknown_email_started = std::time::Instant::now();
        let unknown_email = auth.login("ghost@example.com", "WrongPass1").await.unwrap_err();
        let unknown_email_elapsed = unknown_email_started.elapsed();

        assert!(matches!(wrong_password, AuthError::BadCredentials));
        assert!(matches!(unknown_email, AuthError::BadCredentials));

        // A short-circuited unknown-email branch would return in microseconds;
        // a real cost-12 bcrypt verification takes tens of milliseconds. This
        // floor catches a regression back to skipping the hash, not just the
        // error variant both paths already shared before the fix.
        assert!(
            wrong_password_elapsed.as_millis() >= 5,
            "wrong-password login returned in {wrong_password_elapsed:?}, too fast to have hashed a password"
        );
        assert!(
            unknown_email_elapsed.as_millis() >= 5,
            "unknown-email login returned in {unknown_email_elapsed:?}, too fast to have hashed a password"
        );
    }

    #[tokio::test]
    async fn logout_revokes_token() {
        let auth = service();
        let registered = auth
            .register("logout@example.com", "Passw0rd!", "Co")
            .await
            .expect("register succeeds");

        assert!(!auth.tokens.is_revoked(&registered.token).await);
        auth.logout(&registered.token).await;
        assert!(auth.tokens.is_revoked(&registered.token).await);
    }
}
