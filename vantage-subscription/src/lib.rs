#![deny(clippy::print_stdout, clippy::print_stderr)]

use chrono::Duration;
use chrono::NaiveDate;
use thiserror::Error;
use vantage_tenancy::SubscriptionState;
use vantage_tenancy::SubscriptionStatus;

mod clock;

pub use clock::Clock;
pub use clock::FixedClock;
pub use clock::SystemClock;

pub const TRIAL_WINDOW_DAYS: i64 = 5;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("trial has already been used")]
    TrialAlreadyUsed,
    #[error("daily AI-chat quota exceeded")]
    QuotaExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Active,
    Trial,
    Free,
}

#[derive(Debug, Clone, Copy)]
pub struct QuotaLimits {
    pub active: u32,
    pub trial: u32,
    pub free: u32,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            active: 50,
            trial: 10,
            free: 3,
        }
    }
}

impl QuotaLimits {
    fn limit_for(self, tier: Tier) -> u32 {
        match tier {
            Tier::Active => self.active,
            Tier::Trial => self.trial,
            Tier::Free => self.free,
        }
    }
}

/// Pure transitions and derived views over a [`SubscriptionState`]. Holds no
/// store of its own — callers persist the mutated state through
/// `vantage_tenancy::CredentialStore::save_user` after each call, keeping
/// this crate free of its own circular dependency on the tenancy store.
pub struct SubscriptionService<C: Clock> {
    clock: C,
    trial_window: Duration,
    subscription_duration: Duration,
    quotas: QuotaLimits,
}

impl<C: Clock> SubscriptionService<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            trial_window: Duration::days(TRIAL_WINDOW_DAYS),
            subscription_duration: Duration::days(30),
            quotas: QuotaLimits::default(),
        }
    }

    #[must_use]
    pub fn with_quotas(mut self, quotas: QuotaLimits) -> Self {
        self.quotas = quotas;
        self
    }

    #[must_use]
    pub fn with_trial_window(mut self, days: i64) -> Self {
        self.trial_window = Duration::days(days);
        self
    }

    #[must_use]
    pub fn with_subscription_duration(mut self, days: i64) -> Self {
        self.subscription_duration = Duration::days(days);
        self
    }

    pub fn start_trial(&self, sub: &mut SubscriptionState) -> Result<(), SubscriptionError> {
        if sub.trial_started_at.is_some() {
            return Err(SubscriptionError::TrialAlreadyUsed);
        }
        sub.trial_started_at = Some(self.clock.now());
        sub.status = SubscriptionStatus::Trial;
        Ok(())
    }

    pub fn activate(&self, sub: &mut SubscriptionState, external_ref: String) {
        sub.status = SubscriptionStatus::Active;
        sub.subscription_expires_at = Some(self.clock.now() + self.subscription_duration);
        sub.external_subscription_ref = Some(external_ref);
    }

    pub fn renew(&self, sub: &mut SubscriptionState, external_ref: String) {
        let now = self.clock.now();
        let base = match sub.subscription_expires_at {
            Some(expiry) if expiry > now => expiry,
            _ => now,
        };
        sub.status = SubscriptionStatus::Active;
        sub.subscription_expires_at = Some(base + self.subscription_duration);
        sub.external_subscription_ref = Some(external_ref);
    }

    pub fn cancel(&self, sub: &mut SubscriptionState) {
        sub.status = SubscriptionStatus::Cancelled;
    }

    pub fn has_premium_access(&self, sub: &SubscriptionState) -> bool {
        let now = self.clock.now();
        match sub.status {
            SubscriptionStatus::Active => sub
                .subscription_expires_at
                .is_none_or(|expiry| now < expiry),
            SubscriptionStatus::Trial => sub
                .trial_started_at
                .is_some_and(|started| now < started + self.trial_window),
            _ => false,
        }
    }

    pub fn effective_tier(&self, sub: &SubscriptionState) -> Tier {
        if !self.has_premium_access(sub) {
            return Tier::Free;
        }
        match sub.status {
            SubscriptionStatus::Active => Tier::Active,
            SubscriptionStatus::Trial => Tier::Trial,
            _ => Tier::Free,
        }
    }

    pub fn trial_days_remaining(&self, sub: &SubscriptionState) -> i64 {
        if sub.status != SubscriptionStatus::Trial {
            return 0;
        }
        let Some(started) = sub.trial_started_at else {
            return 0;
        };
        let now = self.clock.now();
        let remaining = (started + self.trial_window - now).num_seconds();
        let days = remaining.div_euclid(86_400) + i64::from(remaining.rem_euclid(86_400) > 0);
        days.clamp(0, self.trial_window.num_days())
    }

    /// Read-only view of the day's remaining quota, without consuming a
    /// slot or mutating the reset-date bookkeeping `consume_ai_chat` owns.
    pub fn ai_chats_remaining(&self, sub: &SubscriptionState) -> u32 {
        let today: NaiveDate = self.clock.now().date_naive();
        let used = if sub.ai_chat_reset_date == Some(today) {
            sub.ai_chats_used_today
        } else {
            0
        };
        let limit = self.quotas.limit_for(self.effective_tier(sub));
        limit.saturating_sub(used)
    }

    /// The daily quota for the subscription's current effective tier.
    pub fn quota_limit(&self, sub: &SubscriptionState) -> u32 {
        self.quotas.limit_for(self.effective_tier(sub))
    }

    /// Atomic per-user quota check-and-increment: exactly one caller wins
    /// when a single slot remains, provided the caller holds the user record
    /// behind the same lock the store uses for `save_user`.
    pub fn consume_ai_chat(&self, sub: &mut SubscriptionState) -> Result<u32, SubscriptionError> {
        let today: NaiveDate = self.clock.now().date_naive();
        if sub.ai_chat_reset_date != Some(today) {
            sub.ai_chats_used_today = 0;
            sub.ai_chat_reset_date = Some(today);
        }

        let limit = self.quotas.limit_for(self.effective_tier(sub));
        if sub.ai_chats_used_today >= limit {
            return Err(SubscriptionError::QuotaExceeded);
        }
        sub.ai_chats_used_today += 1;
        Ok(limit - sub.ai_chats_used_today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn state() -> SubscriptionState {
        SubscriptionState::default()
    }

    #[test]
    fn start_trial_rejects_second_attempt() {
        let service = SubscriptionService::new(FixedClock::new(DateTime::<Utc>::UNIX_EPOCH));
        let mut sub = state();
        service.start_trial(&mut sub).expect("first trial succeeds");
        let err = service.start_trial(&mut sub).unwrap_err();
        assert!(matches!(err, SubscriptionError::TrialAlreadyUsed));
    }

    #[test]
    fn trial_grants_premium_access_until_window_expires() {
        let start = DateTime::<Utc>::UNIX_EPOCH;
        let clock = FixedClock::new(start);
        let service = SubscriptionService::new(clock.clone());
        let mut sub = state();
        service.start_trial(&mut sub).expect("start trial");
        assert!(service.has_premium_access(&sub));
        assert_eq!(service.effective_tier(&sub), Tier::Trial);
        assert_eq!(service.trial_days_remaining(&sub), 5);

        clock.advance(Duration::days(5) + Duration::seconds(1));
        assert!(!service.has_premium_access(&sub));
        assert_eq!(service.effective_tier(&sub), Tier::Free);
        assert_eq!(service.trial_days_remaining(&sub), 0);
    }

    #[test]
    fn active_without_expiry_has_indefinite_access() {
        let clock = FixedClock::new(DateTime::<Utc>::UNIX_EPOCH);
        let service = SubscriptionService::new(clock);
        let mut sub = state();
        sub.status = SubscriptionStatus::Active;
        sub.subscription_expires_at = None;
        assert!(service.has_premium_access(&sub));
        assert_eq!(service.effective_tier(&sub), Tier::Active);
    }

    #[test]
    fn renew_extends_from_future_expiry_not_now() {
        let start = DateTime::<Utc>::UNIX_EPOCH;
        let clock = FixedClock::new(start);
        let service = SubscriptionService::new(clock);
        let mut sub = state();
        service.activate(&mut sub, "ref-1".into());
        let first_expiry = sub.subscription_expires_at.expect("set by activate");

        service.renew(&mut sub, "ref-1".into());
        let renewed_expiry = sub.subscription_expires_at.expect("set by renew");
        assert_eq!(renewed_expiry, first_expiry + Duration::days(30));
    }

    #[test]
    fn cancel_keeps_access_until_expiry() {
        let clock = FixedClock::new(DateTime::<Utc>::UNIX_EPOCH);
        let service = SubscriptionService::new(clock);
        let mut sub = state();
        service.activate(&mut sub, "ref-1".into());
        service.cancel(&mut sub);
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert!(!service.has_premium_access(&sub));
    }

    #[test]
    fn consume_ai_chat_resets_daily_and_enforces_limit() {
        let clock = FixedClock::new(DateTime::<Utc>::UNIX_EPOCH);
        let service = SubscriptionService::new(clock.clone()).with_quotas(QuotaLimits {
            active: 50,
            trial: 10,
            free: 2,
        });
        let mut sub = state();

        assert_eq!(service.consume_ai_chat(&mut sub).expect("first chat"), 1);
        assert_eq!(service.consume_ai_chat(&mut sub).expect("second chat"), 0);
        let err = service.consume_ai_chat(&mut sub).unwrap_err();
        assert!(matches!(err, SubscriptionError::QuotaExceeded));

        clock.advance(Duration::days(1));
        assert_eq!(service.consume_ai_chat(&mut sub).expect("resets next day"), 1);
    }
}
