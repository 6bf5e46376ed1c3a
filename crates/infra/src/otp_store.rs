//! In-memory password-reset codes.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};

use stockroom_auth::{OtpError, OtpPolicy, OtpRecord, check_rate_limit, generate_code, normalize_email};

/// Delivery of a freshly issued code to its owner.
pub trait OtpNotifier: Send + Sync {
    fn send(&self, record: &OtpRecord);
}

/// Writes the code to the log instead of mailing it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

impl OtpNotifier for LoggingNotifier {
    fn send(&self, record: &OtpRecord) {
        tracing::info!(
            email = %record.email,
            otp = %record.code,
            expires_at = %record.expires_at,
            "password reset code issued"
        );
    }
}

/// Issued codes, kept for 24 hours so the daily request limit can be counted.
#[derive(Debug)]
pub struct OtpStore {
    policy: OtpPolicy,
    records: RwLock<Vec<OtpRecord>>,
}

impl OtpStore {
    pub fn new(policy: OtpPolicy) -> Self {
        Self {
            policy,
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn policy(&self) -> &OtpPolicy {
        &self.policy
    }

    /// Issue a new code for `email`, retiring any earlier unused one.
    pub fn issue(&self, email: &str, now: DateTime<Utc>) -> Result<OtpRecord, OtpError> {
        let email = normalize_email(email);
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);

        let window_start = now - Duration::hours(24);
        records.retain(|r| r.created_at > window_start);

        let recent = records.iter().filter(|r| r.email == email).count();
        check_rate_limit(recent, &self.policy)?;

        for earlier in records.iter_mut().filter(|r| r.email == email && !r.used) {
            earlier.used = true;
        }

        let record = OtpRecord::issue(email, generate_code(), now, &self.policy);
        records.push(record.clone());
        Ok(record)
    }

    /// Check `code` against the newest unused code. Every call costs an attempt.
    pub fn verify(&self, email: &str, code: &str, now: DateTime<Utc>) -> Result<(), OtpError> {
        let email = normalize_email(email);
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let record = records
            .iter_mut()
            .rev()
            .find(|r| r.email == email && !r.used)
            .ok_or(OtpError::NoActiveCode)?;
        record.attempt(code, now, &self.policy)
    }

    /// Redeem the newest unused code, marking it used. A wrong code costs an
    /// attempt, same as [`OtpStore::verify`].
    pub fn consume(&self, email: &str, code: &str, now: DateTime<Utc>) -> Result<(), OtpError> {
        let email = normalize_email(email);
        let code = code.trim();
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let record = records
            .iter_mut()
            .rev()
            .find(|r| r.email == email && !r.used)
            .ok_or(OtpError::InvalidOrExpired)?;

        if record.code != code {
            let _ = record.attempt(code, now, &self.policy);
            return Err(OtpError::InvalidOrExpired);
        }
        if !record.is_valid(now, &self.policy) {
            return Err(OtpError::InvalidOrExpired);
        }
        record.used = true;
        Ok(())
    }

    /// Codes issued to `email` in the trailing 24 hours.
    pub fn requests_since(&self, email: &str, since: DateTime<Utc>) -> usize {
        let email = normalize_email(email);
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.email == email && r.created_at > since)
            .count()
    }
}

impl Default for OtpStore {
    fn default() -> Self {
        Self::new(OtpPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_verify_consume() {
        let store = OtpStore::default();
        let now = Utc::now();
        let record = store.issue("Alice@Example.com", now).unwrap();
        assert_eq!(record.email, "alice@example.com");
        assert_eq!(record.code.len(), 6);

        store.verify("alice@example.com", &record.code, now).unwrap();
        store.consume("alice@example.com", &record.code, now).unwrap();
        assert_eq!(
            store.consume("alice@example.com", &record.code, now),
            Err(OtpError::InvalidOrExpired)
        );
        assert_eq!(store.verify("alice@example.com", &record.code, now), Err(OtpError::NoActiveCode));
    }

    #[test]
    fn mismatches_count_down_then_lock_out() {
        let store = OtpStore::default();
        let now = Utc::now();
        let record = store.issue("a@b.co", now).unwrap();
        let wrong = if record.code == "111111" { "222222" } else { "111111" };

        assert_eq!(store.verify("a@b.co", wrong, now), Err(OtpError::Mismatch { remaining: 2 }));
        assert_eq!(store.verify("a@b.co", wrong, now), Err(OtpError::Mismatch { remaining: 1 }));
        assert_eq!(store.verify("a@b.co", wrong, now), Err(OtpError::MismatchFinal));
        assert_eq!(store.verify("a@b.co", &record.code, now), Err(OtpError::AttemptsExhausted));
        assert_eq!(store.consume("a@b.co", &record.code, now), Err(OtpError::InvalidOrExpired));
    }

    #[test]
    fn wrong_guesses_at_redemption_lock_the_code() {
        let store = OtpStore::default();
        let now = Utc::now();
        let record = store.issue("a@b.co", now).unwrap();
        let wrong = if record.code == "111111" { "222222" } else { "111111" };

        for _ in 0..store.policy().max_attempts {
            assert_eq!(store.consume("a@b.co", wrong, now), Err(OtpError::InvalidOrExpired));
        }
        assert_eq!(store.consume("a@b.co", &record.code, now), Err(OtpError::InvalidOrExpired));
        assert_eq!(store.verify("a@b.co", &record.code, now), Err(OtpError::AttemptsExhausted));
    }

    #[test]
    fn one_wrong_guess_still_allows_the_right_code() {
        let store = OtpStore::default();
        let now = Utc::now();
        let record = store.issue("a@b.co", now).unwrap();
        let wrong = if record.code == "111111" { "222222" } else { "111111" };

        assert_eq!(store.consume("a@b.co", wrong, now), Err(OtpError::InvalidOrExpired));
        store.consume("a@b.co", &record.code, now).unwrap();
    }

    #[test]
    fn reissue_retires_the_previous_code() {
        let store = OtpStore::default();
        let now = Utc::now();
        let first = store.issue("a@b.co", now).unwrap();
        let second = store.issue("a@b.co", now + Duration::seconds(1)).unwrap();

        if first.code != second.code {
            assert_eq!(store.consume("a@b.co", &first.code, now), Err(OtpError::InvalidOrExpired));
        }
        store.consume("a@b.co", &second.code, now + Duration::seconds(2)).unwrap();
    }

    #[test]
    fn expired_codes_are_rejected() {
        let store = OtpStore::default();
        let now = Utc::now();
        let record = store.issue("a@b.co", now).unwrap();
        let later = now + Duration::minutes(11);
        assert_eq!(store.verify("a@b.co", &record.code, later), Err(OtpError::Expired));
        assert_eq!(store.consume("a@b.co", &record.code, later), Err(OtpError::InvalidOrExpired));
    }

    #[test]
    fn daily_limit_rolls_over() {
        let store = OtpStore::default();
        let now = Utc::now();
        for i in 0..5 {
            store.issue("a@b.co", now + Duration::minutes(i)).unwrap();
        }
        assert_eq!(store.issue("a@b.co", now + Duration::minutes(6)), Err(OtpError::RateLimited));
        assert_eq!(store.requests_since("a@b.co", now - Duration::hours(1)), 5);

        // Other addresses are unaffected.
        store.issue("c@d.co", now).unwrap();

        let tomorrow = now + Duration::hours(25);
        store.issue("a@b.co", tomorrow).unwrap();
    }
}
