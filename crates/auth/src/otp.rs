//! One-time passcodes for password reset.
//!
//! Pure rules only; the store that keeps records lives in `stockroom-infra`.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpPolicy {
    pub expiry: Duration,
    pub max_attempts: u32,
    /// Requests allowed per email in any trailing 24 hours.
    pub max_daily_requests: usize,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            expiry: Duration::minutes(10),
            max_attempts: 3,
            max_daily_requests: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub email: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
    pub used: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("Too many OTP requests. Please try again after 24 hours.")]
    RateLimited,

    #[error("No valid OTP found. Please request a new OTP.")]
    NoActiveCode,

    #[error("OTP has expired. Please request a new OTP.")]
    Expired,

    #[error("Maximum OTP attempts exceeded. Please request a new OTP.")]
    AttemptsExhausted,

    #[error("Invalid OTP. You have {remaining} attempts remaining.")]
    Mismatch { remaining: u32 },

    #[error("Invalid OTP. Maximum attempts exceeded. Please request a new OTP.")]
    MismatchFinal,

    #[error("Invalid or expired OTP.")]
    InvalidOrExpired,

    #[error("Passwords do not match.")]
    PasswordsDoNotMatch,
}

/// Six digits, never starting with zero.
pub fn generate_code() -> String {
    let n: u32 = rand::rng().random_range(100_000..1_000_000);
    n.to_string()
}

impl OtpRecord {
    pub fn issue(email: impl Into<String>, code: impl Into<String>, now: DateTime<Utc>, policy: &OtpPolicy) -> Self {
        Self {
            email: email.into(),
            code: code.into(),
            created_at: now,
            expires_at: now + policy.expiry,
            attempts: 0,
            used: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_valid(&self, now: DateTime<Utc>, policy: &OtpPolicy) -> bool {
        !self.used && !self.is_expired(now) && self.attempts < policy.max_attempts
    }

    /// One verification attempt. Consumes an attempt before comparing, so a
    /// correct code on the last allowed attempt still succeeds.
    pub fn attempt(&mut self, code: &str, now: DateTime<Utc>, policy: &OtpPolicy) -> Result<(), OtpError> {
        if self.is_expired(now) {
            return Err(OtpError::Expired);
        }
        if self.attempts >= policy.max_attempts {
            return Err(OtpError::AttemptsExhausted);
        }
        self.attempts += 1;
        if self.code != code.trim() {
            let remaining = policy.max_attempts.saturating_sub(self.attempts);
            return Err(if remaining > 0 {
                OtpError::Mismatch { remaining }
            } else {
                OtpError::MismatchFinal
            });
        }
        Ok(())
    }
}

/// Rate-limit check over the caller's recent request count.
pub fn check_rate_limit(requests_last_24h: usize, policy: &OtpPolicy) -> Result<(), OtpError> {
    if requests_last_24h >= policy.max_daily_requests {
        Err(OtpError::RateLimited)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(now: DateTime<Utc>) -> OtpRecord {
        OtpRecord::issue("a@b.co", "123456", now, &OtpPolicy::default())
    }

    #[test]
    fn correct_code_verifies() {
        let now = Utc::now();
        let mut r = record(now);
        assert_eq!(r.attempt("123456", now, &OtpPolicy::default()), Ok(()));
        assert_eq!(r.attempts, 1);
    }

    #[test]
    fn mismatch_reports_remaining_attempts() {
        let now = Utc::now();
        let policy = OtpPolicy::default();
        let mut r = record(now);
        assert_eq!(r.attempt("000000", now, &policy), Err(OtpError::Mismatch { remaining: 2 }));
        assert_eq!(
            OtpError::Mismatch { remaining: 2 }.to_string(),
            "Invalid OTP. You have 2 attempts remaining."
        );
        r.attempt("000000", now, &policy).unwrap_err();
        let last = r.attempt("000000", now, &policy).unwrap_err();
        assert_eq!(last, OtpError::MismatchFinal);
        assert!(last.to_string().contains("Maximum attempts exceeded"));
        assert_eq!(r.attempt("123456", now, &policy), Err(OtpError::AttemptsExhausted));
        assert!(!r.is_valid(now, &policy));
    }

    #[test]
    fn expired_code_is_rejected_even_if_correct() {
        let now = Utc::now();
        let mut r = record(now);
        let later = now + Duration::minutes(10);
        assert_eq!(r.attempt("123456", later, &OtpPolicy::default()), Err(OtpError::Expired));
    }

    #[test]
    fn rate_limit_trips_at_the_configured_count() {
        let policy = OtpPolicy::default();
        assert!(check_rate_limit(4, &policy).is_ok());
        assert_eq!(check_rate_limit(5, &policy), Err(OtpError::RateLimited));
    }

    proptest! {
        #[test]
        fn generated_codes_are_six_digits(_seed in 0u8..50) {
            let code = generate_code();
            prop_assert_eq!(code.len(), 6);
            prop_assert!(code.chars().all(|c| c.is_ascii_digit()));
            prop_assert!(!code.starts_with('0'));
        }
    }
}
