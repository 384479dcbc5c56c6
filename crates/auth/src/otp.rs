//! One-time codes for e-mail verification and password reset.

use core::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_core::{DomainError, Entity, OtpId};

/// Failed attempts allowed before a code is burned.
pub const OTP_MAX_ATTEMPTS: u32 = 5;

const OTP_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpPurpose {
    Verify,
    Forgot,
}

impl OtpPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            OtpPurpose::Verify => "verify",
            OtpPurpose::Forgot => "forgot",
        }
    }
}

impl FromStr for OtpPurpose {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verify" => Ok(OtpPurpose::Verify),
            "forgot" => Ok(OtpPurpose::Forgot),
            other => Err(DomainError::validation(format!(
                "type must be 'verify' or 'forgot', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("code has expired")]
    Expired,

    #[error("invalid code")]
    Mismatch,

    #[error("too many attempts, request a new code")]
    TooManyAttempts,
}

impl From<OtpError> for DomainError {
    fn from(value: OtpError) -> Self {
        DomainError::validation(value.to_string())
    }
}

/// A pending code for one e-mail address and purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Otp {
    id: OtpId,
    email: String,
    code: String,
    purpose: OtpPurpose,
    attempts: u32,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl Entity for Otp {
    type Id = OtpId;
    const COLLECTION: &'static str = "otps";

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Six random decimal digits.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(100_000..1_000_000).to_string()
}

impl Otp {
    pub fn issue<R: Rng + ?Sized>(
        email: impl Into<String>,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Self {
        Self {
            id: OtpId::new(),
            email: email.into(),
            code: generate_code(rng),
            purpose,
            attempts: 0,
            expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
            created_at: now,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn purpose(&self) -> OtpPurpose {
        self.purpose
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check a submitted code. A mismatch counts as a failed attempt; the
    /// caller persists the updated counter.
    pub fn check(&mut self, code: &str, now: DateTime<Utc>) -> Result<(), OtpError> {
        if self.attempts >= OTP_MAX_ATTEMPTS {
            return Err(OtpError::TooManyAttempts);
        }
        if self.is_expired(now) {
            return Err(OtpError::Expired);
        }
        if code.trim() != self.code {
            self.attempts += 1;
            return Err(OtpError::Mismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn issue(now: DateTime<Utc>) -> Otp {
        let mut rng = StdRng::seed_from_u64(7);
        Otp::issue("a@example.com", OtpPurpose::Verify, now, &mut rng)
    }

    #[test]
    fn codes_are_six_digits() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let code = generate_code(&mut rng);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn matching_code_passes_within_ttl() {
        let now = Utc::now();
        let mut otp = issue(now);
        let code = otp.code().to_string();
        assert!(otp.check(&code, now + Duration::minutes(9)).is_ok());
        assert_eq!(otp.attempts(), 0);
    }

    #[test]
    fn expired_code_is_rejected() {
        let now = Utc::now();
        let mut otp = issue(now);
        let code = otp.code().to_string();
        assert_eq!(otp.check(&code, now + Duration::minutes(10)), Err(OtpError::Expired));
    }

    #[test]
    fn mismatches_burn_the_code_after_max_attempts() {
        let now = Utc::now();
        let mut otp = issue(now);
        let code = otp.code().to_string();
        for _ in 0..OTP_MAX_ATTEMPTS {
            assert_eq!(otp.check("000000", now), Err(OtpError::Mismatch));
        }
        assert_eq!(otp.check(&code, now), Err(OtpError::TooManyAttempts));
    }

    #[test]
    fn purpose_parses_case_insensitively() {
        assert_eq!("Forgot".parse::<OtpPurpose>().unwrap(), OtpPurpose::Forgot);
        assert!("reset".parse::<OtpPurpose>().is_err());
    }
}
