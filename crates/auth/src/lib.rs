//! `stockroom-auth`: users, password hashing, signed sessions and one-time
//! codes.
//!
//! This crate is decoupled from HTTP and storage: the API layer moves cookies
//! and documents, this crate decides what they mean.

pub mod otp;
pub mod password;
pub mod roles;
pub mod session;
pub mod user;

pub use otp::{OTP_MAX_ATTEMPTS, Otp, OtpError, OtpPurpose, generate_code};
pub use password::{check_password_policy, hash_password, verify_password};
pub use roles::Role;
pub use session::{SESSION_COOKIE, SessionClaims, SessionError, SessionSigner, validate_claims};
pub use user::{RegisterUser, User, UserProfile, normalize_email};
