//! User accounts.
//!
//! Email is the login key: it is normalized (trimmed, lowercased) before it
//! is stored or compared. The password hash never leaves this crate through
//! [`UserProfile`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, UserId, require_text};

use crate::{Role, check_password_policy, hash_password, verify_password};

/// Trim and lowercase an e-mail address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    email: String,
    name: Option<String>,
    password_hash: String,
    role: Role,
    email_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Entity for User {
    type Id = UserId;
    const COLLECTION: &'static str = "users";

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Command: RegisterUser.
#[derive(Debug, Clone)]
pub struct RegisterUser {
    pub user_id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub password: String,
    pub role: Role,
    pub occurred_at: DateTime<Utc>,
}

/// Public view of a user, safe to serialize to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub email_verified: bool,
}

impl User {
    pub fn register(cmd: RegisterUser) -> DomainResult<Self> {
        require_text("email", &cmd.email)?;
        require_text("password", &cmd.password)?;
        let email = normalize_email(&cmd.email);
        if !email.contains('@') {
            return Err(DomainError::validation(format!("invalid email: {email}")));
        }
        check_password_policy(&cmd.password)?;

        Ok(Self {
            id: cmd.user_id,
            email,
            name: cmd
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            password_hash: hash_password(&cmd.password)?,
            role: cmd.role,
            email_verified: false,
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn email_verified(&self) -> bool {
        self.email_verified
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }

    /// Replace the password after checking it against the policy.
    pub fn change_password(&mut self, password: &str, at: DateTime<Utc>) -> DomainResult<()> {
        check_password_policy(password)?;
        self.password_hash = hash_password(password)?;
        self.updated_at = at;
        Ok(())
    }

    pub fn mark_email_verified(&mut self, at: DateTime<Utc>) {
        if !self.email_verified {
            self.email_verified = true;
            self.updated_at = at;
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            email_verified: self.email_verified,
        }
    }
}
