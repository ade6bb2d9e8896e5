//! User accounts with argon2-hashed passwords.

use std::collections::HashMap;
use std::sync::RwLock;

use super::StoreError;
use crate::auth::Role;
use crate::auth::password;

/// A user account. Only the password hash is ever kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

impl User {
    /// Create a user, hashing `password` with a fresh salt.
    pub fn new(
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<Self, argon2::password_hash::Error> {
        Ok(Self {
            username: username.to_string(),
            password_hash: password::hash_password(password)?,
            role,
        })
    }

    /// Check `password` against the stored hash. A corrupt hash never matches.
    pub fn is_correct_password(&self, password: &str) -> bool {
        password::verify_password(password, &self.password_hash).unwrap_or(false)
    }
}

pub trait UserStore: Send + Sync {
    /// Store a copy of `user`; fails with `AlreadyExists` if the username is taken.
    fn save(&self, user: &User) -> Result<(), StoreError>;

    fn find(&self, username: &str) -> Result<Option<User>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn save(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write()?;
        if users.contains_key(&user.username) {
            return Err(StoreError::AlreadyExists(user.username.clone()));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    fn find(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read()?.get(username).cloned())
    }
}
