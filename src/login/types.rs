use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

use super::LoginError;
use crate::rbac::Grant;

/// bcrypt work factor for new password hashes.
pub const PASSWORD_HASH_COST: u32 = bcrypt::DEFAULT_COST;

pub fn hash_password(password: &str) -> Result<String, LoginError> {
    bcrypt::hash(password.as_bytes(), PASSWORD_HASH_COST)
        .map_err(|e| LoginError::InternalError(format!("password hashing failed: {}", e)))
}

/// Malformed stored hashes never match.
pub fn check_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password.as_bytes(), hash).unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// bcrypt hash in modular crypt format (`$2b$...`).
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grants: Vec<Grant>,
}

impl User {
    pub fn new(password: &str) -> Result<Self, LoginError> {
        Ok(Self {
            password_hash: hash_password(password)?,
            grants: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDatabase {
    #[serde(default)]
    pub users: HashMap<String, User>,
}

impl UserDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let contents = fs::read_to_string(path).await?;
        let doc = contents
            .parse::<toml_edit::DocumentMut>()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let db: UserDatabase = toml_edit::de::from_document(doc)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(db)
    }

    /// Load `path`, or start empty when the file does not exist yet.
    pub async fn load_or_default(path: &Path) -> Result<Self, std::io::Error> {
        match Self::load_from_file(path).await {
            Ok(db) => Ok(db),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e),
        }
    }

    pub async fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        let value = toml_edit::ser::to_document(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(path, value.to_string()).await?;
        Ok(())
    }

    pub fn get_user(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    pub fn add_user(&mut self, username: String, user: User) {
        self.users.insert(username, user);
    }

    pub fn remove_user(&mut self, username: &str) -> Option<User> {
        self.users.remove(username)
    }

    pub fn get_user_mut(&mut self, username: &str) -> Option<&mut User> {
        self.users.get_mut(username)
    }

    pub fn verify_password(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|user| check_password(password, &user.password_hash))
    }
}

/// Usernames end up inside a `name:signature` cookie, so `:` is reserved.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@'))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
}
