// In-memory user index and its loader

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::core::errors::LoaderError;

/// Seed used when no `USERS_SEED_PATH` is configured
const BUILTIN_SEED: &str = r#"
users:
  - email: "shopper1@95729.com"
    name: "Shopper One"
  - email: "shopper2@95729.com"
    name: "Shopper Two"
  - email: "shopper3@95729.com"
    name: "Shopper Three"
"#;

/// A known user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    users: Vec<SeedUser>,
}

#[derive(Debug, Deserialize)]
struct SeedUser {
    #[serde(default)]
    id: Option<Uuid>,
    email: String,
    #[serde(default)]
    name: Option<String>,
}

/// Normalise an email for lookup (trimmed, lowercased) and check its shape
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    let valid = !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace);
    valid.then_some(email)
}

/// Queryable index of users keyed by normalised email
#[derive(Debug, Default)]
pub struct UserIndex {
    users: Vec<User>,
    by_email: HashMap<String, usize>,
}

impl UserIndex {
    /// Build the index, rejecting invalid and duplicate emails
    pub fn from_users(users: Vec<User>) -> Result<Self, LoaderError> {
        let mut index = UserIndex::default();
        for mut user in users {
            let email = normalize_email(&user.email)
                .ok_or_else(|| LoaderError::InvalidEmail(user.email.clone()))?;
            if index.by_email.contains_key(&email) {
                return Err(LoaderError::DuplicateEmail(email));
            }
            user.email = email.clone();
            index.by_email.insert(email, index.users.len());
            index.users.push(user);
        }
        Ok(index)
    }

    /// Parse a YAML seed document (`users: [{email, name?, id?}]`)
    pub fn from_yaml(content: &str) -> Result<Self, LoaderError> {
        let seed: SeedFile = serde_yaml::from_str(content)?;
        let users = seed
            .users
            .into_iter()
            .map(|u| User {
                // Stable ids for seeds that omit them
                id: u
                    .id
                    .unwrap_or_else(|| Uuid::new_v5(&Uuid::NAMESPACE_URL, u.email.trim().to_lowercase().as_bytes())),
                name: u.name.unwrap_or_else(|| u.email.clone()),
                email: u.email,
            })
            .collect();
        Self::from_users(users)
    }

    /// Load from a seed file on disk
    pub async fn from_file(path: &Path) -> Result<Self, LoaderError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LoaderError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_yaml(&content)
    }

    /// Index built from the bundled seed
    pub fn builtin() -> Result<Self, LoaderError> {
        Self::from_yaml(BUILTIN_SEED)
    }

    pub fn find_by_email(&self, raw_email: &str) -> Option<&User> {
        let email = normalize_email(raw_email)?;
        self.by_email.get(&email).map(|&i| &self.users[i])
    }

    /// Users in seed order
    pub fn all(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Load the user index from the configured seed, or the bundled one
pub async fn load_index(seed_path: Option<&Path>) -> Result<UserIndex, LoaderError> {
    let index = match seed_path {
        Some(path) => UserIndex::from_file(path).await?,
        None => UserIndex::builtin()?,
    };
    info!(users = index.len(), seeded_from = ?seed_path, "User index built");
    Ok(index)
}
