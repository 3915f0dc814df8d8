//! JSON mapping files.
//!
//! Both files are flat JSON objects:
//!
//! ```json
//! { "pivotal_user1": "5b10ac8d82e05b22cc7d4ef5" }
//! { "started": "In Progress", "finished": "Code Review" }
//! ```
//!
//! A status file replaces the built-in table entirely.

use std::path::Path;

use migration::{StatusMap, StoreError, UserDirectory};
use serde::de::DeserializeOwned;
use tracing::info;

pub fn load_user_directory(path: &Path) -> Result<UserDirectory, StoreError> {
    let users: UserDirectory = load_json(path)?;
    info!(path = %path.display(), users = users.len(), "user mapping loaded");
    Ok(users)
}

pub fn load_status_map(path: &Path) -> Result<StatusMap, StoreError> {
    let statuses = load_json(path)?;
    info!(path = %path.display(), "status mapping loaded");
    Ok(statuses)
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let text = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| StoreError::Mapping {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
