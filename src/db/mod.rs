//! Durable key-value store for the session credentials.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{LoginToken, StoredCredentials};

/// Key names as constants.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const USERNAME: &str = "username";
}

/// String key-value storage that survives restarts.
///
/// Multi-entry writes and removals are all-or-nothing: a failed `set_all`
/// leaves the previous contents readable.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), AppError>;
    fn remove_all(&self, keys: &[&str]) -> Result<(), AppError>;
}

/// Read the persisted (token, username) pair.
///
/// A pair with either half missing is treated as absent.
pub fn load_credentials(store: &dyn DurableStore) -> Result<Option<StoredCredentials>, AppError> {
    let token = store.get(keys::TOKEN)?.filter(|t| !t.is_empty());
    let username = store.get(keys::USERNAME)?.filter(|u| !u.is_empty());

    Ok(match (token, username) {
        (Some(token), Some(username)) => Some(StoredCredentials {
            token: LoginToken::new(token),
            username,
        }),
        _ => None,
    })
}

/// Write both credential entries in one operation.
pub fn save_credentials(
    store: &dyn DurableStore,
    credentials: &StoredCredentials,
) -> Result<(), AppError> {
    store.set_all(&[
        (keys::TOKEN, credentials.token.expose()),
        (keys::USERNAME, credentials.username.as_str()),
    ])
}

/// Remove both credential entries.
pub fn clear_credentials(store: &dyn DurableStore) -> Result<(), AppError> {
    store.remove_all(&[keys::TOKEN, keys::USERNAME])
}
