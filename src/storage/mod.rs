mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use log::warn;
use thiserror::Error;

use crate::ui::Theme;

/// Key holding the serialized conversation list.
pub const CONVERSATIONS_KEY: &str = "chatHistory";
/// Key holding the theme preference (`"dark"` / `"light"`).
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// String key/value persistence, the shape of browser local storage.
/// Every write replaces the whole value under the key.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Reads the stored theme. An unrecognised value is treated as unset.
pub fn load_theme(store: &dyn KeyValueStore) -> Result<Option<Theme>, StorageError> {
    let Some(raw) = store.get(THEME_KEY)? else {
        return Ok(None);
    };
    match raw.parse::<Theme>() {
        Ok(theme) => Ok(Some(theme)),
        Err(e) => {
            warn!("Ignoring stored theme: {}", e);
            Ok(None)
        }
    }
}

pub fn save_theme(store: &dyn KeyValueStore, theme: Theme) -> Result<(), StorageError> {
    store.set(THEME_KEY, theme.as_str())
}
