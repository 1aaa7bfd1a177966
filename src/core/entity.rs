//! Document trait - common interface for stored record types

use serde::{de::DeserializeOwned, Serialize};

/// Common trait for everything kept in the store as its own document
pub trait Document: Serialize + DeserializeOwned {
    /// Directory (collection) the documents live in, e.g. "batches"
    const COLLECTION: &'static str;

    /// Singular name for messages (e.g., "batch")
    const KIND: &'static str;

    /// The document key (batch number, SKU, machine name, measurement ID)
    fn key(&self) -> &str;
}

/// Check that a user-supplied key can be used as a document key
///
/// Keys become file names, so only ASCII letters, digits, `-`, `_` and `.`
/// are accepted, and the key may not start with a dot.
pub fn validate_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("key cannot be empty".to_string());
    }
    if key.starts_with('.') {
        return Err(format!("'{}' cannot start with '.'", key));
    }
    if let Some(bad) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(format!("'{}' contains invalid character '{}'", key, bad));
    }
    Ok(())
}
