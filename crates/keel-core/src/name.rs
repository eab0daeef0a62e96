//! Object naming helpers.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Maximum length of an object name accepted by the object store.
pub const MAX_NAME_LEN: usize = 253;

static INVALID_NAME_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9._:\-]").expect("name character class is a valid regex")
});

/// Turns an arbitrary identifier (an image ref, a manifest name) into a legal
/// object name.
///
/// Every character outside `[A-Za-z0-9._:-]` becomes `_` and the result is
/// truncated to [`MAX_NAME_LEN`] bytes. The mapping is deterministic so the
/// same identifier always addresses the same object across passes.
pub fn sanitize_name(name: &str) -> String {
    let mut sanitized = INVALID_NAME_CHARS.replace_all(name, "_").into_owned();
    // Only ASCII survives the replacement, so byte truncation is safe.
    sanitized.truncate(MAX_NAME_LEN);
    sanitized
}

/// A name qualified by a namespace. An empty namespace is the default one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NamespacedName {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// A name in the default namespace.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(String::new(), name)
    }

    /// Rejects an empty name and a `/` in either part, so the display form
    /// identifies the pair unambiguously.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(CoreError::invalid_name("name is empty"));
        }
        if self.name.contains('/') || self.namespace.contains('/') {
            return Err(CoreError::invalid_name(self.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}
