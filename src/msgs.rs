//! Message Bundles - Translated Text by Message Id

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleLoadError {
    #[error("Failed to read message bundle: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid message bundle JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Translations for one locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBundle {
    locale: String,
    #[serde(default)]
    messages: BTreeMap<String, String>,
}

impl MessageBundle {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            messages: BTreeMap::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, BundleLoadError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Builder-style insert.
    pub fn with_message(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(id, text);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, text: impl Into<String>) {
        self.messages.insert(id.into(), text.into());
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.messages.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
