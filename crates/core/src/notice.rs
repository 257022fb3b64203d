//! User-facing notices derived from lookup failures or election-state
//! conditions. Published through the `NOTICE` context key; a null value
//! clears any displayed alert.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A typed user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    #[serde(rename = "type")]
    pub level: NoticeLevel,
    pub title: String,
    pub desc: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, desc: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, desc)
    }

    pub fn warning(title: impl Into<String>, desc: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, title, desc)
    }

    pub fn error(title: impl Into<String>, desc: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, desc)
    }

    fn new(level: NoticeLevel, title: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            desc: desc.into(),
        }
    }

    /// Infallible conversion for storage in the context.
    pub fn to_value(&self) -> Value {
        let level = match self.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        json!({ "type": level, "title": self.title, "desc": self.desc })
    }
}
