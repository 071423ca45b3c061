//! User-visible, dismissible notices.
//!
//! Failures the operator should know about but that do not end the session
//! (a rolled-back update, an empty export) are recorded here instead of being
//! returned as fatal errors.

use std::collections::VecDeque;

use serde::Serialize;

/// Maximum number of notices kept. Older ones are dropped first.
pub const MAX_NOTICES: usize = 50;

/// Notice severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
}

/// Bounded list of notices, oldest first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Notices {
    items: VecDeque<Notice>,
    #[serde(skip)]
    next_id: u64,
}

impl Notices {
    /// Record a notice and return its id.
    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.items.push_back(Notice {
            id,
            level,
            message: message.into(),
        });
        while self.items.len() > MAX_NOTICES {
            self.items.pop_front();
        }
        id
    }

    /// Remove a notice. Returns whether it existed.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|notice| notice.id != id);
        self.items.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Notice> {
        self.items.back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
