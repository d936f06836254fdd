// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Append-only import log
//!
//! Recoverable problems are collected here instead of being returned as
//! errors, so a large import can report everything at the end. Each entry
//! is also forwarded to `tracing`.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiagnosticKind {
    Progress,
    UnhandledOpcode,
    UnresolvedReference,
    BrokenReference,
    Structural,
    ShortRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Info => write!(f, "{}", self.message),
            Severity::Warning => write!(f, "WARNING: {}", self.message),
            Severity::Error => write!(f, "ERROR: {}", self.message),
        }
    }
}

/// Shared diagnostic buffer. Clones append to the same entries.
#[derive(Debug, Clone, Default)]
pub struct ImportLog {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl ImportLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, severity: Severity, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Info => tracing::debug!(?kind, "{}", message),
            Severity::Warning => tracing::warn!(?kind, "{}", message),
            Severity::Error => tracing::error!(?kind, "{}", message),
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Diagnostic {
                severity,
                kind,
                message,
            });
    }

    pub fn info(&self, kind: DiagnosticKind, message: impl Into<String>) {
        self.push(Severity::Info, kind, message);
    }

    pub fn warn(&self, kind: DiagnosticKind, message: impl Into<String>) {
        self.push(Severity::Warning, kind, message);
    }

    pub fn error(&self, kind: DiagnosticKind, message: impl Into<String>) {
        self.push(Severity::Error, kind, message);
    }

    /// Copy of all entries so far
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Warnings and errors only
    pub fn problems(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| d.severity >= Severity::Warning)
            .cloned()
            .collect()
    }

    pub fn has_problems(&self) -> bool {
        self.count(Severity::Warning) + self.count(Severity::Error) > 0
    }
}

impl fmt::Display for ImportLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self.entries() {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}
