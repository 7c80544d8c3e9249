//! Response Types
//!
//! Every command produces exactly one [`Response`], rendered to a single
//! line of text before framing.
//!
//! ## Wire Grammar
//!
//! ```text
//! write ok      done                                (configurable literal)
//! read ok       SUCCESS                             (no rows)
//!               SUCCESS|('alice',)|('bob',)         (one segment per row)
//! failure       ERROR:<CATEGORY>[:<detail>]
//! ```
//!
//! Callers treat anything not starting with `ERROR` as success.

use std::fmt;

/// Default acknowledgement for a successful write.
pub const DEFAULT_WRITE_ACK: &str = "done";

/// Leading literal of a read result.
pub const SUCCESS: &str = "SUCCESS";

/// Leading literal of a failure.
pub const ERROR: &str = "ERROR";

/// Separator between a read result and its rows.
pub const ROW_SEPARATOR: char = '|';

/// Why a command failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Uniqueness constraint violation
    DuplicateEntry,
    /// Any other error reported by the store
    StoreError,
    /// Neither a read nor a recognized write
    UnknownCommand,
    /// Fault in the relay itself
    Internal,
}

impl ErrorCategory {
    /// The category as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::DuplicateEntry => "DUPLICATE",
            ErrorCategory::StoreError => "STORE",
            ErrorCategory::UnknownCommand => "UNKNOWN_COMMAND",
            ErrorCategory::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `rows` is `None` for a write and `Some` (possibly empty) for a read.
    Success { rows: Option<Vec<String>> },

    /// The command failed; `detail` is omitted from the wire when `None`.
    Failure {
        category: ErrorCategory,
        detail: Option<String>,
    },
}

impl Response {
    /// A write acknowledgement.
    pub fn done() -> Self {
        Response::Success { rows: None }
    }

    /// A read result.
    pub fn rows(rows: Vec<String>) -> Self {
        Response::Success { rows: Some(rows) }
    }

    /// A failure without detail.
    pub fn failure(category: ErrorCategory) -> Self {
        Response::Failure {
            category,
            detail: None,
        }
    }

    /// A failure carrying a human-readable detail.
    pub fn failure_with(category: ErrorCategory, detail: impl Into<String>) -> Self {
        Response::Failure {
            category,
            detail: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }

    /// Short label for logs: `done`, `rows`, or the failure category.
    pub fn label(&self) -> &'static str {
        match self {
            Response::Success { rows: None } => "done",
            Response::Success { rows: Some(_) } => "rows",
            Response::Failure { category, .. } => category.as_str(),
        }
    }

    /// Renders the response text (without the frame delimiter).
    pub fn render(&self, write_ack: &str) -> String {
        match self {
            Response::Success { rows: None } => write_ack.to_string(),
            Response::Success { rows: Some(rows) } => {
                let capacity = SUCCESS.len() + rows.iter().map(|r| r.len() + 1).sum::<usize>();
                let mut out = String::with_capacity(capacity);
                out.push_str(SUCCESS);
                for row in rows {
                    out.push(ROW_SEPARATOR);
                    out.push_str(row);
                }
                out
            }
            Response::Failure { category, detail } => match detail {
                Some(detail) => format!("{}:{}:{}", ERROR, category, detail),
                None => format!("{}:{}", ERROR, category),
            },
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(DEFAULT_WRITE_ACK))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_write_ack() {
        assert_eq!(Response::done().render("done"), "done");
        assert_eq!(Response::done().render("SUCCESS"), "SUCCESS");
    }

    #[test]
    fn test_render_empty_read() {
        assert_eq!(Response::rows(vec![]).to_string(), "SUCCESS");
    }

    #[test]
    fn test_render_rows() {
        let response = Response::rows(vec!["('alice',)".into(), "('bob',)".into()]);
        let text = response.to_string();
        assert_eq!(text, "SUCCESS|('alice',)|('bob',)");
        assert_eq!(text.split('|').count() - 1, 2);
    }

    #[test]
    fn test_render_failures() {
        assert_eq!(
            Response::failure(ErrorCategory::DuplicateEntry).to_string(),
            "ERROR:DUPLICATE"
        );
        assert_eq!(
            Response::failure_with(ErrorCategory::StoreError, "no such table: x").to_string(),
            "ERROR:STORE:no such table: x"
        );
        assert_eq!(
            Response::failure(ErrorCategory::UnknownCommand).to_string(),
            "ERROR:UNKNOWN_COMMAND"
        );
    }

    #[test]
    fn test_label() {
        assert_eq!(Response::done().label(), "done");
        assert_eq!(Response::rows(vec![]).label(), "rows");
        assert_eq!(Response::failure(ErrorCategory::Internal).label(), "INTERNAL");
        assert!(!Response::failure(ErrorCategory::Internal).is_success());
    }
}
