//! Command Classification
//!
//! Decides from the leading keyword alone whether a statement produces rows
//! or only a status. The statement is never parsed: SQLite rejects whatever
//! is invalid, and a misclassified statement costs an error response, not
//! data.

use std::fmt;

/// What kind of statement a command is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Produces rows (`SELECT`)
    Read,
    /// Produces only a status (`INSERT`, `UPDATE`, `DELETE`, `CREATE`, `DROP`, `ALTER`)
    Write,
    /// Anything else
    Unrecognized,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Read => write!(f, "read"),
            Classification::Write => write!(f, "write"),
            Classification::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

const READ_VERBS: &[&str] = &["SELECT"];

const WRITE_VERBS: &[&str] = &["INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER"];

/// Classifies a command by its leading keyword, case-insensitively.
///
/// The keyword is the run of ASCII letters after any leading whitespace, so
/// `select*from t` and `SELECT(1)` are both reads.
pub fn classify(command: &str) -> Classification {
    let trimmed = command.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(trimmed.len());
    let keyword = &trimmed[..end];

    if READ_VERBS.iter().any(|verb| keyword.eq_ignore_ascii_case(verb)) {
        Classification::Read
    } else if WRITE_VERBS.iter().any(|verb| keyword.eq_ignore_ascii_case(verb)) {
        Classification::Write
    } else {
        Classification::Unrecognized
    }
}
