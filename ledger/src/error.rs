use std::path::PathBuf;

/// Failures surfaced by ledger operations.
///
/// Sign-up admission outcomes are not errors; see [`crate::signup::Admission`].
#[derive(Debug, thiserror::Error)]
pub enum BonusError {
    /// A submitted `Name|ID|Kills` line could not be parsed. `line` is the
    /// 0-based index into the submitted text.
    #[error("line {line}: {reason} (expected `Name|ID|Kills`)")]
    Format { line: usize, reason: String },

    /// Caller supplied a value outside the accepted domain (negative kills,
    /// malformed date or time slot, overflowing payout, bad config value).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Payment status other than `Paid` or `Due`.
    #[error("invalid status `{0}`: expected Paid or Due")]
    InvalidStatus(String),

    /// Reading or writing the ledger failed.
    #[error("storage error at {path}: {message}")]
    Storage { path: PathBuf, message: String },
}

impl BonusError {
    pub(crate) fn format(line: usize, reason: impl Into<String>) -> Self {
        BonusError::Format {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        BonusError::Storage {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BonusError>;
