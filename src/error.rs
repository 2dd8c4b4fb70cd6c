//! Exit codes and structured error output.

use serde::Serialize;

/// Process exit codes.
///
/// - 0: Success
/// - 1: General error (bad arguments, unreadable catalogue, ...)
/// - 2: Nothing to do (no files matched the command)
/// - 3: Partial success (some files failed)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NothingToDo = 2,
    PartialSuccess = 3,
    Interrupted = 130,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "CT000",
            Self::GeneralError => "CT001",
            Self::NothingToDo => "CT002",
            Self::PartialSuccess => "CT003",
            Self::Interrupted => "CT130",
        }
    }
}

/// Error as printed with `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "CT001")
    pub code: String,
    pub exit_code: i32,
    pub message: String,
    /// Causes, outermost first
    pub causes: Vec<String>,
    pub interrupted: bool,
}

impl StructuredError {
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            causes: err.chain().skip(1).map(ToString::to_string).collect(),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
