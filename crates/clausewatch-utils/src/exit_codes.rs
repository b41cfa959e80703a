//! Exit code constants for clausewatch.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid arguments, configuration, or input validation |
//! | 4 | `DOCUMENT` | Document could not be read or has an unsupported type |
//! | 5 | `PROVIDER_AUTH` | Credential rejected by the model service |
//! | 6 | `RATE_LIMITED` | Still rate limited after every retry attempt |
//! | 70 | `PROVIDER_FAILURE` | Any other model service failure |
//! | 130 | `CANCELLED` | Interrupted by the user |

/// Exit codes matching the documented exit code table.
///
/// Use the named constants for common exit codes, or [`as_i32()`](Self::as_i32)
/// to get the numeric value for `std::process::exit()`.
///
/// ```rust
/// use clausewatch_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::RATE_LIMITED, ExitCode::from_i32(6));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments, configuration or empty input
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Document error - unsupported type or unreadable content
    pub const DOCUMENT: ExitCode = ExitCode(4);

    /// Provider authentication - the API key was rejected
    pub const PROVIDER_AUTH: ExitCode = ExitCode(5);

    /// Rate limited - retries exhausted
    pub const RATE_LIMITED: ExitCode = ExitCode(6);

    /// Provider failure - listing or generation failed for another reason
    pub const PROVIDER_FAILURE: ExitCode = ExitCode(70);

    /// Cancelled - interrupted with Ctrl-C
    pub const CANCELLED: ExitCode = ExitCode(130);

    /// Get the numeric exit code value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an ExitCode from a raw i32 value.
    ///
    /// Prefer using the named constants when possible.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}
