//! Exit codes for the pipewrap binary.
//!
//! A clean SIGINT-initiated drain is the tool's normal termination and exits
//! zero; failures are distinguished by when they occurred.

use crate::commands::AppError;

/// Exit code constants.
pub mod codes {
    /// Clean shutdown after a full drain.
    pub const SUCCESS: i32 = 0;
    /// Usage or configuration error, reported before any resource is
    /// acquired.
    pub const USAGE: i32 = 1;
    /// The capture backend failed to start.
    pub const STARTUP: i32 = 2;
    /// The pipeline aborted at runtime.
    pub const RUNTIME: i32 = 3;
}

/// Maps a session failure to its exit code.
pub fn exit_code(error: &AppError) -> i32 {
    match error {
        AppError::Usage(_) => codes::USAGE,
        AppError::Startup(_) => codes::STARTUP,
        AppError::Runtime => codes::RUNTIME,
    }
}

#[cfg(test)]
mod tests {
    use capture_source::CaptureError;

    use crate::cli::CliError;

    use super::*;

    #[test]
    fn usage_errors_map_to_one() {
        let error = AppError::Usage(CliError::InvalidCount(0));
        assert_eq!(exit_code(&error), codes::USAGE);
    }

    #[test]
    fn startup_errors_map_to_two() {
        let error = AppError::Startup(CaptureError::EmptyCommand);
        assert_eq!(exit_code(&error), codes::STARTUP);
    }

    #[test]
    fn runtime_errors_map_to_three() {
        assert_eq!(exit_code(&AppError::Runtime), codes::RUNTIME);
    }

    #[test]
    fn code_constants_are_distinct() {
        assert_eq!(codes::SUCCESS, 0);
        assert_eq!(codes::USAGE, 1);
        assert_eq!(codes::STARTUP, 2);
        assert_eq!(codes::RUNTIME, 3);
    }
}
