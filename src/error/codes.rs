/// Error code registry for tickervol
///
/// Error codes are organized by category:
/// - 1000-1999: Input errors
/// - 2000-2999: Configuration errors
/// - 3000-3999: Execution errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Input errors (1000-1999)
    pub const INPUT_GENERIC: u16 = 1000;
    pub const INPUT_NOT_FOUND: u16 = 1001;
    pub const INPUT_NOT_A_DIRECTORY: u16 = 1002;
    pub const INPUT_PERMISSION_DENIED: u16 = 1003;

    // Configuration errors (2000-2999)
    pub const CONFIG_GENERIC: u16 = 2000;
    pub const CONFIG_NOT_FOUND: u16 = 2001;
    pub const CONFIG_PARSE_ERROR: u16 = 2002;
    pub const CONFIG_INVALID_VALUE: u16 = 2003;

    // Execution errors (3000-3999)
    pub const EXEC_WORKER_PROGRAM: u16 = 3001;
    pub const EXEC_QUEUE_CLOSED: u16 = 3002;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        // Input errors
        1000 => "Generic input error",
        1001 => "Input directory not found",
        1002 => "Input path is not a directory",
        1003 => "Permission denied reading input directory",

        // Configuration errors
        2000 => "Generic configuration error",
        2001 => "Configuration file not found",
        2002 => "Failed to parse configuration",
        2003 => "Invalid value in configuration",

        // Execution errors
        3001 => "Worker executable could not be resolved",
        3002 => "Work queue closed unexpectedly",

        _ => "Unknown error",
    }
}
