//! JSON-RPC 2.0 and LSP error codes.
//!
//! Codes -32768 to -32000 are reserved by JSON-RPC. Codes -32099 to -32000
//! are left to implementations for server errors.

/// Invalid JSON was received.
pub const PARSE_ERROR: i32 = -32700;

/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i32 = -32600;

/// The method does not exist or is not available.
pub const METHOD_NOT_FOUND: i32 = -32601;

/// Invalid method parameters.
pub const INVALID_PARAMS: i32 = -32602;

/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i32 = -32603;

/// The invoked method failed.
pub const INVOCATION_ERROR: i32 = -32000;

/// The request was cancelled (LSP).
pub const REQUEST_CANCELLED: i32 = -32800;

/// Lowest code of the implementation-defined server error range.
pub const SERVER_ERROR_START: i32 = -32099;

/// Highest code of the implementation-defined server error range.
pub const SERVER_ERROR_END: i32 = -32000;

/// Returns a human-readable name for an error code.
pub fn code_name(code: i32) -> &'static str {
    match code {
        PARSE_ERROR => "PARSE_ERROR",
        INVALID_REQUEST => "INVALID_REQUEST",
        METHOD_NOT_FOUND => "METHOD_NOT_FOUND",
        INVALID_PARAMS => "INVALID_PARAMS",
        INTERNAL_ERROR => "INTERNAL_ERROR",
        INVOCATION_ERROR => "INVOCATION_ERROR",
        REQUEST_CANCELLED => "REQUEST_CANCELLED",
        SERVER_ERROR_START..=SERVER_ERROR_END => "SERVER_ERROR",
        -32768..=-32000 => "RESERVED",
        _ => "APPLICATION",
    }
}

/// Returns true if the code lies in the JSON-RPC reserved range.
pub fn is_reserved(code: i32) -> bool {
    (-32768..=-32000).contains(&code)
}
