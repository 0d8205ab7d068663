// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the webshell bridge.

use thiserror::Error;

/// Top-level error type for all webshell operations.
#[derive(Debug, Error)]
pub enum ShellError {
    // -- Per-call errors (degrade to an empty value on the page) --
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A native flow finished without a usable value. `code` is the raw
    /// outcome code it reported.
    #[error("{flow} canceled or failed. Return code is : {code}")]
    FlowFailed { flow: String, code: i32 },

    #[error("{0} is not available: the device is missing, not functional or disabled")]
    CapabilityUnavailable(String),

    // -- Page-load / process faults --
    #[error("embedding runtime too old: requires major version {required}, found {found}")]
    Incompatible { required: u32, found: u32 },

    #[error("host runtime has no loaded document")]
    NoDocument,

    // -- Registry / namespace --
    #[error("handler name must not be empty")]
    EmptyHandlerName,

    #[error("duplicate handler name: {0}")]
    DuplicateHandler(String),

    #[error("no handler mounted under `{0}`")]
    UnknownHandler(String),

    #[error("handler `{handler}` has no operation `{operation}`")]
    UnknownOperation { handler: String, operation: String },

    #[error("`{operation}` takes {expected} argument(s), got {actual}")]
    Arity {
        operation: String,
        expected: usize,
        actual: usize,
    },

    #[error("flow launchers can only be registered while handlers are being created")]
    LauncherSealed,

    #[error("lifecycle transition started while another was being dispatched")]
    ReentrantLifecycle,

    // -- Storage / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ShellError>;
