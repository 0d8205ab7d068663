// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the webshell bridge.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Opaque locator supplied by hosted content naming where a returned value
/// should be written back.
///
/// The bridge never parses it; it is forwarded verbatim into generated
/// script text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellAddress(String);

impl CellAddress {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CellAddress {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for CellAddress {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for CellAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlation token issued when a native asynchronous operation is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestToken(pub u64);

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Integer outcome reported by a finished native flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutcomeCode(pub i32);

impl OutcomeCode {
    /// The flow finished and produced its result.
    pub const OK: Self = Self(-1);
    /// The user backed out, or the router gave up waiting.
    pub const CANCELED: Self = Self(0);
    /// The device lacks the feature or it is switched off.
    pub const NOT_AVAILABLE: Self = Self(2);

    pub fn class(self) -> OutcomeClass {
        match self {
            Self::OK => OutcomeClass::Success,
            Self::NOT_AVAILABLE => OutcomeClass::NotAvailable,
            _ => OutcomeClass::Failed,
        }
    }
}

impl std::fmt::Display for OutcomeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three outcome classes handlers distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeClass {
    Success,
    NotAvailable,
    Failed,
}

/// Optional key/value payload attached to a completion event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultBundle(BTreeMap<String, String>);

impl ResultBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for ResultBundle {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A native asynchronous operation finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalResult {
    pub token: RequestToken,
    pub code: OutcomeCode,
    pub payload: Option<ResultBundle>,
}

impl ExternalResult {
    pub fn new(token: RequestToken, code: OutcomeCode, payload: Option<ResultBundle>) -> Self {
        Self {
            token,
            code,
            payload,
        }
    }

    /// Completion synthesized when a pending call is abandoned.
    pub fn canceled(token: RequestToken) -> Self {
        Self::new(token, OutcomeCode::CANCELED, None)
    }
}

/// Host foreground/background/teardown transitions forwarded to handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Resumed,
    Paused,
    Destroyed,
}

/// Severity of a line written to the in-page console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsoleLevel {
    Log,
    Error,
}

impl ConsoleLevel {
    /// Name of the `console` method this level maps to.
    pub fn method(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Error => "error",
        }
    }
}
