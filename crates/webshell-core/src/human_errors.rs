// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable fault text for the shell's blocking screens.
//
// Per-call errors never reach the user directly (the page just receives an
// empty value). Only the faults that halt forward progress, an incompatible
// embedding runtime or an uncaught panic, are shown, and they must carry
// actionable text rather than an opaque crash.

use chrono::{DateTime, Utc};

use crate::error::ShellError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Retrying the same action may work.
    Transient,
    /// User must do something (grant a permission, switch a feature on).
    ActionRequired,
    /// Cannot be fixed by retrying on this device.
    Permanent,
    /// The shell cannot continue; only "close" is offered.
    Fatal,
}

/// A human-readable error with plain message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `ShellError` into text a user can act on.
pub fn humanize_error(err: &ShellError) -> HumanError {
    match err {
        ShellError::Incompatible { required, found } => HumanError {
            message: "The web component on this device is too old.".into(),
            suggestion: format!(
                "This app needs browser engine version {required} or newer, but the device has \
                 version {found}. Install or update \"Chrome\" from the app store; the system \
                 web component is upgraded along with it."
            ),
            severity: Severity::Fatal,
        },

        ShellError::PermissionDenied(what) => HumanError {
            message: "Permission was not granted.".into(),
            suggestion: format!("Allow {what} for this app in the system settings, then try again."),
            severity: Severity::ActionRequired,
        },

        ShellError::CapabilityUnavailable(what) => HumanError {
            message: "This feature isn't available on your device.".into(),
            suggestion: format!(
                "{what} needs hardware this device lacks or has switched off. Turn it on if \
                 your device has it."
            ),
            severity: Severity::ActionRequired,
        },

        ShellError::PlatformUnavailable => HumanError {
            message: "This feature isn't available on your device.".into(),
            suggestion: "Some features require a specific type of phone or tablet.".into(),
            severity: Severity::Permanent,
        },

        ShellError::FlowFailed { .. } => HumanError {
            message: "The action didn't finish.".into(),
            suggestion: "Try again.".into(),
            severity: Severity::Transient,
        },

        ShellError::InvalidArgument(detail) => HumanError {
            message: "The page sent a value the app can't use.".into(),
            suggestion: format!("Report this to whoever maintains the page. ({detail})"),
            severity: Severity::Permanent,
        },

        ShellError::NoDocument => HumanError {
            message: "The page hasn't finished loading.".into(),
            suggestion: "Wait for the page to load, or refresh it.".into(),
            severity: Severity::Transient,
        },

        ShellError::Config(_) | ShellError::Io(_) | ShellError::Serialization(_) => HumanError {
            message: "The app's settings couldn't be read or saved.".into(),
            suggestion: "Close and reopen the app. If this keeps happening, clear the app's data."
                .into(),
            severity: Severity::Transient,
        },

        ShellError::EmptyHandlerName
        | ShellError::DuplicateHandler(_)
        | ShellError::UnknownHandler(_)
        | ShellError::UnknownOperation { .. }
        | ShellError::Arity { .. }
        | ShellError::LauncherSealed
        | ShellError::ReentrantLifecycle
        | ShellError::Bridge(_) => HumanError {
            message: "The app had an internal problem.".into(),
            suggestion: "Close and reopen the app. If this keeps happening, please report it."
                .into(),
            severity: Severity::Permanent,
        },
    }
}

/// Text of the "fatal error" screen shown after an uncaught fault.
#[derive(Debug, Clone)]
pub struct FatalReport {
    pub message: String,
    pub detail: String,
    pub at: DateTime<Utc>,
}

impl FatalReport {
    const PREAMBLE: &'static str = "The app hit a serious error. Please take a photo or \
         screenshot of this screen and contact technical support.";

    pub fn new(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: detail.into(),
            at: Utc::now(),
        }
    }

    /// Full screen text. The only action offered is "close".
    pub fn render(&self) -> String {
        format!(
            "{}\r\n\n{}\r\n{}\r\n\n[{}]\n\n[ Close ]",
            Self::PREAMBLE,
            self.message,
            self.detail,
            self.at.to_rfc3339(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incompatible_runtime_names_both_versions() {
        let human = humanize_error(&ShellError::Incompatible {
            required: 87,
            found: 74,
        });
        assert_eq!(human.severity, Severity::Fatal);
        assert!(human.suggestion.contains("87"));
        assert!(human.suggestion.contains("74"));
        assert!(human.suggestion.contains("Chrome"));
    }

    #[test]
    fn permission_denied_needs_user_action() {
        let human = humanize_error(&ShellError::PermissionDenied("camera".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("camera"));
    }

    #[test]
    fn unavailable_differs_from_failure() {
        let absent = humanize_error(&ShellError::CapabilityUnavailable("NFC".into()));
        let failed = humanize_error(&ShellError::FlowFailed {
            flow: "NFC reading".into(),
            code: 0,
        });
        assert_ne!(absent.message, failed.message);
        assert_eq!(failed.severity, Severity::Transient);
    }

    #[test]
    fn flow_errors_read_as_console_diagnostics() {
        let failed = ShellError::FlowFailed {
            flow: "Barcode scan".into(),
            code: 0,
        };
        assert_eq!(
            failed.to_string(),
            "Barcode scan canceled or failed. Return code is : 0"
        );
        let absent = ShellError::CapabilityUnavailable("NFC reading".into());
        assert!(absent.to_string().starts_with("NFC reading is not available"));
    }

    #[test]
    fn fatal_report_offers_only_close() {
        let report = FatalReport::new("index out of bounds", "panicked at src/main.rs:10:5");
        let text = report.render();
        assert!(text.contains("technical support"));
        assert!(text.contains("index out of bounds"));
        assert!(text.contains("src/main.rs:10:5"));
        assert!(text.ends_with("[ Close ]"));
    }
}
