// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the bridge's external collaborators.
//
// The browser engine and the OS facilities (permission prompts, activity
// launches, process control) are consumed, not implemented, here. A real
// embedding provides them; `stub` and `headless` stand in on desktop/CI.

use webshell_core::error::Result;
use webshell_core::types::RequestToken;

use crate::router::CompletionSender;

/// The embedding browser engine.
pub trait HostRuntime: Send + Sync {
    /// Whether a document is currently loaded and able to run script.
    fn has_document(&self) -> bool;

    /// Execute a script fragment in the current document.
    fn evaluate_script(&self, script: &str) -> Result<()>;

    /// Expose a callable namespace to hosted content under `name`.
    fn bind_namespace(&self, name: &str) -> Result<()>;

    /// Load `url` as the current document.
    fn navigate(&self, url: &str) -> Result<()>;

    /// Append ` <suffix>` to the user agent of every later request, so hosted
    /// content can tell it runs inside the shell.
    fn set_user_agent_suffix(&self, suffix: &str) -> Result<()>;

    /// Engine version string (e.g. "103.0.5060.73"), if it can be read.
    fn engine_version(&self) -> Option<String>;
}

/// Unified native platform grouping every OS facility handlers rely on.
pub trait NativePlatform: ShellControl + FlowLauncher + PermissionGate + Send + Sync {
    /// Human-readable platform name (e.g. "Android 14").
    fn platform_name(&self) -> &str;
}

/// Shell pages the bridge can open on top of the hosted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellPage {
    Settings,
    QuickConfig,
}

/// Process-level control and identity of the shell.
pub trait ShellControl {
    /// Installed package identifier.
    fn package_name(&self) -> String;

    /// Human-readable version of the shell.
    fn version_name(&self) -> Result<String>;

    /// Restart the shell process. Configuration written before this call
    /// takes effect in the new process.
    fn restart(&self);

    /// Close the shell without prompting.
    fn close(&self);

    /// Open one of the shell's own pages.
    fn open_page(&self, page: ShellPage) -> Result<()>;

    /// Place a phone call. Callers must hold [`Permission::CallPhone`].
    fn dial(&self, number: &str) -> Result<()>;
}

/// Sensitive permissions gated behind a user prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Camera,
    CallPhone,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Camera => f.write_str("camera access"),
            Self::CallPhone => f.write_str("phone calls"),
        }
    }
}

/// Receives the user's answer to a permission prompt. May run on any thread.
pub type PermissionReply = Box<dyn FnOnce(bool) + Send + 'static>;

/// OS permission prompts.
pub trait PermissionGate {
    /// Ask for `permission`; `reply` is called exactly once with the answer.
    fn request(&self, permission: Permission, reply: PermissionReply);
}

/// The kinds of external flow a handler can register a launcher for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    /// Modal NFC reader returning a tag id.
    NfcRead,
    /// Camera-based barcode scanner.
    CameraScan,
    /// One-shot listen for a hardware scan head broadcast.
    ScanHead,
}

impl FlowKind {
    /// Label used in console diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Self::NfcRead => "NFC reading",
            Self::CameraScan => "Barcode scan",
            Self::ScanHead => "Scan head read",
        }
    }
}

/// A concrete launch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowRequest {
    ReadNfcTag,
    ScanBarcode,
    /// Wait for a broadcast with `action`, carrying the code under `extra`.
    ListenScanHead { action: String, extra: String },
}

impl FlowRequest {
    pub fn kind(&self) -> FlowKind {
        match self {
            Self::ReadNfcTag => FlowKind::NfcRead,
            Self::ScanBarcode => FlowKind::CameraScan,
            Self::ListenScanHead { .. } => FlowKind::ScanHead,
        }
    }

    /// Payload key the flow's successful result is delivered under.
    pub fn payload_key(&self) -> &str {
        match self {
            Self::ReadNfcTag => "tagId",
            Self::ScanBarcode => "barcode",
            Self::ListenScanHead { extra, .. } => extra,
        }
    }
}

/// Launch external flows whose outcome arrives later.
pub trait FlowLauncher {
    /// Start `request`. Its outcome must eventually be reported through
    /// `completions` under `token`, from any thread. Returning `Err` means
    /// nothing was started and nothing will be reported.
    fn launch(
        &self,
        token: RequestToken,
        request: FlowRequest,
        completions: CompletionSender,
    ) -> Result<()>;
}
