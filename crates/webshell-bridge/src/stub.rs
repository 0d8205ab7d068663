// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub platform for desktop/CI builds where native mobile APIs are unavailable.
//
// Process control and shell pages are recorded instead of performed. Flows
// are either left open for the caller to complete by hand (the headless
// driver's `complete` command, tests) or answered immediately as
// not-available, mirroring a device without the hardware.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use webshell_core::error::{Result, ShellError};
use webshell_core::types::{ExternalResult, OutcomeCode, RequestToken};

use crate::router::CompletionSender;
use crate::traits::*;

/// How the stub answers flow launches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowBehavior {
    /// Start the flow and wait for [`StubPlatform::complete`].
    #[default]
    Defer,
    /// Report `NOT_AVAILABLE` straight away.
    Unavailable,
    /// Refuse to start (`launch` returns `PlatformUnavailable`).
    Refuse,
}

#[derive(Default)]
struct Recorded {
    launches: Vec<(RequestToken, FlowRequest)>,
    pages: Vec<ShellPage>,
    dials: Vec<String>,
    restarts: usize,
    closes: usize,
    completions: Option<CompletionSender>,
}

/// Recording platform returned on non-mobile builds.
pub struct StubPlatform {
    version: Option<String>,
    package: String,
    granted: HashSet<Permission>,
    flows: FlowBehavior,
    recorded: Mutex<Recorded>,
}

impl Default for StubPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl StubPlatform {
    pub fn new() -> Self {
        Self {
            version: None,
            package: "dev.webshell.desktop".into(),
            granted: HashSet::new(),
            flows: FlowBehavior::default(),
            recorded: Mutex::new(Recorded::default()),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    pub fn granting(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.granted.extend(permissions);
        self
    }

    pub fn with_flows(mut self, flows: FlowBehavior) -> Self {
        self.flows = flows;
        self
    }

    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn launches(&self) -> Vec<(RequestToken, FlowRequest)> {
        self.recorded().launches.clone()
    }

    /// Token of the most recent launch.
    pub fn last_token(&self) -> Option<RequestToken> {
        self.recorded().launches.last().map(|(token, _)| *token)
    }

    pub fn pages(&self) -> Vec<ShellPage> {
        self.recorded().pages.clone()
    }

    pub fn dials(&self) -> Vec<String> {
        self.recorded().dials.clone()
    }

    pub fn restarts(&self) -> usize {
        self.recorded().restarts
    }

    pub fn closes(&self) -> usize {
        self.recorded().closes
    }

    /// Report a flow outcome as the native side would. Returns `false` if no
    /// flow was ever launched or the shell is shutting down.
    pub fn complete(&self, result: ExternalResult) -> bool {
        let sender = self.recorded().completions.clone();
        match sender {
            Some(sender) => sender.complete(result),
            None => {
                warn!(token = %result.token, "no flow launched; completion ignored");
                false
            }
        }
    }
}

impl NativePlatform for StubPlatform {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }
}

impl ShellControl for StubPlatform {
    fn package_name(&self) -> String {
        self.package.clone()
    }

    fn version_name(&self) -> Result<String> {
        self.version.clone().ok_or_else(|| {
            warn!("ShellControl::version_name called on stub platform without a version");
            ShellError::PlatformUnavailable
        })
    }

    fn restart(&self) {
        info!("restart requested");
        self.recorded().restarts += 1;
    }

    fn close(&self) {
        info!("close requested");
        self.recorded().closes += 1;
    }

    fn open_page(&self, page: ShellPage) -> Result<()> {
        info!(?page, "shell page opened");
        self.recorded().pages.push(page);
        Ok(())
    }

    fn dial(&self, number: &str) -> Result<()> {
        info!(number, "dialing");
        self.recorded().dials.push(number.to_owned());
        Ok(())
    }
}

impl PermissionGate for StubPlatform {
    fn request(&self, permission: Permission, reply: PermissionReply) {
        let granted = self.granted.contains(&permission);
        if !granted {
            warn!(%permission, "permission denied on stub platform");
        }
        reply(granted);
    }
}

impl FlowLauncher for StubPlatform {
    fn launch(
        &self,
        token: RequestToken,
        request: FlowRequest,
        completions: CompletionSender,
    ) -> Result<()> {
        if self.flows == FlowBehavior::Refuse {
            warn!(kind = ?request.kind(), "FlowLauncher::launch called on stub platform");
            return Err(ShellError::PlatformUnavailable);
        }
        {
            let mut recorded = self.recorded();
            recorded.launches.push((token, request));
            recorded.completions = Some(completions.clone());
        }
        if self.flows == FlowBehavior::Unavailable {
            completions.complete(ExternalResult::new(token, OutcomeCode::NOT_AVAILABLE, None));
        }
        Ok(())
    }
}
