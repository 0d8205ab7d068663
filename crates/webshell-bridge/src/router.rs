// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async result router: correlates native flow completions with the calls
// that started them.
//
// Every launch gets a fresh `RequestToken` from the shared `TokenIssuer` and
// the owning handler records a `PendingCall` under it. Completions arrive on
// arbitrary threads through a `CompletionSender`, queue in the
// `CompletionInbox`, and are pumped into `BridgeHost::dispatch_external_result`
// by the host. Resolving a token removes its entry and disarms its timeout, so
// a late or duplicate completion for the same token is claimed by nobody.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument, warn};

use webshell_core::error::{Result, ShellError};
use webshell_core::types::{CellAddress, ExternalResult, RequestToken};

use crate::traits::{FlowKind, FlowLauncher, FlowRequest, NativePlatform};

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Shared monotonic source of request tokens. Tokens are never reused.
#[derive(Debug, Clone, Default)]
pub struct TokenIssuer {
    last: Arc<AtomicU64>,
}

impl TokenIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> RequestToken {
        RequestToken(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

// ---------------------------------------------------------------------------
// Pending calls
// ---------------------------------------------------------------------------

/// Pending timeout timer. Dropping it aborts the timer task.
#[derive(Debug)]
pub struct TimeoutGuard(AbortHandle);

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// An in-flight asynchronous call awaiting its completion.
#[derive(Debug)]
pub struct PendingCall {
    /// Where the eventual value is written.
    pub cell: CellAddress,
    pub flow: FlowRequest,
    pub started: Instant,
    timeout: Option<TimeoutGuard>,
}

impl PendingCall {
    pub fn has_timeout(&self) -> bool {
        self.timeout.is_some()
    }

    fn disarm(&mut self) {
        self.timeout = None;
    }
}

/// A handler's own token -> call map.
#[derive(Debug, Default)]
pub struct PendingCalls {
    calls: Mutex<HashMap<RequestToken, PendingCall>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    fn calls(&self) -> MutexGuard<'_, HashMap<RequestToken, PendingCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a call launched under `token`.
    pub fn begin(&self, token: RequestToken, cell: CellAddress, flow: FlowRequest) {
        let previous = self.calls().insert(
            token,
            PendingCall {
                cell,
                flow,
                started: Instant::now(),
                timeout: None,
            },
        );
        debug_assert!(previous.is_none(), "token {token} issued twice");
    }

    /// Attach a timeout to the call under `token`. A guard for a call that is
    /// no longer pending is dropped, which aborts its timer.
    fn arm(&self, token: RequestToken, guard: TimeoutGuard) {
        if let Some(call) = self.calls().get_mut(&token) {
            call.timeout = Some(guard);
        }
    }

    /// Remove and return the call for `token`, if it is still pending. Its
    /// timeout, if any, is aborted.
    pub fn resolve(&self, token: RequestToken) -> Option<PendingCall> {
        let mut call = self.calls().remove(&token)?;
        call.disarm();
        Some(call)
    }

    pub fn contains(&self, token: RequestToken) -> bool {
        self.calls().contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.calls().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls().is_empty()
    }

    /// Remove every pending call and abort their timeouts (teardown).
    pub fn drain(&self) -> Vec<(RequestToken, PendingCall)> {
        let mut drained: Vec<_> = self.calls().drain().collect();
        for (_, call) in &mut drained {
            call.disarm();
        }
        drained.sort_by_key(|(token, _)| *token);
        drained
    }
}

// ---------------------------------------------------------------------------
// Completion transport
// ---------------------------------------------------------------------------

/// Cloneable, thread-safe reporter of flow outcomes.
#[derive(Debug, Clone)]
pub struct CompletionSender {
    tx: mpsc::UnboundedSender<ExternalResult>,
}

impl CompletionSender {
    /// Report `result`. Returns `false` if the shell is shutting down and the
    /// completion was dropped.
    pub fn complete(&self, result: ExternalResult) -> bool {
        let token = result.token;
        match self.tx.send(result) {
            Ok(()) => true,
            Err(_) => {
                warn!(%token, "completion inbox closed; result dropped");
                false
            }
        }
    }
}

/// Receiving end, owned by the bridge host.
#[derive(Debug)]
pub struct CompletionInbox {
    rx: mpsc::UnboundedReceiver<ExternalResult>,
}

impl CompletionInbox {
    /// Next queued completion without waiting.
    pub fn try_next(&mut self) -> Option<ExternalResult> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next completion. `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<ExternalResult> {
        self.rx.recv().await
    }
}

pub fn completion_channel() -> (CompletionSender, CompletionInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CompletionSender { tx }, CompletionInbox { rx })
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    /// Resolve calls still pending after this long as canceled.
    /// `None` waits forever.
    pub pending_timeout: Option<Duration>,
}

/// Issues tokens and carries completions back to the host.
pub struct AsyncResultRouter {
    issuer: TokenIssuer,
    completions: CompletionSender,
    options: RouterOptions,
}

impl AsyncResultRouter {
    /// Create a router and the inbox the host drains.
    pub fn new(options: RouterOptions) -> (Self, CompletionInbox) {
        let (completions, inbox) = completion_channel();
        let router = Self {
            issuer: TokenIssuer::new(),
            completions,
            options,
        };
        (router, inbox)
    }

    pub fn issue(&self) -> RequestToken {
        self.issuer.next()
    }

    pub fn completions(&self) -> CompletionSender {
        self.completions.clone()
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Start the pending timer for `token`, if one is configured. The timer
    /// runs until it fires or the returned guard is dropped.
    fn arm_timeout(&self, token: RequestToken) -> Option<TimeoutGuard> {
        let timeout = self.options.pending_timeout?;
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(%token, "no async runtime; pending timeout not armed");
            return None;
        };
        let completions = self.completions.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            debug!(%token, ?timeout, "pending timeout elapsed");
            completions.complete(ExternalResult::canceled(token));
        });
        Some(TimeoutGuard(task.abort_handle()))
    }
}

/// Launch capability for one flow kind, obtained during `on_created`.
#[derive(Clone)]
pub struct FlowLauncherHandle {
    kind: FlowKind,
    platform: Arc<dyn NativePlatform>,
    router: Arc<AsyncResultRouter>,
}

impl std::fmt::Debug for FlowLauncherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowLauncherHandle")
            .field("kind", &self.kind)
            .field("platform", &self.platform.platform_name())
            .finish()
    }
}

impl FlowLauncherHandle {
    pub(crate) fn new(
        kind: FlowKind,
        platform: Arc<dyn NativePlatform>,
        router: Arc<AsyncResultRouter>,
    ) -> Self {
        Self {
            kind,
            platform,
            router,
        }
    }

    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    /// Record a call answering `cell` in `pending` and start `request` for
    /// it under a fresh token. On `Err` nothing was started and the entry is
    /// already gone again.
    #[instrument(skip_all, fields(kind = ?self.kind, %cell))]
    pub fn launch(
        &self,
        pending: &PendingCalls,
        cell: CellAddress,
        request: FlowRequest,
    ) -> Result<RequestToken> {
        if request.kind() != self.kind {
            return Err(ShellError::Bridge(format!(
                "{:?} launcher cannot start {:?}",
                self.kind,
                request.kind()
            )));
        }
        let token = self.router.issue();
        pending.begin(token, cell, request.clone());
        if let Err(e) = self
            .platform
            .launch(token, request, self.router.completions())
        {
            pending.resolve(token);
            return Err(e);
        }
        info!(%token, "flow launched");
        if let Some(guard) = self.router.arm_timeout(token) {
            pending.arm(token, guard);
        }
        Ok(token)
    }
}
