// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The capability handler contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use webshell_core::error::{Result, ShellError};
use webshell_core::store::ShellSettings;
use webshell_core::types::ExternalResult;

use crate::channel::ValueChannel;
use crate::router::{AsyncResultRouter, FlowLauncherHandle};
use crate::serial::SerialContext;
use crate::traits::{FlowKind, NativePlatform};

/// A callable operation and the number of string arguments it takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: &'static str,
    pub arity: usize,
}

impl OperationSpec {
    pub const fn new(name: &'static str, arity: usize) -> Self {
        Self { name, arity }
    }
}

/// Find `operation` in `operations` and check the argument count.
pub fn check_arity<'a>(
    handler: &str,
    operations: &'a [OperationSpec],
    operation: &str,
    args: &[String],
) -> Result<&'a OperationSpec> {
    let spec = operations
        .iter()
        .find(|spec| spec.name == operation)
        .ok_or_else(|| ShellError::UnknownOperation {
            handler: handler.to_owned(),
            operation: operation.to_owned(),
        })?;
    if spec.arity != args.len() {
        return Err(ShellError::Arity {
            operation: format!("{handler}.{operation}"),
            expected: spec.arity,
            actual: args.len(),
        });
    }
    Ok(spec)
}

/// A named unit exposing callable operations to hosted content.
///
/// Operations take only string arguments. A synchronous operation writes its
/// value through the [`ValueChannel`] before returning; an asynchronous one
/// launches a flow, records a pending call, and answers from
/// [`process_external_result`](Self::process_external_result).
pub trait CapabilityHandler: Send + Sync {
    /// Namespace the handler is mounted under. Stable and non-empty.
    fn name(&self) -> &str;

    fn operations(&self) -> &[OperationSpec];

    /// Called exactly once after the host runtime exists and before any
    /// operation may be invoked. The only point where flow launchers can be
    /// registered.
    fn on_created(&self, _launchers: &LauncherRegistrar) -> Result<()> {
        Ok(())
    }

    fn on_resumed(&self) {}

    fn before_paused(&self) {}

    fn before_destroyed(&self) {}

    /// Offered a completion. Return `true` only if this handler owns the
    /// token and fully handled it.
    fn process_external_result(&self, _result: &ExternalResult) -> bool {
        false
    }

    /// Run `operation`. Arity has already been checked by the host.
    fn invoke(&self, operation: &str, args: &[String]) -> Result<()>;
}

/// Shared collaborators handed to handlers at construction.
#[derive(Clone)]
pub struct HandlerContext {
    pub channel: ValueChannel,
    pub settings: ShellSettings,
    pub platform: Arc<dyn NativePlatform>,
    pub serial: SerialContext,
}

/// Hands out flow launchers during `on_created`, and refuses afterwards.
#[derive(Clone)]
pub struct LauncherRegistrar {
    platform: Arc<dyn NativePlatform>,
    router: Arc<AsyncResultRouter>,
    sealed: Arc<AtomicBool>,
}

impl LauncherRegistrar {
    pub(crate) fn new(platform: Arc<dyn NativePlatform>, router: Arc<AsyncResultRouter>) -> Self {
        Self {
            platform,
            router,
            sealed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn register(&self, kind: FlowKind) -> Result<FlowLauncherHandle> {
        if self.sealed.load(Ordering::SeqCst) {
            return Err(ShellError::LauncherSealed);
        }
        tracing::debug!(?kind, "flow launcher registered");
        Ok(FlowLauncherHandle::new(
            kind,
            Arc::clone(&self.platform),
            Arc::clone(&self.router),
        ))
    }

    pub(crate) fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }
}
