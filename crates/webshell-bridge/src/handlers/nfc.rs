// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `nfc`: reads the id of an NFC tag through the platform's modal reader.

use std::sync::OnceLock;

use tracing::{instrument, warn};

use webshell_core::error::{Result, ShellError};
use webshell_core::types::{CellAddress, ExternalResult};

use crate::handler::{CapabilityHandler, HandlerContext, LauncherRegistrar, OperationSpec};
use crate::handlers::settle;
use crate::router::{FlowLauncherHandle, PendingCalls};
use crate::traits::{FlowKind, FlowRequest};

const OPERATIONS: &[OperationSpec] = &[OperationSpec::new("readTagId", 1)];

pub struct NfcHandler {
    ctx: HandlerContext,
    launcher: OnceLock<FlowLauncherHandle>,
    pending: PendingCalls,
}

impl NfcHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self {
            ctx,
            launcher: OnceLock::new(),
            pending: PendingCalls::new(),
        }
    }

    /// Calls still waiting for a tag.
    pub fn pending(&self) -> &PendingCalls {
        &self.pending
    }

    fn read_tag_id(&self, cell: CellAddress) -> Result<()> {
        let Some(launcher) = self.launcher.get() else {
            self.ctx.channel.write_value(&cell, "");
            return Err(ShellError::Bridge("nfc launcher not registered".into()));
        };

        if let Err(e) = launcher.launch(&self.pending, cell.clone(), FlowRequest::ReadNfcTag) {
            self.ctx.channel.write_value(&cell, "");
            self.ctx
                .channel
                .error(&format!("NFC reading could not start: {e}"));
            return Err(e);
        }
        self.ctx.channel.log("NFC reading started.");
        Ok(())
    }
}

impl CapabilityHandler for NfcHandler {
    fn name(&self) -> &str {
        "nfc"
    }

    fn operations(&self) -> &[OperationSpec] {
        OPERATIONS
    }

    fn on_created(&self, launchers: &LauncherRegistrar) -> Result<()> {
        let handle = launchers.register(FlowKind::NfcRead)?;
        self.launcher
            .set(handle)
            .map_err(|_| ShellError::Bridge("nfc created twice".into()))
    }

    fn before_destroyed(&self) {
        let abandoned = self.pending.drain();
        if !abandoned.is_empty() {
            warn!(count = abandoned.len(), "abandoning unfinished NFC reads");
        }
    }

    fn process_external_result(&self, result: &ExternalResult) -> bool {
        let Some(call) = self.pending.resolve(result.token) else {
            return false;
        };
        settle(&self.ctx.channel, &call, result);
        true
    }

    #[instrument(skip(self, args), fields(handler = "nfc"))]
    fn invoke(&self, operation: &str, args: &[String]) -> Result<()> {
        match (operation, args) {
            ("readTagId", [cell]) => self.read_tag_id(CellAddress::from(cell.as_str())),
            _ => Err(ShellError::UnknownOperation {
                handler: "nfc".into(),
                operation: operation.into(),
            }),
        }
    }
}
