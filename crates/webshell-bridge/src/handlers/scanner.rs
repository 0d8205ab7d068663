// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `scanner`: barcode input from the camera or from a hardware scan head.
//
// Camera scans are gated on the camera permission. A denial still answers the
// cell with "" so the page is never left waiting. Scan head reads listen for
// the broadcast configured with `app.setScannerOptions`.

use std::sync::{Arc, OnceLock};

use tracing::{instrument, warn};

use webshell_core::error::{Result, ShellError};
use webshell_core::types::{CellAddress, ExternalResult};

use crate::channel::ValueChannel;
use crate::handler::{CapabilityHandler, HandlerContext, LauncherRegistrar, OperationSpec};
use crate::handlers::settle;
use crate::router::{FlowLauncherHandle, PendingCalls};
use crate::traits::{FlowKind, FlowRequest, Permission, PermissionGate};

const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::new("scan", 1),
    OperationSpec::new("listen", 1),
];

pub struct ScannerHandler {
    ctx: HandlerContext,
    camera: OnceLock<FlowLauncherHandle>,
    scan_head: OnceLock<FlowLauncherHandle>,
    pending: Arc<PendingCalls>,
}

/// Start the flow for `cell`. A launch that fails answers the cell
/// immediately.
fn start(
    launcher: &FlowLauncherHandle,
    pending: &PendingCalls,
    channel: &ValueChannel,
    cell: CellAddress,
    request: FlowRequest,
) -> Result<()> {
    let label = request.kind().label();
    match launcher.launch(pending, cell.clone(), request) {
        Ok(_) => Ok(()),
        Err(e) => {
            channel.write_value(&cell, "");
            channel.error(&format!("{label} could not start: {e}"));
            Err(e)
        }
    }
}

impl ScannerHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self {
            ctx,
            camera: OnceLock::new(),
            scan_head: OnceLock::new(),
            pending: Arc::new(PendingCalls::new()),
        }
    }

    pub fn pending(&self) -> &PendingCalls {
        &self.pending
    }

    fn launcher(&self, slot: &OnceLock<FlowLauncherHandle>, cell: &CellAddress) -> Result<FlowLauncherHandle> {
        slot.get().cloned().ok_or_else(|| {
            self.ctx.channel.write_value(cell, "");
            ShellError::Bridge("scanner launcher not registered".into())
        })
    }

    fn scan(&self, cell: CellAddress) -> Result<()> {
        let launcher = self.launcher(&self.camera, &cell)?;
        let pending = Arc::clone(&self.pending);
        let channel = self.ctx.channel.clone();
        let serial = self.ctx.serial.clone();

        self.ctx.platform.request(
            Permission::Camera,
            Box::new(move |granted| {
                if !granted {
                    channel.write_value(&cell, "");
                    let denied = ShellError::PermissionDenied(Permission::Camera.to_string());
                    channel.report(&denied);
                    return;
                }
                serial.post(move || {
                    if let Err(e) = start(&launcher, &pending, &channel, cell, FlowRequest::ScanBarcode) {
                        warn!(error = %e, "camera scan not started");
                    }
                });
            }),
        );
        Ok(())
    }

    fn listen(&self, cell: CellAddress) -> Result<()> {
        let launcher = self.launcher(&self.scan_head, &cell)?;
        let request = FlowRequest::ListenScanHead {
            action: self.ctx.settings.scan_action(),
            extra: self.ctx.settings.scan_extra(),
        };
        start(&launcher, &self.pending, &self.ctx.channel, cell, request)
    }
}

impl CapabilityHandler for ScannerHandler {
    fn name(&self) -> &str {
        "scanner"
    }

    fn operations(&self) -> &[OperationSpec] {
        OPERATIONS
    }

    fn on_created(&self, launchers: &LauncherRegistrar) -> Result<()> {
        let camera = launchers.register(FlowKind::CameraScan)?;
        let scan_head = launchers.register(FlowKind::ScanHead)?;
        if self.camera.set(camera).is_err() || self.scan_head.set(scan_head).is_err() {
            return Err(ShellError::Bridge("scanner created twice".into()));
        }
        Ok(())
    }

    fn before_destroyed(&self) {
        let abandoned = self.pending.drain();
        if !abandoned.is_empty() {
            warn!(count = abandoned.len(), "abandoning unfinished scans");
        }
    }

    fn process_external_result(&self, result: &ExternalResult) -> bool {
        match self.pending.resolve(result.token) {
            Some(call) => {
                settle(&self.ctx.channel, &call, result);
                true
            }
            None => false,
        }
    }

    #[instrument(skip(self, args), fields(handler = "scanner"))]
    fn invoke(&self, operation: &str, args: &[String]) -> Result<()> {
        let cell = CellAddress::from(args.first().map(String::as_str).unwrap_or_default());
        match operation {
            "scan" => self.scan(cell),
            "listen" => self.listen(cell),
            other => Err(ShellError::UnknownOperation {
                handler: "scanner".into(),
                operation: other.into(),
            }),
        }
    }
}
