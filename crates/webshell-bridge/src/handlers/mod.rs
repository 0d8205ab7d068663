// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The stock capability handlers mounted by the shell.

pub mod app;
pub mod nfc;
pub mod scanner;

use std::sync::Arc;

use tracing::{debug, warn};

use webshell_core::convert::strip_non_ascii;
use webshell_core::error::ShellError;
use webshell_core::types::{ExternalResult, OutcomeClass};

use crate::channel::ValueChannel;
use crate::handler::{CapabilityHandler, HandlerContext};
use crate::router::PendingCall;

pub use app::AppHandler;
pub use nfc::NfcHandler;
pub use scanner::ScannerHandler;

/// `app`, `nfc` and `scanner`, in that order.
pub fn standard_handlers(ctx: &HandlerContext) -> Vec<Arc<dyn CapabilityHandler>> {
    vec![
        Arc::new(AppHandler::new(ctx.clone())),
        Arc::new(NfcHandler::new(ctx.clone())),
        Arc::new(ScannerHandler::new(ctx.clone())),
    ]
}

/// Answer a resolved call from its completion.
///
/// Success writes the sanitized payload value; every other path writes `""`.
/// Exactly one console line accompanies each outcome.
pub(crate) fn settle(channel: &ValueChannel, call: &PendingCall, result: &ExternalResult) {
    let label = call.flow.kind().label();
    match result.code.class() {
        OutcomeClass::Success => {
            let value = result
                .payload
                .as_ref()
                .and_then(|payload| payload.get(call.flow.payload_key()));
            match value {
                Some(raw) => {
                    let value = strip_non_ascii(raw);
                    debug!(cell = %call.cell, "flow succeeded");
                    channel.write_value(&call.cell, &value);
                    channel.log(&format!("{label} completed. Value is : {value}"));
                }
                None => {
                    warn!(cell = %call.cell, key = call.flow.payload_key(), "success without data");
                    channel.write_value(&call.cell, "");
                    channel.report(&ShellError::FlowFailed {
                        flow: label.into(),
                        code: result.code.0,
                    });
                }
            }
        }
        OutcomeClass::NotAvailable => {
            warn!(cell = %call.cell, "capability not available");
            channel.write_value(&call.cell, "");
            channel.report(&ShellError::CapabilityUnavailable(label.into()));
        }
        OutcomeClass::Failed => {
            debug!(cell = %call.cell, code = %result.code, "flow canceled or failed");
            channel.write_value(&call.cell, "");
            channel.report(&ShellError::FlowFailed {
                flow: label.into(),
                code: result.code.0,
            });
        }
    }
}
