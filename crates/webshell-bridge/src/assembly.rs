// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wires the serial context, value channel, router and handlers together.
//
// All shared collaborators are built here once and handed to handlers
// through `HandlerContext`; nothing in the bridge is global.

use std::sync::Arc;

use webshell_core::error::Result;
use webshell_core::store::ShellSettings;

use crate::channel::{ChannelOptions, ValueChannel};
use crate::handler::{CapabilityHandler, HandlerContext, LauncherRegistrar};
use crate::host::BridgeHost;
use crate::router::{AsyncResultRouter, RouterOptions};
use crate::serial::{SerialQueue, serial_context};
use crate::traits::{HostRuntime, NativePlatform};

#[derive(Debug, Clone, Default)]
pub struct AssemblyOptions {
    pub router: RouterOptions,
    pub channel: ChannelOptions,
}

/// A mounted bridge and the queue that must be pumped to run its writes.
pub struct Assembly {
    pub host: Arc<BridgeHost>,
    pub serial: SerialQueue,
    pub context: HandlerContext,
}

/// Build the bridge and mount the handlers returned by `handlers`.
pub fn assemble<F>(
    runtime: Arc<dyn HostRuntime>,
    platform: Arc<dyn NativePlatform>,
    settings: ShellSettings,
    options: AssemblyOptions,
    handlers: F,
) -> Result<Assembly>
where
    F: FnOnce(&HandlerContext) -> Vec<Arc<dyn CapabilityHandler>>,
{
    let (serial, queue) = serial_context();
    let context = HandlerContext {
        channel: ValueChannel::new(Arc::clone(&runtime), serial.clone(), options.channel),
        settings,
        platform: Arc::clone(&platform),
        serial,
    };

    let (router, inbox) = AsyncResultRouter::new(options.router);
    let launchers = LauncherRegistrar::new(platform, Arc::new(router));
    let host = BridgeHost::mount(runtime, launchers, inbox, handlers(&context))?;

    Ok(Assembly {
        host: Arc::new(host),
        serial: queue,
        context,
    })
}
