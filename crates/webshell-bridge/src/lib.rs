// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Webshell: the bridge between hosted web content and native capabilities.
//!
//! Hosted content calls `name.operation("arg", ...)` on a mounted
//! [`CapabilityHandler`]. A handler either answers right away by writing to
//! the supplied cell address through the [`ValueChannel`], or launches a
//! native flow and answers later, when the [`BridgeHost`] routes the flow's
//! completion back to it.
//!
//! The host runtime (the browser engine) and the native platform are
//! consumed through the traits in [`traits`]. [`stub`] and [`headless`]
//! provide implementations for desktop/CI builds.

pub mod assembly;
pub mod channel;
pub mod compat;
pub mod handler;
pub mod handlers;
pub mod headless;
pub mod host;
pub mod router;
pub mod serial;
pub mod stub;
pub mod traits;

pub use assembly::{Assembly, AssemblyOptions, assemble};
pub use channel::{ChannelOptions, ValueChannel};
pub use handler::{CapabilityHandler, HandlerContext, LauncherRegistrar, OperationSpec};
pub use host::BridgeHost;
pub use router::{
    AsyncResultRouter, CompletionInbox, CompletionSender, FlowLauncherHandle, PendingCall,
    PendingCalls, RouterOptions, TokenIssuer,
};
pub use serial::{SerialContext, SerialQueue};
pub use traits::{FlowKind, FlowRequest, HostRuntime, NativePlatform, Permission, ShellPage};
