// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge host: the ordered handler registry.
//
// Mounting binds each handler's name into the callable namespace and runs its
// `on_created`. Lifecycle events are broadcast to every handler; completions
// are offered in registration order until one handler claims them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, instrument, warn};

use webshell_core::error::{Result, ShellError};
use webshell_core::types::{ExternalResult, LifecycleEvent};

use crate::handler::{CapabilityHandler, LauncherRegistrar, check_arity};
use crate::router::CompletionInbox;
use crate::traits::HostRuntime;

pub struct BridgeHost {
    runtime: Arc<dyn HostRuntime>,
    handlers: Vec<Arc<dyn CapabilityHandler>>,
    by_name: HashMap<String, usize>,
    inbox: Mutex<Option<CompletionInbox>>,
    dispatching: AtomicBool,
}

/// Clears the lifecycle flag when a dispatch ends, even by panic.
struct DispatchGuard<'a>(&'a AtomicBool);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BridgeHost {
    /// Mount `handlers` in order. Names are validated before anything is
    /// bound, so a bad list leaves the runtime untouched.
    #[instrument(skip_all, fields(count = handlers.len()))]
    pub fn mount(
        runtime: Arc<dyn HostRuntime>,
        launchers: LauncherRegistrar,
        inbox: CompletionInbox,
        handlers: Vec<Arc<dyn CapabilityHandler>>,
    ) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(handlers.len());
        for (index, handler) in handlers.iter().enumerate() {
            let name = handler.name();
            if name.is_empty() {
                return Err(ShellError::EmptyHandlerName);
            }
            if by_name.insert(name.to_owned(), index).is_some() {
                return Err(ShellError::DuplicateHandler(name.to_owned()));
            }
        }

        for handler in &handlers {
            runtime.bind_namespace(handler.name())?;
            handler.on_created(&launchers)?;
            debug!(handler = handler.name(), "handler mounted");
        }
        launchers.seal();
        info!(
            handlers = ?handlers.iter().map(|h| h.name()).collect::<Vec<_>>(),
            "bridge mounted"
        );

        Ok(Self {
            runtime,
            handlers,
            by_name,
            inbox: Mutex::new(Some(inbox)),
            dispatching: AtomicBool::new(false),
        })
    }

    pub fn runtime(&self) -> &Arc<dyn HostRuntime> {
        &self.runtime
    }

    /// Mounted names in registration order.
    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn handler(&self, name: &str) -> Option<&Arc<dyn CapabilityHandler>> {
        self.by_name.get(name).map(|&index| &self.handlers[index])
    }

    /// Callable-namespace entry point. Safe to call from any thread.
    #[instrument(skip(self, args), fields(args = args.len()))]
    pub fn invoke(&self, handler: &str, operation: &str, args: &[String]) -> Result<()> {
        let target = self
            .handler(handler)
            .ok_or_else(|| ShellError::UnknownHandler(handler.to_owned()))?;
        check_arity(handler, target.operations(), operation, args)?;
        target.invoke(operation, args).inspect_err(|e| {
            warn!(error = %e, "operation failed");
        })
    }

    /// Forward `event` to every handler in registration order.
    #[instrument(skip(self))]
    pub fn dispatch_lifecycle(&self, event: LifecycleEvent) -> Result<()> {
        if self
            .dispatching
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("lifecycle transition requested during another");
            return Err(ShellError::ReentrantLifecycle);
        }
        let _guard = DispatchGuard(&self.dispatching);

        for handler in &self.handlers {
            match event {
                LifecycleEvent::Resumed => handler.on_resumed(),
                LifecycleEvent::Paused => handler.before_paused(),
                LifecycleEvent::Destroyed => handler.before_destroyed(),
            }
        }
        Ok(())
    }

    /// Offer `result` to handlers in order; stop at the first that claims it.
    #[instrument(skip_all, fields(token = %result.token, code = %result.code))]
    pub fn dispatch_external_result(&self, result: &ExternalResult) -> bool {
        for handler in &self.handlers {
            if handler.process_external_result(result) {
                debug!(handler = handler.name(), "completion claimed");
                return true;
            }
        }
        warn!("completion claimed by no handler; dropped");
        false
    }

    /// Dispatch every completion queued so far. Returns how many were
    /// claimed.
    pub fn drain_completions(&self) -> usize {
        let mut slot = self.inbox.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(inbox) = slot.as_mut() else {
            warn!("completion inbox already handed to the async loop");
            return 0;
        };
        let mut claimed = 0;
        while let Some(result) = inbox.try_next() {
            if self.dispatch_external_result(&result) {
                claimed += 1;
            }
        }
        claimed
    }

    /// Dispatch completions as they arrive until every sender is dropped.
    /// Takes over the inbox; `drain_completions` does nothing afterwards.
    pub async fn run_completions(&self) {
        let taken = self
            .inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut inbox) = taken else {
            warn!("completion loop already running");
            return;
        };
        while let Some(result) = inbox.next().await {
            self.dispatch_external_result(&result);
        }
        debug!("completion loop finished");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{OnceLock, Weak};

    use webshell_core::types::{OutcomeCode, RequestToken};

    use super::*;
    use crate::handler::OperationSpec;
    use crate::headless::HeadlessRuntime;
    use crate::router::{AsyncResultRouter, RouterOptions};
    use crate::stub::StubPlatform;

    #[derive(Default)]
    struct Recorder {
        name: &'static str,
        seen: Mutex<Vec<String>>,
        host: OnceLock<Weak<BridgeHost>>,
    }

    impl Recorder {
        fn named(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                ..Self::default()
            })
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().expect("lock").clone()
        }
    }

    impl CapabilityHandler for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn operations(&self) -> &[OperationSpec] {
            const OPS: &[OperationSpec] = &[OperationSpec::new("ping", 1)];
            OPS
        }

        fn on_resumed(&self) {
            self.seen.lock().expect("lock").push("resumed".into());
            if let Some(host) = self.host.get().and_then(Weak::upgrade) {
                let nested = host.dispatch_lifecycle(LifecycleEvent::Paused);
                assert!(matches!(nested, Err(ShellError::ReentrantLifecycle)));
            }
        }

        fn before_destroyed(&self) {
            self.seen.lock().expect("lock").push("destroyed".into());
        }

        fn invoke(&self, operation: &str, args: &[String]) -> Result<()> {
            self.seen
                .lock()
                .expect("lock")
                .push(format!("{operation}({})", args.join(",")));
            Ok(())
        }
    }

    fn mount(
        runtime: Arc<HeadlessRuntime>,
        handlers: Vec<Arc<dyn CapabilityHandler>>,
    ) -> Result<BridgeHost> {
        let platform = Arc::new(StubPlatform::new());
        let (router, inbox) = AsyncResultRouter::new(RouterOptions::default());
        let launchers = LauncherRegistrar::new(platform, Arc::new(router));
        BridgeHost::mount(runtime, launchers, inbox, handlers)
    }

    #[test]
    fn mount_binds_names_in_order() {
        let runtime = Arc::new(HeadlessRuntime::new());
        let host = mount(runtime.clone(), vec![Recorder::named("b"), Recorder::named("a")])
            .expect("mount");
        assert_eq!(runtime.namespaces(), vec!["b", "a"]);
        assert_eq!(host.handler_names(), vec!["b", "a"]);
    }

    #[test]
    fn duplicate_names_bind_nothing() {
        let runtime = Arc::new(HeadlessRuntime::new());
        let result = mount(
            runtime.clone(),
            vec![Recorder::named("app"), Recorder::named("nfc"), Recorder::named("app")],
        );
        assert!(matches!(result, Err(ShellError::DuplicateHandler(name)) if name == "app"));
        assert!(runtime.namespaces().is_empty());
    }

    #[test]
    fn empty_name_is_rejected() {
        let result = mount(Arc::new(HeadlessRuntime::new()), vec![Recorder::named("")]);
        assert!(matches!(result, Err(ShellError::EmptyHandlerName)));
    }

    #[test]
    fn invoke_checks_handler_and_arity() {
        let recorder = Recorder::named("p");
        let host = mount(Arc::new(HeadlessRuntime::new()), vec![recorder.clone()]).expect("mount");

        host.invoke("p", "ping", &["A1".into()]).expect("invoke");
        assert_eq!(recorder.seen(), vec!["ping(A1)"]);

        assert!(matches!(
            host.invoke("q", "ping", &["A1".into()]),
            Err(ShellError::UnknownHandler(_))
        ));
        assert!(matches!(
            host.invoke("p", "ping", &[]),
            Err(ShellError::Arity { .. })
        ));
        assert_eq!(recorder.seen().len(), 1);
    }

    #[test]
    fn lifecycle_reaches_every_handler_and_is_not_reentrant() {
        let first = Recorder::named("first");
        let second = Recorder::named("second");
        let host = Arc::new(
            mount(
                Arc::new(HeadlessRuntime::new()),
                vec![first.clone(), second.clone()],
            )
            .expect("mount"),
        );
        first
            .host
            .set(Arc::downgrade(&host))
            .expect("host set once");

        host.dispatch_lifecycle(LifecycleEvent::Resumed)
            .expect("resume");
        host.dispatch_lifecycle(LifecycleEvent::Destroyed)
            .expect("flag cleared after dispatch");

        assert_eq!(first.seen(), vec!["resumed", "destroyed"]);
        assert_eq!(second.seen(), vec!["resumed", "destroyed"]);
    }

    #[test]
    fn unclaimed_completion_is_dropped() {
        let host = mount(Arc::new(HeadlessRuntime::new()), vec![Recorder::named("p")])
            .expect("mount");
        let result = ExternalResult::new(RequestToken(77), OutcomeCode::OK, None);
        assert!(!host.dispatch_external_result(&result));
    }
}
