// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Headless host runtime for desktop/CI builds.
//
// Nothing is rendered. Navigation "loads" a document immediately and every
// evaluated script is recorded so callers (the line driver, tests) can see
// exactly what would have run in the page.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use webshell_core::error::Result;
use webshell_core::types::ConsoleLevel;

use crate::channel::DEFAULT_SETTER;
use crate::traits::HostRuntime;

#[derive(Default)]
struct Recorded {
    scripts: Vec<String>,
    namespaces: Vec<String>,
    url: Option<String>,
    user_agent_suffix: Option<String>,
    /// Index of the first script not yet handed out by `take_scripts`.
    taken: usize,
}

/// Recording, always-ready host runtime.
#[derive(Default)]
pub struct HeadlessRuntime {
    loaded: AtomicBool,
    engine_version: Option<String>,
    recorded: Mutex<Recorded>,
}

impl HeadlessRuntime {
    /// A runtime with no document loaded yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A runtime that already has a document.
    pub fn loaded() -> Self {
        let runtime = Self::new();
        runtime.loaded.store(true, Ordering::SeqCst);
        runtime
    }

    pub fn with_engine_version(mut self, version: impl Into<String>) -> Self {
        self.engine_version = Some(version.into());
        self
    }

    /// Forget the current document, as if the page were torn down.
    pub fn unload(&self) {
        self.loaded.store(false, Ordering::SeqCst);
    }

    fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every script evaluated so far.
    pub fn scripts(&self) -> Vec<String> {
        self.recorded().scripts.clone()
    }

    /// Scripts evaluated since the previous call.
    pub fn take_scripts(&self) -> Vec<String> {
        let mut recorded = self.recorded();
        let fresh = recorded.scripts[recorded.taken..].to_vec();
        recorded.taken = recorded.scripts.len();
        fresh
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.recorded().namespaces.clone()
    }

    pub fn current_url(&self) -> Option<String> {
        self.recorded().url.clone()
    }

    pub fn user_agent_suffix(&self) -> Option<String> {
        self.recorded().user_agent_suffix.clone()
    }

    /// Values written to `cell` through the default setter, in order.
    pub fn value_writes_to(&self, cell: &str) -> Vec<String> {
        let prefix = format!("{DEFAULT_SETTER}({cell},");
        self.recorded()
            .scripts
            .iter()
            .filter_map(|script| {
                let literal = script.strip_prefix(&prefix)?.strip_suffix(");")?;
                serde_json::from_str::<String>(literal).ok()
            })
            .collect()
    }

    /// Number of scripts that call the default setter, whatever the cell.
    pub fn value_write_count(&self) -> usize {
        let prefix = format!("{DEFAULT_SETTER}(");
        self.recorded()
            .scripts
            .iter()
            .filter(|script| script.starts_with(&prefix))
            .count()
    }

    /// Console lines written to the page, in order.
    pub fn console_lines(&self) -> Vec<(ConsoleLevel, String)> {
        self.recorded()
            .scripts
            .iter()
            .filter_map(|script| {
                let rest = script.strip_prefix("window.console && console.")?;
                let (level, rest) = if let Some(rest) = rest.strip_prefix("log(") {
                    (ConsoleLevel::Log, rest)
                } else {
                    (ConsoleLevel::Error, rest.strip_prefix("error(")?)
                };
                let literal = rest.strip_suffix(");")?;
                Some((level, serde_json::from_str::<String>(literal).ok()?))
            })
            .collect()
    }
}

impl HostRuntime for HeadlessRuntime {
    fn has_document(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    fn evaluate_script(&self, script: &str) -> Result<()> {
        debug!(script, "evaluate");
        self.recorded().scripts.push(script.to_owned());
        Ok(())
    }

    fn bind_namespace(&self, name: &str) -> Result<()> {
        self.recorded().namespaces.push(name.to_owned());
        Ok(())
    }

    fn navigate(&self, url: &str) -> Result<()> {
        info!(url, "navigating");
        self.recorded().url = Some(url.to_owned());
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn set_user_agent_suffix(&self, suffix: &str) -> Result<()> {
        debug!(suffix, "user agent suffix set");
        self.recorded().user_agent_suffix = Some(suffix.to_owned());
        Ok(())
    }

    fn engine_version(&self) -> Option<String> {
        self.engine_version.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_scripts_hands_out_each_script_once() {
        let runtime = HeadlessRuntime::loaded();
        runtime.evaluate_script("a();").expect("eval");
        runtime.evaluate_script("b();").expect("eval");
        assert_eq!(runtime.take_scripts(), vec!["a();", "b();"]);
        runtime.evaluate_script("c();").expect("eval");
        assert_eq!(runtime.take_scripts(), vec!["c();"]);
        assert!(runtime.take_scripts().is_empty());
        assert_eq!(runtime.scripts().len(), 3);
    }

    #[test]
    fn parses_console_lines() {
        let runtime = HeadlessRuntime::loaded();
        runtime
            .evaluate_script(r#"window.console && console.error("NFC reading failed.");"#)
            .expect("eval");
        runtime
            .evaluate_script(r#"window.console && console.log("ok");"#)
            .expect("eval");
        assert_eq!(
            runtime.console_lines(),
            vec![
                (ConsoleLevel::Error, "NFC reading failed.".to_string()),
                (ConsoleLevel::Log, "ok".to_string()),
            ]
        );
    }
}
