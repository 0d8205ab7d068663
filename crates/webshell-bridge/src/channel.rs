// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Value exchange channel: writes values and console lines into the page.
//
// Both operations render a script fragment and post its evaluation onto the
// serial context. Values are JSON-encoded, never hand-quoted, so quotes,
// backslashes and non-ASCII text arrive on the page unchanged. The cell
// address is spliced in verbatim: hosted content owns its format.
//
// A write that reaches the runtime before a document is loaded is dropped
// with a warning rather than queued, so an endlessly loading page cannot
// grow a backlog.

use std::sync::Arc;

use tracing::{debug, warn};

use webshell_core::error::{Result, ShellError};
use webshell_core::types::{CellAddress, ConsoleLevel};

use crate::serial::SerialContext;
use crate::traits::HostRuntime;

/// Well-known page-side setter receiving `(cell, value)`.
pub const DEFAULT_SETTER: &str = "HAC.setCellValue";

#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// Script expression called with the cell address and the value.
    pub setter: String,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            setter: DEFAULT_SETTER.into(),
        }
    }
}

/// JSON string literal for `text`.
fn js_string(text: &str) -> String {
    serde_json::Value::String(text.to_owned()).to_string()
}

/// Script that writes `value` into `cell` through `setter`.
pub fn render_value_write(setter: &str, cell: &CellAddress, value: &str) -> String {
    format!("{setter}({cell},{});", js_string(value))
}

/// Script that appends `message` to the page console, if the page has one.
pub fn render_console_write(message: &str, level: ConsoleLevel) -> String {
    format!(
        "window.console && console.{}({});",
        level.method(),
        js_string(message)
    )
}

/// Run `script` in the current document, if there is one.
fn evaluate(runtime: &dyn HostRuntime, script: &str) -> Result<()> {
    if !runtime.has_document() {
        return Err(ShellError::NoDocument);
    }
    runtime.evaluate_script(script)
}

/// Cloneable handle handlers use to answer hosted content.
#[derive(Clone)]
pub struct ValueChannel {
    runtime: Arc<dyn HostRuntime>,
    serial: SerialContext,
    options: Arc<ChannelOptions>,
}

impl ValueChannel {
    pub fn new(runtime: Arc<dyn HostRuntime>, serial: SerialContext, options: ChannelOptions) -> Self {
        Self {
            runtime,
            serial,
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &ChannelOptions {
        &self.options
    }

    /// Write `value` into `cell` on the page.
    pub fn write_value(&self, cell: &CellAddress, value: &str) {
        debug!(%cell, len = value.len(), "writing value");
        self.submit(render_value_write(&self.options.setter, cell, value));
    }

    /// Append a line to the page console.
    pub fn write_console(&self, message: &str, level: ConsoleLevel) {
        self.submit(render_console_write(message, level));
    }

    pub fn log(&self, message: &str) {
        self.write_console(message, ConsoleLevel::Log);
    }

    pub fn error(&self, message: &str) {
        self.write_console(message, ConsoleLevel::Error);
    }

    /// Write `error` to the page console as a diagnostic line.
    pub fn report(&self, error: &ShellError) {
        self.error(&error.to_string());
    }

    fn submit(&self, script: String) {
        let runtime = Arc::clone(&self.runtime);
        self.serial.post(move || match evaluate(runtime.as_ref(), &script) {
            Ok(()) => {}
            Err(ShellError::NoDocument) => {
                warn!(script = %script, "no document loaded; script dropped");
            }
            Err(e) => warn!(error = %e, "script evaluation failed"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessRuntime;
    use crate::serial::serial_context;

    #[test]
    fn value_is_json_encoded() {
        let cell = CellAddress::from("A1");
        assert_eq!(
            render_value_write(DEFAULT_SETTER, &cell, "3.4.0"),
            r#"HAC.setCellValue(A1,"3.4.0");"#
        );
        assert_eq!(
            render_value_write(DEFAULT_SETTER, &cell, r#"it's "quoted" \ here"#),
            r#"HAC.setCellValue(A1,"it's \"quoted\" \\ here");"#
        );
        assert_eq!(
            render_value_write(DEFAULT_SETTER, &cell, ""),
            r#"HAC.setCellValue(A1,"");"#
        );
    }

    #[test]
    fn cell_address_is_spliced_verbatim() {
        let cell = CellAddress::from(r#"{"Row":31,"Column":1,"PageID":"p"}"#);
        assert_eq!(
            render_value_write("page.set", &cell, "x"),
            r#"page.set({"Row":31,"Column":1,"PageID":"p"},"x");"#
        );
    }

    #[test]
    fn console_levels() {
        assert_eq!(
            render_console_write("hi", ConsoleLevel::Log),
            r#"window.console && console.log("hi");"#
        );
        assert_eq!(
            render_console_write("bad", ConsoleLevel::Error),
            r#"window.console && console.error("bad");"#
        );
    }

    #[test]
    fn writes_wait_for_serial_context() {
        let runtime = Arc::new(HeadlessRuntime::loaded());
        let (serial, mut queue) = serial_context();
        let channel = ValueChannel::new(runtime.clone(), serial, ChannelOptions::default());

        channel.write_value(&CellAddress::from("A1"), "v");
        assert!(runtime.scripts().is_empty());

        queue.run_until_idle();
        assert_eq!(runtime.value_writes_to("A1"), vec!["v".to_string()]);
    }

    #[test]
    fn evaluate_refuses_without_document() {
        let runtime = HeadlessRuntime::new();
        assert!(matches!(
            evaluate(&runtime, "x();"),
            Err(ShellError::NoDocument)
        ));
        assert!(runtime.scripts().is_empty());
    }

    #[test]
    fn report_writes_the_error_text() {
        let runtime = Arc::new(HeadlessRuntime::loaded());
        let (serial, mut queue) = serial_context();
        let channel = ValueChannel::new(runtime.clone(), serial, ChannelOptions::default());

        channel.report(&ShellError::PermissionDenied("camera access".into()));
        queue.run_until_idle();
        assert_eq!(
            runtime.console_lines(),
            vec![(ConsoleLevel::Error, "permission denied: camera access".to_string())]
        );
    }

    #[test]
    fn writes_before_document_are_dropped() {
        let runtime = Arc::new(HeadlessRuntime::new());
        let (serial, mut queue) = serial_context();
        let channel = ValueChannel::new(runtime.clone(), serial, ChannelOptions::default());

        channel.write_value(&CellAddress::from("A1"), "early");
        channel.log("early");
        queue.run_until_idle();
        assert!(runtime.scripts().is_empty());

        runtime.navigate("https://app.example/").expect("navigate");
        channel.write_value(&CellAddress::from("A1"), "late");
        queue.run_until_idle();
        assert_eq!(runtime.value_writes_to("A1"), vec!["late".to_string()]);
    }
}
