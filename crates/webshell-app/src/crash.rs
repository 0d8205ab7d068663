// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Top-level fault handler.
//
// An uncaught panic anywhere in the shell is turned into the fatal error
// screen: the report is logged, saved next to the settings, printed, and the
// process exits. Nothing tries to keep running.

use std::any::Any;
use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use webshell_core::human_errors::FatalReport;

/// Report file inside the data directory.
pub const CRASH_FILE: &str = "crash.txt";

/// Exit status after a fatal fault (EX_SOFTWARE).
pub const FATAL_EXIT: i32 = 70;

/// Install the panic hook. Call once, after logging is initialised.
pub fn install(dir: PathBuf) {
    std::panic::set_hook(Box::new(move |info| {
        let message = panic_message(info.payload());
        let location = info
            .location()
            .map(|l| format!("panicked at {}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "panicked at an unknown location".into());
        let detail = format!("{location}\n{}", Backtrace::force_capture());

        let report = FatalReport::new(message, detail);
        error!(message = %report.message, "fatal fault");
        save(&dir, &report);
        eprintln!("{}", report.render());
        std::process::exit(FATAL_EXIT);
    }));
}

fn save(dir: &Path, report: &FatalReport) {
    let path = dir.join(CRASH_FILE);
    if let Err(e) = std::fs::write(&path, report.render()) {
        error!(path = %path.display(), error = %e, "could not save crash report");
    }
}

/// Text carried by a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown fault".into()
    }
}

/// Take the report left by a previous run, if any.
pub fn take_previous_report(dir: &Path) -> Option<String> {
    let path = dir.join(CRASH_FILE);
    let text = std::fs::read_to_string(&path).ok()?;
    if let Err(e) = std::fs::remove_file(&path) {
        warn!(path = %path.display(), error = %e, "could not clear crash report");
    }
    Some(text)
}
