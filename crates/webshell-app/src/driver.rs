// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line driver for the headless shell.
//
// Stands in for hosted content and the native side. Each input line is one
// of:
//
//   handler.operation("arg", ...)        call a mounted operation
//   complete <token> <code> [{"k":"v"}]  report a flow outcome
//   resume | pause | destroy             lifecycle transition
//   quit
//
// Every script the page would have run is printed to stdout.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::io::{AsyncBufRead, Lines};
use tracing::{info, warn};

use webshell_core::error::{Result, ShellError};
use webshell_core::types::{ExternalResult, LifecycleEvent, OutcomeCode, RequestToken, ResultBundle};

use crate::services::shell_services::ShellServices;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Call {
        handler: String,
        operation: String,
        args: Vec<String>,
    },
    Complete(ExternalResult),
    Lifecycle(LifecycleEvent),
    Quit,
}

/// How a driver session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Input ended or `quit` was read.
    Quit,
    /// Hosted content closed the shell.
    Close,
    /// Hosted content asked for a restart.
    Restart,
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    match line {
        "quit" => return Ok(Some(Command::Quit)),
        "resume" => return Ok(Some(Command::Lifecycle(LifecycleEvent::Resumed))),
        "pause" => return Ok(Some(Command::Lifecycle(LifecycleEvent::Paused))),
        "destroy" => return Ok(Some(Command::Lifecycle(LifecycleEvent::Destroyed))),
        _ => {}
    }

    if let Some(rest) = line.strip_prefix("complete ") {
        return parse_complete(rest).map(Some);
    }
    parse_call(line).map(Some)
}

/// Split off the first whitespace-delimited word of `text`.
fn next_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    text.split_once(char::is_whitespace).unwrap_or((text, ""))
}

fn parse_complete(rest: &str) -> Result<Command> {
    let (token, rest) = next_word(rest);
    let (code, rest) = next_word(rest);
    let token = token
        .trim_start_matches('#')
        .parse::<u64>()
        .map_err(|_| ShellError::InvalidArgument("complete: expected a token".into()))?;
    let code = code
        .parse::<i32>()
        .map_err(|_| ShellError::InvalidArgument("complete: expected an outcome code".into()))?;
    let payload = match rest.trim() {
        "" => None,
        json => {
            let map: BTreeMap<String, String> = serde_json::from_str(json)?;
            Some(map.into_iter().collect::<ResultBundle>())
        }
    };
    Ok(Command::Complete(ExternalResult::new(
        RequestToken(token),
        OutcomeCode(code),
        payload,
    )))
}

fn parse_call(line: &str) -> Result<Command> {
    let malformed = || ShellError::InvalidArgument(format!("not a call: {line}"));
    let open = line.find('(').ok_or_else(malformed)?;
    let inner = line[open + 1..].strip_suffix(')').ok_or_else(malformed)?;
    let (handler, operation) = line[..open].trim().split_once('.').ok_or_else(malformed)?;
    let args: Vec<String> = serde_json::from_str(&format!("[{inner}]"))?;
    Ok(Command::Call {
        handler: handler.to_owned(),
        operation: operation.to_owned(),
        args,
    })
}

/// Read commands until input ends or the shell closes/restarts. `lines`
/// outlives a restart so no buffered input is lost.
pub async fn run<R>(services: &mut ShellServices, lines: &mut Lines<R>) -> Result<Exit>
where
    R: AsyncBufRead + Unpin,
{
    let settings = &services.settings;
    info!(
        action_bar = settings.action_bar_visible(),
        setting_menu = settings.setting_menu_visible(),
        theme = %settings.theme_color().to_rgb_hex(),
        about = %settings.about_url(),
        help = %settings.help_url(),
        "shell chrome"
    );

    let mut tick = tokio::time::interval(Duration::from_millis(100));
    let (restarts, closes) = (services.platform.restarts(), services.platform.closes());

    services.bridge.host.dispatch_lifecycle(LifecycleEvent::Resumed)?;
    pump(services);

    let exit = loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break Exit::Quit };
                match parse_line(&line) {
                    Ok(Some(Command::Quit)) => break Exit::Quit,
                    Ok(Some(command)) => execute(services, command),
                    Ok(None) => {}
                    Err(e) => eprintln!("! {e}"),
                }
            }
            _ = tick.tick() => {}
        }
        pump(services);

        if services.platform.closes() > closes {
            break Exit::Close;
        }
        if services.platform.restarts() > restarts {
            break Exit::Restart;
        }
    };

    let host = &services.bridge.host;
    host.dispatch_lifecycle(LifecycleEvent::Paused)?;
    host.dispatch_lifecycle(LifecycleEvent::Destroyed)?;
    pump(services);
    info!(?exit, "driver finished");
    Ok(exit)
}

fn execute(services: &ShellServices, command: Command) {
    let host = &services.bridge.host;
    let outcome = match command {
        Command::Call {
            handler,
            operation,
            args,
        } => host.invoke(&handler, &operation, &args),
        Command::Complete(result) => {
            if !services.platform.complete(result) {
                warn!("completion not delivered");
            }
            Ok(())
        }
        Command::Lifecycle(event) => host.dispatch_lifecycle(event),
        Command::Quit => Ok(()),
    };
    if let Err(e) = outcome {
        eprintln!("! {e}");
    }
}

/// Route completions and run posted jobs until both are idle, printing every
/// script that reached the page.
fn pump(services: &mut ShellServices) {
    loop {
        let claimed = services.bridge.host.drain_completions();
        let ran = services.bridge.serial.run_until_idle();
        if claimed == 0 && ran == 0 {
            break;
        }
    }
    for script in services.runtime.take_scripts() {
        println!("{script}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_calls_with_json_arguments() {
        let command = parse_line(r#"app.setScannerOptions("com.vendor.SCAN", "da\"ta")"#)
            .expect("parse")
            .expect("command");
        assert_eq!(
            command,
            Command::Call {
                handler: "app".into(),
                operation: "setScannerOptions".into(),
                args: vec!["com.vendor.SCAN".into(), "da\"ta".into()],
            }
        );

        let no_args = parse_line("app.restartApp()").expect("parse").expect("command");
        assert!(matches!(no_args, Command::Call { args, .. } if args.is_empty()));
    }

    #[test]
    fn parses_completions() {
        let command = parse_line(r#"complete #3 -1 {"tagId":"04A2"}"#)
            .expect("parse")
            .expect("command");
        let Command::Complete(result) = command else {
            panic!("expected a completion");
        };
        assert_eq!(result.token, RequestToken(3));
        assert_eq!(result.code, OutcomeCode::OK);
        let payload = result.payload.expect("payload");
        assert_eq!(payload.get("tagId"), Some("04A2"));

        let bare = parse_line("complete 8 2").expect("parse").expect("command");
        assert_eq!(
            bare,
            Command::Complete(ExternalResult::new(
                RequestToken(8),
                OutcomeCode::NOT_AVAILABLE,
                None
            ))
        );
    }

    #[test]
    fn completions_tolerate_extra_whitespace() {
        let spaced = parse_line("complete 1  2").expect("parse").expect("command");
        assert_eq!(
            spaced,
            Command::Complete(ExternalResult::new(
                RequestToken(1),
                OutcomeCode::NOT_AVAILABLE,
                None
            ))
        );

        let tabbed = parse_line("complete \t#4 \t -1   {\"tagId\": \"a b\"} ")
            .expect("parse")
            .expect("command");
        let Command::Complete(result) = tabbed else {
            panic!("expected a completion");
        };
        assert_eq!(result.token, RequestToken(4));
        assert_eq!(result.code, OutcomeCode::OK);
        assert_eq!(result.payload.expect("payload").get("tagId"), Some("a b"));
    }

    #[test]
    fn lifecycle_quit_and_comments() {
        assert_eq!(
            parse_line("pause").expect("parse"),
            Some(Command::Lifecycle(LifecycleEvent::Paused))
        );
        assert_eq!(parse_line(" quit ").expect("parse"), Some(Command::Quit));
        assert_eq!(parse_line("# note").expect("parse"), None);
        assert_eq!(parse_line("").expect("parse"), None);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_line("getVersion(\"A1\")").is_err());
        assert!(parse_line("app.getVersion(A1)").is_err());
        assert!(parse_line("app.getVersion(\"A1\"").is_err());
        assert!(parse_line("complete x 1").is_err());
        assert!(parse_line("complete 1 2 [1]").is_err());
    }
}
