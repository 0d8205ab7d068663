// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `app`: lets hosted content inspect and steer the shell itself.
//
// Settings that shape the shell chrome (theme color, menus, about/help links)
// are only read at startup, so their setters flush the store and restart the
// shell. Restart is the apply mechanism.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use webshell_core::convert::{Color, is_truthy};
use webshell_core::error::{Result, ShellError};
use webshell_core::types::CellAddress;

use crate::handler::{CapabilityHandler, HandlerContext, OperationSpec};
use crate::traits::{Permission, PermissionGate, ShellControl, ShellPage};

const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::new("getVersion", 1),
    OperationSpec::new("getPackageName", 1),
    OperationSpec::new("getActionBarColor", 1),
    OperationSpec::new("setActionBarColor", 1),
    OperationSpec::new("setScannerOptions", 2),
    OperationSpec::new("toggleSettingMenu", 1),
    OperationSpec::new("toggleActionBar", 1),
    OperationSpec::new("setAboutUrl", 1),
    OperationSpec::new("setHelpUrl", 1),
    OperationSpec::new("restartApp", 0),
    OperationSpec::new("closeApp", 0),
    OperationSpec::new("openSettingPage", 0),
    OperationSpec::new("openQuickConfigPage", 0),
    OperationSpec::new("dial", 1),
];

pub struct AppHandler {
    ctx: HandlerContext,
}

impl AppHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    fn get_version(&self, cell: CellAddress) {
        let version = self.ctx.platform.version_name().unwrap_or_else(|e| {
            warn!(error = %e, "version unavailable");
            String::new()
        });
        self.ctx.channel.write_value(&cell, &version);
    }

    fn get_package_name(&self, cell: CellAddress) {
        let package = self.ctx.platform.package_name();
        self.ctx.channel.write_value(&cell, &package);
    }

    fn get_action_bar_color(&self, cell: CellAddress) {
        let color = self.ctx.settings.theme_color();
        self.ctx.channel.write_value(&cell, &color.to_rgb_hex());
    }

    fn set_action_bar_color(&self, hex: &str) -> Result<()> {
        let color = Color::parse(hex).inspect_err(|_| {
            self.ctx
                .channel
                .error(&format!("Invalid action bar color: {hex}"));
        })?;
        self.ctx.settings.set_theme_color(color)?;
        self.restart_to_apply()
    }

    /// Make pending writes durable, then restart on the serial context.
    fn restart_to_apply(&self) -> Result<()> {
        self.ctx.settings.flush()?;
        self.restart();
        Ok(())
    }

    fn restart(&self) {
        let platform = Arc::clone(&self.ctx.platform);
        self.ctx.serial.post(move || platform.restart());
    }

    fn close(&self) {
        let platform = Arc::clone(&self.ctx.platform);
        self.ctx.serial.post(move || platform.close());
    }

    fn open_page(&self, page: ShellPage) {
        let platform = Arc::clone(&self.ctx.platform);
        self.ctx.serial.post(move || {
            if let Err(e) = platform.open_page(page) {
                warn!(?page, error = %e, "could not open shell page");
            }
        });
    }

    /// Call `number` once the call permission is granted.
    fn dial(&self, number: String) {
        let platform = Arc::clone(&self.ctx.platform);
        let serial = self.ctx.serial.clone();
        let channel = self.ctx.channel.clone();
        self.ctx.platform.request(
            Permission::CallPhone,
            Box::new(move |granted| {
                if !granted {
                    let denied = ShellError::PermissionDenied(Permission::CallPhone.to_string());
                    channel.report(&denied);
                    return;
                }
                serial.post(move || {
                    if let Err(e) = platform.dial(&number) {
                        warn!(error = %e, "dial failed");
                    }
                });
            }),
        );
    }
}

impl CapabilityHandler for AppHandler {
    fn name(&self) -> &str {
        "app"
    }

    fn operations(&self) -> &[OperationSpec] {
        OPERATIONS
    }

    #[instrument(skip(self, args), fields(handler = "app"))]
    fn invoke(&self, operation: &str, args: &[String]) -> Result<()> {
        let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or_default();
        let cell = || CellAddress::from(arg(0));
        let settings = &self.ctx.settings;

        match operation {
            "getVersion" => self.get_version(cell()),
            "getPackageName" => self.get_package_name(cell()),
            "getActionBarColor" => self.get_action_bar_color(cell()),
            "setActionBarColor" => self.set_action_bar_color(arg(0))?,
            "setScannerOptions" => {
                settings.set_scan_options(arg(0), arg(1))?;
                settings.flush()?;
            }
            "toggleSettingMenu" => {
                settings.set_setting_menu_visible(is_truthy(arg(0)))?;
                self.restart_to_apply()?;
            }
            "toggleActionBar" => {
                settings.set_action_bar_visible(is_truthy(arg(0)))?;
                self.restart_to_apply()?;
            }
            "setAboutUrl" => {
                settings.set_about_url(arg(0))?;
                self.restart_to_apply()?;
            }
            "setHelpUrl" => {
                settings.set_help_url(arg(0))?;
                self.restart_to_apply()?;
            }
            "restartApp" => self.restart(),
            "closeApp" => self.close(),
            "openSettingPage" => self.open_page(ShellPage::Settings),
            "openQuickConfigPage" => self.open_page(ShellPage::QuickConfig),
            "dial" => self.dial(arg(0).to_owned()),
            other => {
                return Err(ShellError::UnknownOperation {
                    handler: "app".into(),
                    operation: other.into(),
                });
            }
        }
        info!(operation, "done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use webshell_core::store::ShellSettings;

    use super::*;
    use crate::channel::{ChannelOptions, ValueChannel};
    use crate::headless::HeadlessRuntime;
    use crate::serial::{SerialQueue, serial_context};
    use crate::stub::StubPlatform;

    struct Fixture {
        runtime: Arc<HeadlessRuntime>,
        platform: Arc<StubPlatform>,
        settings: ShellSettings,
        queue: SerialQueue,
        app: AppHandler,
    }

    fn fixture(platform: StubPlatform) -> Fixture {
        let runtime = Arc::new(HeadlessRuntime::loaded());
        let platform = Arc::new(platform);
        let settings = ShellSettings::in_memory();
        let (serial, queue) = serial_context();
        let ctx = HandlerContext {
            channel: ValueChannel::new(runtime.clone(), serial.clone(), ChannelOptions::default()),
            settings: settings.clone(),
            platform: platform.clone(),
            serial,
        };
        Fixture {
            runtime,
            platform,
            settings,
            queue,
            app: AppHandler::new(ctx),
        }
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn missing_version_writes_empty_value() {
        let mut f = fixture(StubPlatform::new());
        f.app.invoke("getVersion", &args(&["A1"])).expect("invoke");
        f.queue.run_until_idle();
        assert_eq!(f.runtime.value_writes_to("A1"), vec![String::new()]);
    }

    #[test]
    fn package_name_is_written() {
        let mut f = fixture(StubPlatform::new().with_package("com.example.shell"));
        f.app.invoke("getPackageName", &args(&["B1"])).expect("invoke");
        f.queue.run_until_idle();
        assert_eq!(f.runtime.value_writes_to("B1"), vec!["com.example.shell"]);
    }

    #[test]
    fn default_theme_color_reads_back_without_alpha() {
        let mut f = fixture(StubPlatform::new());
        f.app.invoke("getActionBarColor", &args(&["C1"])).expect("invoke");
        f.queue.run_until_idle();
        assert_eq!(f.runtime.value_writes_to("C1"), vec!["0x555555"]);
    }

    #[test]
    fn bad_color_is_rejected_without_restart() {
        let mut f = fixture(StubPlatform::new());
        let err = f
            .app
            .invoke("setActionBarColor", &args(&["#12345"]))
            .expect_err("five digits");
        assert!(matches!(err, ShellError::InvalidArgument(_)));
        f.queue.run_until_idle();
        assert_eq!(f.platform.restarts(), 0);
        assert_eq!(f.runtime.console_lines().len(), 1);
        assert_eq!(f.settings.theme_color().to_rgb_hex(), "0x555555");
    }

    #[test]
    fn chrome_settings_restart_on_the_serial_context() {
        let mut f = fixture(StubPlatform::new());
        f.app.invoke("toggleActionBar", &args(&["no"])).expect("invoke");
        assert_eq!(f.platform.restarts(), 0, "restart must be posted");
        f.queue.run_until_idle();
        assert_eq!(f.platform.restarts(), 1);
        assert!(!f.settings.action_bar_visible());

        f.app.invoke("toggleSettingMenu", &args(&["anything"])).expect("invoke");
        f.app.invoke("setAboutUrl", &args(&["https://a.example/"])).expect("invoke");
        f.app.invoke("setHelpUrl", &args(&[""])).expect("invoke");
        f.queue.run_until_idle();
        assert_eq!(f.platform.restarts(), 4);
        assert!(f.settings.setting_menu_visible());
        assert_eq!(f.settings.about_url(), "https://a.example/");
        assert_eq!(f.settings.help_url(), "");
    }

    #[test]
    fn scanner_options_do_not_restart() {
        let mut f = fixture(StubPlatform::new());
        f.app
            .invoke("setScannerOptions", &args(&["com.vendor.SCAN", "data"]))
            .expect("invoke");
        f.queue.run_until_idle();
        assert_eq!(f.platform.restarts(), 0);
        assert_eq!(f.settings.scan_action(), "com.vendor.SCAN");
        assert_eq!(f.settings.scan_extra(), "data");
    }

    #[test]
    fn pages_and_close_are_posted() {
        let mut f = fixture(StubPlatform::new());
        f.app.invoke("openSettingPage", &[]).expect("invoke");
        f.app.invoke("openQuickConfigPage", &[]).expect("invoke");
        f.app.invoke("closeApp", &[]).expect("invoke");
        assert!(f.platform.pages().is_empty());
        f.queue.run_until_idle();
        assert_eq!(
            f.platform.pages(),
            vec![ShellPage::Settings, ShellPage::QuickConfig]
        );
        assert_eq!(f.platform.closes(), 1);
    }

    #[test]
    fn dial_requires_call_permission() {
        let mut denied = fixture(StubPlatform::new());
        denied.app.invoke("dial", &args(&["10086"])).expect("invoke");
        denied.queue.run_until_idle();
        assert!(denied.platform.dials().is_empty());
        assert_eq!(denied.runtime.console_lines().len(), 1);

        let mut granted = fixture(StubPlatform::new().granting([Permission::CallPhone]));
        granted.app.invoke("dial", &args(&["10086"])).expect("invoke");
        granted.queue.run_until_idle();
        assert_eq!(granted.platform.dials(), vec!["10086"]);
    }
}
