// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Startup sequence: settings, compatibility gate, bridge, entry page.
//
// A restart runs this again from scratch, which is how configuration written
// by hosted content takes effect.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use webshell_bridge::compat::{check_engine, user_agent_suffix};
use webshell_bridge::handlers::standard_handlers;
use webshell_bridge::headless::HeadlessRuntime;
use webshell_bridge::stub::StubPlatform;
use webshell_bridge::{Assembly, AssemblyOptions, HostRuntime, Permission, RouterOptions, assemble};
use webshell_core::error::{Result, ShellError};
use webshell_core::{JsonFileConfigStore, ShellDefaults, ShellSettings};

/// Settings file inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default)]
pub struct ShellOptions {
    /// Quick configuration document imported before anything reads settings.
    pub quick_config: Option<String>,
    /// Engine version the headless runtime reports.
    pub engine_version: Option<String>,
    /// Shell version reported to hosted content.
    pub shell_version: String,
    pub pending_timeout: Option<Duration>,
}

pub struct ShellServices {
    pub runtime: Arc<HeadlessRuntime>,
    pub platform: Arc<StubPlatform>,
    pub settings: ShellSettings,
    pub bridge: Assembly,
}

impl ShellServices {
    pub fn init(dir: &Path, options: &ShellOptions) -> Result<Self> {
        info!(path = %dir.display(), "initialising shell services");
        let settings = open_settings(dir);

        if let Some(doc) = &options.quick_config {
            let applied = settings.apply_quick_config(doc)?;
            info!(applied, "quick config applied");
        }

        let mut runtime = HeadlessRuntime::new();
        if let Some(version) = &options.engine_version {
            runtime = runtime.with_engine_version(version.clone());
        }
        let runtime = Arc::new(runtime);
        check_engine(runtime.as_ref(), &settings)?;

        let platform = Arc::new(
            StubPlatform::new()
                .with_version(options.shell_version.clone())
                .granting([Permission::Camera, Permission::CallPhone]),
        );

        let bridge = assemble(
            runtime.clone(),
            platform.clone(),
            settings.clone(),
            AssemblyOptions {
                router: RouterOptions {
                    pending_timeout: options.pending_timeout,
                },
                ..AssemblyOptions::default()
            },
            standard_handlers,
        )?;

        let entry = settings.entry();
        if entry.is_empty() {
            return Err(ShellError::Config("entry URL is empty".into()));
        }
        runtime.set_user_agent_suffix(&user_agent_suffix(&options.shell_version))?;
        runtime.navigate(&entry)?;
        info!(%entry, "shell services initialised");

        Ok(Self {
            runtime,
            platform,
            settings,
            bridge,
        })
    }
}

/// File-backed settings, or in-memory defaults if the file can't be used.
fn open_settings(dir: &Path) -> ShellSettings {
    let path = dir.join(CONFIG_FILE);
    match JsonFileConfigStore::open(&path) {
        Ok(store) => ShellSettings::new(Arc::new(store), ShellDefaults::default()),
        Err(e) => {
            error!(path = %path.display(), error = %e, "settings unreadable; using in-memory fallback");
            ShellSettings::in_memory()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ShellOptions {
        ShellOptions {
            shell_version: "3.4.0".into(),
            ..ShellOptions::default()
        }
    }

    #[test]
    fn starts_on_the_default_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let services = ShellServices::init(dir.path(), &options()).expect("init");
        assert_eq!(services.runtime.current_url().as_deref(), Some("about:blank"));
        assert_eq!(
            services.runtime.user_agent_suffix().as_deref(),
            Some("HAC/3.4.0")
        );
        assert_eq!(
            services.bridge.host.handler_names(),
            vec!["app", "nfc", "scanner"]
        );
    }

    #[test]
    fn quick_config_persists_across_restarts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = ShellOptions {
            quick_config: Some(r#"{"E":"https://app.example/","ABV":"no"}"#.into()),
            ..options()
        };
        ShellServices::init(dir.path(), &first).expect("first start");

        let again = ShellServices::init(dir.path(), &options()).expect("restart");
        assert_eq!(
            again.runtime.current_url().as_deref(),
            Some("https://app.example/")
        );
        assert!(!again.settings.action_bar_visible());
    }

    #[test]
    fn old_engine_blocks_startup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let old = ShellOptions {
            engine_version: Some("74.0.3729.186".into()),
            ..options()
        };
        assert!(matches!(
            ShellServices::init(dir.path(), &old),
            Err(ShellError::Incompatible { found: 74, .. })
        ));
    }

    #[test]
    fn corrupt_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE), "{not json").expect("write");
        let services = ShellServices::init(dir.path(), &options()).expect("init");
        assert_eq!(services.settings.entry(), "about:blank");
    }
}
