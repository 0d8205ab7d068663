// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Browser engine compatibility gate, run before the entry page is loaded.

use tracing::{info, warn};

use webshell_core::error::{Result, ShellError};
use webshell_core::store::ShellSettings;

use crate::traits::HostRuntime;

/// Oldest engine major version hosted content is tested against.
pub const MIN_ENGINE_MAJOR: u32 = 87;

/// User agent token identifying the shell to hosted content.
pub const USER_AGENT_PRODUCT: &str = "HAC";

/// Suffix appended to the engine's user agent, e.g. `HAC/3.4.0`.
pub fn user_agent_suffix(shell_version: &str) -> String {
    format!("{USER_AGENT_PRODUCT}/{shell_version}")
}

/// Major component of a dotted version string such as `103.0.5060.73`.
pub fn engine_major(version: &str) -> Option<u32> {
    version.split('.').next()?.trim().parse().ok()
}

/// Refuse engines older than [`MIN_ENGINE_MAJOR`] unless the bypass flag is
/// set. A version that cannot be read is let through.
pub fn check_engine(runtime: &dyn HostRuntime, settings: &ShellSettings) -> Result<()> {
    if settings.bypass_compatibility_check() {
        info!("engine compatibility check bypassed");
        return Ok(());
    }
    let Some(version) = runtime.engine_version() else {
        warn!("engine version unknown; skipping compatibility check");
        return Ok(());
    };
    let Some(found) = engine_major(&version) else {
        warn!(%version, "unparseable engine version; skipping compatibility check");
        return Ok(());
    };
    if found < MIN_ENGINE_MAJOR {
        return Err(ShellError::Incompatible {
            required: MIN_ENGINE_MAJOR,
            found,
        });
    }
    info!(%version, "engine compatible");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessRuntime;

    #[test]
    fn major_version_parsing() {
        assert_eq!(engine_major("103.0.5060.73"), Some(103));
        assert_eq!(engine_major("87"), Some(87));
        assert_eq!(engine_major("beta.1"), None);
        assert_eq!(engine_major(""), None);
    }

    #[test]
    fn user_agent_names_the_shell_version() {
        assert_eq!(user_agent_suffix("3.4.0"), "HAC/3.4.0");
    }

    #[test]
    fn old_engine_is_refused() {
        let settings = ShellSettings::in_memory();
        let runtime = HeadlessRuntime::new().with_engine_version("74.0.3729.186");
        assert!(matches!(
            check_engine(&runtime, &settings),
            Err(ShellError::Incompatible { required: 87, found: 74 })
        ));
    }

    #[test]
    fn boundary_and_unknown_versions_pass() {
        let settings = ShellSettings::in_memory();
        let exact = HeadlessRuntime::new().with_engine_version("87.0.1");
        assert!(check_engine(&exact, &settings).is_ok());
        assert!(check_engine(&HeadlessRuntime::new(), &settings).is_ok());
        let odd = HeadlessRuntime::new().with_engine_version("dev-build");
        assert!(check_engine(&odd, &settings).is_ok());
    }

    #[test]
    fn bypass_flag_skips_the_check() {
        let settings = ShellSettings::in_memory();
        settings
            .set_bypass_compatibility_check(true)
            .expect("set flag");
        let runtime = HeadlessRuntime::new().with_engine_version("60.0");
        assert!(check_engine(&runtime, &settings).is_ok());
    }
}
