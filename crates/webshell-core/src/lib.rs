// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Webshell: Core types, argument conventions, errors and configuration
// shared by the bridge and the shell binary.

pub mod config;
pub mod convert;
pub mod error;
pub mod human_errors;
pub mod store;
pub mod types;

pub use config::{ConfigKey, ConfigValue, ShellDefaults};
pub use convert::{Color, is_truthy, strip_non_ascii};
pub use error::ShellError;
pub use store::{ConfigStore, JsonFileConfigStore, MemoryConfigStore, ShellSettings};
pub use types::*;
