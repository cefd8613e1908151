//! Environment handed to stdio child processes.
//!
//! Children do not inherit the parent environment wholesale. Only a small,
//! platform-specific allow-list of variables is copied across, with caller
//! overrides applied on top.

use std::collections::HashMap;

/// Variables a child process inherits by default.
#[cfg(windows)]
pub const DEFAULT_INHERITED_ENV_VARS: &[&str] = &[
    "APPDATA",
    "HOMEDRIVE",
    "HOMEPATH",
    "LOCALAPPDATA",
    "PATH",
    "PROCESSOR_ARCHITECTURE",
    "SYSTEMDRIVE",
    "SYSTEMROOT",
    "TEMP",
    "USERNAME",
    "USERPROFILE",
];

/// Variables a child process inherits by default.
#[cfg(not(windows))]
pub const DEFAULT_INHERITED_ENV_VARS: &[&str] = &["HOME", "LOGNAME", "PATH", "SHELL", "TERM", "USER"];

/// The allow-listed subset of the current process environment.
pub fn default_environment() -> HashMap<String, String> {
    inherit_with(|key| std::env::var(key).ok())
}

/// Environment for a child: the allow-listed variables plus `overrides`.
///
/// Overrides win over inherited values and are passed through as given.
pub fn child_environment(overrides: &HashMap<String, String>) -> HashMap<String, String> {
    let mut env = default_environment();
    env.extend(
        overrides
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    env
}

fn inherit_with(lookup: impl Fn(&str) -> Option<String>) -> HashMap<String, String> {
    DEFAULT_INHERITED_ENV_VARS
        .iter()
        .filter_map(|key| {
            let value = lookup(key)?;
            // Values starting with "()" are exported shell functions.
            if value.starts_with("()") {
                tracing::debug!("Not inheriting function-valued variable {}", key);
                return None;
            }
            Some((key.to_string(), value))
        })
        .collect()
}
