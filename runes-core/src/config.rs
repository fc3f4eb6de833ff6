//! Runtime configuration.

use std::env;

/// Environment variable consulted by [`RuntimeConfig::from_env`].
pub const DEBUG_ENV: &str = "RUNES_DEBUG";

/// Settings for a [`Runtime`](crate::reactive::Runtime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Enables [`Runtime::debug`](crate::reactive::Runtime::debug) hooks.
    /// Outside debug mode they are inert.
    pub debug: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debug: cfg!(debug_assertions),
        }
    }
}

impl RuntimeConfig {
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Build a config from the process environment.
    ///
    /// `RUNES_DEBUG` accepts `1`, `true`, `yes` or `on` (any case) to enable
    /// debug mode; any other value disables it. When unset the default applies.
    pub fn from_env() -> Self {
        let config = Self::default();
        match env::var(DEBUG_ENV) {
            Ok(value) => config.with_debug(parse_flag(&value)),
            Err(_) => config,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_follows_build_profile() {
        assert_eq!(RuntimeConfig::default().debug, cfg!(debug_assertions));
    }

    #[test]
    fn with_debug_overrides() {
        assert!(RuntimeConfig::default().with_debug(true).debug);
        assert!(!RuntimeConfig::default().with_debug(false).debug);
    }

    #[test]
    fn flag_parsing() {
        for on in ["1", "true", "TRUE", " yes ", "On"] {
            assert!(parse_flag(on), "{on:?} should enable");
        }
        for off in ["0", "false", "", "debug", "no"] {
            assert!(!parse_flag(off), "{off:?} should disable");
        }
    }
}
