// Environment variable loading

use std::collections::HashMap;
use std::env;

/// Default prefix for node-pool manager variables.
pub const ENV_PREFIX: &str = "NODEPOOL";

/// Environment variable loader
///
/// With prefix `NODEPOOL`, `NODEPOOL_LEASE_TTL_SECONDS=30` is reported as
/// `lease_ttl_seconds`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Map a raw variable name to its config key, `None` when the prefix
    /// does not match.
    pub fn config_key(&self, key: &str) -> Option<String> {
        match self.prefix {
            Some(ref prefix) => key
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|rest| !rest.is_empty())
                .map(str::to_lowercase),
            None => Some(key.to_lowercase()),
        }
    }

    /// Load every matching variable from the process environment
    pub fn load(&self) -> HashMap<String, String> {
        self.collect(env::vars())
    }

    /// Keep the matching pairs of `vars`, keyed by config key
    pub fn collect<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| self.config_key(&key).map(|k| (k, value)))
            .collect()
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(Some(ENV_PREFIX.to_string()))
    }
}
