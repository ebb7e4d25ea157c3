// Environment variable source

use crate::{ConfigError, Result};
use std::collections::BTreeMap;
use std::env;

/// Prefix applied to every gateway environment variable.
pub const ENV_PREFIX: &str = "ARGOFIRE";

/// Reads `PREFIX_*` variables into lowercase setting keys.
///
/// `ARGOFIRE_TIMEOUT_SECS=20` becomes `timeout_secs = "20"`.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Collect every variable carrying the prefix.
    pub fn load(&self) -> BTreeMap<String, String> {
        self.collect(env::vars())
    }

    /// Read one setting by its unprefixed key.
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = self.full_key(key);
        env::var(&full_key).map_err(|_| ConfigError::Missing(full_key))
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}_{}", self.prefix, key.to_uppercase())
    }

    pub(crate) fn collect<I>(&self, vars: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{}_", self.prefix);
        vars.into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&marker)
                    .map(|rest| (rest.to_lowercase(), value))
            })
            .collect()
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(ENV_PREFIX)
    }
}
