//! Gateway settings for the ArgoFire adapter.
//!
//! Settings are assembled once from layered sources and then handed to the
//! processor, which never mutates them. Later layers win:
//!
//! 1. built-in defaults (sandbox mode, 15 second timeout, AVS off)
//! 2. a TOML, JSON or `.env` file
//! 3. a `.env` file read with `dotenvy`
//! 4. `ARGOFIRE_*` process environment variables
//! 5. explicit overrides, including legacy `gb_argofire_*` option keys
//!
//! ```rust,ignore
//! use argofire_config::{Mode, SettingsLoader};
//!
//! let settings = SettingsLoader::new()
//!     .file("gateway.toml".as_ref())?
//!     .env()
//!     .build()?;
//! assert_eq!(settings.mode, Mode::Sandbox);
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use env::{ENV_PREFIX, EnvLoader};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Sandbox endpoint for `ProcessCreditCard`.
pub const SANDBOX_ENDPOINT: &str =
    "https://dev.ftipgw.com/smartpayments/transact.asmx/ProcessCreditCard";

/// Live endpoint for `ProcessCreditCard`.
pub const LIVE_ENDPOINT: &str =
    "https://secure.ftipgw.com/smartpayments/transact.asmx/ProcessCreditCard";

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

const MAX_TIMEOUT_SECS: u64 = 300;

/// Gateway endpoint selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Sandbox,
    Live,
}

impl Mode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sandbox" | "test" => Some(Mode::Sandbox),
            "live" | "production" => Some(Mode::Live),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Sandbox => "sandbox",
            Mode::Live => "live",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials and behavior switches for one processor instance.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub mode: Mode,
    pub username: String,
    password: SecretString,
    /// Partner/reseller key. Kept for the settings surface, never sent.
    pub vendor: Option<String>,
    /// Merchant key. Kept for the settings surface, never sent.
    pub merchant: Option<String>,
    pub timeout: Duration,
    /// Reject approvals whose AVS result is not `Y`.
    pub avs_check: bool,
    /// Dump redacted request/response payloads to the log.
    pub debug: bool,
    pub sandbox_url: String,
    pub live_url: String,
    /// Card brand names accepted at checkout; `None` keeps the processor default.
    pub accepted_cards: Option<Vec<String>>,
}

impl GatewaySettings {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            mode: Mode::default(),
            username: username.into(),
            password: SecretString::new(password.into().into()),
            vendor: None,
            merchant: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            avs_check: false,
            debug: false,
            sandbox_url: SANDBOX_ENDPOINT.to_string(),
            live_url: LIVE_ENDPOINT.to_string(),
            accepted_cards: None,
        }
    }

    /// Load from `.env` and the process environment.
    pub fn from_env() -> Result<Self> {
        SettingsLoader::new().dotenv(None)?.env().build()
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_avs_check(mut self, enabled: bool) -> Self {
        self.avs_check = enabled;
        self
    }

    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }

    /// Override both endpoints, e.g. to point at a local mock gateway.
    pub fn with_endpoints(mut self, sandbox: impl Into<String>, live: impl Into<String>) -> Self {
        self.sandbox_url = sandbox.into();
        self.live_url = live.into();
        self
    }

    pub fn with_accepted_cards<I, S>(mut self, cards: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted_cards = Some(cards.into_iter().map(Into::into).collect());
        self
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// Endpoint for the configured mode.
    pub fn endpoint(&self) -> &str {
        match self.mode {
            Mode::Sandbox => &self.sandbox_url,
            Mode::Live => &self.live_url,
        }
    }
}

impl Validate for GatewaySettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.username, "username")?;
        ConfigValidator::not_empty(self.password.expose_secret(), "password")?;
        ConfigValidator::in_range(
            self.timeout.as_millis(),
            1,
            u128::from(MAX_TIMEOUT_SECS) * 1000,
            "timeout_ms",
        )?;
        ConfigValidator::is_http_url(&self.sandbox_url, "sandbox_url")?;
        ConfigValidator::is_http_url(&self.live_url, "live_url")?;
        Ok(())
    }
}

/// Layered builder for [`GatewaySettings`].
#[derive(Debug, Default)]
pub struct SettingsLoader {
    values: BTreeMap<String, String>,
    env: EnvLoader,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a settings file, format picked from its extension.
    pub fn file(mut self, path: &Path) -> Result<Self> {
        let values = ConfigLoader::auto(path)?.load_file(path)?;
        self.values.extend(values);
        Ok(self)
    }

    /// Merge `ARGOFIRE_*` entries from a `.env` file without touching the
    /// process environment. With `None`, a missing `.env` is not an error.
    pub fn dotenv(mut self, path: Option<&Path>) -> Result<Self> {
        let iter = match path {
            Some(path) => dotenvy::from_path_iter(path)
                .map_err(|e| ConfigError::LoadError(e.to_string()))?,
            None => match dotenvy::dotenv_iter() {
                Ok(iter) => iter,
                Err(_) => return Ok(self),
            },
        };

        self.values.extend(loader::collect_dotenv(iter)?);
        Ok(self)
    }

    /// Merge `ARGOFIRE_*` process environment variables.
    pub fn env(mut self) -> Self {
        let values = self.env.load();
        self.values.extend(values);
        self
    }

    /// Merge options persisted by the settings collaborator. Accepts both
    /// plain keys (`username`) and the legacy `gb_argofire_*` names.
    pub fn options<I, K, V>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in options {
            let key = normalize_option_key(key.as_ref());
            self.values.insert(key, value.into());
        }
        self
    }

    pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(normalize_option_key(key), value.into());
        self
    }

    /// Parse the merged values and validate the result.
    pub fn build(self) -> Result<GatewaySettings> {
        let values = self.values;
        let get = |key: &str| values.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let username = get("username").ok_or_else(|| ConfigError::Missing("username".into()))?;
        let password = get("password").ok_or_else(|| ConfigError::Missing("password".into()))?;
        let mut settings = GatewaySettings::new(username, password);

        if let Some(raw) = get("mode") {
            settings.mode = Mode::parse(raw).ok_or_else(|| invalid("mode", raw))?;
        }
        if let Some(raw) = get("timeout_secs") {
            let secs: u64 = raw.parse().map_err(|_| invalid("timeout_secs", raw))?;
            settings.timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = get("avs_check") {
            settings.avs_check = parse_bool(raw).ok_or_else(|| invalid("avs_check", raw))?;
        }
        if let Some(raw) = get("debug") {
            settings.debug = parse_bool(raw).ok_or_else(|| invalid("debug", raw))?;
        }
        if let Some(raw) = get("sandbox_url") {
            settings.sandbox_url = raw.to_string();
        }
        if let Some(raw) = get("live_url") {
            settings.live_url = raw.to_string();
        }
        settings.vendor = get("vendor").map(str::to_string);
        settings.merchant = get("merchant").map(str::to_string);
        settings.accepted_cards = get("accepted_cards").map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase)
                .collect()
        });

        settings.validate()?;
        Ok(settings)
    }
}

fn normalize_option_key(key: &str) -> String {
    let key = key.trim().to_lowercase();
    match key.strip_prefix("gb_argofire_") {
        // The original option name carried this misspelling.
        Some("vender") => "vendor".to_string(),
        Some(rest) => rest.to_string(),
        None => key,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SettingsLoader {
        SettingsLoader::new()
            .set("username", "merchant")
            .set("password", "s3cret")
    }

    #[test]
    fn test_defaults() {
        let settings = base().build().unwrap();
        assert_eq!(settings.mode, Mode::Sandbox);
        assert_eq!(settings.timeout, Duration::from_secs(15));
        assert!(!settings.avs_check);
        assert!(!settings.debug);
        assert_eq!(settings.endpoint(), SANDBOX_ENDPOINT);
        assert!(settings.accepted_cards.is_none());
    }

    #[test]
    fn test_live_mode_selects_live_endpoint() {
        let settings = base().set("mode", "live").build().unwrap();
        assert_eq!(settings.mode, Mode::Live);
        assert_eq!(settings.endpoint(), LIVE_ENDPOINT);
    }

    #[test]
    fn test_legacy_option_keys() {
        let settings = SettingsLoader::new()
            .options([
                ("gb_argofire_username", "legacy"),
                ("gb_argofire_password", "pw"),
                ("gb_argofire_mode", "live"),
                ("gb_argofire_vender", "partner-1"),
                ("gb_argofire_merchant", "rp-2"),
            ])
            .build()
            .unwrap();

        assert_eq!(settings.username, "legacy");
        assert_eq!(settings.mode, Mode::Live);
        assert_eq!(settings.vendor.as_deref(), Some("partner-1"));
        assert_eq!(settings.merchant.as_deref(), Some("rp-2"));
    }

    #[test]
    fn test_missing_credentials() {
        let err = SettingsLoader::new().set("username", "x").build().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref key) if key == "password"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            base().set("mode", "staging").build(),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            base().set("timeout_secs", "soon").build(),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            base().set("avs_check", "maybe").build(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_timeout_out_of_range_fails_validation() {
        let err = base().set("timeout_secs", "0").build().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));

        let too_long = GatewaySettings::new("merchant", "pw")
            .with_timeout(Duration::from_secs(MAX_TIMEOUT_SECS) + Duration::from_millis(1));
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_sub_second_timeout_is_valid() {
        let settings =
            GatewaySettings::new("merchant", "pw").with_timeout(Duration::from_millis(500));
        assert!(settings.validate().is_ok());
        assert!(GatewaySettings::new("merchant", "pw")
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_env_file_and_dotenv_agree() {
        let path = std::env::temp_dir().join(format!("argofire-{}.env", std::process::id()));
        std::fs::write(
            &path,
            "# gateway\n\
             export ARGOFIRE_USERNAME=merchant # sandbox account\n\
             ARGOFIRE_PASSWORD=\"s3\\\"cret\"\n\
             ARGOFIRE_MODE=live\n\
             ARGOFIRE_TIMEOUT_SECS=20\n",
        )
        .unwrap();

        let from_file = SettingsLoader::new().file(&path).unwrap().build();
        let from_dotenv = SettingsLoader::new().dotenv(Some(path.as_path())).unwrap().build();
        std::fs::remove_file(&path).unwrap();

        let (from_file, from_dotenv) = (from_file.unwrap(), from_dotenv.unwrap());
        assert_eq!(from_file.username, "merchant");
        assert_eq!(from_file.password().expose_secret(), "s3\"cret");
        assert_eq!(from_file.mode, Mode::Live);
        assert_eq!(from_file.username, from_dotenv.username);
        assert_eq!(
            from_file.password().expose_secret(),
            from_dotenv.password().expose_secret()
        );
        assert_eq!(from_file.mode, from_dotenv.mode);
        assert_eq!(from_file.timeout, from_dotenv.timeout);
    }

    #[test]
    fn test_accepted_cards_list() {
        let settings = base()
            .set("accepted_cards", "Visa, mastercard,,amex")
            .build()
            .unwrap();
        assert_eq!(
            settings.accepted_cards,
            Some(vec![
                "visa".to_string(),
                "mastercard".to_string(),
                "amex".to_string()
            ])
        );
    }

    #[test]
    fn test_password_is_redacted_in_debug() {
        let settings = GatewaySettings::new("merchant", "hunter2");
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("hunter2"));
        assert_eq!(settings.password().expose_secret(), "hunter2");
    }

    #[test]
    fn test_builder_methods() {
        let settings = GatewaySettings::new("merchant", "pw")
            .with_mode(Mode::Live)
            .with_timeout(Duration::from_secs(5))
            .with_avs_check(true)
            .with_endpoints("http://127.0.0.1:1/sandbox", "http://127.0.0.1:1/live");

        assert!(settings.validate().is_ok());
        assert_eq!(settings.endpoint(), "http://127.0.0.1:1/live");
    }
}
