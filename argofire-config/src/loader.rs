// Settings file loaders

use crate::{ConfigError, EnvLoader, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Supported settings file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Json,
    Toml,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }
}

/// Parses a settings file into flat `key -> string` pairs.
///
/// Only top-level scalars are kept; arrays of scalars are joined with
/// commas so `accepted_cards = ["visa", "amex"]` reads the same as the
/// environment form `visa,amex`.
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Pick the format from the file extension.
    pub fn auto(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| ConfigError::LoadError(format!("Unsupported format: {}", ext)))?;

        Ok(Self::new(format))
    }

    pub fn load_file(&self, path: &Path) -> Result<BTreeMap<String, String>> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        self.parse(&content)
    }

    pub fn parse(&self, content: &str) -> Result<BTreeMap<String, String>> {
        match self.format {
            FileFormat::Json => {
                let value: Value = serde_json::from_str(content)
                    .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e)))?;
                flatten(value)
            }
            FileFormat::Toml => {
                let value: Value = toml::from_str(content)
                    .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;
                flatten(value)
            }
            FileFormat::Env => collect_dotenv(dotenvy::from_read_iter(content.as_bytes())),
        }
    }
}

fn flatten(value: Value) -> Result<BTreeMap<String, String>> {
    let Value::Object(map) = value else {
        return Err(ConfigError::ParseError(
            "settings file must contain a table at the top level".to_string(),
        ));
    };

    let mut out = BTreeMap::new();
    for (key, value) in map {
        if let Some(text) = scalar_text(&value) {
            out.insert(key.to_lowercase(), text);
        } else if let Value::Array(items) = &value {
            let joined: Vec<String> = items.iter().filter_map(scalar_text).collect();
            out.insert(key.to_lowercase(), joined.join(","));
        }
    }

    Ok(out)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Collect `ARGOFIRE_*` pairs from a `dotenvy` iterator.
pub(crate) fn collect_dotenv<I>(iter: I) -> Result<BTreeMap<String, String>>
where
    I: IntoIterator<Item = std::result::Result<(String, String), dotenvy::Error>>,
{
    let mut pairs = Vec::new();
    for item in iter {
        pairs.push(item.map_err(|e| ConfigError::ParseError(format!("dotenv parse error: {}", e)))?);
    }
    Ok(EnvLoader::default().collect(pairs))
}
