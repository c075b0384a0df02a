//! Reader configuration and factory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use sheetgrade_core::model::ChoiceSet;

use crate::omr::OmrClient;
use crate::reader::SheetReader;
use crate::vision::VisionClient;

/// Configuration for the OMR service backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OmrConfig {
    /// Base URL of the OMR service.
    #[serde(default = "default_omr_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_omr_timeout")]
    pub timeout_secs: u64,
}

impl Default for OmrConfig {
    fn default() -> Self {
        Self {
            base_url: default_omr_url(),
            timeout_secs: default_omr_timeout(),
        }
    }
}

/// Configuration for the AI vision backend.
///
/// The hand-written `Debug` impl keeps the API key out of log output.
#[derive(Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// API key; supports `${VAR_NAME}` references.
    #[serde(default)]
    pub api_key: String,
    /// Vision model id.
    #[serde(default = "default_vision_model")]
    pub model: String,
    /// Override the API base URL, e.g. for a proxy.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl std::fmt::Debug for VisionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionConfig")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_vision_model(),
            base_url: None,
        }
    }
}

/// Top-level sheetgrade configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetgradeConfig {
    /// Directory for stored answer keys and results.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Choice letters printed on the sheets, e.g. `"ABCDE"`.
    #[serde(default = "default_choices")]
    pub choices: String,
    /// OMR service settings.
    #[serde(default)]
    pub omr: OmrConfig,
    /// AI vision settings.
    #[serde(default)]
    pub vision: VisionConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./sheetgrade-data")
}
fn default_choices() -> String {
    "ABCDE".to_string()
}
fn default_omr_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_omr_timeout() -> u64 {
    30
}
fn default_vision_model() -> String {
    "gemini-2.0-flash-lite".to_string()
}

impl Default for SheetgradeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            choices: default_choices(),
            omr: OmrConfig::default(),
            vision: VisionConfig::default(),
        }
    }
}

impl SheetgradeConfig {
    /// Parse the configured choice letters.
    pub fn choice_set(&self) -> Result<ChoiceSet> {
        self.choices
            .parse::<ChoiceSet>()
            .map_err(|e| anyhow::anyhow!("invalid choices in config: {e}"))
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `sheetgrade.toml` in the current directory
/// 2. `~/.config/sheetgrade/config.toml`
///
/// Environment variable overrides: `SHEETGRADE_DATA_DIR`, `SHEETGRADE_OMR_URL`,
/// `SHEETGRADE_VISION_KEY`.
pub fn load_config() -> Result<SheetgradeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<SheetgradeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("sheetgrade.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<SheetgradeConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => SheetgradeConfig::default(),
    };

    // Apply env var overrides
    if let Ok(dir) = std::env::var("SHEETGRADE_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Ok(url) = std::env::var("SHEETGRADE_OMR_URL") {
        config.omr.base_url = url;
    }
    if let Ok(key) = std::env::var("SHEETGRADE_VISION_KEY") {
        config.vision.api_key = key;
    }

    // Resolve env vars in fields that commonly carry references
    config.vision.api_key = resolve_env_vars(&config.vision.api_key);
    config.omr.base_url = resolve_env_vars(&config.omr.base_url);
    config.vision.base_url = config.vision.base_url.as_ref().map(|u| resolve_env_vars(u));

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("sheetgrade"))
}

/// Create a sheet reader instance by backend name.
pub fn create_reader(name: &str, config: &SheetgradeConfig) -> Result<Box<dyn SheetReader>> {
    match name {
        "omr" => {
            let client = OmrClient::new(&config.omr.base_url)
                .with_timeout(std::time::Duration::from_secs(config.omr.timeout_secs));
            Ok(Box::new(client))
        }
        "vision" => {
            if config.vision.api_key.is_empty() {
                anyhow::bail!(
                    "no vision API key configured; set vision.api_key in sheetgrade.toml \
                     or the SHEETGRADE_VISION_KEY environment variable"
                );
            }
            let client = VisionClient::new(&config.vision.api_key, config.vision.base_url.clone())
                .with_model(&config.vision.model);
            Ok(Box::new(client))
        }
        other => anyhow::bail!("unknown reader backend: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_SHEETGRADE_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_SHEETGRADE_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_SHEETGRADE_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_SHEETGRADE_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = SheetgradeConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("./sheetgrade-data"));
        assert_eq!(config.choices, "ABCDE");
        assert_eq!(config.omr.base_url, "http://localhost:8000");
        assert_eq!(config.omr.timeout_secs, 30);
        assert_eq!(config.vision.model, "gemini-2.0-flash-lite");
        assert!(config.vision.api_key.is_empty());
    }

    #[test]
    fn parse_partial_config() {
        let toml_str = r#"
choices = "ABCD"

[omr]
timeout_secs = 5

[vision]
model = "gemini-2.5-pro"
"#;
        let config: SheetgradeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.choices, "ABCD");
        assert_eq!(config.omr.timeout_secs, 5);
        // Unset fields keep their defaults.
        assert_eq!(config.omr.base_url, "http://localhost:8000");
        assert_eq!(config.vision.model, "gemini-2.5-pro");
        assert_eq!(config.choice_set().unwrap().len(), 4);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/no/such/sheetgrade.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn load_resolves_references_then_env_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheetgrade.toml");
        std::fs::write(
            &path,
            "[vision]\napi_key = \"${_SHEETGRADE_KEY_FOR_TEST}\"\n",
        )
        .unwrap();

        std::env::set_var("_SHEETGRADE_KEY_FOR_TEST", "from-reference");
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.vision.api_key, "from-reference");

        std::env::set_var("SHEETGRADE_VISION_KEY", "from-override");
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.vision.api_key, "from-override");

        std::env::remove_var("SHEETGRADE_VISION_KEY");
        std::env::remove_var("_SHEETGRADE_KEY_FOR_TEST");
    }

    #[test]
    fn masked_debug_hides_the_key() {
        let config = VisionConfig {
            api_key: "secret".to_string(),
            ..VisionConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(rendered.contains("***"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn reader_factory_dispatches_by_name() {
        let mut config = SheetgradeConfig::default();
        assert_eq!(create_reader("omr", &config).unwrap().name(), "omr");

        let err = create_reader("vision", &config).unwrap_err();
        assert!(err.to_string().contains("no vision API key"));

        config.vision.api_key = "key".to_string();
        assert_eq!(create_reader("vision", &config).unwrap().name(), "vision");

        assert!(create_reader("pigeon", &config).is_err());
    }
}
