//! Application configuration for pbrtjson.
//!
//! User config lives at `~/.pbrtjson/pbrtjson.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "pbrtjson.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".pbrtjson";

/// Sources below this size are written as indented JSON.
pub const DEFAULT_PRETTY_THRESHOLD_BYTES: u64 = 4 * 1024;

// ---------------------------------------------------------------------------
// Config structs (matching pbrtjson.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Per-file conversion settings.
    #[serde(default)]
    pub conversion: ConversionConfig,

    /// Batch driver settings.
    #[serde(default)]
    pub batch: BatchSection,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory holding one subdirectory per scene collection.
    #[serde(default = "default_source_root")]
    pub source_root: String,

    /// Directory receiving converted collections.
    #[serde(default = "default_output_root")]
    pub output_root: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            output_root: default_output_root(),
        }
    }
}

fn default_source_root() -> String {
    "../pbrt-v4-scenes".into()
}
fn default_output_root() -> String {
    ".".into()
}

/// `[conversion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Sources smaller than this many bytes get pretty-printed output.
    #[serde(default = "default_pretty_threshold")]
    pub pretty_threshold_bytes: u64,

    /// Extension of scene source files (without the dot).
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    /// Extension of converted artifacts (without the dot).
    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    /// Directive whose argument names another source file.
    #[serde(default = "default_include_keyword")]
    pub include_keyword: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            pretty_threshold_bytes: default_pretty_threshold(),
            source_extension: default_source_extension(),
            output_extension: default_output_extension(),
            include_keyword: default_include_keyword(),
        }
    }
}

fn default_pretty_threshold() -> u64 {
    DEFAULT_PRETTY_THRESHOLD_BYTES
}
fn default_source_extension() -> String {
    "pbrt".into()
}
fn default_output_extension() -> String {
    "json".into()
}
fn default_include_keyword() -> String {
    "Include".into()
}

/// `[batch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSection {
    /// Collection folder names under the source root.
    #[serde(default = "default_collections")]
    pub collections: Vec<String>,

    /// Regexes matched against `<collection>/<file>`; matches are not converted.
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// Auxiliary asset directories copied next to the output.
    #[serde(default = "default_assets")]
    pub assets: Vec<AssetRule>,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            collections: default_collections(),
            ignore_patterns: default_ignore_patterns(),
            assets: default_assets(),
        }
    }
}

fn default_collections() -> Vec<String> {
    ["killeroos", "ganesha", "lte-orb", "sssdragon"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_ignore_patterns() -> Vec<String> {
    // animated content is not supported
    vec![r"killeroos/killeroo-moving\.pbrt$".into()]
}
fn default_assets() -> Vec<AssetRule> {
    vec![
        AssetRule {
            dir: "geometry".into(),
            pattern: Some(r"\.ply".into()),
            recursive: false,
        },
        AssetRule {
            dir: "textures".into(),
            pattern: None,
            recursive: true,
        },
    ]
}

/// `[[batch.assets]]` entry: a collection subdirectory copied verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRule {
    /// Subdirectory name inside a collection.
    pub dir: String,
    /// Regex on file names; `None` copies everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Copy the whole tree instead of only top-level files.
    #[serde(default)]
    pub recursive: bool,
}

// ---------------------------------------------------------------------------
// Runtime config (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime conversion options.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub pretty_threshold_bytes: u64,
    pub source_extension: String,
    pub output_extension: String,
    pub include_keyword: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ConvertOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            pretty_threshold_bytes: config.conversion.pretty_threshold_bytes,
            source_extension: config.conversion.source_extension.clone(),
            output_extension: config.conversion.output_extension.clone(),
            include_keyword: config.conversion.include_keyword.clone(),
        }
    }
}

/// Runtime batch configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    pub collections: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub assets: Vec<AssetRule>,
    pub convert: ConvertOptions,
}

impl From<&AppConfig> for BatchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            source_root: PathBuf::from(&config.defaults.source_root),
            output_root: PathBuf::from(&config.defaults.output_root),
            collections: config.batch.collections.clone(),
            ignore_patterns: config.batch.ignore_patterns.clone(),
            assets: config.batch.assets.clone(),
            convert: ConvertOptions::from(config),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.pbrtjson/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| ConvertError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.pbrtjson/pbrtjson.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ConvertError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ConvertError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ConvertError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ConvertError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject settings that would make conversion ambiguous.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let conv = &config.conversion;
    for (name, ext) in [
        ("source_extension", &conv.source_extension),
        ("output_extension", &conv.output_extension),
    ] {
        if ext.is_empty() || ext.starts_with('.') {
            return Err(ConvertError::config(format!(
                "{name} must be a bare extension such as \"json\", got {ext:?}"
            )));
        }
    }
    if conv.source_extension == conv.output_extension {
        return Err(ConvertError::config(
            "source_extension and output_extension must differ",
        ));
    }
    if conv.include_keyword.is_empty() {
        return Err(ConvertError::config("include_keyword must not be empty"));
    }
    Ok(())
}
