//! Configuration for inkpost.
//!
//! Reads `inkpost.toml` with serde, discovering it in the current directory
//! or any parent when no explicit path is given. Command-line flags are folded
//! in afterwards through [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! These string values accept `${VAR}` and `${VAR:-default}`:
//! - `math.server_url`
//! - `toc.title`
//! - `assets.vault_dir`
//! - `icons.dir`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "inkpost.toml";

/// Directory, next to the config file, holding inkpost's own data.
const PROJECT_DIRNAME: &str = ".inkpost";

/// Deepest heading level a document can have.
const MAX_HEADING_LEVEL: u8 = 6;

/// Overrides collected from command-line flags.
///
/// Only `Some` values replace what the config file says.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the math typesetting server URL.
    pub math_url: Option<String>,
    /// Override whether the table of contents is generated.
    pub toc_enabled: Option<bool>,
    /// Override whether typeset formulas are cached on disk.
    pub cache_enabled: Option<bool>,
    /// Override the asset vault directory.
    pub vault_dir: Option<PathBuf>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Math typesetting.
    pub math: MathConfig,
    /// Table of contents generation.
    pub toc: TocConfig,
    /// External link footnotes.
    pub links: LinksConfig,
    /// Image captions.
    pub images: ImagesConfig,
    /// Asset lookup (paths as written in TOML).
    assets: AssetsConfigRaw,
    /// Icon shortcodes (paths as written in TOML).
    icons: IconsConfigRaw,

    /// Resolved asset configuration (set after loading).
    #[serde(skip)]
    pub assets_resolved: AssetsConfig,
    /// Resolved icon configuration (set after loading).
    #[serde(skip)]
    pub icons_resolved: IconsConfig,
    /// Directory for inkpost data such as the formula cache.
    #[serde(skip)]
    pub project_dir: PathBuf,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Math typesetting configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MathConfig {
    /// Typesetting server URL. Without one, formulas are emitted as TeX.
    pub server_url: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Whether typeset formulas are cached on disk.
    pub cache: bool,
}

impl Default for MathConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            timeout_secs: 30,
            cache: true,
        }
    }
}

/// Table of contents configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TocConfig {
    /// Whether a table of contents is inserted.
    pub enabled: bool,
    /// Title shown above the entries.
    pub title: String,
    /// Deepest heading level listed.
    pub max_level: u8,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "Contents".to_owned(),
            max_level: MAX_HEADING_LEVEL,
        }
    }
}

/// External link configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// Whether `http(s)` links get numbered footnotes.
    pub footnotes: bool,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self { footnotes: true }
    }
}

/// Image configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Whether images are wrapped in a captioned figure.
    pub captions: bool,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self { captions: true }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct AssetsConfigRaw {
    vault_dir: Option<String>,
}

/// Resolved asset configuration.
#[derive(Debug, Default)]
pub struct AssetsConfig {
    /// Root directory searched for images referenced by documents.
    pub vault_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct IconsConfigRaw {
    dir: Option<String>,
}

/// Resolved icon configuration.
#[derive(Debug, Default)]
pub struct IconsConfig {
    /// Directory of `{name}.svg` files used for `:name:` shortcodes.
    pub dir: Option<PathBuf>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`math.server_url`").
        field: String,
        /// Error message (e.g., "${`MATH_URL`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration, then apply CLI overrides.
    ///
    /// Uses `config_path` when given, otherwise the nearest `inkpost.toml`
    /// in the current directory or its parents, otherwise defaults rooted
    /// at the current directory.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit `config_path` is missing, or the file
    /// cannot be read, parsed, expanded or validated.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Directory for the on-disk formula cache.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.project_dir.join("cache")
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(url) = &settings.math_url {
            self.math.server_url = Some(url.clone());
        }
        if let Some(enabled) = settings.toc_enabled {
            self.toc.enabled = enabled;
        }
        if let Some(cache) = settings.cache_enabled {
            self.math.cache = cache;
        }
        if let Some(vault_dir) = &settings.vault_dir {
            self.assets_resolved.vault_dir = Some(vault_dir.clone());
        }
    }

    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    fn default_with_base(base: &Path) -> Self {
        Self {
            math: MathConfig::default(),
            toc: TocConfig::default(),
            links: LinksConfig::default(),
            images: ImagesConfig::default(),
            assets: AssetsConfigRaw::default(),
            icons: IconsConfigRaw::default(),
            assets_resolved: AssetsConfig::default(),
            icons_resolved: IconsConfig::default(),
            project_dir: base.join(PROJECT_DIRNAME),
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_math()?;
        self.validate_toc()?;
        Ok(())
    }

    fn validate_math(&self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.math.server_url {
            require_non_empty(url, "math.server_url")?;
            require_http_url(url, "math.server_url")?;
        }
        if self.math.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "math.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_toc(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_HEADING_LEVEL).contains(&self.toc.max_level) {
            return Err(ConfigError::Validation(format!(
                "toc.max_level must be between 1 and {MAX_HEADING_LEVEL}"
            )));
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.math.server_url {
            self.math.server_url = Some(expand::expand_env(url, "math.server_url")?);
        }
        self.toc.title = expand::expand_env(&self.toc.title, "toc.title")?;
        if let Some(ref dir) = self.assets.vault_dir {
            self.assets.vault_dir = Some(expand::expand_env(dir, "assets.vault_dir")?);
        }
        if let Some(ref dir) = self.icons.dir {
            self.icons.dir = Some(expand::expand_env(dir, "icons.dir")?);
        }
        Ok(())
    }

    /// Resolve relative directories against the config file's directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.project_dir = config_dir.join(PROJECT_DIRNAME);
        self.assets_resolved = AssetsConfig {
            vault_dir: self.assets.vault_dir.as_deref().map(|d| config_dir.join(d)),
        };
        self.icons_resolved = IconsConfig {
            dir: self.icons.dir.as_deref().map(|d| config_dir.join(d)),
        };
    }
}
