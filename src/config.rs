use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

/// RFC 3986 scheme syntax: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
static SCHEME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*$").unwrap());

/// Top-level configuration loaded from shellguard.toml.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
#[derive(Default)]
pub struct ShellConfig {
    pub shutdown: ShutdownConfig,
    pub external: ExternalConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long to wait after a shutdown signal before assuming the page
    /// survived it and showing the error dialog.
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExternalConfig {
    /// Schemes opened in a new browsing context. Everything else navigates
    /// the current page under an expected unload.
    pub new_context_schemes: Vec<String>,
}

// --- Default implementations ---

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { delay_ms: 1500 }
    }
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            new_context_schemes: vec!["http".to_string(), "https".to_string()],
        }
    }
}

impl ShutdownConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Errors produced while loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// `shutdown.delay_ms` was zero.
    ZeroDelay,
    /// An entry of `external.new_context_schemes` is not a URI scheme.
    InvalidScheme(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {}", path.display(), source)
            }
            ConfigError::ZeroDelay => write!(f, "shutdown.delay_ms must be greater than zero"),
            ConfigError::InvalidScheme(scheme) => {
                write!(f, "invalid scheme in external.new_context_schemes: {scheme:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::ZeroDelay | ConfigError::InvalidScheme(_) => None,
        }
    }
}

impl ShellConfig {
    /// Load and validate config from `path`.
    ///
    /// A missing file yields the defaults; any other read failure or a
    /// malformed file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let config: ShellConfig = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validated()
    }

    /// Check invariants and normalize scheme names to lower case.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.shutdown.delay_ms == 0 {
            return Err(ConfigError::ZeroDelay);
        }
        for scheme in &mut self.external.new_context_schemes {
            if !SCHEME_PATTERN.is_match(scheme) {
                return Err(ConfigError::InvalidScheme(scheme.clone()));
            }
            scheme.make_ascii_lowercase();
        }
        Ok(self)
    }
}
