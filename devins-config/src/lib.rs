//! Shared configuration loader for the DevIns toolchain.
//!
//! `defaults/devins.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`DevinsConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/devins.default.toml");

/// Top-level configuration consumed by DevIns applications.
#[derive(Debug, Clone, Deserialize)]
pub struct DevinsConfig {
    pub compiler: CompilerConfig,
    pub inspect: InspectConfig,
    pub logging: LoggingConfig,
}

/// Knobs for the front-matter compiler.
#[derive(Debug, Clone, Deserialize)]
pub struct CompilerConfig {
    pub detect_plan_lists: bool,
    pub warn_unknown_nodes: bool,
}

/// Controls token/tree/compile output of the CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct InspectConfig {
    pub format: OutputFormat,
    pub include_trivia: bool,
    pub show_positions: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Simple,
    Json,
    Yaml,
    Debug,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI flags).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<DevinsConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<DevinsConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert!(config.compiler.detect_plan_lists);
        assert!(config.compiler.warn_unknown_nodes);
        assert_eq!(config.inspect.format, OutputFormat::Json);
        assert!(!config.inspect.include_trivia);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("inspect.format", "yaml")
            .expect("override to apply")
            .set_override("compiler.detect_plan_lists", false)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.inspect.format, OutputFormat::Yaml);
        assert!(!config.compiler.detect_plan_lists);
    }

    #[test]
    fn layers_user_file_over_defaults() {
        let dir = std::env::temp_dir().join(format!("devins-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("devins.toml");
        let mut file = std::fs::File::create(&path).expect("config file");
        writeln!(file, "[logging]\nlevel = \"debug\"").expect("write config");

        let config = Loader::new().with_file(&path).build().expect("config to build");
        assert_eq!(config.logging.level, "debug");
        assert!(config.inspect.show_positions);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_optional_file_is_ignored() {
        let config = Loader::new()
            .with_optional_file("/nonexistent/devins.toml")
            .build()
            .expect("config to build");
        assert_eq!(config.inspect.format, OutputFormat::Json);
    }
}
