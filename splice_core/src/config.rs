//! Layered configuration: built-in defaults, workspace file, environment.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use splice_agents::CommandGateway;
use splice_api::EditEncoding;

use crate::apply::ApplyOptions;
use crate::extract::ExtractOptions;

/// Workspace-relative location of the configuration file.
pub const WORKSPACE_CONFIG_PATH: &str = ".splice/config.toml";

/// Errors surfaced while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File being read.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for [`Config`].
    #[error("failed to parse config {origin}: {source}")]
    Parse {
        /// File path, or `<inline>`.
        origin: String,
        /// Parser error.
        #[source]
        source: toml::de::Error,
    },
    /// An environment override could not be interpreted.
    #[error("invalid value {value:?} for {name}")]
    InvalidOverride {
        /// Variable name.
        name: &'static str,
        /// Rejected value.
        value: String,
    },
}

/// Complete configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Automatic decoding.
    #[serde(default)]
    pub decode: DecodeConfig,
    /// Edit application.
    #[serde(default)]
    pub apply: ApplyConfig,
    /// Symbol extraction.
    #[serde(default)]
    pub extract: ExtractConfig,
    /// External agent command.
    #[serde(default)]
    pub agent: AgentConfig,
}

/// `[decode]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Encodings tried, in order, when decoding a response.
    #[serde(default = "DecodeConfig::default_order")]
    pub order: Vec<EditEncoding>,
}

impl DecodeConfig {
    fn default_order() -> Vec<EditEncoding> {
        vec![
            EditEncoding::Structured,
            EditEncoding::SearchReplace,
            EditEncoding::UnifiedDiff,
        ]
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            order: Self::default_order(),
        }
    }
}

/// `[apply]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyConfig {
    /// Compare each edit's old text against the buffer before applying it.
    #[serde(default = "ApplyConfig::default_verify_old_text")]
    pub verify_old_text: bool,
}

impl ApplyConfig {
    const fn default_verify_old_text() -> bool {
        true
    }
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            verify_old_text: Self::default_verify_old_text(),
        }
    }
}

/// `[extract]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Longest snippet kept per symbol.
    #[serde(default = "ExtractConfig::default_max_snippet_lines")]
    pub max_snippet_lines: usize,
}

impl ExtractConfig {
    const fn default_max_snippet_lines() -> usize {
        200
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_snippet_lines: Self::default_max_snippet_lines(),
        }
    }
}

/// `[agent]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Program run for each agent request. No command gateway when unset.
    #[serde(default)]
    pub command: Option<String>,
    /// Arguments passed to `command`.
    #[serde(default)]
    pub args: Vec<String>,
    /// Seconds to wait for the command before giving up.
    #[serde(default = "AgentConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl AgentConfig {
    const fn default_timeout_secs() -> u64 {
        120
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    decode_order: Option<String>,
    agent_command: Option<String>,
    agent_timeout_secs: Option<String>,
}

impl EnvOverrides {
    /// Read `SPLICE_DECODE_ORDER`, `SPLICE_AGENT_CMD` and `SPLICE_AGENT_TIMEOUT_SECS`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            decode_order: env::var("SPLICE_DECODE_ORDER").ok(),
            agent_command: env::var("SPLICE_AGENT_CMD").ok(),
            agent_timeout_secs: env::var("SPLICE_AGENT_TIMEOUT_SECS").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(decode_order: &str, agent_command: &str, agent_timeout_secs: &str) -> Self {
        Self {
            decode_order: Some(decode_order.to_owned()),
            agent_command: Some(agent_command.to_owned()),
            agent_timeout_secs: Some(agent_timeout_secs.to_owned()),
        }
    }
}

impl Config {
    /// Load defaults, then `<workspace>/.splice/config.toml`, then environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace file is unreadable or invalid, or an
    /// override cannot be parsed.
    pub fn load(workspace_root: &Path) -> Result<Self, ConfigError> {
        Self::load_with_layers(
            Some(workspace_root.join(WORKSPACE_CONFIG_PATH)),
            EnvOverrides::from_env(),
        )
    }

    /// Load defaults, then `workspace` if it exists, then `env_overrides`.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_with_layers(
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self, ConfigError> {
        let config = match workspace.filter(|path| path.exists()) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        apply_env_overrides(config, env_overrides)
    }

    /// Parse a configuration file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&data).map_err(|source| ConfigError::Parse {
            origin: path.display().to_string(),
            source,
        })
    }

    /// Parse configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            origin: "<inline>".to_owned(),
            source,
        })
    }

    /// Applier switches.
    #[must_use]
    pub const fn apply_options(&self) -> ApplyOptions {
        ApplyOptions {
            verify_old_text: self.apply.verify_old_text,
        }
    }

    /// Extractor switches.
    #[must_use]
    pub const fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            max_snippet_lines: self.extract.max_snippet_lines,
        }
    }

    /// Command gateway described by `[agent]`, when a command is configured.
    #[must_use]
    pub fn command_gateway(&self) -> Option<CommandGateway> {
        let command = self.agent.command.as_deref()?.trim();
        if command.is_empty() {
            return None;
        }
        Some(
            CommandGateway::new(command)
                .with_args(&self.agent.args)
                .with_timeout(Duration::from_secs(self.agent.timeout_secs)),
        )
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Result<Config, ConfigError> {
    if let Some(order) = env.decode_order {
        let parsed: Option<Vec<EditEncoding>> = order
            .split(',')
            .filter(|name| !name.trim().is_empty())
            .map(EditEncoding::from_name)
            .collect();
        match parsed {
            Some(parsed) if !parsed.is_empty() => config.decode.order = parsed,
            _ => {
                return Err(ConfigError::InvalidOverride {
                    name: "SPLICE_DECODE_ORDER",
                    value: order,
                })
            }
        }
    }

    if let Some(command) = env.agent_command {
        let mut parts = command.split_whitespace().map(str::to_owned);
        if let Some(program) = parts.next() {
            config.agent.command = Some(program);
            config.agent.args = parts.collect();
        }
    }

    if let Some(timeout) = env.agent_timeout_secs {
        config.agent.timeout_secs = timeout.trim().parse().map_err(|_| ConfigError::InvalidOverride {
            name: "SPLICE_AGENT_TIMEOUT_SECS",
            value: timeout.clone(),
        })?;
    }

    Ok(config)
}
