use config::{Config, ConfigError, Environment, File};
use extractors::StatementParserConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = r#"
[mailbox]
# Directory with exported statement e-mails (*.eml)
# directory = "/home/me/csob-statements"

[statement]
# Character set CSOB writes text statements in
source_encoding = "windows-1250"
# "fail-fast" or "collect-and-continue"
failure_policy = "fail-fast"
"#;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CheckerConfig {
    pub mailbox: MailboxConfig,
    pub statement: StatementParserConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MailboxConfig {
    pub directory: PathBuf,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        let directory = match dirs::data_dir() {
            Some(data_dir) => data_dir.join("csob-checker").join("statements"),
            None => PathBuf::from("statements"),
        };
        Self { directory }
    }
}

impl CheckerConfig {
    /// Load from `path` or the per-user config file, writing a commented
    /// default first if none exists. `CSOB_CHECKER__<SECTION>__<KEY>`
    /// environment variables take precedence over the file.
    pub fn load(path: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ConfigError::Message(format!("Failed to create config directory: {e}"))
                })?;
            }
            std::fs::write(&config_path, DEFAULT_CONFIG).map_err(|e| {
                ConfigError::Message(format!("Failed to write default config: {e}"))
            })?;
            tracing::info!("Wrote default config to {:?}", config_path);
        }

        let builder = Config::builder()
            .add_source(File::from(config_path.clone()))
            .add_source(Environment::with_prefix("CSOB_CHECKER").separator("__"))
            .build()?;

        let config: CheckerConfig = builder.try_deserialize()?;

        Ok((config, config_path))
    }
}

pub fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("csob-checker").join("checker.toml")
    } else {
        PathBuf::from("checker.toml")
    }
}
