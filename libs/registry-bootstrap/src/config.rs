use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Db {
    InMem,
    Sqlite,
}

impl Default for Db {
    fn default() -> Self {
        Db::InMem
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptReq {
    Grpc,
    Http,
}

impl Default for AcceptReq {
    fn default() -> Self {
        AcceptReq::Grpc
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, rename = "db")]
    pub db: Db,
    #[serde(default, rename = "accept-req")]
    pub accept_req: AcceptReq,
    pub server: ServerConfig,
    #[serde(default)]
    pub checker: CheckerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default = "default_domain")]
    pub domain: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CheckerConfig {
    #[serde(default, rename = "req")]
    pub req: AcceptReq,
    #[serde(default = "default_max_retries", rename = "max_retries_req")]
    pub max_retries_req: u32,
    #[serde(default = "default_cooldown", rename = "cooldown_req")]
    pub cooldown_req: u64,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            req: AcceptReq::default(),
            max_retries_req: default_max_retries(),
            cooldown_req: default_cooldown(),
        }
    }
}

fn default_mode() -> String {
    "dev".to_string()
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_domain() -> String {
    "localhost".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_cooldown() -> u64 {
    5
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let conf: Config =
            serde_yaml::from_str(&data).with_context(|| "failed to parse config file")?;
        Ok(conf)
    }

    pub fn cooldown(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.checker.cooldown_req)
    }
}
