//! Configuration management for Walkable
//!
//! Configuration is resolved once, in the binary, and handed to each
//! component by value. Sources, in order:
//!
//! 1. The TOML file named by `WALKABLE_CONFIG`
//! 2. `<config dir>/walkable/config.toml`, when it exists
//! 3. The process environment (`BSKY_USER`, `BSKY_PSWD`, `AWS_BUCK`, ...)

use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

pub const DEFAULT_PDS_URL: &str = "https://bsky.social";

#[derive(Debug)]
pub struct Config {
    pub bluesky: BlueskyConfig,
    pub x: Option<XConfig>,
    pub source: SourceConfig,
}

#[derive(Debug)]
pub struct BlueskyConfig {
    /// Handle or email used to log in
    pub identifier: String,
    pub password: SecretString,
    pub pds_url: String,
}

#[derive(Debug)]
pub struct XConfig {
    pub consumer_key: String,
    pub consumer_secret: SecretString,
    pub access_token: String,
    pub access_token_secret: SecretString,
}

#[derive(Debug)]
pub struct SourceConfig {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    /// Custom endpoint for S3-compatible storage
    pub endpoint: Option<String>,
}

// On-disk layout. Secrets are plain strings only until `into_config`.
#[derive(Deserialize)]
struct FileConfig {
    bluesky: FileBluesky,
    x: Option<FileX>,
    source: FileSource,
}

#[derive(Deserialize)]
struct FileBluesky {
    identifier: String,
    password: String,
    pds_url: Option<String>,
}

#[derive(Deserialize)]
struct FileX {
    consumer_key: String,
    consumer_secret: String,
    access_token: String,
    access_token_secret: String,
}

#[derive(Deserialize)]
struct FileSource {
    bucket: String,
    region: String,
    access_key_id: String,
    secret_access_key: String,
    endpoint: Option<String>,
}

impl FileConfig {
    fn into_config(self) -> Config {
        Config {
            bluesky: BlueskyConfig {
                identifier: self.bluesky.identifier,
                password: SecretString::from(self.bluesky.password),
                pds_url: self
                    .bluesky
                    .pds_url
                    .unwrap_or_else(|| DEFAULT_PDS_URL.to_string()),
            },
            x: self.x.map(|x| XConfig {
                consumer_key: x.consumer_key,
                consumer_secret: SecretString::from(x.consumer_secret),
                access_token: x.access_token,
                access_token_secret: SecretString::from(x.access_token_secret),
            }),
            source: SourceConfig {
                bucket: self.source.bucket,
                region: self.source.region,
                access_key_id: self.source.access_key_id,
                secret_access_key: SecretString::from(self.source.secret_access_key),
                endpoint: self.source.endpoint,
            },
        }
    }
}

const X_VARS: [&str; 4] = ["GOTWI_API_KEY", "GOTWI_API_KEY_SECRET", "TWIT_AT", "TWIT_AS"];

impl Config {
    /// Load configuration from the first available source
    pub fn load() -> Result<Self> {
        match resolve_config_path()? {
            Some(path) => Self::load_from_path(&path),
            None => Self::from_env(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let file: FileConfig = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(file.into_config())
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as missing. The X section is optional, but once
    /// any of its variables is set all four are required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require =
            |key: &str| get(key).ok_or_else(|| ConfigError::MissingField(key.to_string()));

        let bluesky = BlueskyConfig {
            identifier: require("BSKY_USER")?,
            password: SecretString::from(require("BSKY_PSWD")?),
            pds_url: get("BSKY_PDS_URL").unwrap_or_else(|| DEFAULT_PDS_URL.to_string()),
        };

        let x = if X_VARS.iter().any(|key| get(key).is_some()) {
            Some(XConfig {
                consumer_key: require("GOTWI_API_KEY")?,
                consumer_secret: SecretString::from(require("GOTWI_API_KEY_SECRET")?),
                access_token: require("TWIT_AT")?,
                access_token_secret: SecretString::from(require("TWIT_AS")?),
            })
        } else {
            None
        };

        let source = SourceConfig {
            bucket: require("AWS_BUCK")?,
            region: require("AWS_REGN")?,
            access_key_id: require("AWS_USER")?,
            secret_access_key: SecretString::from(require("AWS_PSWD")?),
            endpoint: get("AWS_ENDPOINT"),
        };

        Ok(Self { bluesky, x, source })
    }
}

/// Resolve the configuration file path following XDG Base Directory spec.
///
/// Returns `None` when no file is configured and none exists at the default
/// location, in which case the environment is used.
pub fn resolve_config_path() -> Result<Option<PathBuf>> {
    if let Ok(path) = std::env::var("WALKABLE_CONFIG") {
        return Ok(Some(PathBuf::from(shellexpand::tilde(&path).to_string())));
    }

    let default = dirs::config_dir().map(|dir| dir.join("walkable").join("config.toml"));
    Ok(default.filter(|path| path.exists()))
}
