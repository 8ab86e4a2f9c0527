// src/config.rs
//! Runtime configuration (TOML).
//!
//! ```toml
//! [source]
//! location = "public/posts.csv"   # file path or http(s) URL
//!
//! [feed]
//! default_sort = "likes"
//!
//! [server]
//! static_dir = "public"
//! ```
//!
//! Resolution: `$FEED_CONFIG_PATH` → `config/feed.toml` → built-in defaults.
//! `$FEED_SOURCE` overrides `source.location` in every case.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::feed::SortField;

pub const DEFAULT_CONFIG_PATH: &str = "config/feed.toml";
pub const DEFAULT_SOURCE: &str = "public/posts.csv";
pub const DEFAULT_STATIC_DIR: &str = "public";

pub const ENV_CONFIG_PATH: &str = "FEED_CONFIG_PATH";
pub const ENV_SOURCE: &str = "FEED_SOURCE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct FeedConfig {
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub feed: FeedSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceSection {
    #[serde(default = "default_location")]
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct FeedSection {
    #[serde(default)]
    pub default_sort: SortField,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_location() -> String {
    DEFAULT_SOURCE.to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STATIC_DIR)
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            location: default_location(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            static_dir: default_static_dir(),
        }
    }
}

impl FeedConfig {
    /// Parse TOML text. Every section and key is optional.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: FeedConfig = toml::from_str(s).context("parsing feed config")?;
        Ok(cfg)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading feed config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks, then apply `$FEED_SOURCE`.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };

        if let Ok(src) = std::env::var(ENV_SOURCE) {
            let src = src.trim();
            if !src.is_empty() {
                cfg.source.location = src.to_string();
            }
        }
        Ok(cfg)
    }
}
