// src/ingest/source.rs
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::ingest::types::FeedSource;

/// CSV file on local disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeedSource for FileSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("reading feed file {}", self.path.display()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// CSV served over HTTP(S). No timeout and no retry: a stalled server keeps
/// the caller waiting.
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl FeedSource for HttpSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("feed http get()")?
            .error_for_status()
            .context("feed http status")?;
        let body = resp.bytes().await.context("feed http body")?;
        Ok(body.to_vec())
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// In-memory payload (fixtures, tests, embedded data).
pub struct StaticSource {
    label: String,
    payload: Vec<u8>,
}

impl StaticSource {
    pub fn new(label: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }

    pub fn from_fixture(content: &str) -> Self {
        Self::new("fixture", content.as_bytes())
    }
}

#[async_trait]
impl FeedSource for StaticSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        Ok(self.payload.clone())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Pick a source from a location string: `http://` / `https://` URLs are
/// fetched over the network, anything else is a file path.
pub fn source_for(location: &str) -> Box<dyn FeedSource> {
    let lower = location.trim().to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Box::new(HttpSource::new(location.trim()))
    } else {
        Box::new(FileSource::new(location.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_for_dispatches_on_scheme() {
        assert_eq!(
            source_for("HTTPS://example.test/posts.csv").describe(),
            "HTTPS://example.test/posts.csv"
        );
        assert_eq!(source_for(" public/posts.csv ").describe(), "public/posts.csv");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let src = FileSource::new("definitely/not/here.csv");
        let err = src.fetch().await.unwrap_err();
        assert!(format!("{err:#}").contains("definitely/not/here.csv"));
    }

    #[tokio::test]
    async fn static_source_returns_payload() {
        let src = StaticSource::from_fixture("a,b\n1,2\n");
        assert_eq!(src.fetch().await.unwrap(), b"a,b\n1,2\n".to_vec());
    }
}
