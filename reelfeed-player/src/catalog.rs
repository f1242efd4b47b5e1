//! Video catalog collaborator
//!
//! The feed controller never owns the item list's persistence; it talks
//! to the external video-listing service through this trait so tests can
//! substitute a fake. List failures surface as the feed's error phase —
//! no automatic retry loop.

use crate::error::{Error, Result};
use async_trait::async_trait;
use reelfeed_common::model::VideoEntry;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// External video-listing service
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    /// Ordered video list; persisted order is authoritative
    async fn list_videos(&self, user_id: Option<Uuid>) -> Result<Vec<VideoEntry>>;

    /// Register a new manifest URL (admin path)
    async fn add_video(&self, src: &str) -> Result<VideoEntry>;

    /// Remove a video by id (admin path)
    async fn remove_video(&self, id: Uuid) -> Result<()>;
}

/// HTTP client for the catalog service
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct AddVideoRequest<'a> {
    src: &'a str,
}

impl HttpCatalog {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Fetch(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn videos_url(&self) -> String {
        format!("{}/api/videos", self.base_url)
    }
}

#[async_trait]
impl VideoCatalog for HttpCatalog {
    async fn list_videos(&self, user_id: Option<Uuid>) -> Result<Vec<VideoEntry>> {
        let mut request = self.client.get(self.videos_url());
        if let Some(user_id) = user_id {
            request = request.query(&[("user_id", user_id.to_string())]);
        }

        debug!(url = %self.videos_url(), "fetching video list");

        let response = request
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("video list request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "video list returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<Vec<VideoEntry>>()
            .await
            .map_err(|e| Error::Fetch(format!("invalid video list payload: {}", e)))
    }

    async fn add_video(&self, src: &str) -> Result<VideoEntry> {
        let response = self
            .client
            .post(self.videos_url())
            .json(&AddVideoRequest { src })
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("add video request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "add video returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<VideoEntry>()
            .await
            .map_err(|e| Error::Fetch(format!("invalid add video payload: {}", e)))
    }

    async fn remove_video(&self, id: Uuid) -> Result<()> {
        let url = format!("{}/{}", self.videos_url(), id);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("remove video request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "remove video returned HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }
}
