// Bazarr API access
//
// The workflow talks to Bazarr through the `SubtitleProvider` trait; the
// production implementation is `BazarrClient`, which owns the request
// wrapper with retry and backoff.

pub mod client;

pub use client::BazarrClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Subtitle, WantedEpisode, WantedItem, WantedMovie, WantedPage};

/// Operations the subtitle workflow needs from the remote service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubtitleProvider: Send + Sync {
    /// Movies flagged as missing subtitles (full list, unbounded page)
    async fn wanted_movies(&self) -> Result<WantedPage<WantedMovie>>;

    /// Episodes flagged as missing subtitles (full list, unbounded page)
    async fn wanted_episodes(&self) -> Result<WantedPage<WantedEpisode>>;

    /// Current subtitle list for one movie or episode
    async fn subtitles(&self, item: &WantedItem) -> Result<Vec<Subtitle>>;

    /// Ask the service to search for and download a subtitle in `language`
    async fn request_download(&self, item: &WantedItem, language: &str) -> Result<()>;

    /// Ask the service to machine-translate the subtitle at `path` into
    /// `target_language`
    async fn request_translation(
        &self,
        item: &WantedItem,
        path: &str,
        target_language: &str,
    ) -> Result<()>;
}
