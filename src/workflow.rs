use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::api::SubtitleProvider;
use crate::config::TranslateConfig;
use crate::error::Result;
use crate::models::{Subtitle, WantedItem};
use crate::retry::Sleeper;

/// Machine translation source when the preferred language is unavailable
const FALLBACK_LANGUAGE: &str = "en";

/// Orchestrates the subtitle workflow for wanted movies and episodes. Holds
/// no state of its own: every decision reloads fresh data from the API.
pub struct Workflow {
    api: Arc<dyn SubtitleProvider>,
    sleeper: Arc<dyn Sleeper>,
    preferred_language: String,
    item_delay: Duration,
}

impl Workflow {
    pub fn new(
        api: Arc<dyn SubtitleProvider>,
        sleeper: Arc<dyn Sleeper>,
        config: &TranslateConfig,
    ) -> Self {
        Self {
            api,
            sleeper,
            preferred_language: config.preferred_language.clone(),
            item_delay: Duration::from_secs(config.delay_secs),
        }
    }

    /// One full pass: episodes first, then movies. Batch failures are
    /// logged and never abort the run.
    pub async fn run_all(&self) {
        if let Err(e) = self.run_episodes().await {
            error!("Episode subtitles run failed: {}", e);
        }
        if let Err(e) = self.run_movies().await {
            error!("Movie subtitles run failed: {}", e);
        }
    }

    pub async fn run_movies(&self) -> Result<()> {
        info!("Starting movie subtitles translation process...");
        let wanted = self.api.wanted_movies().await?;
        if wanted.total == 0 {
            info!("No movies found needing subtitles");
            return Ok(());
        }

        info!("Found {} movies needing subtitles", wanted.total);
        let items: Vec<WantedItem> = wanted.data.into_iter().map(WantedItem::from).collect();
        self.process_batch(&items).await;
        Ok(())
    }

    pub async fn run_episodes(&self) -> Result<()> {
        info!("Starting episode subtitles translation process...");
        let wanted = self.api.wanted_episodes().await?;
        if wanted.total == 0 {
            info!("No episodes found needing subtitles");
            return Ok(());
        }

        info!("Found {} episodes needing subtitles", wanted.total);
        let items: Vec<WantedItem> = wanted.data.into_iter().map(WantedItem::from).collect();
        self.process_batch(&items).await;
        Ok(())
    }

    /// Process items in API order, pacing with the configured delay between
    /// items (skipped after the last one). A failed item is logged and the
    /// batch continues.
    async fn process_batch(&self, items: &[WantedItem]) {
        for (index, item) in items.iter().enumerate() {
            if let Err(e) = self.process_item(item).await {
                warn!("Failed to process {} '{}': {}", item.kind().singular(), item.title(), e);
            }
            if !self.item_delay.is_zero() && index < items.len() - 1 {
                debug!("Waiting {}s before next item...", self.item_delay.as_secs());
                self.sleeper.sleep(self.item_delay).await;
            }
        }
    }

    /// Per-item state machine, terminal at the first satisfied branch:
    /// download preferred -> re-check -> fall back to English -> translate.
    async fn process_item(&self, item: &WantedItem) -> Result<()> {
        info!(
            "Processing {}: {} (ID: {})",
            item.kind().singular(),
            item.title(),
            item.media_id()
        );

        // Best effort: ask for the preferred language directly first
        info!(
            "Attempting to download {} subtitles...",
            self.preferred_language
        );
        if let Err(e) = self
            .api
            .request_download(item, &self.preferred_language)
            .await
        {
            warn!(
                "Download request for {} subtitles failed: {}",
                self.preferred_language, e
            );
        }

        info!("Checking current subtitles status...");
        let subtitles = self.api.subtitles(item).await?;
        info!("Found {} existing subtitles", subtitles.len());

        if subtitles
            .iter()
            .any(|s| s.is_downloaded(&self.preferred_language))
        {
            info!(
                "Found existing {} subtitles, skipping...",
                self.preferred_language
            );
            return Ok(());
        }

        info!("Looking for English subtitles...");
        let mut english = find_subtitle(&subtitles, FALLBACK_LANGUAGE);
        if english.is_none() {
            info!("No English subtitles found, attempting to download...");
            if let Err(e) = self.api.request_download(item, FALLBACK_LANGUAGE).await {
                warn!("English download request failed: {}", e);
            }
            match self.api.subtitles(item).await {
                Ok(refreshed) => {
                    english = find_subtitle(&refreshed, FALLBACK_LANGUAGE);
                    info!("English subtitles download completed");
                }
                Err(e) => warn!("Failed to re-check subtitles after download: {}", e),
            }
        }

        match english {
            Some(subtitle) => {
                // is_downloaded guarantees a non-empty path
                let path = subtitle.path.as_deref().unwrap_or_default();
                info!("Found English subtitles at: {}", path);
                info!(
                    "Attempting to translate from English to {}...",
                    self.preferred_language
                );
                self.api
                    .request_translation(item, path, &self.preferred_language)
                    .await?;
                info!("Translation requested for {}", item.title());
            }
            None => {
                error!("No English subtitles with valid path found or downloaded");
            }
        }

        Ok(())
    }
}

fn find_subtitle(subtitles: &[Subtitle], lang: &str) -> Option<Subtitle> {
    subtitles.iter().find(|s| s.is_downloaded(lang)).cloned()
}
