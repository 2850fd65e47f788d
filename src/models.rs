use serde::Deserialize;

/// The two media categories Bazarr tracks, mapped to their API spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Movies,
    Episodes,
}

impl MediaKind {
    /// Endpoint path segment ("movies" / "episodes")
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Movies => "movies",
            Self::Episodes => "episodes",
        }
    }

    /// Singular form used by the translate action and in log lines
    pub fn singular(&self) -> &'static str {
        match self {
            Self::Movies => "movie",
            Self::Episodes => "episode",
        }
    }
}

/// A page of wanted items as returned by `{movies,episodes}/wanted`
#[derive(Debug, Clone, Deserialize)]
pub struct WantedPage<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WantedMovie {
    pub radarr_id: u64,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WantedEpisode {
    pub sonarr_series_id: u64,
    pub sonarr_episode_id: u64,
    pub series_title: String,
    #[serde(default)]
    pub episode_title: Option<String>,
}

/// A single subtitle entry on a movie or episode. `path` is present only
/// when the subtitle file actually exists on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct Subtitle {
    #[serde(default)]
    pub code2: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub forced: bool,
    #[serde(default)]
    pub hi: bool,
}

impl Subtitle {
    /// True when this entry is in `lang` and has a usable file path.
    /// Forced and hearing-impaired variants are not distinguished.
    pub fn is_downloaded(&self, lang: &str) -> bool {
        self.code2 == lang && self.path.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Per-item detail record returned by `GET {movies,episodes}?...id[]=`
#[derive(Debug, Clone, Deserialize)]
pub struct MediaDetails {
    #[serde(default = "Vec::new")]
    pub subtitles: Vec<Subtitle>,
}

/// A wanted movie or episode, unified so the workflow and the API client
/// can share one code path. Owns the id-to-query-parameter mapping.
#[derive(Debug, Clone)]
pub enum WantedItem {
    Movie(WantedMovie),
    Episode(WantedEpisode),
}

impl WantedItem {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Movie(_) => MediaKind::Movies,
            Self::Episode(_) => MediaKind::Episodes,
        }
    }

    /// The id the translate action targets (Radarr movie id or Sonarr
    /// episode id).
    pub fn media_id(&self) -> u64 {
        match self {
            Self::Movie(movie) => movie.radarr_id,
            Self::Episode(episode) => episode.sonarr_episode_id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Movie(movie) => &movie.title,
            Self::Episode(episode) => &episode.series_title,
        }
    }

    /// Query parameters identifying this item on the download endpoint.
    pub fn id_params(&self) -> Vec<(String, String)> {
        match self {
            Self::Movie(movie) => {
                vec![("radarrid".to_string(), movie.radarr_id.to_string())]
            }
            Self::Episode(episode) => vec![
                ("seriesid".to_string(), episode.sonarr_series_id.to_string()),
                ("episodeid".to_string(), episode.sonarr_episode_id.to_string()),
            ],
        }
    }

    /// Same identifiers in the array form the info endpoint expects
    /// (`radarrid[]=`, `seriesid[]=`, `episodeid[]=`).
    pub fn lookup_params(&self) -> Vec<(String, String)> {
        self.id_params()
            .into_iter()
            .map(|(key, value)| (format!("{}[]", key), value))
            .collect()
    }
}

impl From<WantedMovie> for WantedItem {
    fn from(movie: WantedMovie) -> Self {
        Self::Movie(movie)
    }
}

impl From<WantedEpisode> for WantedItem {
    fn from(episode: WantedEpisode) -> Self {
        Self::Episode(episode)
    }
}
