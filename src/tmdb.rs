use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    models::{MovieDetails, SearchCandidate},
};

/// Read access to the external movie metadata service.
#[async_trait::async_trait]
pub trait MetadataSource: Send + Sync {
    async fn search(&self, query: &str) -> AppResult<Vec<SearchCandidate>>;

    async fn details(&self, external_id: i64) -> AppResult<MovieDetails>;
}

pub struct TmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    language: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        base_url: String,
        language: String,
        rps: u32,
    ) -> Self {
        if api_key.trim().is_empty() {
            tracing::warn!("Using mock TMDB data - no TMDB_API_KEY provided");
        }

        let rps = NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));
        Self { client, api_key, base_url, language, limiter }
    }

    fn use_mock(&self) -> bool {
        self.api_key.trim().is_empty()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait::async_trait]
impl MetadataSource for TmdbClient {
    async fn search(&self, query: &str) -> AppResult<Vec<SearchCandidate>> {
        if self.use_mock() {
            return Ok(vec![SearchCandidate {
                id: MOCK_ID,
                original_title: MOCK_TITLE.to_string(),
                title: Some(MOCK_TITLE.to_string()),
                release_date: Some(MOCK_RELEASE.to_string()),
                poster_path: Some(MOCK_POSTER.to_string()),
                overview: Some(MOCK_OVERVIEW.to_string()),
            }]);
        }

        self.limiter.until_ready().await;
        debug!(query = %query, "searching TMDB");

        let resp: SearchResponse = self
            .client
            .get(self.url("search/movie"))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
                ("query", query),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(query = %query, results = resp.results.len(), "TMDB search finished");
        Ok(resp.results)
    }

    async fn details(&self, external_id: i64) -> AppResult<MovieDetails> {
        if self.use_mock() {
            return Ok(MovieDetails {
                original_title: MOCK_TITLE.to_string(),
                overview: MOCK_OVERVIEW.to_string(),
                poster_path: Some(MOCK_POSTER.to_string()),
                release_date: Some(MOCK_RELEASE.to_string()),
            });
        }

        self.limiter.until_ready().await;
        debug!(external_id, "fetching TMDB movie details");

        let details = self
            .client
            .get(self.url(&format!("movie/{external_id}")))
            .query(&[("api_key", self.api_key.as_str()), ("language", self.language.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(details)
    }
}

const MOCK_ID: i64 = 550;
const MOCK_TITLE: &str = "Fight Club";
const MOCK_OVERVIEW: &str = "An insomniac office worker and a soap salesman form an underground club.";
const MOCK_POSTER: &str = "/pB8BM7pdSp6B6Ih7QZ4DrQ3PmJK.jpg";
const MOCK_RELEASE: &str = "1999-10-15";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchCandidate>,
}

/// Joins the image base path and a poster path with exactly one slash.
pub fn poster_url(base: &str, poster_path: Option<&str>) -> String {
    match poster_path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(path) => format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/')),
        None => String::new(),
    }
}

/// Year portion of a `YYYY-MM-DD` release date.
pub fn release_year(release_date: Option<&str>) -> AppResult<i32> {
    let raw = release_date.unwrap_or_default();
    raw.split('-')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::ExternalApi(format!("unusable release date {raw:?}")))
}
