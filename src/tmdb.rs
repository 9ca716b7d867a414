use std::{collections::HashMap, num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use jiff::civil::Date;
use serde::Deserialize;

use crate::{
    countdown::parse_release_date,
    error::AppResult,
    models::{DiscoveredMovie, Enrichment},
    platforms::PlatformRegistry,
};

/// TMDB release type for digital releases; physical and TV follow it.
const DIGITAL_RELEASE_TYPE: i32 = 4;

pub struct TmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    image_base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        base_url: String,
        image_base_url: String,
        rps: u32,
    ) -> Self {
        if api_key.trim().is_empty() {
            tracing::warn!("Using mock TMDB data - no TMDB_API_KEY provided");
        }

        let quota = Quota::per_second(NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN));
        let limiter = Arc::new(RateLimiter::direct(quota));
        Self { client, api_key, base_url, image_base_url, limiter }
    }

    fn is_mock(&self) -> bool {
        self.api_key.trim().is_empty()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn image(&self, size: &str, path: Option<&str>) -> Option<String> {
        let path = path.map(str::trim).filter(|p| !p.is_empty())?;
        Some(format!("{}/{}{}", self.image_base_url.trim_end_matches('/'), size, path))
    }

    pub async fn discover(
        &self,
        year: i16,
        language: &str,
        page: u32,
    ) -> AppResult<Vec<DiscoveredMovie>> {
        if self.is_mock() {
            return Ok(mock_discover(year, language, page));
        }

        self.limiter.until_ready().await;

        let resp: DiscoverResponse = self
            .client
            .get(self.url("discover/movie"))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("with_original_language", language),
                ("sort_by", "popularity.desc"),
            ])
            .query(&[("primary_release_year", i32::from(year)), ("page", page as i32)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp
            .results
            .into_iter()
            .map(|m| DiscoveredMovie {
                tmdb_id: m.id,
                poster: self.image("w500", m.poster_path.as_deref()),
                title: m.title,
                overview: m.overview.filter(|o| !o.trim().is_empty()),
                release_date: m.release_date.as_deref().and_then(parse_release_date),
                rating: m.vote_average,
                popularity: m.popularity,
                language: m.original_language,
            })
            .collect())
    }

    pub async fn details(
        &self,
        tmdb_id: i32,
        region: &str,
        registry: &PlatformRegistry,
    ) -> AppResult<Enrichment> {
        if self.is_mock() {
            return Ok(mock_enrichment(tmdb_id));
        }

        self.limiter.until_ready().await;

        let resp: MovieDetails = self
            .client
            .get(self.url(&format!("movie/{tmdb_id}")))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("append_to_response", "external_ids,videos,watch/providers,release_dates"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(self.to_enrichment(resp, region, registry))
    }

    fn to_enrichment(
        &self,
        details: MovieDetails,
        region: &str,
        registry: &PlatformRegistry,
    ) -> Enrichment {
        let youtube: Vec<&Video> = details
            .videos
            .results
            .iter()
            .filter(|v| v.site.eq_ignore_ascii_case("YouTube"))
            .collect();
        let trailer = youtube
            .iter()
            .find(|v| v.type_ == "Trailer")
            .or_else(|| youtube.first())
            .map(|v| v.key.clone());

        let mut platforms: Vec<String> = Vec::new();
        if let Some(offers) = details.watch_providers.results.get(region) {
            for provider in &offers.flatrate {
                match registry.match_provider(&provider.provider_name) {
                    Some(platform) if !platforms.contains(&platform.id) => {
                        platforms.push(platform.id.clone())
                    },
                    Some(_) => {},
                    None => {
                        tracing::debug!(provider = %provider.provider_name, "unmapped provider")
                    },
                }
            }
        }

        let ott_release_date = earliest_digital_release(&details.release_dates, region);
        let genres = details.genres.iter().map(|g| g.name.as_str()).collect::<Vec<_>>().join(", ");

        Enrichment {
            overview: details.overview.filter(|o| !o.trim().is_empty()),
            poster: self.image("w500", details.poster_path.as_deref()),
            backdrop: self.image("original", details.backdrop_path.as_deref()),
            release_date: details.release_date.as_deref().and_then(parse_release_date),
            ott_release_date,
            rating: Some(details.vote_average),
            popularity: Some(details.popularity),
            genres: (!genres.is_empty()).then_some(genres),
            runtime: details.runtime.filter(|r| *r > 0),
            certification: None,
            imdb_id: details.external_ids.imdb_id.filter(|id| !id.trim().is_empty()),
            youtube_trailer_id: trailer,
            platforms,
        }
    }
}

fn earliest_digital_release(release_dates: &ReleaseDatesResponse, region: &str) -> Option<Date> {
    release_dates
        .results
        .iter()
        .filter(|c| c.iso_3166_1 == region)
        .flat_map(|c| c.release_dates.iter())
        .filter(|rd| rd.type_ >= DIGITAL_RELEASE_TYPE)
        .filter_map(|rd| parse_release_date(&rd.release_date))
        .min()
}

fn mock_discover(year: i16, language: &str, page: u32) -> Vec<DiscoveredMovie> {
    if page > 1 {
        return Vec::new();
    }
    let release = Date::new(year, 6, 1).ok();
    vec![
        DiscoveredMovie {
            tmdb_id: 900_001,
            title: "Mock Premiere".to_string(),
            overview: Some("Mock discovery result".to_string()),
            poster: None,
            release_date: release,
            rating: 7.5,
            popularity: 42.0,
            language: language.to_string(),
        },
        DiscoveredMovie {
            tmdb_id: 900_002,
            title: "Mock Sequel".to_string(),
            overview: None,
            poster: None,
            release_date: None,
            rating: 6.1,
            popularity: 12.0,
            language: language.to_string(),
        },
    ]
}

fn mock_enrichment(tmdb_id: i32) -> Enrichment {
    Enrichment {
        overview: Some(format!("Mock overview for {tmdb_id}")),
        youtube_trailer_id: Some("mock-trailer".to_string()),
        platforms: vec!["netflix".to_string()],
        ..Default::default()
    }
}

#[derive(Debug, Deserialize)]
struct DiscoverResponse {
    results: Vec<DiscoverMovie>,
}

#[derive(Debug, Deserialize)]
struct DiscoverMovie {
    id: i32,
    title: String,
    overview: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    popularity: f64,
    #[serde(default)]
    original_language: String,
}

#[derive(Debug, Deserialize)]
struct MovieDetails {
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    release_date: Option<String>,
    runtime: Option<i32>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    popularity: f64,
    #[serde(default)]
    genres: Vec<Genre>,
    #[serde(default)]
    external_ids: ExternalIds,
    #[serde(default)]
    videos: Videos,
    #[serde(rename = "watch/providers", default)]
    watch_providers: WatchProviders,
    #[serde(default)]
    release_dates: ReleaseDatesResponse,
}

#[derive(Debug, Deserialize)]
struct Genre {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Videos {
    results: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    key: String,
    site: String,
    #[serde(rename = "type")]
    type_: String,
}

#[derive(Debug, Default, Deserialize)]
struct WatchProviders {
    results: HashMap<String, RegionOffers>,
}

#[derive(Debug, Deserialize)]
struct RegionOffers {
    #[serde(default)]
    flatrate: Vec<Provider>,
}

#[derive(Debug, Deserialize)]
struct Provider {
    provider_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ReleaseDatesResponse {
    results: Vec<ReleaseDatesCountry>,
}

#[derive(Debug, Deserialize)]
struct ReleaseDatesCountry {
    iso_3166_1: String,
    release_dates: Vec<ReleaseDateEntry>,
}

#[derive(Debug, Deserialize)]
struct ReleaseDateEntry {
    release_date: String,
    #[serde(rename = "type")]
    type_: i32,
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    fn client(api_key: &str) -> TmdbClient {
        TmdbClient::new(
            reqwest::Client::new(),
            api_key.to_string(),
            "https://api.themoviedb.org/3/".to_string(),
            "https://image.tmdb.org/t/p".to_string(),
            0,
        )
    }

    const DETAILS: &str = r#"{
        "id": 811941,
        "title": "Devara: Part 1",
        "overview": "Devara, a fearless man...",
        "poster_path": "/poster.jpg",
        "backdrop_path": null,
        "release_date": "2024-09-27",
        "runtime": 177,
        "vote_average": 6.8,
        "popularity": 55.1,
        "genres": [{"id": 28, "name": "Action"}, {"id": 18, "name": "Drama"}],
        "external_ids": {"imdb_id": "tt11821912"},
        "videos": {"results": [
            {"key": "teaser1", "site": "YouTube", "type": "Teaser"},
            {"key": "trailer1", "site": "YouTube", "type": "Trailer"}
        ]},
        "watch/providers": {"results": {
            "IN": {"link": "https://www.themoviedb.org/movie/811941/watch?locale=IN",
                   "flatrate": [{"provider_id": 8, "provider_name": "Netflix", "logo_path": "/n.jpg"},
                                {"provider_id": 1796, "provider_name": "Netflix basic with Ads", "logo_path": "/n2.jpg"},
                                {"provider_id": 11, "provider_name": "MUBI", "logo_path": "/m.jpg"}]},
            "US": {"flatrate": [{"provider_id": 9, "provider_name": "Amazon Prime Video", "logo_path": "/p.jpg"}]}
        }},
        "release_dates": {"results": [
            {"iso_3166_1": "IN", "release_dates": [
                {"release_date": "2024-09-27T00:00:00.000Z", "type": 3, "note": ""},
                {"release_date": "2024-11-22T00:00:00.000Z", "type": 5, "note": ""},
                {"release_date": "2024-11-08T00:00:00.000Z", "type": 4, "note": ""}
            ]},
            {"iso_3166_1": "US", "release_dates": [
                {"release_date": "2024-10-01T00:00:00.000Z", "type": 4, "note": ""}
            ]}
        ]}
    }"#;

    #[test]
    fn details_map_onto_registry_platforms_for_the_region() {
        let details: MovieDetails = serde_json::from_str(DETAILS).unwrap();
        let e = client("key").to_enrichment(details, "IN", &PlatformRegistry::builtin());

        assert_eq!(e.platforms, ["netflix"]);
        assert_eq!(e.youtube_trailer_id.as_deref(), Some("trailer1"));
        assert_eq!(e.ott_release_date, Some(date(2024, 11, 8)));
        assert_eq!(e.release_date, Some(date(2024, 9, 27)));
        assert_eq!(e.genres.as_deref(), Some("Action, Drama"));
        assert_eq!(e.poster.as_deref(), Some("https://image.tmdb.org/t/p/w500/poster.jpg"));
        assert_eq!(e.backdrop, None);
        assert_eq!(e.imdb_id.as_deref(), Some("tt11821912"));
        assert_eq!(e.runtime, Some(177));
    }

    #[test]
    fn sparse_details_still_deserialize() {
        let details: MovieDetails =
            serde_json::from_str(r#"{"overview": "", "runtime": 0, "release_date": ""}"#).unwrap();
        let e = client("key").to_enrichment(details, "US", &PlatformRegistry::builtin());
        assert!(e.platforms.is_empty());
        assert_eq!(e.overview, None);
        assert_eq!(e.runtime, None);
        assert_eq!(e.release_date, None);
        assert_eq!(e.youtube_trailer_id, None);
    }

    #[tokio::test]
    async fn missing_api_key_serves_mock_data() {
        let tmdb = client("");
        let found = tmdb.discover(2026, "te", 1).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].release_date, Some(date(2026, 6, 1)));
        assert!(tmdb.discover(2026, "te", 2).await.unwrap().is_empty());

        let e = tmdb.details(900_001, "IN", &PlatformRegistry::builtin()).await.unwrap();
        assert_eq!(e.platforms, ["netflix"]);
    }
}
