use std::collections::BTreeMap;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::{countdown::Countdown, links::ResolvedLink};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    #[default]
    Upcoming,
    Available,
}

impl AvailabilityStatus {
    pub fn as_code(self) -> &'static str {
        match self {
            AvailabilityStatus::Upcoming => "upcoming",
            AvailabilityStatus::Available => "available",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "upcoming" => Some(AvailabilityStatus::Upcoming),
            "available" => Some(AvailabilityStatus::Available),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(default)]
    pub id: i32,
    pub tmdb_id: i32,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub backdrop: Option<String>,
    #[serde(default)]
    pub release_date: Option<Date>,
    #[serde(default)]
    pub ott_release_date: Option<Date>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub genres: String,
    #[serde(default)]
    pub runtime: i32,
    #[serde(default)]
    pub certification: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub youtube_trailer_id: Option<String>,
    #[serde(default)]
    pub status: AvailabilityStatus,
    /// Registry ids of the platforms currently streaming this title.
    #[serde(default)]
    pub platforms: Vec<String>,
    /// Platform link key to a stored direct URL.
    #[serde(default)]
    pub direct_links: BTreeMap<String, String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Movie {
    /// The stored direct link under `key`, if it holds anything usable.
    pub fn direct_link(&self, key: &str) -> Option<&str> {
        self.direct_links.get(key).map(|url| url.trim()).filter(|url| !url.is_empty())
    }
}

/// A row from TMDB discovery, before enrichment.
#[derive(Clone, Debug)]
pub struct DiscoveredMovie {
    pub tmdb_id: i32,
    pub title: String,
    pub overview: Option<String>,
    pub poster: Option<String>,
    pub release_date: Option<Date>,
    pub rating: f64,
    pub popularity: f64,
    pub language: String,
}

/// Metadata gathered for a single title by the enrichment job. `None` fields
/// leave the stored value untouched; `platforms` always replaces the stored list.
#[derive(Clone, Debug, Default)]
pub struct Enrichment {
    pub overview: Option<String>,
    pub poster: Option<String>,
    pub backdrop: Option<String>,
    pub release_date: Option<Date>,
    pub ott_release_date: Option<Date>,
    pub rating: Option<f64>,
    pub popularity: Option<f64>,
    pub genres: Option<String>,
    pub runtime: Option<i32>,
    pub certification: Option<String>,
    pub imdb_id: Option<String>,
    pub youtube_trailer_id: Option<String>,
    pub platforms: Vec<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Category {
    Upcoming,
    NewOnOtt,
    Trending,
    HiddenGems,
    Free,
}

impl Category {
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "upcoming" => Some(Category::Upcoming),
            "new-on-ott" => Some(Category::NewOnOtt),
            "trending" => Some(Category::Trending),
            "hidden-gems" => Some(Category::HiddenGems),
            "free" => Some(Category::Free),
            _ => None,
        }
    }
}

/// Faceted browse criteria. Empty facets match everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovieFilter {
    /// Any of these language codes.
    pub languages: Vec<String>,
    pub genre: Option<String>,
    /// Every one of these platform ids.
    pub platforms: Vec<String>,
    pub min_rating: Option<f64>,
    pub year_from: Option<i16>,
    pub year_to: Option<i16>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieCard {
    pub tmdb_id: i32,
    pub title: String,
    pub poster: Option<String>,
    pub rating: f64,
    pub status: AvailabilityStatus,
    pub platforms: Vec<String>,
    pub youtube_trailer_id: Option<String>,
    pub countdown: Countdown,
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub movie: Movie,
    pub links: Vec<ResolvedLink>,
    pub countdown: Countdown,
}
