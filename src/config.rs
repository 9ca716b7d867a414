use std::{env::VarError, net::SocketAddr, path::PathBuf};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub tmdb_image_base_url: String,
    pub omdb_api_key: String,
    pub omdb_base_url: String,
    pub tmdb_rps: u32,
    pub max_concurrent: usize,
    /// ISO 3166-1 region used for watch providers and digital release dates.
    pub watch_region: String,
    pub discover_language: String,
    pub platforms_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key))
    }

    fn from_vars(var: impl Fn(&str) -> Result<String, VarError>) -> anyhow::Result<Self> {
        let host = var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = var("PORT").unwrap_or_else(|_| "5001".to_string()).parse().context("PORT")?;

        let database_url =
            var("DATABASE_URL").unwrap_or_else(|_| "sqlite://ott_radar.db?mode=rwc".to_string());

        let tmdb_api_key = var("TMDB_API_KEY").unwrap_or_default();
        let tmdb_base_url =
            var("TMDB_BASE_URL").unwrap_or_else(|_| "https://api.themoviedb.org/3".to_string());
        let tmdb_image_base_url =
            var("TMDB_IMAGE_BASE_URL").unwrap_or_else(|_| "https://image.tmdb.org/t/p".to_string());

        let omdb_api_key = var("OMDB_API_KEY").unwrap_or_default();
        let omdb_base_url =
            var("OMDB_BASE_URL").unwrap_or_else(|_| "https://www.omdbapi.com".to_string());

        let tmdb_rps: u32 = match var("TMDB_RPS") {
            Ok(s) => s.parse().context("TMDB_RPS")?,
            Err(_) => 4,
        };

        let max_concurrent: usize = match var("MAX_CONCURRENT_REQUESTS") {
            Ok(s) => s.parse().context("MAX_CONCURRENT_REQUESTS")?,
            Err(_) => 5,
        };

        let watch_region = var("WATCH_REGION")
            .map(|s| s.trim().to_uppercase())
            .unwrap_or_else(|_| "IN".to_string());

        let discover_language = var("DISCOVER_LANGUAGE").unwrap_or_else(|_| "te".to_string());

        let platforms_file =
            var("PLATFORMS_FILE").ok().filter(|s| !s.trim().is_empty()).map(PathBuf::from);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            tmdb_api_key,
            tmdb_base_url,
            tmdb_image_base_url,
            omdb_api_key,
            omdb_base_url,
            tmdb_rps,
            max_concurrent,
            watch_region,
            discover_language,
            platforms_file,
        })
    }
}
