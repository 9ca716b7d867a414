use std::path::Path;

use anyhow::Context;
use futures::{StreamExt, stream};
use jiff::civil::Date;
use tracing::{debug, info, warn};

use crate::{
    countdown,
    error::AppResult,
    models::{AvailabilityStatus, Movie},
    omdb::OmdbClient,
    platforms::PlatformRegistry,
    store::MovieStore,
    tmdb::TmdbClient,
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct JobReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl JobReport {
    fn record(&mut self, ok: bool) {
        self.processed += 1;
        if ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

pub async fn discover(
    store: &MovieStore,
    tmdb: &TmdbClient,
    year: i16,
    language: &str,
    pages: u32,
    today: Date,
) -> AppResult<JobReport> {
    let mut report = JobReport::default();

    for page in 1..=pages.max(1) {
        let found = tmdb.discover(year, language, page).await?;
        debug!(page = page, results = found.len(), "discover page fetched");
        if found.is_empty() {
            break;
        }

        for movie in found {
            let status = countdown::availability(movie.release_date, today);
            match store.upsert_discovered(&movie, status).await {
                Ok(()) => report.record(true),
                Err(err) => {
                    warn!(tmdb_id = movie.tmdb_id, error = %err, "failed to store movie");
                    report.record(false);
                },
            }
        }
    }

    info!(year = year, language = %language, ?report, "discovery finished");
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
pub async fn enrich(
    store: &MovieStore,
    tmdb: &TmdbClient,
    omdb: &OmdbClient,
    registry: &PlatformRegistry,
    region: &str,
    limit: u64,
    max_concurrent: usize,
    today: Date,
) -> AppResult<JobReport> {
    let movies = store.needing_enrichment(limit).await?;
    debug!(candidates = movies.len(), "movies needing enrichment");

    let outcomes: Vec<bool> = stream::iter(movies)
        .map(|movie| async move {
            debug!(tmdb_id = movie.tmdb_id, title = %movie.title, "enriching movie");
            let result: AppResult<bool> = async {
                let mut patch = tmdb.details(movie.tmdb_id, region, registry).await?;
                if let Err(err) = omdb.refine(&mut patch).await {
                    warn!(tmdb_id = movie.tmdb_id, error = %err, "OMDb lookup failed");
                }
                store.apply_enrichment(movie.tmdb_id, &patch, today).await
            }
            .await;

            match result {
                Ok(updated) => updated,
                Err(err) => {
                    warn!(tmdb_id = movie.tmdb_id, error = %err, "failed to enrich movie");
                    false
                },
            }
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    let mut report = JobReport::default();
    for ok in outcomes {
        report.record(ok);
    }

    info!(?report, "enrichment finished");
    Ok(report)
}

/// Flips upcoming titles whose release date has arrived to available.
pub async fn check_availability(store: &MovieStore, today: Date) -> AppResult<JobReport> {
    let upcoming = store.upcoming().await?;

    let released: Vec<i32> = upcoming
        .iter()
        .filter(|m| countdown::availability(m.release_date, today) == AvailabilityStatus::Available)
        .map(|m| m.id)
        .collect();

    let flipped = store.set_status(&released, AvailabilityStatus::Available).await?;

    let report = JobReport {
        processed: upcoming.len(),
        succeeded: flipped as usize,
        failed: released.len().saturating_sub(flipped as usize),
    };
    info!(today = %today, ?report, "availability check finished");
    Ok(report)
}

pub async fn export(store: &MovieStore, path: &Path) -> anyhow::Result<JobReport> {
    let movies = store.all().await?;
    let json = serde_json::to_string_pretty(&movies)?;
    tokio::fs::write(path, json).await.with_context(|| format!("writing {}", path.display()))?;

    let report = JobReport { processed: movies.len(), succeeded: movies.len(), failed: 0 };
    info!(path = %path.display(), ?report, "export finished");
    Ok(report)
}

pub async fn import(store: &MovieStore, path: &Path) -> anyhow::Result<JobReport> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let movies: Vec<Movie> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    let mut report = JobReport::default();
    for movie in &movies {
        match store.restore(movie).await {
            Ok(()) => report.record(true),
            Err(err) => {
                warn!(tmdb_id = movie.tmdb_id, error = %err, "failed to restore movie");
                report.record(false);
            },
        }
    }

    info!(path = %path.display(), ?report, "import finished");
    Ok(report)
}

/// Records a direct link for one platform. An empty `url` clears it.
pub async fn set_link(
    store: &MovieStore,
    registry: &PlatformRegistry,
    tmdb_id: i32,
    platform_id: &str,
    url: &str,
) -> anyhow::Result<()> {
    let platform = registry
        .get(platform_id)
        .with_context(|| format!("unknown platform `{platform_id}`"))?;

    let url = url.trim();
    if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) {
        anyhow::bail!("direct link must be an http(s) URL");
    }

    if !store.set_direct_link(tmdb_id, &platform.link_key, url).await? {
        anyhow::bail!("no movie with TMDB id {tmdb_id}");
    }

    info!(tmdb_id, platform = %platform.id, cleared = url.is_empty(), "direct link updated");
    Ok(())
}
