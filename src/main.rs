mod config;
mod countdown;
mod db;
mod entities;
mod error;
mod jobs;
mod links;
mod models;
mod omdb;
mod platforms;
mod routes;
mod store;
mod tmdb;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;

use crate::{
    config::Config, omdb::OmdbClient, platforms::PlatformRegistry, store::MovieStore,
    tmdb::TmdbClient,
};

const USAGE: &str = "usage: ott-radar [serve | discover [YEAR] [PAGES] | enrich [LIMIT] | \
check-availability | export PATH | import PATH | set-link TMDB_ID PLATFORM URL]";

#[derive(Clone)]
pub struct AppState {
    pub store: MovieStore,
    pub registry: Arc<PlatformRegistry>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,ott_radar=debug,sqlx=warn".into()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let registry = match &config.platforms_file {
        Some(path) => PlatformRegistry::load(path)
            .with_context(|| format!("loading platform table {}", path.display()))?,
        None => PlatformRegistry::builtin(),
    };
    tracing::debug!(platforms = registry.platforms().len(), "platform registry loaded");
    let registry = Arc::new(registry);

    let db = db::connect_and_migrate(&config.database_url).await.context("database")?;
    let store = MovieStore::new(db);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("serve");
    let arg = |i: usize| args.get(i).map(String::as_str);

    match command {
        "serve" => serve(config, store, registry).await,
        "discover" => {
            let today = countdown::today();
            let year = match arg(1) {
                Some(y) => y.parse().context("YEAR")?,
                None => today.year(),
            };
            let pages = match arg(2) {
                Some(p) => p.parse().context("PAGES")?,
                None => 1,
            };
            let tmdb = tmdb_client(&config)?;
            jobs::discover(&store, &tmdb, year, &config.discover_language, pages, today)
                .await
                .context("discover")?;
            Ok(())
        },
        "enrich" => {
            let limit = match arg(1) {
                Some(l) => l.parse().context("LIMIT")?,
                None => 200,
            };
            let http = http_client()?;
            let tmdb = tmdb_client_with(&config, http.clone());
            let omdb =
                OmdbClient::new(http, config.omdb_api_key.clone(), config.omdb_base_url.clone());
            jobs::enrich(
                &store,
                &tmdb,
                &omdb,
                &registry,
                &config.watch_region,
                limit,
                config.max_concurrent,
                countdown::today(),
            )
            .await
            .context("enrich")?;
            Ok(())
        },
        "check-availability" => {
            jobs::check_availability(&store, countdown::today())
                .await
                .context("check-availability")?;
            Ok(())
        },
        "export" => {
            let path = arg(1).map(PathBuf::from).context(USAGE)?;
            jobs::export(&store, &path).await?;
            Ok(())
        },
        "import" => {
            let path = arg(1).map(PathBuf::from).context(USAGE)?;
            jobs::import(&store, &path).await?;
            Ok(())
        },
        "set-link" => {
            let (Some(tmdb_id), Some(platform), Some(url)) = (arg(1), arg(2), arg(3)) else {
                anyhow::bail!(USAGE);
            };
            let tmdb_id: i32 = tmdb_id.parse().context("TMDB_ID")?;
            jobs::set_link(&store, &registry, tmdb_id, platform, url).await
        },
        other => anyhow::bail!("unknown command `{other}`\n{USAGE}"),
    }
}

async fn serve(
    config: Arc<Config>,
    store: MovieStore,
    registry: Arc<PlatformRegistry>,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState { store, registry });
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn http_client() -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent("ott-radar/0.1")
        .timeout(Duration::from_secs(30))
        .build()?)
}

fn tmdb_client(config: &Config) -> anyhow::Result<TmdbClient> {
    Ok(tmdb_client_with(config, http_client()?))
}

fn tmdb_client_with(config: &Config, http: reqwest::Client) -> TmdbClient {
    TmdbClient::new(
        http,
        config.tmdb_api_key.clone(),
        config.tmdb_base_url.clone(),
        config.tmdb_image_base_url.clone(),
        config.tmdb_rps,
    )
}
