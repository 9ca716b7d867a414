use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState,
    countdown::{self, compute_countdown},
    error::{AppError, AppResult},
    links::resolve_links,
    models::{Category, Movie, MovieCard, MovieDetail, MovieFilter},
    platforms::Platform,
    store::MovieStore,
};

const HOME_SECTION_SIZE: u64 = 12;
const DEFAULT_LIMIT: u64 = 24;
const MAX_LIMIT: u64 = 100;
const MIN_QUERY_CHARS: usize = 2;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/api/search", get(search))
        .route("/api/movies/{category}", get(category))
        .route("/api/filter", get(filter))
        .route("/api/movie/{tmdb_id}", get(movie_detail))
        .route("/api/platforms", get(platforms))
        .route("/api/stats", get(stats))
        .route("/out", get(outbound))
        .route("/health", get(health))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn card(movie: Movie, today: jiff::civil::Date) -> MovieCard {
    MovieCard {
        countdown: compute_countdown(movie.release_date, today),
        tmdb_id: movie.tmdb_id,
        title: movie.title,
        poster: movie.poster,
        rating: movie.rating,
        status: movie.status,
        platforms: movie.platforms,
        youtube_trailer_id: movie.youtube_trailer_id,
    }
}

fn cards(movies: Vec<Movie>, today: jiff::civil::Date) -> Vec<MovieCard> {
    movies.into_iter().map(|m| card(m, today)).collect()
}

#[derive(Debug, Serialize)]
pub struct Home {
    upcoming: Vec<MovieCard>,
    new_on_ott: Vec<MovieCard>,
    trending: Vec<MovieCard>,
    hidden_gems: Vec<MovieCard>,
    free: Vec<MovieCard>,
}

pub async fn home(State(state): State<Arc<AppState>>) -> AppResult<Json<Home>> {
    let today = countdown::today();
    let store = &state.store;

    Ok(Json(Home {
        upcoming: section(store, Category::Upcoming, today).await?,
        new_on_ott: section(store, Category::NewOnOtt, today).await?,
        trending: section(store, Category::Trending, today).await?,
        hidden_gems: section(store, Category::HiddenGems, today).await?,
        free: section(store, Category::Free, today).await?,
    }))
}

async fn section(
    store: &MovieStore,
    category: Category,
    today: jiff::civil::Date,
) -> AppResult<Vec<MovieCard>> {
    Ok(cards(store.list(category, today, HOME_SECTION_SIZE).await?, today))
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct PageQuery {
    page: Option<u64>,
    limit: Option<u64>,
}

impl PageQuery {
    /// 1-based page number, clamped page size, and row offset.
    fn resolve(self) -> (u64, u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        (page, per_page, (page - 1).saturating_mul(per_page))
    }
}

/// One page of cards plus the total number of matches.
#[derive(Debug, Serialize)]
pub struct Paged {
    total: u64,
    page: u64,
    per_page: u64,
    has_more: bool,
    results: Vec<MovieCard>,
}

impl Paged {
    fn empty(page: u64, per_page: u64) -> Self {
        Self { total: 0, page, per_page, has_more: false, results: Vec::new() }
    }

    fn new((movies, total): (Vec<Movie>, u64), page: u64, per_page: u64) -> Self {
        Self {
            total,
            page,
            per_page,
            has_more: page.saturating_mul(per_page) < total,
            results: cards(movies, countdown::today()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    query: String,
    #[serde(flatten)]
    paged: Paged,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
    Query(paging): Query<PageQuery>,
) -> AppResult<Json<SearchResults>> {
    let query = params.q.trim().to_string();
    let (page, per_page, offset) = paging.resolve();
    if query.chars().count() < MIN_QUERY_CHARS {
        return Ok(Json(SearchResults { query, paged: Paged::empty(page, per_page) }));
    }

    let found = state.store.search(&query, per_page, offset).await?;
    Ok(Json(SearchResults { paged: Paged::new(found, page, per_page), query }))
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    /// Comma-separated language codes; any may match.
    lang: Option<String>,
    genre: Option<String>,
    /// Comma-separated platform ids; all must match.
    platform: Option<String>,
    min_rating: Option<f64>,
    year_from: Option<i16>,
    year_to: Option<i16>,
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl From<FilterQuery> for MovieFilter {
    fn from(q: FilterQuery) -> Self {
        MovieFilter {
            languages: split_list(q.lang.as_deref()),
            genre: q.genre.filter(|g| !g.trim().is_empty()),
            platforms: split_list(q.platform.as_deref()),
            min_rating: q.min_rating.filter(|r| *r > 0.0),
            year_from: q.year_from,
            year_to: q.year_to,
        }
    }
}

pub async fn filter(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
    Query(paging): Query<PageQuery>,
) -> AppResult<Json<Paged>> {
    let (page, per_page, offset) = paging.resolve();
    let found = state.store.filter(&MovieFilter::from(params), per_page, offset).await?;
    Ok(Json(Paged::new(found, page, per_page)))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<u64>,
}

pub async fn category(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Vec<MovieCard>>> {
    let category = Category::from_slug(&slug)
        .ok_or_else(|| AppError::not_found(format!("unknown category `{slug}`")))?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let today = countdown::today();
    Ok(Json(cards(state.store.list(category, today, limit).await?, today)))
}

pub async fn movie_detail(
    State(state): State<Arc<AppState>>,
    Path(tmdb_id): Path<i32>,
) -> AppResult<Json<MovieDetail>> {
    let movie = state
        .store
        .get_by_tmdb_id(tmdb_id)
        .await?
        .filter(|m| m.is_active)
        .ok_or_else(|| AppError::not_found(format!("movie {tmdb_id} not found")))?;

    let links = resolve_links(&state.registry, &movie);
    let countdown = compute_countdown(movie.release_date, countdown::today());
    Ok(Json(MovieDetail { movie, links, countdown }))
}

#[derive(Debug, Serialize)]
pub struct PlatformInfo<'a> {
    id: &'a str,
    display_name: &'a str,
    base_url: &'a str,
    search_url_template: &'a str,
}

impl<'a> From<&'a Platform> for PlatformInfo<'a> {
    fn from(p: &'a Platform) -> Self {
        Self {
            id: &p.id,
            display_name: &p.display_name,
            base_url: p.base_url(),
            search_url_template: &p.search_url_template,
        }
    }
}

pub async fn platforms(State(state): State<Arc<AppState>>) -> Response {
    let platforms: Vec<PlatformInfo<'_>> =
        state.registry.platforms().iter().map(Into::into).collect();
    Json(platforms).into_response()
}

#[derive(Debug, Serialize)]
pub struct PlatformStat {
    platform_id: String,
    display_name: Option<String>,
    count: u64,
}

pub async fn stats(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<PlatformStat>>> {
    let counts = state.store.platform_counts().await?;
    Ok(Json(
        counts
            .into_iter()
            .map(|(platform_id, count)| PlatformStat {
                display_name: state.registry.get(&platform_id).map(|p| p.display_name.clone()),
                platform_id,
                count,
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct OutQuery {
    url: Option<String>,
    platform: Option<String>,
    movie_id: Option<i32>,
}

/// Logs an outbound click and redirects. Only absolute http(s) targets are followed.
pub async fn outbound(Query(params): Query<OutQuery>) -> AppResult<Response> {
    let url = params.url.unwrap_or_default();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(AppError::not_found("no outbound link"));
    }

    tracing::info!(
        platform = params.platform.as_deref().unwrap_or("unknown"),
        movie_id = ?params.movie_id,
        url = %url,
        "outbound click"
    );
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.store.ping().await {
        Ok(()) => Json(json!({ "status": "healthy", "db": "connected" })).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "unhealthy", "db": "disconnected", "error": err.to_string() })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        models::AvailabilityStatus,
        platforms::PlatformRegistry,
        store::tests::{discovered, memory_store},
    };

    async fn app() -> (Router, MovieStore) {
        let store = memory_store().await;
        let state = Arc::new(AppState {
            store: store.clone(),
            registry: Arc::new(PlatformRegistry::builtin()),
        });
        (router(state), store)
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap()).await.unwrap()
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn detail_includes_resolved_links_in_registry_order() {
        let (app, store) = app().await;
        let zee5_url = "https://www.zee5.com/movies/details/hanu-man/0-0-1";
        let upcoming = AvailabilityStatus::Upcoming;
        store.upsert_discovered(&discovered(42, "Hanu Man", None), upcoming).await.unwrap();
        store.set_direct_link(42, "zee5", zee5_url).await.unwrap();

        let resp = get(app, "/api/movie/42").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;

        assert_eq!(body["title"], "Hanu Man");
        assert_eq!(body["countdown"]["label"], "TBA");
        assert!(body["countdown"]["days_remaining"].is_null());

        let links = body["links"].as_array().unwrap();
        assert_eq!(links.len(), PlatformRegistry::builtin().platforms().len());
        assert_eq!(links[0]["platform_id"], "netflix");
        assert_eq!(links[0]["url"], "https://www.netflix.com/search?q=Hanu%20Man");
        assert_eq!(links[0]["is_direct"], false);
        let zee5 = links.iter().find(|l| l["platform_id"] == "zee5").unwrap();
        assert_eq!(zee5["is_direct"], true);
        assert_eq!(zee5["url"], zee5_url);
    }

    #[tokio::test]
    async fn unknown_movie_and_category_are_not_found() {
        let (app, _) = app().await;
        assert_eq!(get(app.clone(), "/api/movie/1").await.status(), StatusCode::NOT_FOUND);

        let resp = get(app, "/api/movies/classics").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(resp).await["error"], "unknown category `classics`");
    }

    #[tokio::test]
    async fn outbound_redirects_only_to_http_urls() {
        let (app, _) = app().await;
        let uri = "/out?url=https%3A%2F%2Fwww.netflix.com%2Ftitle%2F1&platform=netflix";
        let resp = get(app.clone(), uri).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers()[header::LOCATION], "https://www.netflix.com/title/1");

        let script = get(app.clone(), "/out?url=javascript%3Aalert(1)").await;
        assert_eq!(script.status(), StatusCode::NOT_FOUND);
        assert_eq!(get(app, "/out").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn search_pages_report_the_full_match_count() {
        let (app, store) = app().await;
        let upcoming = AvailabilityStatus::Upcoming;
        for (id, title) in [(1, "Pushpa: The Rise"), (2, "Pushpa 2: The Rule"), (9, "Ka")] {
            store.upsert_discovered(&discovered(id, title, None), upcoming).await.unwrap();
        }

        let body = json_body(get(app.clone(), "/api/search?q=K").await).await;
        assert_eq!(body["total"], 0);
        assert_eq!(body["has_more"], false);

        let body = json_body(get(app.clone(), "/api/search?q=ka").await).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["results"][0]["tmdb_id"], 9);

        let body = json_body(get(app.clone(), "/api/search?q=pushpa&limit=1").await).await;
        assert_eq!(body["query"], "pushpa");
        assert_eq!(body["total"], 2);
        assert_eq!(body["per_page"], 1);
        assert_eq!(body["has_more"], true);
        assert_eq!(body["results"].as_array().unwrap().len(), 1);

        let body = json_body(get(app, "/api/search?q=pushpa&limit=1&page=2").await).await;
        assert_eq!(body["page"], 2);
        assert_eq!(body["has_more"], false);
        assert_eq!(body["results"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn filter_applies_comma_separated_facets() {
        let (app, store) = app().await;
        let rows = [
            (1, "te", "Action", vec!["netflix", "aha"]),
            (2, "ta", "Drama", vec!["aha"]),
            (3, "hi", "Action", vec!["netflix"]),
        ];
        for (id, language, genres, platforms) in rows {
            let movie: Movie = serde_json::from_value(serde_json::json!({
                "tmdb_id": id,
                "title": format!("Movie {id}"),
                "language": language,
                "genres": genres,
                "platforms": platforms,
                "rating": 7.0,
            }))
            .unwrap();
            store.restore(&movie).await.unwrap();
        }

        let ids = |body: Value| -> Vec<i64> {
            let results = body["results"].as_array().unwrap();
            let mut ids: Vec<i64> =
                results.iter().map(|r| r["tmdb_id"].as_i64().unwrap()).collect();
            ids.sort();
            ids
        };

        let body = json_body(get(app.clone(), "/api/filter?lang=te,ta").await).await;
        assert_eq!(body["total"], 2);
        assert_eq!(ids(body), [1, 2]);

        let body = json_body(get(app.clone(), "/api/filter?platform=netflix,aha").await).await;
        assert_eq!(ids(body), [1]);

        let body = json_body(get(app.clone(), "/api/filter?genre=action&lang=").await).await;
        assert_eq!(ids(body), [1, 3]);

        let body = json_body(get(app, "/api/filter?min_rating=7.5").await).await;
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn free_category_is_served() {
        let (app, _) = app().await;
        let resp = get(app.clone(), "/api/movies/free").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await, serde_json::json!([]));

        let home = json_body(get(app, "/").await).await;
        assert!(home["free"].is_array());
    }

    #[tokio::test]
    async fn health_reports_database_connectivity() {
        let (app, _) = app().await;
        let resp = get(app, "/health").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["status"], "healthy");
    }
}
