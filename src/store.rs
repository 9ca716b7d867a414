use std::collections::BTreeMap;

use jiff::civil::Date;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, Statement,
    sea_query::{Expr, LikeExpr, OnConflict, SimpleExpr},
};
use tracing::warn;

use crate::{
    countdown::parse_release_date,
    entities::movie,
    error::AppResult,
    models::{AvailabilityStatus, Category, DiscoveredMovie, Enrichment, Movie, MovieFilter},
};

const NEW_ON_OTT_WINDOW_DAYS: i64 = 30;
/// Registry ids of platforms that stream without a subscription.
const FREE_PLATFORMS: [&str; 3] = ["youtube", "hotstar", "jiocinema"];

#[derive(Clone)]
pub struct MovieStore {
    db: DatabaseConnection,
}

impl MovieStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn ping(&self) -> AppResult<()> {
        let backend = self.db.get_database_backend();
        self.db.execute(Statement::from_string(backend, "SELECT 1".to_string())).await?;
        Ok(())
    }

    pub async fn get_by_tmdb_id(&self, tmdb_id: i32) -> AppResult<Option<Movie>> {
        let row = movie::Entity::find()
            .filter(movie::Column::TmdbId.eq(tmdb_id))
            .one(&self.db)
            .await?;
        Ok(row.map(into_movie))
    }

    /// Every whitespace-separated token must appear in the title. Returns one
    /// page of matches and the total match count.
    pub async fn search(
        &self,
        query: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<Movie>, u64)> {
        let tokens: Vec<&str> = query.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let mut cond = Condition::all().add(movie::Column::IsActive.eq(true));
        for token in tokens {
            cond = cond.add(contains_literal(movie::Column::Title, token));
        }

        let query = movie::Entity::find().filter(cond).order_by_desc(movie::Column::Popularity);
        self.page(query, limit, offset).await
    }

    /// Faceted browse, most popular first. Returns one page and the total count.
    pub async fn filter(
        &self,
        filter: &MovieFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<Movie>, u64)> {
        let mut cond = Condition::all().add(movie::Column::IsActive.eq(true));

        if !filter.languages.is_empty() {
            let any = filter.languages.iter().fold(Condition::any(), |c, lang| {
                c.add(movie::Column::Language.eq(lang.trim().to_lowercase()))
            });
            cond = cond.add(any);
        }
        if let Some(genre) = filter.genre.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            cond = cond.add(contains_literal(movie::Column::Genres, genre));
        }
        for platform in &filter.platforms {
            cond = cond.add(contains_literal(movie::Column::OttPlatforms, &quoted(platform)));
        }
        if let Some(min) = filter.min_rating {
            cond = cond.add(movie::Column::Rating.gte(min));
        }
        if let Some(year) = filter.year_from {
            cond = cond.add(movie::Column::ReleaseDate.gte(format!("{year:04}-01-01")));
        }
        if let Some(year) = filter.year_to {
            cond = cond.add(movie::Column::ReleaseDate.lte(format!("{year:04}-12-31")));
        }

        let query = movie::Entity::find().filter(cond).order_by_desc(movie::Column::Popularity);
        self.page(query, limit, offset).await
    }

    async fn page(
        &self,
        query: Select<movie::Entity>,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<Movie>, u64)> {
        let total = query.clone().count(&self.db).await?;
        let rows = query.offset(offset).limit(limit).all(&self.db).await?;
        Ok((rows.into_iter().map(into_movie).collect(), total))
    }

    pub async fn list(&self, category: Category, today: Date, limit: u64) -> AppResult<Vec<Movie>> {
        let today_str = today.to_string();
        let query = movie::Entity::find().filter(movie::Column::IsActive.eq(true));

        let query = match category {
            Category::Upcoming => query
                .filter(movie::Column::ReleaseDate.gt(today_str))
                .order_by_asc(movie::Column::ReleaseDate),
            Category::NewOnOtt => {
                let cutoff = today - jiff::Span::new().days(NEW_ON_OTT_WINDOW_DAYS);
                query
                    .filter(movie::Column::OttReleaseDate.gte(cutoff.to_string()))
                    .filter(movie::Column::OttReleaseDate.lte(today_str))
                    .filter(movie::Column::OttPlatforms.ne("[]"))
                    .order_by_desc(movie::Column::OttReleaseDate)
            },
            Category::Trending => query
                .filter(movie::Column::Rating.gte(6.5))
                .order_by_desc(movie::Column::Popularity),
            Category::HiddenGems => query
                .filter(movie::Column::Rating.gte(7.0))
                .filter(movie::Column::Popularity.gt(5.0))
                .filter(movie::Column::Popularity.lt(100.0))
                .order_by_desc(movie::Column::Rating),
            Category::Free => {
                let any = FREE_PLATFORMS.iter().fold(Condition::any(), |c, id| {
                    c.add(contains_literal(movie::Column::OttPlatforms, &quoted(id)))
                });
                query.filter(any).order_by_desc(movie::Column::Popularity)
            },
        };

        let rows = query.limit(limit).all(&self.db).await?;
        Ok(rows.into_iter().map(into_movie).collect())
    }

    pub async fn upsert_discovered(
        &self,
        found: &DiscoveredMovie,
        status: AvailabilityStatus,
    ) -> AppResult<()> {
        let now = now_sec();
        let model = movie::ActiveModel {
            id: Default::default(),
            tmdb_id: Set(found.tmdb_id),
            title: Set(found.title.clone()),
            overview: Set(found.overview.clone()),
            poster: Set(found.poster.clone()),
            backdrop: Set(None),
            release_date: Set(found.release_date.map(|d| d.to_string())),
            ott_release_date: Set(None),
            rating: Set(found.rating),
            popularity: Set(found.popularity),
            language: Set(found.language.clone()),
            genres: Set(String::new()),
            runtime: Set(0),
            certification: Set(None),
            imdb_id: Set(None),
            youtube_trailer_id: Set(None),
            status: Set(status.as_code().to_string()),
            ott_platforms: Set("[]".to_string()),
            direct_links: Set("{}".to_string()),
            is_active: Set(true),
            fetch_source: Set("tmdb".to_string()),
            last_checked: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        movie::Entity::insert(model)
            .on_conflict(
                OnConflict::column(movie::Column::TmdbId)
                    .update_columns([
                        movie::Column::Title,
                        movie::Column::ReleaseDate,
                        movie::Column::Rating,
                        movie::Column::Popularity,
                        movie::Column::Status,
                        movie::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        Ok(())
    }

    /// Active titles still missing an overview, a trailer, or any platform.
    pub async fn needing_enrichment(&self, limit: u64) -> AppResult<Vec<Movie>> {
        let incomplete = Condition::any()
            .add(movie::Column::Overview.is_null())
            .add(movie::Column::Overview.eq(""))
            .add(movie::Column::YoutubeTrailerId.is_null())
            .add(movie::Column::OttPlatforms.eq("[]"));

        let rows = movie::Entity::find()
            .filter(movie::Column::IsActive.eq(true))
            .filter(incomplete)
            .order_by_asc(movie::Column::LastChecked)
            .order_by_desc(movie::Column::Popularity)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(into_movie).collect())
    }

    pub async fn apply_enrichment(
        &self,
        tmdb_id: i32,
        patch: &Enrichment,
        today: Date,
    ) -> AppResult<bool> {
        let Some(row) = movie::Entity::find()
            .filter(movie::Column::TmdbId.eq(tmdb_id))
            .one(&self.db)
            .await?
        else {
            return Ok(false);
        };

        let release_date = patch
            .release_date
            .or_else(|| row.release_date.as_deref().and_then(parse_release_date));
        let status = crate::countdown::availability(release_date, today);
        let platforms = serde_json::to_string(&patch.platforms)?;

        let now = now_sec();
        let mut active: movie::ActiveModel = row.into();
        if let Some(v) = &patch.overview {
            active.overview = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.poster {
            active.poster = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.backdrop {
            active.backdrop = Set(Some(v.clone()));
        }
        if let Some(v) = release_date {
            active.release_date = Set(Some(v.to_string()));
        }
        if let Some(v) = patch.ott_release_date {
            active.ott_release_date = Set(Some(v.to_string()));
        }
        if let Some(v) = patch.rating {
            active.rating = Set(v);
        }
        if let Some(v) = patch.popularity {
            active.popularity = Set(v);
        }
        if let Some(v) = &patch.genres {
            active.genres = Set(v.clone());
        }
        if let Some(v) = patch.runtime {
            active.runtime = Set(v);
        }
        if let Some(v) = &patch.certification {
            active.certification = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.imdb_id {
            active.imdb_id = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.youtube_trailer_id {
            active.youtube_trailer_id = Set(Some(v.clone()));
        }
        active.ott_platforms = Set(platforms);
        active.status = Set(status.as_code().to_string());
        active.last_checked = Set(Some(now));
        active.updated_at = Set(now);
        active.update(&self.db).await?;

        Ok(true)
    }

    pub async fn upcoming(&self) -> AppResult<Vec<Movie>> {
        let rows = movie::Entity::find()
            .filter(movie::Column::IsActive.eq(true))
            .filter(movie::Column::Status.eq(AvailabilityStatus::Upcoming.as_code()))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(into_movie).collect())
    }

    pub async fn set_status(&self, ids: &[i32], status: AvailabilityStatus) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let res = movie::Entity::update_many()
            .col_expr(movie::Column::Status, Expr::value(status.as_code()))
            .col_expr(movie::Column::UpdatedAt, Expr::value(now_sec()))
            .filter(movie::Column::Id.is_in(ids.iter().copied()))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }

    /// Stores (or clears, with an empty `url`) the direct link under `link_key`.
    pub async fn set_direct_link(
        &self,
        tmdb_id: i32,
        link_key: &str,
        url: &str,
    ) -> AppResult<bool> {
        let Some(row) = movie::Entity::find()
            .filter(movie::Column::TmdbId.eq(tmdb_id))
            .one(&self.db)
            .await?
        else {
            return Ok(false);
        };

        let mut links = parse_links(&row.direct_links, row.tmdb_id);
        let url = url.trim();
        if url.is_empty() {
            links.remove(link_key);
        } else {
            links.insert(link_key.to_string(), url.to_string());
        }

        let mut active: movie::ActiveModel = row.into();
        active.direct_links = Set(serde_json::to_string(&links)?);
        active.updated_at = Set(now_sec());
        active.update(&self.db).await?;
        Ok(true)
    }

    pub async fn all(&self) -> AppResult<Vec<Movie>> {
        let rows = movie::Entity::find().order_by_asc(movie::Column::Id).all(&self.db).await?;
        Ok(rows.into_iter().map(into_movie).collect())
    }

    /// Inserts or fully overwrites a movie keyed by its TMDB id.
    pub async fn restore(&self, m: &Movie) -> AppResult<()> {
        let now = now_sec();
        let model = movie::ActiveModel {
            id: Default::default(),
            tmdb_id: Set(m.tmdb_id),
            title: Set(m.title.clone()),
            overview: Set(m.overview.clone()),
            poster: Set(m.poster.clone()),
            backdrop: Set(m.backdrop.clone()),
            release_date: Set(m.release_date.map(|d| d.to_string())),
            ott_release_date: Set(m.ott_release_date.map(|d| d.to_string())),
            rating: Set(m.rating),
            popularity: Set(m.popularity),
            language: Set(m.language.clone()),
            genres: Set(m.genres.clone()),
            runtime: Set(m.runtime),
            certification: Set(m.certification.clone()),
            imdb_id: Set(m.imdb_id.clone()),
            youtube_trailer_id: Set(m.youtube_trailer_id.clone()),
            status: Set(m.status.as_code().to_string()),
            ott_platforms: Set(serde_json::to_string(&m.platforms)?),
            direct_links: Set(serde_json::to_string(&m.direct_links)?),
            is_active: Set(m.is_active),
            fetch_source: Set("import".to_string()),
            last_checked: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        movie::Entity::insert(model)
            .on_conflict(
                OnConflict::column(movie::Column::TmdbId)
                    .update_columns([
                        movie::Column::Title,
                        movie::Column::Overview,
                        movie::Column::Poster,
                        movie::Column::Backdrop,
                        movie::Column::ReleaseDate,
                        movie::Column::OttReleaseDate,
                        movie::Column::Rating,
                        movie::Column::Popularity,
                        movie::Column::Language,
                        movie::Column::Genres,
                        movie::Column::Runtime,
                        movie::Column::Certification,
                        movie::Column::ImdbId,
                        movie::Column::YoutubeTrailerId,
                        movie::Column::Status,
                        movie::Column::OttPlatforms,
                        movie::Column::DirectLinks,
                        movie::Column::IsActive,
                        movie::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        Ok(())
    }

    /// Active titles per platform id, most common first.
    pub async fn platform_counts(&self) -> AppResult<Vec<(String, u64)>> {
        let rows: Vec<String> = movie::Entity::find()
            .select_only()
            .column(movie::Column::OttPlatforms)
            .filter(movie::Column::IsActive.eq(true))
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for raw in rows {
            for platform in serde_json::from_str::<Vec<String>>(&raw).unwrap_or_default() {
                *counts.entry(platform).or_default() += 1;
            }
        }

        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(counts)
    }
}

fn into_movie(row: movie::Model) -> Movie {
    let platforms = serde_json::from_str(&row.ott_platforms).unwrap_or_else(|err| {
        warn!(tmdb_id = row.tmdb_id, error = %err, "unreadable ott_platforms, treating as empty");
        Vec::new()
    });
    let direct_links = parse_links(&row.direct_links, row.tmdb_id);
    let status = AvailabilityStatus::from_code(&row.status).unwrap_or_default();

    Movie {
        id: row.id,
        tmdb_id: row.tmdb_id,
        title: row.title,
        overview: row.overview,
        poster: row.poster,
        backdrop: row.backdrop,
        release_date: row.release_date.as_deref().and_then(parse_release_date),
        ott_release_date: row.ott_release_date.as_deref().and_then(parse_release_date),
        rating: row.rating,
        popularity: row.popularity,
        language: row.language,
        genres: row.genres,
        runtime: row.runtime,
        certification: row.certification,
        imdb_id: row.imdb_id,
        youtube_trailer_id: row.youtube_trailer_id,
        status,
        platforms,
        direct_links,
        is_active: row.is_active,
    }
}

fn parse_links(raw: &str, tmdb_id: i32) -> BTreeMap<String, String> {
    serde_json::from_str(raw).unwrap_or_else(|err| {
        warn!(tmdb_id = tmdb_id, error = %err, "unreadable direct_links, treating as empty");
        BTreeMap::new()
    })
}

/// `LIKE '%needle%'` with the needle's own wildcards escaped.
fn contains_literal(col: movie::Column, needle: &str) -> SimpleExpr {
    let escaped = needle.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    col.like(LikeExpr::new(format!("%{escaped}%")).escape('\\'))
}

/// A platform id as it appears inside the JSON `ott_platforms` array.
fn quoted(id: &str) -> String {
    format!("\"{id}\"")
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}
