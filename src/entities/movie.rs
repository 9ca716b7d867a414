use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub tmdb_id: i32,
    pub title: String,
    pub overview: Option<String>,
    pub poster: Option<String>,
    pub backdrop: Option<String>,
    pub release_date: Option<String>,
    pub ott_release_date: Option<String>,
    pub rating: f64,
    pub popularity: f64,
    pub language: String,
    pub genres: String,
    pub runtime: i32,
    pub certification: Option<String>,
    pub imdb_id: Option<String>,
    pub youtube_trailer_id: Option<String>,
    pub status: String,
    /// JSON array of registry platform ids.
    pub ott_platforms: String,
    /// JSON object of platform link key to URL.
    pub direct_links: String,
    pub is_active: bool,
    pub fetch_source: String,
    pub last_checked: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
