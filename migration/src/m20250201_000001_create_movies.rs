use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(pk_auto(Movies::Id))
                    .col(integer(Movies::TmdbId))
                    .col(string(Movies::Title))
                    .col(text_null(Movies::Overview))
                    .col(string_null(Movies::Poster))
                    .col(string_null(Movies::Backdrop))
                    .col(string_null(Movies::ReleaseDate))
                    .col(string_null(Movies::OttReleaseDate))
                    .col(double(Movies::Rating).default(0.0))
                    .col(double(Movies::Popularity).default(0.0))
                    .col(string(Movies::Language).default("te"))
                    .col(string(Movies::Genres).default(""))
                    .col(integer(Movies::Runtime).default(0))
                    .col(string_null(Movies::Certification))
                    .col(string_null(Movies::ImdbId))
                    .col(string_null(Movies::YoutubeTrailerId))
                    .col(string(Movies::Status).default("upcoming"))
                    .col(text(Movies::OttPlatforms).default("[]"))
                    .col(boolean(Movies::IsActive).default(true))
                    .col(string(Movies::FetchSource).default("tmdb"))
                    .col(big_integer_null(Movies::LastChecked))
                    .col(big_integer(Movies::CreatedAt))
                    .col(big_integer(Movies::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_tmdb_id")
                    .table(Movies::Table)
                    .col(Movies::TmdbId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_title")
                    .table(Movies::Table)
                    .col(Movies::Title)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_release_date")
                    .table(Movies::Table)
                    .col(Movies::ReleaseDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Id,
    TmdbId,
    Title,
    Overview,
    Poster,
    Backdrop,
    ReleaseDate,
    OttReleaseDate,
    Rating,
    Popularity,
    Language,
    Genres,
    Runtime,
    Certification,
    ImdbId,
    YoutubeTrailerId,
    Status,
    OttPlatforms,
    IsActive,
    FetchSource,
    LastChecked,
    CreatedAt,
    UpdatedAt,
}
