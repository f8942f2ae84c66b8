use sea_orm_migration::{prelude::*, schema::*};

use super::m20240301_000001_create_profiles::Profile;
use super::m20240301_000002_create_rides::Ride;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Rating::Table)
                    .if_not_exists()
                    .col(uuid(Rating::Id).primary_key())
                    .col(uuid(Rating::RideId).not_null())
                    .col(uuid(Rating::RaterId).not_null())
                    .col(uuid(Rating::RatedId).not_null())
                    .col(integer(Rating::Rating).not_null())
                    .col(string_len_null(Rating::Comment, 500))
                    .col(
                        timestamp_with_time_zone(Rating::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rating_ride")
                            .from(Rating::Table, Rating::RideId)
                            .to(Ride::Table, Ride::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rating_rater")
                            .from(Rating::Table, Rating::RaterId)
                            .to(Profile::Table, Profile::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rating_rated")
                            .from(Rating::Table, Rating::RatedId)
                            .to(Profile::Table, Profile::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .check(Expr::col(Rating::Rating).between(1, 5))
                    .to_owned(),
            )
            .await?;

        // One rating per rater per ratee per ride
        manager
            .create_index(
                Index::create()
                    .name("idx_rating_unique_per_ride")
                    .table(Rating::Table)
                    .col(Rating::RideId)
                    .col(Rating::RaterId)
                    .col(Rating::RatedId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Rating::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Rating {
    Table,
    Id,
    RideId,
    RaterId,
    RatedId,
    Rating,
    Comment,
    CreatedAt,
}
