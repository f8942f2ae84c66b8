use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20240301_000001_create_profiles::Profile;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(RideStatus::Enum)
                    .values([RideStatus::Active, RideStatus::Completed, RideStatus::Cancelled])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Ride::Table)
                    .if_not_exists()
                    .col(uuid(Ride::Id).primary_key())
                    .col(uuid(Ride::DriverId).not_null())
                    .col(string_len(Ride::FromLocation, 255).not_null())
                    .col(string_len(Ride::ToLocation, 255).not_null())
                    .col(double(Ride::FromLat).not_null())
                    .col(double(Ride::FromLng).not_null())
                    .col(double(Ride::ToLat).not_null())
                    .col(double(Ride::ToLng).not_null())
                    .col(date(Ride::DepartureDate).not_null())
                    .col(time(Ride::DepartureTime).not_null())
                    .col(integer(Ride::AvailableSeats).not_null())
                    .col(integer_null(Ride::MaxPassengers))
                    .col(double(Ride::Price).not_null())
                    .col(string_len_null(Ride::Notes, 500))
                    .col(
                        ColumnDef::new(Ride::Status)
                            .custom(RideStatus::Enum)
                            .not_null(),
                    )
                    .col(
                        timestamp_with_time_zone(Ride::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_driver")
                            .from(Ride::Table, Ride::DriverId)
                            .to(Profile::Table, Profile::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .check(Expr::col(Ride::AvailableSeats).gte(0))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ride::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(RideStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Ride {
    Table,
    Id,
    DriverId,
    FromLocation,
    ToLocation,
    FromLat,
    FromLng,
    ToLat,
    ToLng,
    DepartureDate,
    DepartureTime,
    AvailableSeats,
    MaxPassengers,
    Price,
    Notes,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum RideStatus {
    #[sea_orm(iden = "ride_status")]
    Enum,
    #[sea_orm(iden = "active")]
    Active,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
}
