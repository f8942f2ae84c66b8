use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create user role enum
        manager
            .create_type(
                Type::create()
                    .as_enum(UserRole::Enum)
                    .values([UserRole::Rider, UserRole::Driver, UserRole::Both])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Profile::Table)
                    .if_not_exists()
                    .col(uuid(Profile::Id).primary_key())
                    .col(string_len(Profile::Email, 255).not_null().unique_key())
                    .col(string_len(Profile::PasswordHash, 255).not_null())
                    .col(string_len(Profile::FullName, 100).not_null())
                    .col(string_len_null(Profile::PhoneNumber, 30))
                    .col(string_len_null(Profile::University, 120))
                    .col(
                        ColumnDef::new(Profile::Role)
                            .custom(UserRole::Enum)
                            .not_null(),
                    )
                    .col(double_null(Profile::Rating))
                    .col(integer(Profile::TotalRides).not_null().default(0))
                    .col(
                        timestamp_with_time_zone(Profile::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Profile::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(UserRole::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Profile {
    Table,
    Id,
    Email,
    PasswordHash,
    FullName,
    PhoneNumber,
    University,
    Role,
    Rating,
    TotalRides,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum UserRole {
    #[sea_orm(iden = "user_role")]
    Enum,
    #[sea_orm(iden = "rider")]
    Rider,
    #[sea_orm(iden = "driver")]
    Driver,
    #[sea_orm(iden = "both")]
    Both,
}
