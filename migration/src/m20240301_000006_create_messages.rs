use sea_orm_migration::{prelude::*, schema::*};

use super::m20240301_000001_create_profiles::Profile;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Message::Table)
                    .if_not_exists()
                    .col(uuid(Message::Id).primary_key())
                    .col(uuid(Message::SenderId).not_null())
                    .col(uuid(Message::ReceiverId).not_null())
                    .col(string_len(Message::Content, 2000).not_null())
                    .col(boolean(Message::Read).not_null().default(false))
                    .col(
                        timestamp_with_time_zone(Message::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_sender")
                            .from(Message::Table, Message::SenderId)
                            .to(Profile::Table, Profile::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_receiver")
                            .from(Message::Table, Message::ReceiverId)
                            .to(Profile::Table, Profile::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Conversation reads filter by either endpoint and sort by time
        manager
            .create_index(
                Index::create()
                    .name("idx_message_sender_created")
                    .table(Message::Table)
                    .col(Message::SenderId)
                    .col(Message::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_message_receiver_created")
                    .table(Message::Table)
                    .col(Message::ReceiverId)
                    .col(Message::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Message::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Message {
    Table,
    Id,
    SenderId,
    ReceiverId,
    Content,
    Read,
    CreatedAt,
}
