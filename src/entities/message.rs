use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A direct message between two users. Append-only except for the
/// `read` flag, which flips when the receiver opens the conversation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "message")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub read: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::SenderId",
        to = "super::profile::Column::Id"
    )]
    Sender,
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::ReceiverId",
        to = "super::profile::Column::Id"
    )]
    Receiver,
}

impl ActiveModelBehavior for ActiveModel {}
