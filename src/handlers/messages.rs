use axum::{
    extract::{Path, State},
    Extension, Json,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{message, profile};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub content: String,
}

/// One thread in the caller's inbox, keyed by the counterpart.
#[derive(Debug, Serialize)]
pub struct Conversation {
    pub other_user: profile::Model,
    pub last_message: message::Model,
    pub unread_count: u64,
}

/// Fold a newest-first message list into per-counterpart conversations.
/// Unread counting only considers incoming messages; a counterpart whose
/// profile fails to resolve is dropped rather than failing the read.
fn group_conversations(
    user_id: Uuid,
    messages: Vec<message::Model>,
    profiles: &[profile::Model],
) -> Vec<Conversation> {
    let mut conversations: Vec<Conversation> = Vec::new();

    for msg in messages {
        let incoming = msg.receiver_id == user_id;
        let other_id = if incoming { msg.sender_id } else { msg.receiver_id };
        let unread = incoming && !msg.read;

        match conversations
            .iter_mut()
            .find(|c| c.other_user.id == other_id)
        {
            Some(existing) => {
                if unread {
                    existing.unread_count += 1;
                }
            }
            None => {
                let Some(other_user) = profiles.iter().find(|p| p.id == other_id) else {
                    tracing::debug!(message_id = %msg.id, other_id = %other_id, "message counterpart has no profile, skipping");
                    continue;
                };
                conversations.push(Conversation {
                    other_user: other_user.clone(),
                    last_message: msg,
                    unread_count: u64::from(unread),
                });
            }
        }
    }

    conversations
}

/// The caller's conversations, most recently active first
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<Conversation>>> {
    let messages = message::Entity::find()
        .filter(
            Condition::any()
                .add(message::Column::SenderId.eq(claims.sub))
                .add(message::Column::ReceiverId.eq(claims.sub)),
        )
        .order_by_desc(message::Column::CreatedAt)
        .all(&*state.db)
        .await?;

    let mut counterpart_ids: Vec<Uuid> = messages
        .iter()
        .map(|m| {
            if m.sender_id == claims.sub {
                m.receiver_id
            } else {
                m.sender_id
            }
        })
        .collect();
    counterpart_ids.sort_unstable();
    counterpart_ids.dedup();

    let profiles = if counterpart_ids.is_empty() {
        Vec::new()
    } else {
        profile::Entity::find()
            .filter(profile::Column::Id.is_in(counterpart_ids))
            .all(&*state.db)
            .await?
    };

    Ok(Json(group_conversations(claims.sub, messages, &profiles)))
}

/// The full thread with one user, oldest first. Opening the thread marks
/// the counterpart's messages as read.
pub async fn conversation_with(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(other_id): Path<Uuid>,
) -> AppResult<Json<Vec<message::Model>>> {
    let messages = message::Entity::find()
        .filter(
            Condition::any()
                .add(
                    Condition::all()
                        .add(message::Column::SenderId.eq(claims.sub))
                        .add(message::Column::ReceiverId.eq(other_id)),
                )
                .add(
                    Condition::all()
                        .add(message::Column::SenderId.eq(other_id))
                        .add(message::Column::ReceiverId.eq(claims.sub)),
                ),
        )
        .order_by_asc(message::Column::CreatedAt)
        .all(&*state.db)
        .await?;

    message::Entity::update_many()
        .col_expr(message::Column::Read, Expr::value(true))
        .filter(message::Column::SenderId.eq(other_id))
        .filter(message::Column::ReceiverId.eq(claims.sub))
        .filter(message::Column::Read.eq(false))
        .exec(&*state.db)
        .await?;

    Ok(Json(messages))
}

/// Send a direct message. The sender is always the authenticated caller.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SendMessageRequest>,
) -> AppResult<Json<message::Model>> {
    if payload.content.trim().is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }

    if payload.receiver_id == claims.sub {
        return Err(AppError::BadRequest(
            "You cannot message yourself".to_string(),
        ));
    }

    profile::Entity::find_by_id(payload.receiver_id)
        .one(&*state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let new_message = message::ActiveModel {
        id: Set(Uuid::new_v4()),
        sender_id: Set(claims.sub),
        receiver_id: Set(payload.receiver_id),
        content: Set(payload.content),
        read: Set(false),
        ..Default::default()
    };

    let created = new_message.insert(&*state.db).await?;
    Ok(Json(created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::profile::UserRole;
    use chrono::{Duration, Utc};

    fn test_profile(id: Uuid, name: &str) -> profile::Model {
        profile::Model {
            id,
            email: format!("{}@campus.edu", name),
            password_hash: "hash".to_string(),
            full_name: name.to_string(),
            phone_number: None,
            university: None,
            role: UserRole::Rider,
            rating: None,
            total_rides: 0,
            created_at: Utc::now().into(),
        }
    }

    fn test_message(
        sender: Uuid,
        receiver: Uuid,
        read: bool,
        minutes_ago: i64,
    ) -> message::Model {
        message::Model {
            id: Uuid::new_v4(),
            sender_id: sender,
            receiver_id: receiver,
            content: "hey".to_string(),
            read,
            created_at: (Utc::now() - Duration::minutes(minutes_ago)).into(),
        }
    }

    #[test]
    fn newest_message_heads_each_conversation() {
        let me = Uuid::new_v4();
        let alex = Uuid::new_v4();
        let newer = test_message(alex, me, true, 5);
        let newer_id = newer.id;
        let older = test_message(me, alex, true, 60);

        // Input is newest-first, as the query orders it
        let conversations =
            group_conversations(me, vec![newer, older], &[test_profile(alex, "alex")]);

        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].last_message.id, newer_id);
    }

    #[test]
    fn unread_count_only_considers_incoming_messages() {
        let me = Uuid::new_v4();
        let alex = Uuid::new_v4();
        let messages = vec![
            test_message(alex, me, false, 1),
            test_message(me, alex, false, 2),
            test_message(alex, me, false, 3),
            test_message(alex, me, true, 4),
        ];

        let conversations = group_conversations(me, messages, &[test_profile(alex, "alex")]);

        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].unread_count, 2);
    }

    #[test]
    fn counterpart_without_profile_is_dropped() {
        let me = Uuid::new_v4();
        let alex = Uuid::new_v4();
        let ghost = Uuid::new_v4();
        let messages = vec![
            test_message(alex, me, false, 1),
            test_message(ghost, me, false, 2),
        ];

        let conversations = group_conversations(me, messages, &[test_profile(alex, "alex")]);

        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].other_user.id, alex);
    }

    #[test]
    fn conversations_keep_most_recently_active_order() {
        let me = Uuid::new_v4();
        let alex = Uuid::new_v4();
        let sam = Uuid::new_v4();
        let messages = vec![
            test_message(alex, me, true, 1),
            test_message(sam, me, true, 10),
            test_message(alex, me, true, 20),
        ];

        let conversations = group_conversations(
            me,
            messages,
            &[test_profile(alex, "alex"), test_profile(sam, "sam")],
        );

        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].other_user.id, alex);
        assert_eq!(conversations[1].other_user.id, sam);
    }
}
