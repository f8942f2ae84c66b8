use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

use crate::entities::notification;

pub const BOOKING_REQUEST: &str = "booking_request";
pub const BOOKING_CONFIRMED: &str = "booking_confirmed";
pub const BOOKING_CANCELLED: &str = "booking_cancelled";
pub const RIDE_COMPLETED: &str = "ride_completed";
pub const RIDE_CANCELLED: &str = "ride_cancelled";

/// A notification waiting to be persisted after the primary mutation
/// has committed.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub notification_type: &'static str,
    pub reference_id: Option<Uuid>,
}

/// Persist notifications post-commit. Failures are logged and swallowed;
/// they never affect the outcome of the state transition that produced
/// them.
pub async fn dispatch(db: &DatabaseConnection, messages: Vec<Outgoing>) {
    for msg in messages {
        let model = notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(msg.user_id),
            title: Set(msg.title),
            content: Set(msg.content),
            notification_type: Set(msg.notification_type.to_string()),
            reference_id: Set(msg.reference_id),
            read: Set(false),
            ..Default::default()
        };

        if let Err(err) = model.insert(db).await {
            tracing::warn!(
                user_id = %msg.user_id,
                kind = msg.notification_type,
                error = %err,
                "failed to dispatch notification"
            );
        }
    }
}
