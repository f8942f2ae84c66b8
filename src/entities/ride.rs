use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ride lifecycle. `Completed` and `Cancelled` are terminal; the allowed
/// transitions are encoded in [`RideStatus::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ride_status")]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl RideStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    /// Transition allow-list. Same-state is not a transition; callers treat
    /// it as an idempotent no-op before consulting this table.
    pub fn can_transition_to(self, target: RideStatus) -> bool {
        matches!(
            (self, target),
            (RideStatus::Active, RideStatus::Completed) | (RideStatus::Active, RideStatus::Cancelled)
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ride")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub driver_id: Uuid,
    pub from_location: String,
    pub to_location: String,
    pub from_lat: f64,
    pub from_lng: f64,
    pub to_lat: f64,
    pub to_lng: f64,
    pub departure_date: Date,
    pub departure_time: Time,
    pub available_seats: i32,
    pub max_passengers: Option<i32>,
    pub price: f64,
    pub notes: Option<String>,
    pub status: RideStatus,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::DriverId",
        to = "super::profile::Column::Id"
    )]
    Driver,
    #[sea_orm(has_many = "super::booking::Entity")]
    Bookings,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Driver.def()
    }
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_can_reach_both_terminals() {
        assert!(RideStatus::Active.can_transition_to(RideStatus::Completed));
        assert!(RideStatus::Active.can_transition_to(RideStatus::Cancelled));
    }

    #[test]
    fn terminal_states_are_dead_ends() {
        for terminal in [RideStatus::Completed, RideStatus::Cancelled] {
            for target in [RideStatus::Active, RideStatus::Completed, RideStatus::Cancelled] {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn same_state_is_not_a_transition() {
        assert!(!RideStatus::Active.can_transition_to(RideStatus::Active));
    }
}
