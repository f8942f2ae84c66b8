use chrono::{NaiveDate, NaiveTime};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::profile;
use crate::entities::ride::{self, RideStatus};
use crate::error::{AppError, AppResult};
use crate::workflow::notify::{self, Outgoing};

/// The two transitions a driver may request on a ride. `Active` is the
/// creation state and is never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideDecision {
    Completed,
    Cancelled,
}

impl RideDecision {
    pub fn as_status(self) -> RideStatus {
        match self {
            RideDecision::Completed => RideStatus::Completed,
            RideDecision::Cancelled => RideStatus::Cancelled,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewRide {
    pub from_location: String,
    pub to_location: String,
    pub from_lat: f64,
    pub from_lng: f64,
    pub to_lat: f64,
    pub to_lng: f64,
    pub departure_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub available_seats: i32,
    pub max_passengers: Option<i32>,
    pub price: f64,
    pub notes: Option<String>,
}

/// Offer a new ride. The caller's driver role is enforced by the route
/// guard; this only validates the payload.
pub async fn create_ride(
    db: &DatabaseConnection,
    driver_id: Uuid,
    payload: NewRide,
) -> AppResult<ride::Model> {
    if payload.available_seats < 1 {
        return Err(AppError::BadRequest(
            "A ride must offer at least 1 seat".to_string(),
        ));
    }

    if payload.price < 0.0 {
        return Err(AppError::BadRequest(
            "Price cannot be negative".to_string(),
        ));
    }

    if let Some(max) = payload.max_passengers {
        if max < payload.available_seats {
            return Err(AppError::BadRequest(
                "max_passengers cannot be below available_seats".to_string(),
            ));
        }
    }

    let new_ride = ride::ActiveModel {
        id: Set(Uuid::new_v4()),
        driver_id: Set(driver_id),
        from_location: Set(payload.from_location),
        to_location: Set(payload.to_location),
        from_lat: Set(payload.from_lat),
        from_lng: Set(payload.from_lng),
        to_lat: Set(payload.to_lat),
        to_lng: Set(payload.to_lng),
        departure_date: Set(payload.departure_date),
        departure_time: Set(payload.departure_time),
        available_seats: Set(payload.available_seats),
        max_passengers: Set(payload.max_passengers),
        price: Set(payload.price),
        notes: Set(payload.notes),
        status: Set(RideStatus::Active),
        ..Default::default()
    };

    Ok(new_ride.insert(db).await?)
}

/// Complete or cancel a ride. Only the owning driver may call this.
///
/// Completion bulk-transitions every `confirmed` booking to `completed`
/// inside the same transaction as the ride update. The confirmed
/// passengers are read inside that transaction so the notified set is
/// exactly the set that was transitioned.
pub async fn set_ride_status(
    db: &DatabaseConnection,
    ride_id: Uuid,
    decision: RideDecision,
    actor_id: Uuid,
) -> AppResult<ride::Model> {
    let ride = ride::Entity::find_by_id(ride_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride not found".to_string()))?;

    if ride.driver_id != actor_id {
        return Err(AppError::Forbidden(
            "You can only update rides that you created".to_string(),
        ));
    }

    let target = decision.as_status();

    if ride.status == target {
        return Ok(ride);
    }

    if !ride.status.can_transition_to(target) {
        return Err(AppError::InvalidTransition(format!(
            "Ride is already {}",
            ride.status.to_value()
        )));
    }

    let (updated, confirmed_passengers) = db
        .transaction::<_, (ride::Model, Vec<Uuid>), AppError>(move |txn| {
            Box::pin(async move {
                // Guarded status write: a concurrent transition that commits
                // first leaves the ride non-active and this touches no rows.
                let guard = ride::Entity::update_many()
                    .col_expr(ride::Column::Status, target.as_enum())
                    .filter(ride::Column::Id.eq(ride_id))
                    .filter(ride::Column::Status.eq(RideStatus::Active))
                    .exec(txn)
                    .await?;

                if guard.rows_affected == 0 {
                    return Err(AppError::InvalidTransition(
                        "Ride is no longer active".to_string(),
                    ));
                }

                let confirmed: Vec<Uuid> = booking::Entity::find()
                    .filter(booking::Column::RideId.eq(ride_id))
                    .filter(booking::Column::Status.eq(BookingStatus::Confirmed))
                    .all(txn)
                    .await?
                    .into_iter()
                    .map(|b| b.passenger_id)
                    .collect();

                if target == RideStatus::Completed {
                    booking::Entity::update_many()
                        .col_expr(
                            booking::Column::Status,
                            BookingStatus::Completed.as_enum(),
                        )
                        .filter(booking::Column::RideId.eq(ride_id))
                        .filter(booking::Column::Status.eq(BookingStatus::Confirmed))
                        .exec(txn)
                        .await?;
                }

                let updated = ride::Entity::find_by_id(ride_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Ride not found".to_string()))?;

                Ok((updated, confirmed))
            })
        })
        .await?;

    let (title, kind) = match decision {
        RideDecision::Completed => ("Ride Completed", notify::RIDE_COMPLETED),
        RideDecision::Cancelled => ("Ride Cancelled", notify::RIDE_CANCELLED),
    };

    let messages = confirmed_passengers
        .into_iter()
        .map(|passenger_id| Outgoing {
            user_id: passenger_id,
            title: title.to_string(),
            content: format!(
                "Your ride has been marked as {} by the driver.",
                target.to_value()
            ),
            notification_type: kind,
            reference_id: Some(ride_id),
        })
        .collect();

    notify::dispatch(db, messages).await;

    Ok(updated)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RideRole {
    Driver,
    Passenger,
}

/// One entry in a user's combined ride list: either a ride they offered
/// or one they booked, with the booking annotation in the latter case.
#[derive(Debug, Serialize)]
pub struct UserRide {
    #[serde(flatten)]
    pub ride: ride::Model,
    pub user_role: RideRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_status: Option<BookingStatus>,
}

/// Union of rides where the user drives and rides they booked.
///
/// A booking whose ride row fails to resolve is dropped from the
/// passenger side rather than failing the whole read. No ordering is
/// imposed; callers sort as needed.
pub async fn list_rides_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> AppResult<Vec<UserRide>> {
    let driver_rides = ride::Entity::find()
        .filter(ride::Column::DriverId.eq(user_id))
        .all(db)
        .await?;

    let bookings = booking::Entity::find()
        .filter(booking::Column::PassengerId.eq(user_id))
        .all(db)
        .await?;

    let booked_ride_ids: Vec<Uuid> = bookings.iter().map(|b| b.ride_id).collect();
    let booked_rides = if booked_ride_ids.is_empty() {
        Vec::new()
    } else {
        ride::Entity::find()
            .filter(ride::Column::Id.is_in(booked_ride_ids))
            .all(db)
            .await?
    };

    let mut results: Vec<UserRide> = driver_rides
        .into_iter()
        .map(|ride| UserRide {
            ride,
            user_role: RideRole::Driver,
            booking_id: None,
            booking_status: None,
        })
        .collect();

    for b in bookings {
        match booked_rides.iter().find(|r| r.id == b.ride_id) {
            Some(ride) => results.push(UserRide {
                ride: ride.clone(),
                user_role: RideRole::Passenger,
                booking_id: Some(b.id),
                booking_status: Some(b.status),
            }),
            None => {
                tracing::debug!(booking_id = %b.id, ride_id = %b.ride_id, "booking references missing ride, skipping");
            }
        }
    }

    Ok(results)
}

#[derive(Debug, Serialize)]
pub struct AvailableRide {
    #[serde(flatten)]
    pub ride: ride::Model,
    pub driver: Option<profile::Model>,
}

/// Active rides open for booking, newest departure last, excluding the
/// viewer's own offers when a viewer is known.
pub async fn list_available_rides(
    db: &DatabaseConnection,
    viewer: Option<Uuid>,
) -> AppResult<Vec<AvailableRide>> {
    let rides = ride::Entity::find()
        .filter(ride::Column::Status.eq(RideStatus::Active))
        .order_by_asc(ride::Column::DepartureDate)
        .order_by_asc(ride::Column::DepartureTime)
        .all(db)
        .await?;

    let rides: Vec<ride::Model> = match viewer {
        Some(user_id) => rides.into_iter().filter(|r| r.driver_id != user_id).collect(),
        None => rides,
    };

    let driver_ids: Vec<Uuid> = rides.iter().map(|r| r.driver_id).collect();
    let drivers = if driver_ids.is_empty() {
        Vec::new()
    } else {
        profile::Entity::find()
            .filter(profile::Column::Id.is_in(driver_ids))
            .all(db)
            .await?
    };

    Ok(rides
        .into_iter()
        .map(|ride| {
            let driver = drivers.iter().find(|d| d.id == ride.driver_id).cloned();
            AvailableRide { ride, driver }
        })
        .collect())
}

#[derive(Debug, Serialize)]
pub struct RidePassenger {
    #[serde(flatten)]
    pub booking: booking::Model,
    pub passenger: Option<profile::Model>,
}

#[derive(Debug, Serialize)]
pub struct RideDetails {
    #[serde(flatten)]
    pub ride: ride::Model,
    pub driver: Option<profile::Model>,
    pub passengers: Vec<RidePassenger>,
}

/// A single ride with its driver profile and passenger list. Missing
/// profile rows are tolerated, not fatal.
pub async fn get_ride(db: &DatabaseConnection, ride_id: Uuid) -> AppResult<RideDetails> {
    let ride = ride::Entity::find_by_id(ride_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride not found".to_string()))?;

    let driver = profile::Entity::find_by_id(ride.driver_id).one(db).await?;

    let bookings = booking::Entity::find()
        .filter(booking::Column::RideId.eq(ride_id))
        .all(db)
        .await?;

    let passenger_ids: Vec<Uuid> = bookings.iter().map(|b| b.passenger_id).collect();
    let profiles = if passenger_ids.is_empty() {
        Vec::new()
    } else {
        profile::Entity::find()
            .filter(profile::Column::Id.is_in(passenger_ids))
            .all(db)
            .await?
    };

    let passengers = bookings
        .into_iter()
        .map(|booking| {
            let passenger = profiles.iter().find(|p| p.id == booking.passenger_id).cloned();
            RidePassenger { booking, passenger }
        })
        .collect();

    Ok(RideDetails {
        ride,
        driver,
        passengers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn test_ride(driver_id: Uuid, status: RideStatus) -> ride::Model {
        ride::Model {
            id: Uuid::new_v4(),
            driver_id,
            from_location: "North Campus".to_string(),
            to_location: "Downtown".to_string(),
            from_lat: 42.29,
            from_lng: -83.71,
            to_lat: 42.28,
            to_lng: -83.74,
            departure_date: NaiveDate::from_ymd_opt(2026, 9, 12).unwrap(),
            departure_time: NaiveTime::from_hms_opt(17, 30, 0).unwrap(),
            available_seats: 2,
            max_passengers: Some(3),
            price: 8.0,
            notes: None,
            status,
            created_at: Utc::now().into(),
        }
    }

    fn test_booking(ride_id: Uuid, passenger_id: Uuid, status: BookingStatus) -> booking::Model {
        booking::Model {
            id: Uuid::new_v4(),
            ride_id,
            passenger_id,
            status,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn only_the_owner_may_transition_a_ride() {
        let ride = test_ride(Uuid::new_v4(), RideStatus::Active);
        let ride_id = ride.id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ride]])
            .into_connection();

        let err = set_ride_status(&db, ride_id, RideDecision::Completed, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn repeating_a_ride_decision_is_a_noop() {
        let driver = Uuid::new_v4();
        let ride = test_ride(driver, RideStatus::Completed);
        let ride_id = ride.id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ride]])
            .into_connection();

        let result = set_ride_status(&db, ride_id, RideDecision::Completed, driver)
            .await
            .unwrap();
        assert_eq!(result.status, RideStatus::Completed);
    }

    #[tokio::test]
    async fn terminal_rides_reject_further_transitions() {
        let driver = Uuid::new_v4();
        let ride = test_ride(driver, RideStatus::Completed);
        let ride_id = ride.id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ride]])
            .into_connection();

        let err = set_ride_status(&db, ride_id, RideDecision::Cancelled, driver)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn racing_transition_cannot_overwrite_a_terminal_state() {
        let driver = Uuid::new_v4();
        let ride = test_ride(driver, RideStatus::Active);
        let ride_id = ride.id;

        // Another transition commits between the precondition read and the
        // guarded status write; the write touches no rows and the loser
        // must not overwrite the terminal state.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ride]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let err = set_ride_status(&db, ride_id, RideDecision::Cancelled, driver)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn ride_list_merges_driver_and_passenger_sides() {
        let user = Uuid::new_v4();
        let own_ride = test_ride(user, RideStatus::Active);
        let other_ride = test_ride(Uuid::new_v4(), RideStatus::Active);
        let booking = test_booking(other_ride.id, user, BookingStatus::Confirmed);
        let booking_id = booking.id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![own_ride.clone()]])
            .append_query_results([vec![booking]])
            .append_query_results([vec![other_ride.clone()]])
            .into_connection();

        let rides = list_rides_for_user(&db, user).await.unwrap();
        assert_eq!(rides.len(), 2);

        let driver_entry = rides.iter().find(|r| r.ride.id == own_ride.id).unwrap();
        assert_eq!(driver_entry.user_role, RideRole::Driver);
        assert!(driver_entry.booking_id.is_none());

        let passenger_entry = rides.iter().find(|r| r.ride.id == other_ride.id).unwrap();
        assert_eq!(passenger_entry.user_role, RideRole::Passenger);
        assert_eq!(passenger_entry.booking_id, Some(booking_id));
        assert_eq!(passenger_entry.booking_status, Some(BookingStatus::Confirmed));
    }

    #[tokio::test]
    async fn booking_with_missing_ride_is_dropped_not_fatal() {
        let user = Uuid::new_v4();
        let dangling = test_booking(Uuid::new_v4(), user, BookingStatus::Pending);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<ride::Model>::new()])
            .append_query_results([vec![dangling]])
            .append_query_results([Vec::<ride::Model>::new()])
            .into_connection();

        let rides = list_rides_for_user(&db, user).await.unwrap();
        assert!(rides.is_empty());
    }

    #[tokio::test]
    async fn payload_validation_rejects_zero_seats() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let payload = NewRide {
            from_location: "A".to_string(),
            to_location: "B".to_string(),
            from_lat: 0.0,
            from_lng: 0.0,
            to_lat: 1.0,
            to_lng: 1.0,
            departure_date: NaiveDate::from_ymd_opt(2026, 9, 12).unwrap(),
            departure_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            available_seats: 0,
            max_passengers: None,
            price: 5.0,
            notes: None,
        };

        let err = create_ride(&db, Uuid::new_v4(), payload).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
