use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    SqlErr, TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::profile;
use crate::entities::ride::{self, RideStatus};
use crate::error::{AppError, AppResult};
use crate::workflow::notify::{self, Outgoing};

/// The two transitions a driver may request on a booking. `Completed` is
/// deliberately absent; bookings complete only through the bulk path when
/// the parent ride completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingDecision {
    Confirmed,
    Cancelled,
}

impl BookingDecision {
    pub fn as_status(self) -> BookingStatus {
        match self {
            BookingDecision::Confirmed => BookingStatus::Confirmed,
            BookingDecision::Cancelled => BookingStatus::Cancelled,
        }
    }
}

/// Request a seat on a ride. Creates a `pending` booking; the seat itself
/// is only consumed when the driver confirms (two-phase reservation).
pub async fn request_booking(
    db: &DatabaseConnection,
    ride_id: Uuid,
    passenger_id: Uuid,
) -> AppResult<booking::Model> {
    let ride = ride::Entity::find_by_id(ride_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride not found".to_string()))?;

    if ride.driver_id == passenger_id {
        return Err(AppError::SelfBookingForbidden);
    }

    if ride.status != RideStatus::Active {
        return Err(AppError::InvalidTransition(
            "This ride is no longer accepting bookings".to_string(),
        ));
    }

    // Any pending or confirmed booking for this (ride, passenger) pair
    // blocks a new request. Cancelled bookings do not.
    let active_booking = booking::Entity::find()
        .filter(booking::Column::RideId.eq(ride_id))
        .filter(booking::Column::PassengerId.eq(passenger_id))
        .filter(
            booking::Column::Status.is_in([BookingStatus::Pending, BookingStatus::Confirmed]),
        )
        .one(db)
        .await?;

    if active_booking.is_some() {
        return Err(AppError::AlreadyBooked);
    }

    if ride.available_seats <= 0 {
        return Err(AppError::NoSeatsAvailable);
    }

    let new_booking = booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        ride_id: Set(ride_id),
        passenger_id: Set(passenger_id),
        status: Set(BookingStatus::Pending),
        ..Default::default()
    };

    // A concurrent duplicate request can slip past the read above; the
    // partial unique index on live (ride, passenger) pairs catches it.
    let created = new_booking.insert(db).await.map_err(|err| {
        if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
            AppError::AlreadyBooked
        } else {
            AppError::RemoteStore(err)
        }
    })?;

    let passenger_name = profile::Entity::find_by_id(passenger_id)
        .one(db)
        .await
        .ok()
        .flatten()
        .map(|p| p.full_name)
        .unwrap_or_else(|| "A passenger".to_string());

    notify::dispatch(
        db,
        vec![Outgoing {
            user_id: ride.driver_id,
            title: "New Booking Request".to_string(),
            content: format!(
                "{} wants to join your ride from {} to {}",
                passenger_name, ride.from_location, ride.to_location
            ),
            notification_type: notify::BOOKING_REQUEST,
            reference_id: Some(ride_id),
        }],
    )
    .await;

    Ok(created)
}

/// Confirm or cancel a pending booking. Only the ride's driver may call
/// this; the actor id must come from authenticated claims.
///
/// Confirming consumes one seat through a conditional decrement inside the
/// same transaction as the status update, so two drivers racing for the
/// last seat cannot both succeed. Cancelling a previously confirmed
/// booking restores the seat.
pub async fn set_booking_status(
    db: &DatabaseConnection,
    booking_id: Uuid,
    decision: BookingDecision,
    actor_id: Uuid,
) -> AppResult<booking::Model> {
    let booking = booking::Entity::find_by_id(booking_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let ride = ride::Entity::find_by_id(booking.ride_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride not found".to_string()))?;

    if ride.driver_id != actor_id {
        return Err(AppError::Forbidden(
            "Only the driver can update booking status".to_string(),
        ));
    }

    let target = decision.as_status();

    // Idempotent: repeating a decision is a no-op, never a second decrement.
    if booking.status == target {
        return Ok(booking);
    }

    if ride.status.is_terminal() {
        return Err(AppError::InvalidTransition(format!(
            "Ride is already {}",
            ride.status.to_value()
        )));
    }

    if !booking.status.can_transition_to(target) {
        return Err(AppError::InvalidTransition(format!(
            "Booking cannot go from {} to {}",
            booking.status.to_value(),
            target.to_value()
        )));
    }

    let prior_status = booking.status;
    let was_confirmed = prior_status == BookingStatus::Confirmed;
    let ride_id = ride.id;

    let updated = db
        .transaction::<_, booking::Model, AppError>(move |txn| {
            Box::pin(async move {
                match decision {
                    BookingDecision::Confirmed => {
                        // Guarded decrement: zero rows touched means the last
                        // seat went to someone else or the ride went terminal
                        // after the precondition read.
                        let result = ride::Entity::update_many()
                            .col_expr(
                                ride::Column::AvailableSeats,
                                Expr::col(ride::Column::AvailableSeats).sub(1),
                            )
                            .filter(ride::Column::Id.eq(ride_id))
                            .filter(ride::Column::Status.eq(RideStatus::Active))
                            .filter(ride::Column::AvailableSeats.gt(0))
                            .exec(txn)
                            .await?;

                        if result.rows_affected == 0 {
                            let current = ride::Entity::find_by_id(ride_id)
                                .one(txn)
                                .await?
                                .ok_or_else(|| {
                                    AppError::NotFound("Ride not found".to_string())
                                })?;

                            if current.status.is_terminal() {
                                return Err(AppError::InvalidTransition(format!(
                                    "Ride is already {}",
                                    current.status.to_value()
                                )));
                            }
                            return Err(AppError::NoSeatsAvailable);
                        }
                    }
                    BookingDecision::Cancelled if was_confirmed => {
                        let result = ride::Entity::update_many()
                            .col_expr(
                                ride::Column::AvailableSeats,
                                Expr::col(ride::Column::AvailableSeats).add(1),
                            )
                            .filter(ride::Column::Id.eq(ride_id))
                            .filter(ride::Column::Status.eq(RideStatus::Active))
                            .exec(txn)
                            .await?;

                        if result.rows_affected == 0 {
                            return Err(AppError::InvalidTransition(
                                "Ride is no longer active".to_string(),
                            ));
                        }
                    }
                    BookingDecision::Cancelled => {}
                }

                // Compare-and-set on the status read outside the transaction;
                // a concurrent decision on the same booking touches no rows.
                let result = booking::Entity::update_many()
                    .col_expr(booking::Column::Status, target.as_enum())
                    .filter(booking::Column::Id.eq(booking_id))
                    .filter(booking::Column::Status.eq(prior_status))
                    .exec(txn)
                    .await?;

                if result.rows_affected == 0 {
                    return Err(AppError::InvalidTransition(
                        "Booking was updated concurrently".to_string(),
                    ));
                }

                booking::Entity::find_by_id(booking_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
            })
        })
        .await?;

    let driver_name = profile::Entity::find_by_id(actor_id)
        .one(db)
        .await
        .ok()
        .flatten()
        .map(|p| p.full_name)
        .unwrap_or_else(|| "the driver".to_string());

    let (title, content, kind) = match decision {
        BookingDecision::Confirmed => (
            "Ride Booking Confirmed",
            format!(
                "Your ride request from {} to {} has been accepted by {}.",
                ride.from_location, ride.to_location, driver_name
            ),
            notify::BOOKING_CONFIRMED,
        ),
        BookingDecision::Cancelled => (
            "Ride Booking Cancelled",
            format!(
                "Your ride request from {} to {} has been declined by {}.",
                ride.from_location, ride.to_location, driver_name
            ),
            notify::BOOKING_CANCELLED,
        ),
    };

    notify::dispatch(
        db,
        vec![Outgoing {
            user_id: updated.passenger_id,
            title: title.to_string(),
            content,
            notification_type: kind,
            reference_id: Some(ride_id),
        }],
    )
    .await;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};

    fn test_ride(driver_id: Uuid, seats: i32, status: RideStatus) -> ride::Model {
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
            available_seats: seats,
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
    async fn request_booking_unknown_ride_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<ride::Model>::new()])
            .into_connection();

        let err = request_booking(&db, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn driver_cannot_book_own_ride() {
        let driver = Uuid::new_v4();
        let ride = test_ride(driver, 2, RideStatus::Active);
        let ride_id = ride.id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ride]])
            .into_connection();

        let err = request_booking(&db, ride_id, driver).await.unwrap_err();
        assert!(matches!(err, AppError::SelfBookingForbidden));
    }

    #[tokio::test]
    async fn terminal_ride_rejects_new_requests() {
        let ride = test_ride(Uuid::new_v4(), 2, RideStatus::Completed);
        let ride_id = ride.id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ride]])
            .into_connection();

        let err = request_booking(&db, ride_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn existing_active_booking_blocks_rebooking() {
        let passenger = Uuid::new_v4();
        let ride = test_ride(Uuid::new_v4(), 2, RideStatus::Active);
        let ride_id = ride.id;
        let existing = test_booking(ride_id, passenger, BookingStatus::Pending);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ride]])
            .append_query_results([vec![existing]])
            .into_connection();

        let err = request_booking(&db, ride_id, passenger).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyBooked));
    }

    #[tokio::test]
    async fn full_ride_rejects_requests() {
        let passenger = Uuid::new_v4();
        let ride = test_ride(Uuid::new_v4(), 0, RideStatus::Active);
        let ride_id = ride.id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ride]])
            .append_query_results([Vec::<booking::Model>::new()])
            .into_connection();

        let err = request_booking(&db, ride_id, passenger).await.unwrap_err();
        assert!(matches!(err, AppError::NoSeatsAvailable));
    }

    #[tokio::test]
    async fn failed_insert_surfaces_as_store_error() {
        let passenger = Uuid::new_v4();
        let ride = test_ride(Uuid::new_v4(), 2, RideStatus::Active);
        let ride_id = ride.id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ride]])
            .append_query_results([Vec::<booking::Model>::new()])
            .append_query_errors([DbErr::Custom("connection reset".to_string())])
            .append_exec_errors([DbErr::Custom("connection reset".to_string())])
            .into_connection();

        let err = request_booking(&db, ride_id, passenger).await.unwrap_err();
        assert!(matches!(err, AppError::RemoteStore(_)));
    }

    #[tokio::test]
    async fn confirmation_rechecks_the_ride_inside_the_transaction() {
        let driver = Uuid::new_v4();
        let ride = test_ride(driver, 2, RideStatus::Active);
        let booking = test_booking(ride.id, Uuid::new_v4(), BookingStatus::Pending);
        let booking_id = booking.id;

        // The ride goes terminal between the precondition read and the
        // guarded decrement; the decrement touches no rows.
        let mut completed = ride.clone();
        completed.status = RideStatus::Completed;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![booking]])
            .append_query_results([vec![ride]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![completed]])
            .into_connection();

        let err = set_booking_status(&db, booking_id, BookingDecision::Confirmed, driver)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn last_seat_race_aborts_confirmation() {
        let driver = Uuid::new_v4();
        let ride = test_ride(driver, 1, RideStatus::Active);
        let booking = test_booking(ride.id, Uuid::new_v4(), BookingStatus::Pending);
        let booking_id = booking.id;

        // Another confirmation took the last seat first; the ride is still
        // active but the guarded decrement finds nothing to consume.
        let mut drained = ride.clone();
        drained.available_seats = 0;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![booking]])
            .append_query_results([vec![ride]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![drained]])
            .into_connection();

        let err = set_booking_status(&db, booking_id, BookingDecision::Confirmed, driver)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoSeatsAvailable));
    }

    #[tokio::test]
    async fn concurrent_decision_on_the_same_booking_touches_no_rows() {
        let driver = Uuid::new_v4();
        let ride = test_ride(driver, 2, RideStatus::Active);
        let booking = test_booking(ride.id, Uuid::new_v4(), BookingStatus::Pending);
        let booking_id = booking.id;

        // The status compare-and-set misses because another decision
        // already moved the booking out of `pending`.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![booking]])
            .append_query_results([vec![ride]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let err = set_booking_status(&db, booking_id, BookingDecision::Cancelled, driver)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn only_the_driver_may_decide_a_booking() {
        let ride = test_ride(Uuid::new_v4(), 2, RideStatus::Active);
        let booking = test_booking(ride.id, Uuid::new_v4(), BookingStatus::Pending);
        let booking_id = booking.id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![booking]])
            .append_query_results([vec![ride]])
            .into_connection();

        let stranger = Uuid::new_v4();
        let err = set_booking_status(&db, booking_id, BookingDecision::Confirmed, stranger)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn repeating_a_decision_is_a_noop() {
        let driver = Uuid::new_v4();
        let ride = test_ride(driver, 2, RideStatus::Active);
        let booking = test_booking(ride.id, Uuid::new_v4(), BookingStatus::Confirmed);
        let booking_id = booking.id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![booking.clone()]])
            .append_query_results([vec![ride]])
            .into_connection();

        // No exec results appended: a second decrement would fail the test.
        let result = set_booking_status(&db, booking_id, BookingDecision::Confirmed, driver)
            .await
            .unwrap();
        assert_eq!(result.status, BookingStatus::Confirmed);
        assert_eq!(result.id, booking.id);
    }

    #[tokio::test]
    async fn bookings_on_terminal_rides_are_frozen() {
        let driver = Uuid::new_v4();
        let ride = test_ride(driver, 2, RideStatus::Cancelled);
        let booking = test_booking(ride.id, Uuid::new_v4(), BookingStatus::Pending);
        let booking_id = booking.id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![booking]])
            .append_query_results([vec![ride]])
            .into_connection();

        let err = set_booking_status(&db, booking_id, BookingDecision::Confirmed, driver)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn cancelled_booking_cannot_be_confirmed() {
        let driver = Uuid::new_v4();
        let ride = test_ride(driver, 2, RideStatus::Active);
        let booking = test_booking(ride.id, Uuid::new_v4(), BookingStatus::Cancelled);
        let booking_id = booking.id;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![booking]])
            .append_query_results([vec![ride]])
            .into_connection();

        let err = set_booking_status(&db, booking_id, BookingDecision::Confirmed, driver)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }
}
