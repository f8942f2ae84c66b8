const BASE_FARE: f64 = 5.0;
const PER_KM: f64 = 0.5;
const PER_MINUTE: f64 = 0.25;
const PER_EXTRA_PASSENGER: f64 = 2.0;

/// Estimate a fare from route distance and duration, rounded to the
/// nearest whole unit. The first passenger rides on the base fare; each
/// additional passenger adds a flat surcharge.
pub fn estimate_fare(distance_km: f64, duration_min: f64, passengers: u32) -> i64 {
    let extra_passengers = passengers.saturating_sub(1) as f64;

    let fare = BASE_FARE
        + distance_km * PER_KM
        + duration_min * PER_MINUTE
        + extra_passengers * PER_EXTRA_PASSENGER;

    fare.round() as i64
}
