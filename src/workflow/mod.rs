//! Booking and seat-allocation workflow.
//!
//! Every operation here derives its actor from authenticated claims, runs
//! compound mutations inside a single transaction, and dispatches
//! notifications only after the transaction commits. Seat counters are
//! never read-then-written in application code; they mutate through
//! conditional updates so concurrent confirmations cannot drive
//! `available_seats` negative.

pub mod bookings;
pub mod notify;
pub mod rides;
