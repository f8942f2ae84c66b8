pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_profiles;
mod m20240301_000002_create_rides;
mod m20240301_000003_create_bookings;
mod m20240301_000004_create_notifications;
mod m20240301_000005_create_ratings;
mod m20240301_000006_create_messages;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_profiles::Migration),
            Box::new(m20240301_000002_create_rides::Migration),
            Box::new(m20240301_000003_create_bookings::Migration),
            Box::new(m20240301_000004_create_notifications::Migration),
            Box::new(m20240301_000005_create_ratings::Migration),
            Box::new(m20240301_000006_create_messages::Migration),
        ]
    }
}
