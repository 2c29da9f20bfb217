pub mod connection;
pub mod migrations;
pub mod interests;

pub use connection::{get_db_pool, DatabaseConfig};
pub use interests::PgInterestStore;
