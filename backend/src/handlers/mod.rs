pub mod connections;

pub use connections::{connect, has_interest_from, pass, remove_connection_request};
