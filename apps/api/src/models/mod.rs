pub mod connection;
pub mod draft;
pub mod publication;
pub mod trend;
