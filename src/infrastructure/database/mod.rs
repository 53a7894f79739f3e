//! `PostgreSQL` connection management

pub mod connection;

pub use connection::DatabaseConnection;
