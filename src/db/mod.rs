// Database module
// This module handles SQLite persistence of songs and queues

pub mod connection;
pub mod migrations;
pub mod models;
pub mod operations;

pub use connection::DatabaseConnection;
pub use operations::DbOperations;
