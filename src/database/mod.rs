/*!
 * Database module for persistent storage of batch translation jobs.
 *
 * This module provides SQLite-based persistence for:
 * - Job records with status and progress, so jobs survive restarts
 * - Per-record failures counted against a job
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::DatabaseConnection;
pub use repository::Repository;
