//! SQLite database driver implementation

mod connection;

#[cfg(test)]
mod connection_tests;

pub use connection::{SqliteConnection, SqliteTransaction};
