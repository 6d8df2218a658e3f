//! Arraybind Core - Core abstractions shared by the marshaller and the drivers
//!
//! This crate provides the fundamental traits and types that all other
//! arraybind crates depend on. It defines:
//!
//! - `Connection` / `Transaction` - Traits for database connections and transactions
//! - `ArrayBinder` - Trait for targets that can run a single array-bind round trip
//! - `ArrayBindCommand` / `BindArray` - The positional array-bind wire contract
//! - Common types like `Value`, `Row`, `QueryResult`, etc.

mod bind;
mod connection;
mod error;
mod types;

pub use bind::*;
pub use connection::*;
pub use error::*;
pub use types::*;
