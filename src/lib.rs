//! # Groundskeeper
//!
//! Inheritance-based partition lifecycle management for PostgreSQL.
//!
//! Groundskeeper keeps time- and serial-partitioned tables healthy:
//! it pre-creates children ahead of the data, installs row routing
//! triggers, reaps expired partitions, and can move resident rows or
//! dismantle a set entirely.

pub mod boundary;
pub mod catalog;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod inspect;
pub mod lock;
pub mod maintenance;
pub mod materializer;
pub mod mover;
pub mod naming;
pub mod parent;
pub mod retention;
pub mod router;
pub mod undo;

pub use connection::connect;
pub use error::{Error, Result};
pub use executor::{Executor, MayPostgresExecutor};
