//! # renewal-store
//!
//! PostgreSQL implementation of the membership store contract from
//! `renewal-core`. Migrations are embedded and run on connect.

mod postgres;

pub use postgres::PgStore;
