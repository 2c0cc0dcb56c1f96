// SQLite backend:
// - config: pool manager, options, and `Database` construction
// - params: conversion from `RowValues` into rusqlite values
// - query: result extraction
// - executor: blocking execution against a shared connection

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::{SharedSqliteConnection, SqliteManager, SqliteOptions, SqliteOptionsBuilder};
pub use query::build_result_set;
