// Postgres backend:
// - config: options validation and `Database` construction
// - params: `ToSql` for `RowValues`
// - query: result extraction
// - executor: statement execution on a client

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::{PostgresOptions, PostgresOptionsBuilder};
pub use params::Params;
pub use query::{build_result_set, postgres_extract_value};
