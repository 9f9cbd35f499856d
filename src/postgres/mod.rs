// PostgreSQL driver - tokio-postgres clients pooled through bb8
//
// - config: options, the bb8 connection manager and pool setup
// - params: `ToSql` for `RowValues` and parameter binding checks
// - query: value extraction, stored procedure text and row streaming
// - connection: the `DriverConnection` implementation

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use config::{PgClient, PgManager, PostgresOptions, PostgresOptionsBuilder};
pub use connection::PostgresConnection;
