// SQLite driver - rusqlite connections pooled through bb8
//
// - config: options, the bb8 connection manager and pool setup
// - params: binding parameters to prepared statements
// - query: value extraction and the blocking execution shapes
// - reader: demand-driven row streaming from a blocking worker
// - connection: the `DriverConnection` implementation

pub mod config;
pub mod connection;
pub mod params;
pub mod query;
pub mod reader;

pub use config::{SharedSqliteConnection, SqliteManager, SqliteOptions, SqliteOptionsBuilder};
pub use connection::SqliteConnection;
