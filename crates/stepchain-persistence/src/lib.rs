//! stepchain-persistence
//!
//! Backend Postgres (Diesel + r2d2) para `stepchain-core`.
//!
//! Módulos:
//! - `pg`: `PgBackend` (implementa `Backend`/`StoreTx`), pool y reintentos.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_pool, connect, ConnectionProvider, PgBackend, PgPool, PgStore, PoolProvider};
