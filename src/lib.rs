//! stepchain
//!
//! Fachada del workspace: re-exporta el core (modelo, engine, store en
//! memoria) y agrega la configuración de aplicación y la conexión a
//! Postgres.
//!
//! ```no_run
//! let cfg = stepchain::config::AppConfig::load()?;
//! let store = stepchain::connect(&cfg)?;
//! let user = store.create_user("ana", "ana@example.org", None)?;
//! # Ok::<(), stepchain::ChainError>(())
//! ```

pub mod config;

pub use stepchain_core::*;
pub use stepchain_persistence::{PgBackend, PgStore};

/// Construye el pool (migrando el esquema) y devuelve un store Postgres.
pub fn connect(cfg: &config::AppConfig) -> Result<PgStore, ChainError> {
    let db = cfg.db_config()?;
    log::debug!("connecting to postgres (pool {}..={})", db.min_connections, db.max_connections);
    stepchain_persistence::connect(&db)
}
