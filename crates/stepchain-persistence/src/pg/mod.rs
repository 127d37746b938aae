//! Backend Postgres para `stepchain-core`.
//!
//! Cada `transaction` del core se traduce a una transacción Diesel
//! `READ WRITE` sobre una conexión del pool; las lecturas (`snapshot`) usan
//! `READ ONLY REPEATABLE READ` para ver un único estado confirmado.
//!
//! Concurrencia: `lock_history` hace `SELECT ... FOR UPDATE` sobre la fila de
//! la historia, así dos appends a la misma historia se serializan y el
//! segundo ve el tail que dejó el primero.
//!
//! Reintentos: conflictos de serialización y errores de conexión se
//! reintentan hasta 3 veces re-ejecutando la unidad de trabajo completa.

mod rows;
mod tx;

use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use log::{debug, warn};
use stepchain_core::{Backend, ChainError, Store, StoreTx};

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use tx::PgTx;

pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Store respaldado por Postgres.
pub type PgStore = Store<PgBackend<PoolProvider>>;

/// Proveedor abstracto de conexiones.
///
/// Contrato:
/// - Debe devolver una conexión válida o `PersistenceError::TransientIo` en
///   caso de error.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `PgPool`.
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

pub struct PgBackend<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgBackend<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl PgBackend<PoolProvider> {
    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(PoolProvider { pool })
    }
}

impl<P: ConnectionProvider> Backend for PgBackend<P> {
    fn transaction<T, F>(&self, mut f: F) -> Result<T, ChainError>
        where F: FnMut(&mut dyn StoreTx) -> Result<T, ChainError>
    {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .read_write()
                .run(|c| f(&mut PgTx::new(c)).map_err(PersistenceError::Chain))
        }).map_err(|e| {
              debug!("pg tx rolled back: {e}");
              ChainError::from(e)
          })
    }

    fn snapshot<T, F>(&self, mut f: F) -> Result<T, ChainError>
        where F: FnMut(&mut dyn StoreTx) -> Result<T, ChainError>
    {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .read_only()
                .repeatable_read()
                .run(|c| f(&mut PgTx::new(c)).map_err(PersistenceError::Chain))
        }).map_err(ChainError::from)
    }
}

fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict => true,
        PersistenceError::TransientIo(_) => true,
        PersistenceError::Chain(ChainError::Transient(_)) => true,
        // Algunos mensajes de error (dependen de driver/pg) pueden llegar como Unknown
        // con texto. Best-effort string match sin acoplar a SQLSTATE.
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected")
            || m.contains("could not serialize access due to concurrent update")
            || m.contains("terminating connection due to administrator command")
            || m.contains("connection closed")
            || m.contains("connection refused")
            || m.contains("timeout")
        }
        _ => false,
    }
}

/// Retry simple con backoff lineal (hasta 3 reintentos: 15ms, 30ms, 45ms).
/// Se emite `warn!` por intento. No altera semántica de negocio; sólo repite
/// la unidad de trabajo provista por `f`.
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms",
                      attempts + 1,
                      e,
                      delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

/// Construye un pool r2d2 y ejecuta las migraciones pendientes.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = if min_size == 0 { 1 } else { min_size };
    let validated_max = if max_size == 0 { 1 } else { max_size };
    if validated_min > validated_max {
        warn!("min_size > max_size ({} > {}), ajustando min=max", validated_min, validated_max);
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Abre un `PgStore` a partir de la configuración dada.
pub fn connect(cfg: &crate::config::DbConfig) -> Result<PgStore, ChainError> {
    let pool = build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)?;
    Ok(Store::new(PgBackend::from_pool(pool)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn retry_repeats_transient_failures_then_succeeds() {
        let calls = Cell::new(0);
        let out = with_retry(|| {
                      calls.set(calls.get() + 1);
                      if calls.get() < 3 {
                          Err(PersistenceError::SerializationConflict)
                      } else {
                          Ok(42)
                      }
                  }).expect("third attempt succeeds");
        assert_eq!(out, 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn retry_gives_up_after_three_retries() {
        let calls = Cell::new(0);
        let res: Result<(), _> = with_retry(|| {
            calls.set(calls.get() + 1);
            Err(PersistenceError::TransientIo("down".into()))
        });
        assert!(res.is_err());
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn client_errors_are_not_retried() {
        let calls = Cell::new(0);
        let res: Result<(), _> = with_retry(|| {
            calls.set(calls.get() + 1);
            Err(PersistenceError::Chain(ChainError::Validation("bad".into())))
        });
        assert!(res.is_err());
        assert_eq!(calls.get(), 1);
        assert!(is_retryable(&PersistenceError::Chain(ChainError::Transient("x".into()))));
        assert!(is_retryable(&PersistenceError::Unknown("Deadlock detected".into())));
    }
}
