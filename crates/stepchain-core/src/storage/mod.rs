//! Interfaz de almacenamiento (capacidades get / put / query-by-index).
//!
//! Las entidades no saben persistirse: cada backend implementa `StoreTx`
//! una vez y `Backend` decide cómo abrir, confirmar o revertir la
//! transacción. El engine sólo ve `&mut dyn StoreTx`.
//!
//! Contrato común a todos los backends:
//! - `insert_user` falla con `Conflict` si el nombre ya existe.
//! - `lock_history` serializa escritores sobre la misma historia hasta el
//!   fin de la transacción.
//! - `histories_of` devuelve historias en orden de creación.
//! - `next_step_ids` devuelve los hijos en orden de creación.
//! - Los steps nunca se actualizan ni se borran.

mod memory;

pub use memory::InMemoryBackend;

use crate::errors::ChainError;
use crate::model::{HistoryId, HistoryMeta, Step, StepId, User, UserId};
use crate::selector::UserSelector;

/// Vista transaccional sobre el backend.
pub trait StoreTx {
    fn insert_user(&mut self, user: &User) -> Result<(), ChainError>;
    fn find_user(&mut self, selector: &UserSelector) -> Result<Option<User>, ChainError>;
    fn list_users(&mut self) -> Result<Vec<User>, ChainError>;
    /// Agrega un rol (idempotente).
    fn add_role(&mut self, user: UserId, role: &str) -> Result<(), ChainError>;

    fn insert_history(&mut self, meta: &HistoryMeta) -> Result<(), ChainError>;
    fn find_history(&mut self, id: HistoryId) -> Result<Option<HistoryMeta>, ChainError>;
    /// Como `find_history`, pero bloquea la historia para escritura.
    fn lock_history(&mut self, id: HistoryId) -> Result<Option<HistoryMeta>, ChainError>;
    fn histories_of(&mut self, user: UserId) -> Result<Vec<HistoryMeta>, ChainError>;
    /// Última historia creada por `user`, sin cargar las demás.
    fn latest_history_of(&mut self, user: UserId) -> Result<Option<HistoryMeta>, ChainError>;

    /// Secuencia completa de referencias, de la raíz al final.
    fn history_step_ids(&mut self, id: HistoryId) -> Result<Vec<StepId>, ChainError>;
    /// Largo de la secuencia y último step, en O(1).
    fn history_tail(&mut self, id: HistoryId) -> Result<(usize, Option<StepId>), ChainError>;
    /// Agrega `step` en la posición `position` (== largo actual).
    fn push_history_step(&mut self, id: HistoryId, position: usize, step: StepId) -> Result<(), ChainError>;
    /// Copia por referencia los primeros `len` elementos de `source` en
    /// `target` (que debe estar vacía).
    fn copy_history_prefix(&mut self, source: HistoryId, target: HistoryId, len: usize) -> Result<(), ChainError>;

    /// Inserta un step y lo registra en el índice de hijos de su `previous`.
    fn insert_step(&mut self, step: &Step) -> Result<(), ChainError>;
    fn find_step(&mut self, id: StepId) -> Result<Option<Step>, ChainError>;
    fn next_step_ids(&mut self, id: StepId) -> Result<Vec<StepId>, ChainError>;
}

/// Fábrica de transacciones de un backend.
///
/// - `transaction`: abre una transacción de escritura, ejecuta `f` y
///   confirma si devuelve `Ok`; ante `Err` revierte todo. Un backend puede
///   reintentar `f` completo ante errores transitorios, por eso es `FnMut`.
/// - `snapshot`: lectura consistente del último estado confirmado. Las
///   escrituras hechas dentro de `f` se descartan.
pub trait Backend: Send + Sync {
    fn transaction<T, F>(&self, f: F) -> Result<T, ChainError>
        where F: FnMut(&mut dyn StoreTx) -> Result<T, ChainError>;

    fn snapshot<T, F>(&self, f: F) -> Result<T, ChainError>
        where F: FnMut(&mut dyn StoreTx) -> Result<T, ChainError>;
}
