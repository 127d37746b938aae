//! Step-chain engine: append, fork y recorridos sobre la cadena.
//!
//! Todas las funciones reciben la transacción abierta (`&mut dyn StoreTx`) y
//! nunca tragan errores: cualquier `Err` sube hasta el scope de la
//! transacción, que revierte.

mod append;
mod chain;
mod clock;
mod extend;
mod fork;
mod history;

pub use append::append_step;
pub use chain::{resolve_steps, verify_history, walk_chain};
pub use clock::next_timestamp;
pub use extend::extend_at;
pub use fork::fork_history;
pub use history::create_history;
