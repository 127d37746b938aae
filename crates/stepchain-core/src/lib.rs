//! stepchain-core: cadena de steps con forks por referencia.
//!
//! Un `Step` es inmutable y enlaza a su predecesor; una `History` es una
//! secuencia de referencias (raíz → último step) de un usuario. `fork`
//! crea otra historia que comparte un prefijo de esa secuencia sin copiar
//! steps; lo que se agregue después diverge de forma independiente.
//!
//! Módulos:
//! - `model`: entidades planas e identificadores.
//! - `payload`: valor opaco de un step y su codificación persistente.
//! - `storage`: capacidades de backend (`StoreTx`, `Backend`) y backend en
//!   memoria.
//! - `engine`: append / fork / recorridos.
//! - `store`: `Store` y `UnitOfWork` (límites transaccionales).
//! - `gate`: `RoleGate`.

pub mod constants;
pub mod engine;
pub mod errors;
pub mod gate;
pub mod model;
pub mod payload;
pub mod selector;
pub mod storage;
pub mod store;

pub use errors::{classify_error, ChainError, ErrorClass};
pub use gate::RoleGate;
pub use model::{History, HistoryId, HistoryMeta, Step, StepId, User, UserId};
pub use payload::Payload;
pub use selector::{HistorySelector, UserSelector};
pub use storage::{Backend, InMemoryBackend, StoreTx};
pub use store::{Store, UnitOfWork};

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn append_links_to_previous_tail() {
		let store = Store::in_memory();
		let user = store.create_user("test user", "foo@bar.com", None).expect("user");
		let h = store.create_history(user.id, "hist1").expect("history");

		let a = store.append_step(h.id, "text/plain", "my search string").expect("append a");
		assert_eq!(a.previous, None);
		let b = store.append_step(h.id, "application/intermine-path-query",
		                          json!({"select": ["Gene.id"], "where": {"id": [1, 2, 3]}}))
		             .expect("append b");
		assert_eq!(b.previous, Some(a.id));
		assert!(b.created_at > a.created_at);

		let h = store.fetch_history(&h.id.into()).expect("fetch");
		assert_eq!(h.steps, vec![a.id, b.id]);
	}

	#[test]
	fn fork_in_the_middle_fans_out() {
		let store = Store::in_memory();
		let user = store.create_user("u", "u@x.org", None).expect("user");
		let h = store.create_history(user.id, "hist").expect("history");
		let a = store.append_step(h.id, "t", json!(1)).expect("a");
		let b = store.append_step(h.id, "t", json!(2)).expect("b");

		let fork = store.fork_history(&h.id.into(), 1).expect("fork");
		let c = store.append_step(fork.id, "t", json!(3)).expect("c");

		let next: Vec<StepId> = store.next_steps(a.id).expect("next").into_iter().map(|s| s.id).collect();
		assert_eq!(next, vec![b.id, c.id]);
	}
}
