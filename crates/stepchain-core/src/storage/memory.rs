//! Backend en memoria.
//!
//! Las tablas viven en mapas persistentes (`im`): clonar `Tables` es O(1) y
//! comparte estructura. Una transacción de escritura trabaja sobre un clon
//! del estado confirmado y lo publica al confirmar; si `f` devuelve `Err`
//! el clon se descarta (rollback). Un único escritor a la vez (`writer`);
//! los lectores sólo toman el `RwLock` el tiempo de clonar.

use im::{HashMap as ImMap, Vector};
use log::debug;
use parking_lot::{Mutex, RwLock};

use super::{Backend, StoreTx};
use crate::errors::ChainError;
use crate::model::{HistoryId, HistoryMeta, Step, StepId, User, UserId};
use crate::selector::UserSelector;

#[derive(Clone, Default)]
struct Tables {
    users: ImMap<UserId, User>,
    user_names: ImMap<String, UserId>,
    user_order: Vector<UserId>,
    histories: ImMap<HistoryId, HistoryMeta>,
    histories_by_user: ImMap<UserId, Vector<HistoryId>>,
    sequences: ImMap<HistoryId, Vector<StepId>>,
    steps: ImMap<StepId, Step>,
    /// Índice derivado: step -> hijos en orden de creación.
    children: ImMap<StepId, Vector<StepId>>,
}

#[derive(Default)]
pub struct InMemoryBackend {
    committed: RwLock<Tables>,
    writer: Mutex<()>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for InMemoryBackend {
    fn transaction<T, F>(&self, mut f: F) -> Result<T, ChainError>
        where F: FnMut(&mut dyn StoreTx) -> Result<T, ChainError>
    {
        let _writer = self.writer.lock();
        let mut work = self.committed.read().clone();
        match f(&mut MemoryTx { tables: &mut work }) {
            Ok(out) => {
                *self.committed.write() = work;
                Ok(out)
            }
            Err(e) => {
                debug!("memory tx rolled back: {e}");
                Err(e)
            }
        }
    }

    fn snapshot<T, F>(&self, mut f: F) -> Result<T, ChainError>
        where F: FnMut(&mut dyn StoreTx) -> Result<T, ChainError>
    {
        let mut snap = self.committed.read().clone();
        f(&mut MemoryTx { tables: &mut snap })
    }
}

struct MemoryTx<'a> {
    tables: &'a mut Tables,
}

impl MemoryTx<'_> {
    fn sequence(&self, id: HistoryId) -> Result<&Vector<StepId>, ChainError> {
        self.tables.sequences.get(&id).ok_or_else(|| ChainError::not_found("history", id))
    }
}

impl StoreTx for MemoryTx<'_> {
    fn insert_user(&mut self, user: &User) -> Result<(), ChainError> {
        if self.tables.user_names.contains_key(&user.name) {
            return Err(ChainError::Conflict(format!("user name '{}' already exists", user.name)));
        }
        if self.tables.users.contains_key(&user.id) {
            return Err(ChainError::Conflict(format!("user id {} already exists", user.id)));
        }
        self.tables.user_names.insert(user.name.clone(), user.id);
        self.tables.users.insert(user.id, user.clone());
        self.tables.user_order.push_back(user.id);
        Ok(())
    }

    fn find_user(&mut self, selector: &UserSelector) -> Result<Option<User>, ChainError> {
        let id = match selector {
            UserSelector::Id(id) => Some(*id),
            UserSelector::Name(name) => self.tables.user_names.get(name).copied(),
        };
        Ok(id.and_then(|id| self.tables.users.get(&id).cloned()))
    }

    fn list_users(&mut self) -> Result<Vec<User>, ChainError> {
        Ok(self.tables
               .user_order
               .iter()
               .filter_map(|id| self.tables.users.get(id).cloned())
               .collect())
    }

    fn add_role(&mut self, user: UserId, role: &str) -> Result<(), ChainError> {
        let record = self.tables
                         .users
                         .get_mut(&user)
                         .ok_or_else(|| ChainError::not_found("user", user))?;
        record.roles.insert(role.to_string());
        Ok(())
    }

    fn insert_history(&mut self, meta: &HistoryMeta) -> Result<(), ChainError> {
        if !self.tables.users.contains_key(&meta.user_id) {
            return Err(ChainError::not_found("user", meta.user_id));
        }
        if self.tables.histories.contains_key(&meta.id) {
            return Err(ChainError::Conflict(format!("history id {} already exists", meta.id)));
        }
        let mut owned = self.tables.histories_by_user.get(&meta.user_id).cloned().unwrap_or_default();
        owned.push_back(meta.id);
        self.tables.histories_by_user.insert(meta.user_id, owned);
        self.tables.histories.insert(meta.id, meta.clone());
        self.tables.sequences.insert(meta.id, Vector::new());
        Ok(())
    }

    fn find_history(&mut self, id: HistoryId) -> Result<Option<HistoryMeta>, ChainError> {
        Ok(self.tables.histories.get(&id).cloned())
    }

    fn lock_history(&mut self, id: HistoryId) -> Result<Option<HistoryMeta>, ChainError> {
        // El lock de escritor ya serializa toda la transacción.
        self.find_history(id)
    }

    fn histories_of(&mut self, user: UserId) -> Result<Vec<HistoryMeta>, ChainError> {
        Ok(self.tables
               .histories_by_user
               .get(&user)
               .map(|ids| ids.iter().filter_map(|id| self.tables.histories.get(id).cloned()).collect())
               .unwrap_or_default())
    }

    fn latest_history_of(&mut self, user: UserId) -> Result<Option<HistoryMeta>, ChainError> {
        Ok(self.tables
               .histories_by_user
               .get(&user)
               .and_then(|ids| ids.last())
               .and_then(|id| self.tables.histories.get(id).cloned()))
    }

    fn history_step_ids(&mut self, id: HistoryId) -> Result<Vec<StepId>, ChainError> {
        Ok(self.sequence(id)?.iter().copied().collect())
    }

    fn history_tail(&mut self, id: HistoryId) -> Result<(usize, Option<StepId>), ChainError> {
        let seq = self.sequence(id)?;
        Ok((seq.len(), seq.last().copied()))
    }

    fn push_history_step(&mut self, id: HistoryId, position: usize, step: StepId) -> Result<(), ChainError> {
        if !self.tables.steps.contains_key(&step) {
            return Err(ChainError::not_found("step", step));
        }
        let seq = self.tables
                      .sequences
                      .get_mut(&id)
                      .ok_or_else(|| ChainError::not_found("history", id))?;
        if position != seq.len() {
            return Err(ChainError::Conflict(format!("history {id} expected position {}, got {position}", seq.len())));
        }
        seq.push_back(step);
        Ok(())
    }

    fn copy_history_prefix(&mut self, source: HistoryId, target: HistoryId, len: usize) -> Result<(), ChainError> {
        let src = self.sequence(source)?;
        if len > src.len() {
            let index = i64::try_from(len).map_err(|_| ChainError::Backend(format!("prefix length {len} does not fit in i64")))?;
            return Err(ChainError::Range { index,
                                           len: src.len() });
        }
        let prefix = src.take(len);
        if !self.sequence(target)?.is_empty() {
            return Err(ChainError::Conflict(format!("history {target} already has steps")));
        }
        self.tables.sequences.insert(target, prefix);
        Ok(())
    }

    fn insert_step(&mut self, step: &Step) -> Result<(), ChainError> {
        if self.tables.steps.contains_key(&step.id) {
            return Err(ChainError::Conflict(format!("step id {} already exists", step.id)));
        }
        if let Some(prev) = step.previous {
            if !self.tables.steps.contains_key(&prev) {
                return Err(ChainError::not_found("step", prev));
            }
            let mut kids = self.tables.children.get(&prev).cloned().unwrap_or_default();
            kids.push_back(step.id);
            self.tables.children.insert(prev, kids);
        }
        self.tables.steps.insert(step.id, step.clone());
        Ok(())
    }

    fn find_step(&mut self, id: StepId) -> Result<Option<Step>, ChainError> {
        Ok(self.tables.steps.get(&id).cloned())
    }

    fn next_step_ids(&mut self, id: StepId) -> Result<Vec<StepId>, ChainError> {
        if !self.tables.steps.contains_key(&id) {
            return Err(ChainError::not_found("step", id));
        }
        Ok(self.tables
               .children
               .get(&id)
               .map(|kids| kids.iter().copied().collect())
               .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn user(name: &str) -> User {
        User { id: UserId::generate(),
               name: name.to_string(),
               email: format!("{name}@example.org"),
               passhash: None,
               roles: BTreeSet::new(),
               created_at: Utc::now() }
    }

    #[test]
    fn err_inside_transaction_discards_all_writes() {
        let backend = InMemoryBackend::new();
        let u = user("ana");
        let res: Result<(), ChainError> = backend.transaction(|tx| {
                                                     tx.insert_user(&u)?;
                                                     Err(ChainError::Validation("abort".into()))
                                                 });
        assert!(res.is_err());
        let users = backend.snapshot(|tx| tx.list_users()).expect("list");
        assert!(users.is_empty(), "rolled back user must not be visible");
    }

    #[test]
    fn snapshot_writes_are_discarded() {
        let backend = InMemoryBackend::new();
        let u = user("ben");
        backend.snapshot(|tx| tx.insert_user(&u)).expect("insert in snapshot");
        let found = backend.snapshot(|tx| tx.find_user(&UserSelector::Name("ben".into()))).expect("find");
        assert!(found.is_none());
    }

    #[test]
    fn duplicate_user_name_conflicts() {
        let backend = InMemoryBackend::new();
        backend.transaction(|tx| tx.insert_user(&user("cleo"))).expect("first insert");
        let err = backend.transaction(|tx| tx.insert_user(&user("cleo"))).unwrap_err();
        assert!(matches!(err, ChainError::Conflict(_)), "got {err:?}");
    }

    fn history_of(owner: &User, name: &str) -> HistoryMeta {
        HistoryMeta { id: HistoryId::generate(),
                      name: name.into(),
                      user_id: owner.id,
                      created_at: Utc::now() }
    }

    #[test]
    fn latest_history_is_the_last_inserted() {
        let backend = InMemoryBackend::new();
        let u = user("eve");
        let first = history_of(&u, "first");
        let second = history_of(&u, "second");
        let latest = backend.transaction(|tx| {
                                tx.insert_user(&u)?;
                                assert!(tx.latest_history_of(u.id)?.is_none());
                                tx.insert_history(&first)?;
                                tx.insert_history(&second)?;
                                tx.latest_history_of(u.id)
                            })
                            .expect("latest");
        assert_eq!(latest.map(|h| h.id), Some(second.id));
    }

    #[test]
    fn prefix_longer_than_source_reports_exact_range() {
        let backend = InMemoryBackend::new();
        let u = user("finn");
        let source = history_of(&u, "source");
        let target = history_of(&u, "target");
        let err = backend.transaction(|tx| {
                             tx.insert_user(&u)?;
                             tx.insert_history(&source)?;
                             tx.insert_history(&target)?;
                             tx.copy_history_prefix(source.id, target.id, 3)
                         })
                         .unwrap_err();
        assert_eq!(err, ChainError::Range { index: 3, len: 0 });
    }

    #[test]
    fn push_at_wrong_position_conflicts() {
        let backend = InMemoryBackend::new();
        let u = user("dora");
        let meta = HistoryMeta { id: HistoryId::generate(),
                                 name: "h".into(),
                                 user_id: u.id,
                                 created_at: Utc::now() };
        let step = Step { id: StepId::generate(),
                          created_at: Utc::now(),
                          type_tag: "text/plain".into(),
                          payload: "x".into(),
                          previous: None };
        let err = backend.transaction(|tx| {
                             tx.insert_user(&u)?;
                             tx.insert_history(&meta)?;
                             tx.insert_step(&step)?;
                             tx.push_history_step(meta.id, 3, step.id)
                         })
                         .unwrap_err();
        assert!(matches!(err, ChainError::Conflict(_)), "got {err:?}");
    }
}
