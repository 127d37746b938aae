use std::collections::BTreeSet;

use chrono::Utc;

use crate::engine;
use crate::errors::ChainError;
use crate::model::{History, HistoryId, Step, StepId, User, UserId};
use crate::payload::Payload;
use crate::selector::{HistorySelector, UserSelector};
use crate::storage::StoreTx;

/// Transacción abierta con las operaciones del core.
///
/// Sólo existe dentro de `Store::unit_of_work` / `Store::read`; no puede
/// escapar del scope que la confirma o revierte.
pub struct UnitOfWork<'t> {
    tx: &'t mut dyn StoreTx,
}

impl<'t> UnitOfWork<'t> {
    pub fn new(tx: &'t mut dyn StoreTx) -> Self {
        Self { tx }
    }

    pub fn create_user(&mut self, name: &str, email: &str, passhash: Option<&str>) -> Result<User, ChainError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(ChainError::Validation("user name must not be empty".into()));
        }
        if !email.contains('@') {
            return Err(ChainError::Validation(format!("malformed email '{email}'")));
        }
        let user = User { id: UserId::generate(),
                          name: name.to_string(),
                          email: email.to_string(),
                          passhash: passhash.map(str::to_string),
                          roles: BTreeSet::new(),
                          created_at: Utc::now() };
        self.tx.insert_user(&user)?;
        Ok(user)
    }

    pub fn fetch_user(&mut self, selector: &UserSelector) -> Result<User, ChainError> {
        self.tx
            .find_user(selector)?
            .ok_or_else(|| ChainError::not_found("user", selector))
    }

    pub fn list_users(&mut self) -> Result<Vec<User>, ChainError> {
        self.tx.list_users()
    }

    pub fn grant_role(&mut self, user: UserId, role: &str) -> Result<User, ChainError> {
        let role = role.trim();
        if role.is_empty() {
            return Err(ChainError::Validation("role name must not be empty".into()));
        }
        self.tx.add_role(user, role)?;
        self.fetch_user(&UserSelector::Id(user))
    }

    pub fn create_history(&mut self, user: UserId, name: &str) -> Result<History, ChainError> {
        let meta = engine::create_history(&mut *self.tx, user, name)?;
        Ok(History::from_parts(meta, Vec::new()))
    }

    pub fn fetch_history(&mut self, selector: &HistorySelector) -> Result<History, ChainError> {
        let meta = self.tx
                       .find_history(selector.id)?
                       .ok_or_else(|| ChainError::not_found("history", selector.id))?;
        let steps = self.tx.history_step_ids(meta.id)?;
        Ok(History::from_parts(meta, steps))
    }

    /// Historias del usuario en orden de creación.
    pub fn list_histories(&mut self, user: UserId) -> Result<Vec<History>, ChainError> {
        self.fetch_user(&UserSelector::Id(user))?;
        let metas = self.tx.histories_of(user)?;
        metas.into_iter()
             .map(|meta| {
                 let steps = self.tx.history_step_ids(meta.id)?;
                 Ok(History::from_parts(meta, steps))
             })
             .collect()
    }

    pub fn append_step(&mut self, history: HistoryId, type_tag: &str, payload: impl Into<Payload>) -> Result<Step, ChainError> {
        engine::append_step(&mut *self.tx, history, type_tag, payload.into())
    }

    pub fn fork_history(&mut self, selector: &HistorySelector, index: i64) -> Result<History, ChainError> {
        engine::fork_history(&mut *self.tx, selector, index)
    }

    /// Agrega después de `index`: append si es el final, fork + append si no.
    pub fn extend_at(&mut self,
                     history: HistoryId,
                     index: i64,
                     type_tag: &str,
                     payload: impl Into<Payload>)
                     -> Result<(History, Step), ChainError> {
        engine::extend_at(&mut *self.tx, history, index, type_tag, payload.into())
    }

    pub fn fetch_step(&mut self, id: StepId) -> Result<Step, ChainError> {
        self.tx.find_step(id)?.ok_or_else(|| ChainError::not_found("step", id))
    }

    /// Steps cuyo `previous` es `id`, en orden de creación (de todas las
    /// historias).
    pub fn next_steps(&mut self, id: StepId) -> Result<Vec<Step>, ChainError> {
        let ids = self.tx.next_step_ids(id)?;
        engine::resolve_steps(&mut *self.tx, &ids)
    }

    pub fn history_steps(&mut self, history: HistoryId) -> Result<Vec<Step>, ChainError> {
        let found = self.fetch_history(&HistorySelector { id: history })?;
        engine::resolve_steps(&mut *self.tx, &found.steps)
    }

    pub fn chain(&mut self, step: StepId) -> Result<Vec<Step>, ChainError> {
        engine::walk_chain(&mut *self.tx, step)
    }

    pub fn verify_history(&mut self, history: HistoryId) -> Result<(), ChainError> {
        engine::verify_history(&mut *self.tx, history)
    }
}
