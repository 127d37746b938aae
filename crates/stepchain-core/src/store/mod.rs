//! Store: punto de entrada sancionado para leer y mutar la cadena.
//!
//! Cada operación de escritura corre dentro de una unidad de trabajo
//! (`unit_of_work`): begin al entrar, commit si el closure devuelve `Ok`,
//! rollback ante `Err`. Para agrupar varias operaciones de forma atómica se
//! usa `unit_of_work` directamente; todas las operaciones del closure
//! comparten la misma transacción a través del `UnitOfWork`.
//!
//! Las lecturas (`fetch_*`, `list_*`, recorridos) usan `read`, que ve el
//! último estado confirmado sin tomar el lock de escritura.

mod unit_of_work;

pub use unit_of_work::UnitOfWork;

use log::debug;

use crate::errors::ChainError;
use crate::model::{History, HistoryId, Step, StepId, User, UserId};
use crate::payload::Payload;
use crate::selector::{HistorySelector, UserSelector};
use crate::storage::{Backend, InMemoryBackend};

pub struct Store<B: Backend> {
    backend: B,
}

impl Store<InMemoryBackend> {
    /// Store con backend en memoria (tests, prototipos).
    pub fn in_memory() -> Self {
        Self::new(InMemoryBackend::new())
    }
}

impl<B: Backend> Store<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Ejecuta `f` dentro de una transacción de escritura.
    pub fn unit_of_work<T, F>(&self, mut f: F) -> Result<T, ChainError>
        where F: FnMut(&mut UnitOfWork<'_>) -> Result<T, ChainError>
    {
        self.backend.transaction(|tx| f(&mut UnitOfWork::new(tx)))
    }

    /// Ejecuta `f` sobre un snapshot consistente; sus escrituras se descartan.
    pub fn read<T, F>(&self, mut f: F) -> Result<T, ChainError>
        where F: FnMut(&mut UnitOfWork<'_>) -> Result<T, ChainError>
    {
        self.backend.snapshot(|tx| f(&mut UnitOfWork::new(tx)))
    }

    pub fn create_user(&self, name: &str, email: &str, passhash: Option<&str>) -> Result<User, ChainError> {
        debug!("create_user:start name={name}");
        self.unit_of_work(|uow| uow.create_user(name, email, passhash))
    }

    pub fn fetch_user(&self, selector: &UserSelector) -> Result<User, ChainError> {
        self.read(|uow| uow.fetch_user(selector))
    }

    pub fn list_users(&self) -> Result<Vec<User>, ChainError> {
        self.read(|uow| uow.list_users())
    }

    pub fn grant_role(&self, user: UserId, role: &str) -> Result<User, ChainError> {
        self.unit_of_work(|uow| uow.grant_role(user, role))
    }

    pub fn create_history(&self, user: UserId, name: &str) -> Result<History, ChainError> {
        self.unit_of_work(|uow| uow.create_history(user, name))
    }

    pub fn fetch_history(&self, selector: &HistorySelector) -> Result<History, ChainError> {
        self.read(|uow| uow.fetch_history(selector))
    }

    pub fn list_histories(&self, user: UserId) -> Result<Vec<History>, ChainError> {
        self.read(|uow| uow.list_histories(user))
    }

    pub fn append_step(&self, history: HistoryId, type_tag: &str, payload: impl Into<Payload>) -> Result<Step, ChainError> {
        let payload = payload.into();
        self.unit_of_work(|uow| uow.append_step(history, type_tag, payload.clone()))
    }

    pub fn fork_history(&self, selector: &HistorySelector, index: i64) -> Result<History, ChainError> {
        debug!("fork_history:start source={} index={index}", selector.id);
        self.unit_of_work(|uow| uow.fork_history(selector, index))
    }

    /// Agrega un step después de la posición `index` en una sola unidad de
    /// trabajo; ramifica con un fork si `index` no es el último step.
    pub fn extend_at(&self,
                     history: HistoryId,
                     index: i64,
                     type_tag: &str,
                     payload: impl Into<Payload>)
                     -> Result<(History, Step), ChainError> {
        let payload = payload.into();
        self.unit_of_work(|uow| uow.extend_at(history, index, type_tag, payload.clone()))
    }

    pub fn fetch_step(&self, id: StepId) -> Result<Step, ChainError> {
        self.read(|uow| uow.fetch_step(id))
    }

    pub fn next_steps(&self, id: StepId) -> Result<Vec<Step>, ChainError> {
        self.read(|uow| uow.next_steps(id))
    }

    pub fn history_steps(&self, history: HistoryId) -> Result<Vec<Step>, ChainError> {
        self.read(|uow| uow.history_steps(history))
    }

    pub fn chain(&self, step: StepId) -> Result<Vec<Step>, ChainError> {
        self.read(|uow| uow.chain(step))
    }

    pub fn verify_history(&self, history: HistoryId) -> Result<(), ChainError> {
        self.read(|uow| uow.verify_history(history))
    }
}
