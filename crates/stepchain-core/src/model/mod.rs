//! Entidades del modelo: datos planos, sin lógica de persistencia.

mod history;
mod ids;
mod step;
mod user;

pub use history::{History, HistoryMeta};
pub use ids::{HistoryId, StepId, UserId};
pub use step::Step;
pub use user::User;
