use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StepId;
use crate::payload::Payload;

/// Registro inmutable de la cadena.
///
/// Sólo guarda la referencia hacia atrás (`previous`). Los steps siguientes
/// se derivan de un índice del backend (`StoreTx::next_step_ids`), nunca de
/// un puntero almacenado aquí.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub created_at: DateTime<Utc>,
    /// Mimetype / identificador de herramienta.
    pub type_tag: String,
    pub payload: Payload,
    pub previous: Option<StepId>,
}

impl Step {
    pub fn is_root(&self) -> bool {
        self.previous.is_none()
    }
}
