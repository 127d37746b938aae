use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{HistoryId, StepId, UserId};

/// Cabecera de una historia tal como la guarda el backend (sin secuencia).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMeta {
    pub id: HistoryId,
    pub name: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Historia: cabecera + secuencia ordenada de referencias a steps.
///
/// Invariante: `steps` es un recorrido contiguo desde un step raíz hasta el
/// último step, siguiendo los enlaces `previous`. Las referencias se
/// comparten con otras historias (tras un fork); nunca son copias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    pub id: HistoryId,
    pub name: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub steps: Vec<StepId>,
}

impl History {
    pub fn from_parts(meta: HistoryMeta, steps: Vec<StepId>) -> Self {
        Self { id: meta.id,
               name: meta.name,
               user_id: meta.user_id,
               created_at: meta.created_at,
               steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last_step(&self) -> Option<StepId> {
        self.steps.last().copied()
    }
}
