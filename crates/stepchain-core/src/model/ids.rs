//! Identificadores de entidades.
//!
//! Newtypes sobre `Uuid` (v4) para que un `StepId` no pueda pasarse donde se
//! espera un `HistoryId`. Se generan al crear la entidad y no cambian.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ChainError;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $entity:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Genera un identificador nuevo (UUID v4).
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = ChainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|e| ChainError::Validation(format!("invalid {} id '{s}': {e}", $entity)))
            }
        }
    };
}

entity_id!(
    /// Identificador de usuario.
    UserId, "user"
);
entity_id!(
    /// Identificador de historia.
    HistoryId, "history"
);
entity_id!(
    /// Identificador de step. Estable aunque el step sea compartido por varias
    /// historias.
    StepId, "step"
);
