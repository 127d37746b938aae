use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Usuario dueño de historias.
///
/// `passhash` es opaco para el core: lo calcula (y verifica) la capa de
/// autenticación externa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub passhash: Option<String>,
    pub roles: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}
