//! Selectores explícitos para resolver entidades.
//!
//! Un usuario se resuelve por id o por nombre (ambos únicos). Una historia
//! se resuelve sólo por id: el nombre de historia no es único por usuario.
//! La entrada externa (JSON de sesión, argumentos) se valida al construir el
//! selector, no en la consulta.

use serde_json::Value;

use crate::errors::ChainError;
use crate::model::{HistoryId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserSelector {
    Id(UserId),
    Name(String),
}

impl UserSelector {
    /// Construye el selector a partir de campos opcionales. Exactamente uno
    /// debe estar presente.
    pub fn from_parts(id: Option<UserId>, name: Option<&str>) -> Result<Self, ChainError> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        match (id, name) {
            (Some(id), None) => Ok(Self::Id(id)),
            (None, Some(name)) => Ok(Self::Name(name.to_string())),
            (Some(_), Some(_)) => Err(ChainError::Validation("user selector is ambiguous: give either id or name".into())),
            (None, None) => Err(ChainError::Validation("user selector requires id or name".into())),
        }
    }

    /// Acepta `{"id": "<uuid>"}` o `{"name": "<nombre>"}`.
    pub fn from_json(value: &Value) -> Result<Self, ChainError> {
        let obj = value.as_object()
                       .ok_or_else(|| ChainError::Validation("user selector must be a JSON object".into()))?;
        let id = match obj.get("id") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.parse::<UserId>()?),
            Some(other) => return Err(ChainError::Validation(format!("user id must be a string, got {other}"))),
        };
        let name = match obj.get("name") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(other) => return Err(ChainError::Validation(format!("user name must be a string, got {other}"))),
        };
        Self::from_parts(id, name)
    }
}

impl From<UserId> for UserSelector {
    fn from(id: UserId) -> Self {
        Self::Id(id)
    }
}

impl std::fmt::Display for UserSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::Name(name) => write!(f, "name={name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistorySelector {
    pub id: HistoryId,
}

impl HistorySelector {
    /// Acepta `{"id": "<uuid>"}`. Un selector con `name` se rechaza.
    pub fn from_json(value: &Value) -> Result<Self, ChainError> {
        let obj = value.as_object()
                       .ok_or_else(|| ChainError::Validation("history selector must be a JSON object".into()))?;
        if obj.get("name").is_some_and(|v| !v.is_null()) {
            return Err(ChainError::Validation("histories are selected by id only".into()));
        }
        match obj.get("id") {
            Some(Value::String(s)) => Ok(Self { id: s.parse()? }),
            None | Some(Value::Null) => Err(ChainError::Validation("history selector requires id".into())),
            Some(other) => Err(ChainError::Validation(format!("history id must be a string, got {other}"))),
        }
    }
}

impl From<HistoryId> for HistorySelector {
    fn from(id: HistoryId) -> Self {
        Self { id }
    }
}
