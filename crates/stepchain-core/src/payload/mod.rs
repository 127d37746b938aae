//! Payload opaco de un step y su codificación persistente.
//!
//! El payload es un valor JSON inmutable: objetos (mapas con claves string),
//! arrays (secuencias) y escalares. Se comparte vía `Arc`, así que clonar un
//! `Step` o leerlo desde varias historias no copia la estructura.

mod canonical_json;
mod codec;

pub use canonical_json::to_canonical_json;
pub use codec::{decode_payload, encode_payload};

use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Payload(Arc<Value>);

impl Payload {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// `true` si ambos payloads apuntan a la misma estructura en memoria.
    pub fn shares_with(&self, other: &Payload) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Payload {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::new(Value::String(s.to_string()))
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::new(Value::String(s))
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Payload::new)
    }
}
