use chrono::Utc;
use log::debug;

use super::next_timestamp;
use crate::errors::ChainError;
use crate::model::{HistoryId, Step, StepId};
use crate::payload::Payload;
use crate::storage::StoreTx;

/// Agrega un step al final de `history`.
///
/// El nuevo step enlaza al último step de la historia (o a ninguno si está
/// vacía) y queda registrado como hijo de ese step, visible para cualquier
/// otra historia que lo comparta. Costo O(1) respecto del largo de la cadena.
pub fn append_step(tx: &mut dyn StoreTx, history: HistoryId, type_tag: &str, payload: Payload) -> Result<Step, ChainError> {
    let type_tag = type_tag.trim();
    if type_tag.is_empty() {
        return Err(ChainError::Validation("step type tag must not be empty".into()));
    }
    tx.lock_history(history)?
      .ok_or_else(|| ChainError::not_found("history", history))?;

    let (position, last) = tx.history_tail(history)?;
    let previous_ts = match last {
        Some(id) => Some(tx.find_step(id)?
                           .ok_or_else(|| ChainError::not_found("step", id))?
                           .created_at),
        None => None,
    };

    let step = Step { id: StepId::generate(),
                      created_at: next_timestamp(Utc::now(), previous_ts),
                      type_tag: type_tag.to_string(),
                      payload,
                      previous: last };
    tx.insert_step(&step)?;
    tx.push_history_step(history, position, step.id)?;
    debug!("append_step history={history} step={} position={position} type_tag={}",
           step.id,
           step.type_tag);
    Ok(step)
}
