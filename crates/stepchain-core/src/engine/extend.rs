use log::debug;

use super::{append_step, fork_history};
use crate::errors::ChainError;
use crate::model::{History, HistoryId, Step};
use crate::payload::Payload;
use crate::selector::HistorySelector;
use crate::storage::StoreTx;

/// Agrega un step inmediatamente después de la posición `index`.
///
/// Si `index` es el último step (o `-1` con la historia vacía) es un append
/// común sobre `history`. Si no, se hace fork en `index + 1` y el step se
/// agrega al fork. Devuelve la historia que recibió el step.
///
/// Fuera de `-1..len` es `ChainError::Range` con la posición de fork
/// (`index + 1`).
pub fn extend_at(tx: &mut dyn StoreTx,
                 history: HistoryId,
                 index: i64,
                 type_tag: &str,
                 payload: Payload)
                 -> Result<(History, Step), ChainError> {
    tx.find_history(history)?
      .ok_or_else(|| ChainError::not_found("history", history))?;
    let (len, _) = tx.history_tail(history)?;
    let next = index.checked_add(1).ok_or(ChainError::Range { index, len })?;

    let target = if usize::try_from(next).is_ok_and(|n| n == len) {
        history
    } else {
        fork_history(tx, &HistorySelector { id: history }, next)?.id
    };
    let step = append_step(tx, target, type_tag, payload)?;

    let meta = tx.find_history(target)?
                 .ok_or_else(|| ChainError::not_found("history", target))?;
    let steps = tx.history_step_ids(target)?;
    debug!("extend_at history={history} index={index} target={target} step={}", step.id);
    Ok((History::from_parts(meta, steps), step))
}
