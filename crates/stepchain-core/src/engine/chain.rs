use crate::errors::ChainError;
use crate::model::{HistoryId, Step, StepId};
use crate::storage::StoreTx;

/// Resuelve una lista de referencias a steps completos, en el mismo orden.
pub fn resolve_steps(tx: &mut dyn StoreTx, ids: &[StepId]) -> Result<Vec<Step>, ChainError> {
    ids.iter()
       .map(|id| tx.find_step(*id)?.ok_or_else(|| ChainError::not_found("step", id)))
       .collect()
}

/// Cadena que termina en `step`: de la raíz hasta `step` inclusive.
pub fn walk_chain(tx: &mut dyn StoreTx, step: StepId) -> Result<Vec<Step>, ChainError> {
    let mut chain = Vec::new();
    let mut cursor = Some(step);
    while let Some(id) = cursor {
        let current = tx.find_step(id)?.ok_or_else(|| ChainError::not_found("step", id))?;
        cursor = current.previous;
        chain.push(current);
    }
    chain.reverse();
    Ok(chain)
}

/// Verifica el invariante de la historia: empieza en un step raíz, cada
/// step enlaza al anterior de la secuencia y los timestamps crecen
/// estrictamente.
pub fn verify_history(tx: &mut dyn StoreTx, history: HistoryId) -> Result<(), ChainError> {
    tx.find_history(history)?
      .ok_or_else(|| ChainError::not_found("history", history))?;
    let ids = tx.history_step_ids(history)?;
    let steps = resolve_steps(tx, &ids)?;
    let mut previous: Option<&Step> = None;
    for (position, step) in steps.iter().enumerate() {
        if step.previous != previous.map(|p| p.id) {
            return Err(ChainError::Validation(format!("history {history}: step {} at position {position} does not link to the preceding step",
                                                      step.id)));
        }
        if let Some(p) = previous {
            if step.created_at <= p.created_at {
                return Err(ChainError::Validation(format!("history {history}: timestamp of step {} at position {position} is not after its predecessor",
                                                          step.id)));
            }
        }
        previous = Some(step);
    }
    Ok(())
}
