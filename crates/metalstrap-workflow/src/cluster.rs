//! Manager/worker partition for cluster mode

use metalstrap_actions::TargetConfig;
use tracing::info;

use crate::error::{Result, RunError};

/// Targets split into the cluster manager and its workers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub manager: TargetConfig,
    /// Workers, in configuration order
    pub workers: Vec<TargetConfig>,
}

/// Pick the manager
///
/// The target flagged `manager` wins; with none flagged the first target is
/// promoted. No targets, or several flagged, is an error.
pub fn partition(targets: &[TargetConfig]) -> Result<Partition> {
    if targets.is_empty() {
        return Err(RunError::NoTargets);
    }

    let flagged: Vec<usize> = targets
        .iter()
        .enumerate()
        .filter(|(_, target)| target.manager)
        .map(|(index, _)| index)
        .collect();

    let manager_index = match flagged.as_slice() {
        [] => {
            info!(host = %targets[0].ip, "No manager flagged, promoting first target");
            0
        }
        [index] => *index,
        _ => {
            return Err(RunError::MultipleManagers(
                flagged.iter().map(|i| targets[*i].ip.clone()).collect(),
            ))
        }
    };

    let mut workers = targets.to_vec();
    let manager = workers.remove(manager_index);
    Ok(Partition { manager, workers })
}
