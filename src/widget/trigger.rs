//! Threshold trigger: decides whether the due total warrants an alert.
//!
//! The trigger is stateless. Replacing rather than stacking repeated alerts is
//! the notifier's job, keyed by [`ALERT_SLOT`].

use serde::{Deserialize, Serialize};

/// Default minimum due count before an alert is raised.
pub const DEFAULT_MINIMUM_DUE: u64 = 25;

/// Fixed notifier slot so a new alert replaces the previous one.
pub const ALERT_SLOT: u32 = 1;

/// Request to raise (or replace) the due-cards alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSignal {
    /// Count to display in the alert.
    pub due_count: u64,
    /// Notifier slot the alert occupies.
    pub slot: u32,
}

/// Fires iff `total_due >= threshold`.
#[must_use]
pub fn evaluate(total_due: u64, threshold: u64) -> Option<TriggerSignal> {
    (total_due >= threshold).then_some(TriggerSignal {
        due_count: total_due,
        slot: ALERT_SLOT,
    })
}
