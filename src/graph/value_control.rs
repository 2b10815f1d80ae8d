// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::behaviors::WidgetBehavior;

/// What happens to a numeric widget after each accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    #[default]
    Fixed,
    Increment,
    Decrement,
    Randomize,
}

/// Post-submission value rotation, so repeated runs of one request differ.
///
/// Values are kept within `[min, max]`: stepping past a bound clamps to it.
///
/// # Examples
///
/// ```
/// use dagwood_client::graph::{ControlMode, ValueControl, WidgetBehavior};
/// use serde_json::json;
///
/// let control = ValueControl::new(ControlMode::Decrement, 0, 10, 1);
/// let mut value = json!(1);
/// control.after_queued(&mut value);
/// assert_eq!(value, json!(0));
/// control.after_queued(&mut value);
/// assert_eq!(value, json!(0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueControl {
    pub mode: ControlMode,
    pub min: i64,
    pub max: i64,
    pub step: i64,
}

impl ValueControl {
    pub fn new(mode: ControlMode, min: i64, max: i64, step: i64) -> Self {
        Self {
            mode,
            min: min.min(max),
            max: max.max(min),
            step: step.max(1),
        }
    }

    /// Increment over the non-negative 53-bit range (exactly representable in JSON).
    pub fn increment() -> Self {
        Self::new(ControlMode::Increment, 0, (1_i64 << 53) - 1, 1)
    }

    /// Randomize over the same range. This is the `control_after_generate`
    /// default for seeds.
    pub fn randomize() -> Self {
        Self::new(ControlMode::Randomize, 0, (1_i64 << 53) - 1, 1)
    }

    fn next(&self, current: i64) -> i64 {
        match self.mode {
            ControlMode::Fixed => current,
            ControlMode::Increment => current.saturating_add(self.step).clamp(self.min, self.max),
            ControlMode::Decrement => current.saturating_sub(self.step).clamp(self.min, self.max),
            ControlMode::Randomize => rand::rng().random_range(self.min..=self.max),
        }
    }
}

impl WidgetBehavior for ValueControl {
    fn after_queued(&self, value: &mut Value) {
        // Non-integer values are left untouched
        if let Some(current) = value.as_i64() {
            *value = Value::from(self.next(current));
        }
    }
}
