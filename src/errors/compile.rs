// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors that escape graph compilation.
///
/// Unresolvable links never surface here; they degrade to an omitted input.
/// What remains are defects in the graph snapshot itself.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The graph could not be serialized into its workflow snapshot
    #[error("failed to snapshot graph workflow: {0}")]
    Snapshot(#[from] serde_json::Error),
}
