// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for job submission, with a human-readable aggregation of the
//! engine's per-node validation failures.

use std::fmt::Write;

use thiserror::Error;

use crate::client::types::{NodeErrors, PromptErrorResponse};
use crate::errors::{CompileError, RequestError};

/// Errors that stop the current batch of a queue request.
///
/// None of these stop the queue itself; the driver moves on to the next
/// buffered request after recording the error.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The engine rejected the job with a structured error body
    #[error("{}", format_prompt_error(.response))]
    Rejected {
        status: u16,
        response: PromptErrorResponse,
    },

    /// The engine accepted the request but reported per-node errors
    #[error("{}", format_node_errors("Prompt has node errors", .0))]
    NodeErrors(NodeErrors),

    /// The request never produced an engine response
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The graph could not be compiled
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl SubmissionError {
    /// Per-node errors carried by this failure, if the engine reported any.
    pub fn node_errors(&self) -> Option<&NodeErrors> {
        match self {
            SubmissionError::Rejected { response, .. } => Some(&response.node_errors),
            SubmissionError::NodeErrors(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Render a rejected submission as `message[: details]` followed by one block
/// per failing node.
///
/// ```
/// use dagwood_client::client::types::{ErrorReason, NodeErrorDetail, PromptErrorResponse};
/// use dagwood_client::errors::format_prompt_error;
///
/// let mut response = PromptErrorResponse::default();
/// response.error = Some(ErrorReason {
///     message: "Prompt outputs failed validation".into(),
///     ..Default::default()
/// });
/// response.node_errors.insert(
///     "3".into(),
///     NodeErrorDetail {
///         class_type: "KSampler".into(),
///         errors: vec![ErrorReason {
///             message: "Value bigger than max".into(),
///             details: "steps".into(),
///             ..Default::default()
///         }],
///         ..Default::default()
///     },
/// );
///
/// assert_eq!(
///     format_prompt_error(&response),
///     "Prompt outputs failed validation\nKSampler:\n    - Value bigger than max: steps"
/// );
/// ```
pub fn format_prompt_error(response: &PromptErrorResponse) -> String {
    let headline = match &response.error {
        Some(error) if error.details.is_empty() => error.message.clone(),
        Some(error) => format!("{}: {}", error.message, error.details),
        None if response.node_errors.is_empty() => return "(unknown error)".to_string(),
        None => String::new(),
    };
    format_node_errors(&headline, &response.node_errors)
}

fn format_node_errors(headline: &str, node_errors: &NodeErrors) -> String {
    let mut message = headline.to_string();
    for detail in node_errors.values() {
        let _ = write!(message, "\n{}:", detail.class_type);
        for reason in &detail.errors {
            let _ = write!(message, "\n    - {}: {}", reason.message, reason.details);
        }
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::types::{ErrorReason, NodeErrorDetail};

    #[test]
    fn empty_response_is_unknown_error() {
        assert_eq!(
            format_prompt_error(&PromptErrorResponse::default()),
            "(unknown error)"
        );
    }

    #[test]
    fn details_are_appended_to_headline() {
        let response = PromptErrorResponse {
            error: Some(ErrorReason {
                message: "Invalid prompt".into(),
                details: "missing output node".into(),
                ..Default::default()
            }),
            node_errors: NodeErrors::new(),
        };
        let error = SubmissionError::Rejected { status: 400, response };
        assert_eq!(error.to_string(), "Invalid prompt: missing output node");
        assert_eq!(error.node_errors().map(|e| e.len()), Some(0));
    }

    #[test]
    fn node_errors_variant_lists_every_reason() {
        let mut errors = NodeErrors::new();
        errors.insert(
            "7".into(),
            NodeErrorDetail {
                class_type: "SaveImage".into(),
                errors: vec![
                    ErrorReason { message: "Required input is missing".into(), details: "images".into(), ..Default::default() },
                    ErrorReason { message: "Bad prefix".into(), details: "filename_prefix".into(), ..Default::default() },
                ],
                ..Default::default()
            },
        );
        let error = SubmissionError::NodeErrors(errors);
        assert_eq!(
            error.to_string(),
            "Prompt has node errors\nSaveImage:\n    - Required input is missing: images\n    - Bad prefix: filename_prefix"
        );
    }
}
