// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod compile;
mod config;
mod request;
mod session;
mod submission;
mod transport;

pub use compile::CompileError;
pub use config::ConfigError;
pub use request::RequestError;
pub use session::SessionStoreError;
pub use submission::{format_prompt_error, SubmissionError};
pub use transport::{ProtocolError, TransportError};
