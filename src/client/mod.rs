// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! HTTP side of the engine connection.
//!
//! [`RequestClient`] builds URLs and attaches the request policy;
//! [`EngineApi`] turns routes into typed calls; [`types`] holds the wire shapes.

mod api;
mod request;
pub mod types;

pub use api::{EngineApi, DEFAULT_HISTORY_ITEMS};
pub use request::{ApiRequest, RequestClient, USER_HEADER};
