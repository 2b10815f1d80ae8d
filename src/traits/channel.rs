// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use url::Url;

use crate::errors::TransportError;
use crate::transport::Frame;

/// An open live channel, read frame by frame.
#[async_trait]
pub trait LiveChannel: Send {
    /// Next data frame. `None` once the channel has closed.
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>>;
}

/// Opens live channels.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn LiveChannel>, TransportError>;
}
