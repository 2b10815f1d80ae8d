// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Live channel wire format.
//!
//! Binary frames start with a big-endian `u32` event type. Type `1` is a
//! preview image: a big-endian `u32` image format code at offset 4, then the
//! encoded image from offset 8. Text frames are JSON `{"type": .., "data": ..}`.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::ProtocolError;
use crate::events::{ImageFormat, PreviewImage};

/// Binary event type carrying a preview image.
pub const PREVIEW_IMAGE_EVENT: u32 = 1;

const HEADER_LEN: usize = 4;
const PREVIEW_HEADER_LEN: usize = 8;

/// One data frame read from the live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Text(_) => "text",
            Frame::Binary(_) => "binary",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A decoded text frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Decode a binary frame into the preview image it carries.
///
/// A missing format code falls back to JPEG, as does any code other than `2`.
///
/// # Examples
///
/// ```
/// use dagwood_client::events::ImageFormat;
/// use dagwood_client::transport::decode_binary;
///
/// let mut frame = vec![0, 0, 0, 1, 0, 0, 0, 2];
/// frame.extend_from_slice(b"\x89PNG");
///
/// let preview = decode_binary(&frame).unwrap();
/// assert_eq!(preview.format, ImageFormat::Png);
/// assert_eq!(preview.bytes, b"\x89PNG");
/// ```
pub fn decode_binary(bytes: &[u8]) -> Result<PreviewImage, ProtocolError> {
    let event_type = read_u32(bytes, 0).ok_or(ProtocolError::TruncatedFrame { len: bytes.len() })?;
    if event_type != PREVIEW_IMAGE_EVENT {
        return Err(ProtocolError::UnknownBinaryEvent(event_type));
    }

    Ok(PreviewImage {
        format: ImageFormat::from_code(read_u32(bytes, HEADER_LEN)),
        bytes: bytes.get(PREVIEW_HEADER_LEN..).unwrap_or_default().to_vec(),
    })
}

/// Parse a text frame's envelope.
pub fn parse_text(text: &str) -> Result<TextMessage, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let word: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_be_bytes(word))
}
