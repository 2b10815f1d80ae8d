// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod bus;
mod kinds;

pub use bus::{EventBus, Handler};
pub use kinds::{names, ClientEvent, ImageFormat, PreviewImage};
pub(crate) use kinds::value_to_id;
