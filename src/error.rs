/*
 * SPDX-FileCopyrightText: 2024 OpenCyphal
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The data-facing failure kind raised by generated deserialization routines.
//!
//! The bit-stream core never raises this itself — it cannot, because of the
//! implicit zero-extension rule, every read always "succeeds" with some
//! value. `FormatError` exists for the code a [`crate::DsdlObject::deserialize`]
//! implementation runs on top of the core: rejecting an out-of-range union
//! tag, a delimiter header that claims more bytes than remain, and so on.

use core::fmt;

use alloc::string::String;

/// Indicates that a serialized representation is not a valid instance of the
/// type being deserialized.
///
/// This is the only error channel the top-level [`crate::from_bytes`] façade
/// catches; anything else escaping a `deserialize` body indicates a bug in
/// the (generated) deserialization routine and is left to propagate or panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError {
    message: String,
}

impl FormatError {
    /// Builds a new `FormatError` carrying a human-readable description of
    /// what about the input was invalid.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid DSDL serialized representation: {}", self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FormatError {}

/// Convenience macro mirroring `anyhow::bail!` but for the data-facing
/// [`FormatError`] channel used by generated `deserialize` bodies.
#[macro_export]
macro_rules! bail_format {
    ($($arg:tt)*) => {
        return Err($crate::FormatError::new(alloc::format!($($arg)*)))
    };
}
