/*
 * SPDX-FileCopyrightText: 2024 OpenCyphal
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
// No warnings
//#![deny(warnings)]
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(clippy::empty_loop)]
#![deny(unreachable_code)]
#![deny(unreachable_pub)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]
//#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod buffer;
mod composite;
mod deserializer;
mod error;
mod primitive;
mod serializer;

pub use buffer::ZeroExtendingBuffer;
pub use composite::{from_bytes, to_vec, DelimiterHeader, DsdlObject};
pub use deserializer::Deserializer;
pub use error::FormatError;
pub use primitive::{saturating_f16, saturating_f32, StandardPrimitive};
pub use serializer::Serializer;

/// Prelude module to import everything this crate's generated code needs.
pub mod prelude {
    pub use crate::{
        bail_format, from_bytes, to_vec, DelimiterHeader, Deserializer, DsdlObject, FormatError,
        Serializer, StandardPrimitive, ZeroExtendingBuffer,
    };
}
