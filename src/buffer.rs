/*
 * SPDX-FileCopyrightText: 2024 OpenCyphal
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The read-side zero-extending byte source underpinning [`crate::Deserializer`].
//!
//! A `ZeroExtendingBuffer` behaves like a plain byte slice for in-range
//! indices and returns `0` for anything past the end, which is what gives
//! the Deserializer its "implicit zero extension" behavior almost for free.

use alloc::borrow::Cow;
use alloc::vec::Vec;

use anyhow::{ensure, Result};

/// A contiguous (or lazily-concatenated) read-only byte view that returns
/// zero bytes for any out-of-range access instead of failing.
///
/// Constructed once per [`crate::Deserializer`] (or per fork of one). When
/// built from exactly one fragment the view borrows it directly with no
/// copy; when built from several fragments they are concatenated once, up
/// front, into an owned buffer.
#[derive(Debug, Clone)]
pub struct ZeroExtendingBuffer<'a> {
    data: Cow<'a, [u8]>,
}

impl<'a> ZeroExtendingBuffer<'a> {
    /// Builds a buffer over an ordered sequence of byte fragments.
    ///
    /// If `fragments` contains exactly one slice it is referenced directly
    /// (zero-copy). Otherwise the fragments are concatenated, in order,
    /// into one owned allocation.
    pub fn new(fragments: &[&'a [u8]]) -> Self {
        let data = match fragments {
            [] => Cow::Borrowed(&[][..]),
            [single] => Cow::Borrowed(*single),
            many => {
                let mut owned = Vec::with_capacity(many.iter().map(|f| f.len()).sum());
                for f in many {
                    owned.extend_from_slice(f);
                }
                Cow::Owned(owned)
            }
        };
        Self { data }
    }

    /// Builds a buffer directly from a single already-available slice.
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self {
            data: Cow::Borrowed(data),
        }
    }

    /// Total number of bits in the underlying source (`len() * 8`).
    #[must_use]
    pub fn bit_length(&self) -> u64 {
        self.data.len() as u64 * 8
    }

    /// Number of bytes physically backing this buffer (not zero-extended).
    #[must_use]
    pub fn byte_length(&self) -> usize {
        self.data.len()
    }

    /// Returns the byte at `index`, or `0` if `index` is past the end of
    /// the source. Never fails: `index` is a `usize`, so the "negative
    /// index" usage error from the reference implementation is not
    /// representable here.
    #[must_use]
    pub fn get_byte(&self, index: usize) -> u8 {
        self.data.get(index).copied().unwrap_or(0)
    }

    /// Returns exactly `right - left` bytes starting at `left`, right-padded
    /// with zeros if the source is shorter than `right`. Never fails for
    /// `left <= right`; zero-copy (`Cow::Borrowed`) whenever the requested
    /// range is fully within the source.
    pub fn get_unsigned_slice(&self, left: usize, right: usize) -> Cow<'_, [u8]> {
        assert!(left <= right, "invalid slice boundary [{left}:{right}]");
        let len = self.data.len();
        if right <= len {
            return Cow::Borrowed(&self.data[left..right]);
        }
        let mut out = Vec::with_capacity(right - left);
        if left < len {
            out.extend_from_slice(&self.data[left..len]);
        }
        out.resize(right - left, 0);
        Cow::Owned(out)
    }

    /// Forks a sub-view of exactly `length` bytes starting at `offset`.
    ///
    /// The returned buffer bounds its own zero-extension horizon
    /// independently of `self` — reads past `length` bytes from the fork's
    /// own start, not past the parent's end. Requires
    /// `offset + length <= self.byte_length()`; this is a usage
    /// precondition, since the delimiter header that determines `length`
    /// must already have been validated against remaining space by the
    /// caller before forking.
    pub fn fork_bytes(&self, offset: usize, length: usize) -> Result<ZeroExtendingBuffer<'_>> {
        ensure!(
            offset + length <= self.data.len(),
            "fork_bytes: offset ({offset}) + length ({length}) exceeds buffer length ({})",
            self.data.len()
        );
        Ok(ZeroExtendingBuffer {
            data: Cow::Borrowed(&self.data[offset..offset + length]),
        })
    }
}
