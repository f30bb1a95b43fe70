/*
 * SPDX-FileCopyrightText: 2024 OpenCyphal
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The write side of the bit-stream codec.

use alloc::vec;
use alloc::vec::Vec;

use anyhow::{ensure, Result};

use crate::primitive::StandardPrimitive;

/// One extra byte beyond the requested size absorbs the overhang written by
/// unaligned writes whose last partial byte extends past the nominal end.
const EXTRA_BUFFER_CAPACITY_BYTES: usize = 1;

enum Storage<'a> {
    Owned(Vec<u8>),
    Borrowed(&'a mut [u8]),
}

impl<'a> Storage<'a> {
    fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Owned(v) => v.as_slice(),
            Storage::Borrowed(s) => s,
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Storage::Owned(v) => v.as_mut_slice(),
            Storage::Borrowed(s) => s,
        }
    }
}

/// Writes a sequence of bit-level fields into a pre-sized byte buffer.
///
/// A `Serializer` is created once per top-level record via [`Serializer::new`]
/// and driven forward by a strictly sequential series of `add_*` calls; the
/// bit cursor never moves backwards except implicitly, when a forked child
/// serializer is dropped and the caller calls [`Serializer::skip_bits`] on
/// the parent to account for what the fork wrote.
///
/// Forking (see [`Serializer::fork_bytes`]) mutably borrows `self`, so the
/// Rust borrow checker — not caller discipline — guarantees that at most one
/// serializer in a fork tree is ever written to at a time: code that tries to
/// use a parent while a fork of it is still alive simply does not compile.
pub struct Serializer<'a> {
    buf: Storage<'a>,
    bit_offset: u64,
}

impl<'a> Serializer<'a> {
    /// Allocates a zero-filled buffer of `size + 1` bytes and returns a
    /// `Serializer` that owns it, cursor at zero.
    #[must_use]
    pub fn new(size: usize) -> Serializer<'static> {
        Serializer {
            buf: Storage::Owned(vec![0u8; size + EXTRA_BUFFER_CAPACITY_BYTES]),
            bit_offset: 0,
        }
    }

    /// Number of bits written so far.
    #[must_use]
    pub fn current_bit_length(&self) -> u64 {
        self.bit_offset
    }

    /// Read-only view of the meaningful prefix of the destination buffer,
    /// `ceil(current_bit_length() / 8)` bytes long. If `current_bit_length()`
    /// is not byte-aligned, the trailing bits of the last byte are zero
    /// (guaranteed by zero-initialization plus the OR-based unaligned write
    /// algorithm, which never overwrites bits it didn't just write).
    #[must_use]
    pub fn buffer(&self) -> &[u8] {
        let len = ((self.bit_offset + 7) / 8) as usize;
        &self.buf.as_slice()[..len]
    }

    /// Consumes the serializer and returns its meaningful prefix as an owned
    /// buffer. Used by the top-level [`crate::to_vec`] façade; forked
    /// serializers are never the target of this call since their footprint
    /// is consumed through the parent instead.
    #[must_use]
    pub fn into_buffer(self) -> Vec<u8> {
        let len = ((self.bit_offset + 7) / 8) as usize;
        match self.buf {
            Storage::Owned(mut v) => {
                v.truncate(len);
                v
            }
            Storage::Borrowed(s) => s[..len].to_vec(),
        }
    }

    fn byte_offset(&self) -> usize {
        (self.bit_offset / 8) as usize
    }

    /// Advances the cursor by `n` bits without writing anything. Used for
    /// padding and for "consuming" the footprint written by a forked child
    /// after it has been dropped.
    pub fn skip_bits(&mut self, n: u64) {
        self.bit_offset += n;
    }

    /// Advances the cursor, writing zero bits, until it is a multiple of
    /// `alignment` bits.
    pub fn pad_to_alignment(&mut self, alignment: u64) {
        while self.bit_offset % alignment != 0 {
            self.add_unaligned_bit(false);
        }
    }

    /// Forks a byte-aligned sub-window of `size + 1` bytes starting at the
    /// current cursor, for framing a delimited nested record.
    ///
    /// The fork mutably borrows `self`, so `self` cannot be touched again
    /// until the returned `Serializer` is dropped. The caller's protocol is:
    /// fork, serialize the nested object into the fork, drop the fork, then
    /// call `self.skip_bits(size * 8)` using the fork's own
    /// `current_bit_length()` (rounded up to bytes) as `size`.
    ///
    /// Fails if the cursor is not byte-aligned, or if fewer than
    /// `size + 1` bytes remain in the buffer.
    pub fn fork_bytes(&mut self, size: usize) -> Result<Serializer<'_>> {
        ensure!(
            self.bit_offset % 8 == 0,
            "cannot fork an unaligned serializer (bit_offset = {})",
            self.bit_offset
        );
        let offset = self.byte_offset();
        let needed = size + EXTRA_BUFFER_CAPACITY_BYTES;
        let full = self.buf.as_mut_slice();
        ensure!(
            full.len() - offset >= needed,
            "requested forked buffer size of {size} bytes leaves no room in {} remaining bytes",
            full.len() - offset
        );
        let window = &mut full[offset..offset + needed];
        log::trace!("forking serializer: {size} bytes at byte offset {offset}");
        Ok(Serializer {
            buf: Storage::Borrowed(window),
            bit_offset: 0,
        })
    }

    //
    // Fast methods for byte-aligned primitive fields.
    //

    /// Copies `x` verbatim into the buffer. Precondition: byte-aligned cursor.
    pub fn add_aligned_bytes(&mut self, x: &[u8]) {
        debug_assert_eq!(self.bit_offset % 8, 0);
        let off = self.byte_offset();
        self.buf.as_mut_slice()[off..off + x.len()].copy_from_slice(x);
        self.bit_offset += x.len() as u64 * 8;
    }

    /// Packs a slice of bools into bytes, little-endian bit order (bit 0 of
    /// the first byte is `x[0]`). Precondition: byte-aligned cursor.
    pub fn add_aligned_array_of_bits(&mut self, x: &[bool]) {
        debug_assert_eq!(self.bit_offset % 8, 0);
        let num_bytes = (x.len() + 7) / 8;
        let off = self.byte_offset();
        {
            let dest = &mut self.buf.as_mut_slice()[off..off + num_bytes];
            dest.fill(0);
            for (i, &bit) in x.iter().enumerate() {
                if bit {
                    dest[i / 8] |= 1 << (i % 8);
                }
            }
        }
        self.bit_offset += x.len() as u64;
    }

    /// Encodes an array of standard-bit-length primitives
    /// (`u8/u16/u32/u64`, `i8/i16/i32/i64`, `f16/f32/f64`) in little-endian
    /// order. Precondition: byte-aligned cursor.
    pub fn add_aligned_array_of_standard_primitives<T: StandardPrimitive>(&mut self, x: &[T]) {
        debug_assert_eq!(self.bit_offset % 8, 0);
        let off = self.byte_offset();
        let dest = &mut self.buf.as_mut_slice()[off..off + x.len() * T::BYTES];
        for (chunk, value) in dest.chunks_exact_mut(T::BYTES).zip(x.iter()) {
            value.write_le(chunk);
        }
        self.bit_offset += (x.len() * T::BYTES) as u64 * 8;
    }

    pub fn add_aligned_u8(&mut self, x: u8) {
        debug_assert_eq!(self.bit_offset % 8, 0);
        let off = self.byte_offset();
        self.buf.as_mut_slice()[off] = x;
        self.bit_offset += 8;
    }

    pub fn add_aligned_u16(&mut self, x: u16) {
        self.add_aligned_bytes(&x.to_le_bytes());
    }

    pub fn add_aligned_u32(&mut self, x: u32) {
        self.add_aligned_bytes(&x.to_le_bytes());
    }

    pub fn add_aligned_u64(&mut self, x: u64) {
        self.add_aligned_bytes(&x.to_le_bytes());
    }

    pub fn add_aligned_i8(&mut self, x: i8) {
        self.add_aligned_u8(x as u8);
    }

    pub fn add_aligned_i16(&mut self, x: i16) {
        self.add_aligned_u16(x as u16);
    }

    pub fn add_aligned_i32(&mut self, x: i32) {
        self.add_aligned_u32(x as u32);
    }

    pub fn add_aligned_i64(&mut self, x: i64) {
        self.add_aligned_u64(x as u64);
    }

    pub fn add_aligned_f16(&mut self, x: f64) {
        self.add_aligned_bytes(&crate::primitive::saturating_f16(x).to_le_bytes());
    }

    pub fn add_aligned_f32(&mut self, x: f64) {
        self.add_aligned_bytes(&crate::primitive::saturating_f32(x).to_le_bytes());
    }

    pub fn add_aligned_f64(&mut self, x: f64) {
        self.add_aligned_bytes(&x.to_le_bytes());
    }

    //
    // Less specialized: aligned start, non-standard bit length.
    //

    /// Writes the low `width` bits of `value`, discarding any higher bits.
    /// Precondition: byte-aligned cursor. Fails if `width == 0`.
    pub fn add_aligned_unsigned(&mut self, value: u64, width: u32) -> Result<()> {
        ensure!(width >= 1, "unsigned field width must be at least 1 bit");
        debug_assert_eq!(self.bit_offset % 8, 0);
        let bytes = unsigned_to_bytes(value, width);
        self.add_aligned_bytes(&bytes);
        // add_aligned_bytes advanced by a whole number of bytes; roll back
        // to the exact bit width requested.
        self.bit_offset -= bytes.len() as u64 * 8 - width as u64;
        Ok(())
    }

    /// Writes the low `width` bits of the two's-complement representation of
    /// `value`. Fails if `width < 2`.
    pub fn add_aligned_signed(&mut self, value: i64, width: u32) -> Result<()> {
        ensure!(width >= 2, "signed field width must be at least 2 bits");
        let unsigned = signed_to_unsigned(value, width);
        self.add_aligned_unsigned(unsigned, width)
    }

    //
    // Unaligned: no assumption about cursor position.
    //

    /// Writes a single bit.
    pub fn add_unaligned_bit(&mut self, x: bool) {
        let off = self.byte_offset();
        let shift = (self.bit_offset % 8) as u32;
        if x {
            self.buf.as_mut_slice()[off] |= 1 << shift;
        }
        self.bit_offset += 1;
    }

    /// Unaligned counterpart of [`Serializer::add_aligned_bytes`]. Each
    /// source byte `b` is split across the two affected destination bytes:
    /// `(b << left) & 0xff` is OR-ed into the current partial byte, and
    /// `b >> right` becomes (overwrites) the next byte, which is always
    /// zero-initialized residue at this point.
    pub fn add_unaligned_bytes(&mut self, value: &[u8]) {
        let left = (self.bit_offset % 8) as u32;
        if left == 0 {
            self.add_aligned_bytes(value);
            return;
        }
        let right = 8 - left;
        for &b in value {
            let off = self.byte_offset();
            {
                let buf = self.buf.as_mut_slice();
                buf[off] |= (b << left) & 0xFF;
                self.bit_offset += 8;
                let off = (self.bit_offset / 8) as usize;
                buf[off] = b >> right;
            }
        }
    }

    /// Unaligned counterpart of [`Serializer::add_aligned_array_of_bits`].
    pub fn add_unaligned_array_of_bits(&mut self, x: &[bool]) {
        let num_bytes = (x.len() + 7) / 8;
        let mut packed = vec![0u8; num_bytes];
        for (i, &bit) in x.iter().enumerate() {
            if bit {
                packed[i / 8] |= 1 << (i % 8);
            }
        }
        let backtrack = num_bytes as u64 * 8 - x.len() as u64;
        self.add_unaligned_bytes(&packed);
        self.bit_offset -= backtrack;
    }

    /// Unaligned counterpart of
    /// [`Serializer::add_aligned_array_of_standard_primitives`].
    pub fn add_unaligned_array_of_standard_primitives<T: StandardPrimitive>(&mut self, x: &[T]) {
        let mut packed = vec![0u8; x.len() * T::BYTES];
        for (chunk, value) in packed.chunks_exact_mut(T::BYTES).zip(x.iter()) {
            value.write_le(chunk);
        }
        self.add_unaligned_bytes(&packed);
    }

    /// Writes the low `width` bits of `value`, at any cursor position.
    /// Fails if `width == 0`.
    pub fn add_unaligned_unsigned(&mut self, value: u64, width: u32) -> Result<()> {
        ensure!(width >= 1, "unsigned field width must be at least 1 bit");
        let bytes = unsigned_to_bytes(value, width);
        let backtrack = bytes.len() as u64 * 8 - width as u64;
        self.add_unaligned_bytes(&bytes);
        self.bit_offset -= backtrack;
        Ok(())
    }

    /// Writes the low `width` bits of the two's-complement representation of
    /// `value`, at any cursor position. Fails if `width < 2`.
    pub fn add_unaligned_signed(&mut self, value: i64, width: u32) -> Result<()> {
        ensure!(width >= 2, "signed field width must be at least 2 bits");
        let unsigned = signed_to_unsigned(value, width);
        self.add_unaligned_unsigned(unsigned, width)
    }

    pub fn add_unaligned_f16(&mut self, x: f64) {
        self.add_unaligned_bytes(&crate::primitive::saturating_f16(x).to_le_bytes());
    }

    pub fn add_unaligned_f32(&mut self, x: f64) {
        self.add_unaligned_bytes(&crate::primitive::saturating_f32(x).to_le_bytes());
    }

    pub fn add_unaligned_f64(&mut self, x: f64) {
        self.add_unaligned_bytes(&x.to_le_bytes());
    }
}

/// Truncates `value` to its low `width` bits and packs them little-endian
/// into `ceil(width / 8)` bytes.
fn unsigned_to_bytes(value: u64, width: u32) -> Vec<u8> {
    debug_assert!(width >= 1 && width <= 64);
    let masked = if width == 64 {
        value
    } else {
        value & ((1u64 << width) - 1)
    };
    let num_bytes = ((width + 7) / 8) as usize;
    masked.to_le_bytes()[..num_bytes].to_vec()
}

/// Converts a signed value to its unsigned two's-complement representation
/// at `width` bits, per the format's "no range check, caller saturates"
/// contract.
fn signed_to_unsigned(value: i64, width: u32) -> u64 {
    if value < 0 {
        (value as i128 + (1i128 << width)) as u64
    } else {
        value as u64
    }
}
