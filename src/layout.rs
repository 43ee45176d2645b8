//! Wire layout primitives shared by the dynamic codec and generated code.
//!
//! Everything here works on a borrowed `&[u8]` plus an offset and never
//! allocates on the read path. All multi-byte integers are little-endian.
//!
//! | Type | Wire form |
//! |------|-----------|
//! | `int`, `#` | 4 bytes |
//! | `long`, `double` | 8 bytes |
//! | `int128` / `int256` | 16 / 32 bytes |
//! | `bytes`, `string` | length prefix + data, zero padded to a multiple of 4 |
//! | `Vector<T>` | `0x1cb5c415` + count + elements (bare `vector<T>` drops the tag) |
//! | `true` | nothing; the value is the gating flag bit |
//!
//! Byte strings of 253 bytes or fewer use a one-byte length prefix. Longer
//! strings use `0xFE` followed by a 24-bit length. Padding is counted from the
//! first prefix byte.
//!
//! Generated modules implement [`TlRead`] / [`TlBareRead`] for their views and
//! build through [`TlWrite`]. Reads over untrusted input return
//! [`TlError::TruncatedBuffer`] instead of panicking.
//!
//! ## Profiling
//!
//! With the **`layout_profile`** feature, each field walk records how many
//! fields it skipped. Use [`reset_layout_profile`] / [`get_layout_profile`]
//! around a run; the `field_access` bench prints the totals.

use crate::error::{Result, TlError};
use byteorder::{ByteOrder, LittleEndian};
use std::cell::Cell;
use std::marker::PhantomData;

#[cfg(feature = "layout_profile")]
use std::cell::RefCell;
#[cfg(feature = "layout_profile")]
use std::collections::HashMap;

pub const VECTOR_TAG: u32 = 0x1cb5c415;
pub const BOOL_TRUE_TAG: u32 = 0x997275b5;
pub const BOOL_FALSE_TAG: u32 = 0xbc799737;

pub const TAG_LEN: usize = 4;
pub const FLAGS_LEN: usize = 4;

/// Longest byte string that still uses the one-byte length prefix.
pub const SHORT_BYTES_MAX: usize = 253;
pub const LONG_BYTES_MARKER: u8 = 0xFE;
/// A 24-bit length prefix caps byte strings at 16 MiB - 1.
pub const MAX_BYTES_LEN: usize = 0xFF_FFFF;

/// Maximum object nesting accepted by readers.
pub const MAX_DEPTH: u32 = 64;

// --- Bounds-checked slices ---

/// `len` bytes at `offset`, or `TruncatedBuffer`.
#[inline]
pub fn slice(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| buf.get(offset..end))
        .ok_or_else(|| TlError::truncated(buf.len(), offset, len))
}

#[inline]
pub fn slice_mut(buf: &mut [u8], offset: usize, len: usize) -> Result<&mut [u8]> {
    let buf_len = buf.len();
    offset
        .checked_add(len)
        .and_then(move |end| buf.get_mut(offset..end))
        .ok_or_else(|| TlError::truncated(buf_len, offset, len))
}

/// Check that `len` bytes exist at `offset`; returns `len` so size walks can add it.
#[inline]
pub fn ensure(buf: &[u8], offset: usize, len: usize) -> Result<usize> {
    slice(buf, offset, len).map(|_| len)
}

#[inline]
pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32> {
    slice(buf, offset, 4).map(LittleEndian::read_u32)
}

#[inline]
pub fn read_i32(buf: &[u8], offset: usize) -> Result<i32> {
    slice(buf, offset, 4).map(LittleEndian::read_i32)
}

#[inline]
pub fn read_i64(buf: &[u8], offset: usize) -> Result<i64> {
    slice(buf, offset, 8).map(LittleEndian::read_i64)
}

#[inline]
pub fn read_f64(buf: &[u8], offset: usize) -> Result<f64> {
    slice(buf, offset, 8).map(LittleEndian::read_f64)
}

/// `int128` / `int256` as raw little-endian bytes.
pub fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(slice(buf, offset, N)?);
    Ok(out)
}

pub fn write_u32(buf: &mut [u8], offset: usize, v: u32) -> Result<usize> {
    LittleEndian::write_u32(slice_mut(buf, offset, 4)?, v);
    Ok(4)
}

pub fn write_i32(buf: &mut [u8], offset: usize, v: i32) -> Result<usize> {
    LittleEndian::write_i32(slice_mut(buf, offset, 4)?, v);
    Ok(4)
}

pub fn write_i64(buf: &mut [u8], offset: usize, v: i64) -> Result<usize> {
    LittleEndian::write_i64(slice_mut(buf, offset, 8)?, v);
    Ok(8)
}

pub fn write_f64(buf: &mut [u8], offset: usize, v: f64) -> Result<usize> {
    LittleEndian::write_f64(slice_mut(buf, offset, 8)?, v);
    Ok(8)
}

/// Copy `data` verbatim (fixed-size arrays, pre-serialized objects).
pub fn write_raw(buf: &mut [u8], offset: usize, data: &[u8]) -> Result<usize> {
    slice_mut(buf, offset, data.len())?.copy_from_slice(data);
    Ok(data.len())
}

// --- bytes / string ---

#[inline]
pub fn bytes_header_len(len: usize) -> usize {
    if len <= SHORT_BYTES_MAX {
        1
    } else {
        4
    }
}

/// Encoded size of a byte string of `len` bytes, padding included.
#[inline]
pub fn encoded_bytes_len(len: usize) -> usize {
    (bytes_header_len(len) + len + 3) & !3
}

/// Decode the length prefix at `offset`: `(header_len, data_len)`.
fn bytes_prefix(buf: &[u8], offset: usize) -> Result<(usize, usize)> {
    let first = slice(buf, offset, 1)?[0];
    match first {
        LONG_BYTES_MARKER => {
            let len = LittleEndian::read_u24(slice(buf, offset + 1, 3)?) as usize;
            Ok((4, len))
        }
        0xFF => Err(TlError::Malformed {
            offset,
            reason: "reserved byte string length marker 0xff",
        }),
        n => Ok((1, n as usize)),
    }
}

/// Total encoded size of the byte string at `offset`.
pub fn bytes_size_of(buf: &[u8], offset: usize) -> Result<usize> {
    let (header, len) = bytes_prefix(buf, offset)?;
    let total = (header + len + 3) & !3;
    ensure(buf, offset, total)
}

/// Borrow the data of the byte string at `offset`; returns `(data, consumed)`.
pub fn read_bytes(buf: &[u8], offset: usize) -> Result<(&[u8], usize)> {
    let (header, len) = bytes_prefix(buf, offset)?;
    let total = (header + len + 3) & !3;
    ensure(buf, offset, total)?;
    Ok((&buf[offset + header..offset + header + len], total))
}

/// Write `data` as a TL byte string with zeroed padding; returns bytes written.
pub fn write_bytes(buf: &mut [u8], offset: usize, data: &[u8]) -> Result<usize> {
    if data.len() > MAX_BYTES_LEN {
        return Err(TlError::InvalidFieldState(format!(
            "byte string of {} bytes exceeds the 24-bit length prefix",
            data.len()
        )));
    }
    let total = encoded_bytes_len(data.len());
    let header = bytes_header_len(data.len());
    let out = slice_mut(buf, offset, total)?;
    if header == 1 {
        out[0] = data.len() as u8;
    } else {
        out[0] = LONG_BYTES_MARKER;
        LittleEndian::write_u24(&mut out[1..4], data.len() as u32);
    }
    out[header..header + data.len()].copy_from_slice(data);
    out[header + data.len()..].fill(0);
    Ok(total)
}

// --- vectors ---

#[inline]
pub fn vector_header_len(boxed: bool) -> usize {
    if boxed {
        8
    } else {
        4
    }
}

/// Read a vector header: `(count, header_len)`. Boxed vectors must start with
/// [`VECTOR_TAG`].
pub fn read_vector_header(buf: &[u8], offset: usize, boxed: bool) -> Result<(u32, usize)> {
    if boxed {
        let tag = read_u32(buf, offset)?;
        if tag != VECTOR_TAG {
            return Err(TlError::UnknownConstructor { tag });
        }
    }
    let header = vector_header_len(boxed);
    let count = read_u32(buf, offset + header - 4)?;
    Ok((count, header))
}

pub fn write_vector_header(buf: &mut [u8], offset: usize, boxed: bool, count: u32) -> Result<usize> {
    if boxed {
        write_u32(buf, offset, VECTOR_TAG)?;
    }
    let header = vector_header_len(boxed);
    write_u32(buf, offset + header - 4, count)?;
    Ok(header)
}

/// Size of the vector at `offset`, sizing each element with `elem_size`.
///
/// Zero-sized elements (tagless empty combinators) stop the loop early: a
/// huge count over a tiny buffer must not spin. Every other element advances
/// at least one byte, so the loop is bounded by the buffer length.
pub fn vector_size_of<F>(buf: &[u8], offset: usize, boxed: bool, mut elem_size: F) -> Result<usize>
where
    F: FnMut(&[u8], usize) -> Result<usize>,
{
    let (count, header) = read_vector_header(buf, offset, boxed)?;
    let mut pos = offset + header;
    for _ in 0..count {
        let n = elem_size(buf, pos)?;
        if n == 0 {
            break;
        }
        pos += n;
    }
    Ok(pos - offset)
}

// --- nesting guard ---

thread_local!(static DEPTH: Cell<u32> = const { Cell::new(0) });

/// Counts one level of object nesting while alive. Readers take one per
/// object so hostile input cannot exhaust the stack.
pub struct DepthGuard(());

impl DepthGuard {
    pub fn enter(offset: usize) -> Result<DepthGuard> {
        DEPTH.with(|d| {
            let next = d.get() + 1;
            if next > MAX_DEPTH {
                return Err(TlError::Malformed {
                    offset,
                    reason: "objects nested too deeply",
                });
            }
            d.set(next);
            Ok(DepthGuard(()))
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

// --- flags ---

/// A `#` field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Flags(pub u32);

/// Mask for flag bit `bit`; zero for bits past 31.
#[inline]
fn bit_mask(bit: u8) -> u32 {
    1u32.checked_shl(u32::from(bit)).unwrap_or(0)
}

impl Flags {
    /// `false` for bits past 31.
    #[inline]
    pub fn get(self, bit: u8) -> bool {
        self.0 & bit_mask(bit) != 0
    }

    /// Bits past 31 are ignored.
    #[inline]
    pub fn set(&mut self, bit: u8, on: bool) {
        if on {
            self.0 |= bit_mask(bit);
        } else {
            self.0 &= !bit_mask(bit);
        }
    }

    pub fn with(mut self, bit: u8, on: bool) -> Self {
        self.set(bit, on);
        self
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl From<u32> for Flags {
    fn from(v: u32) -> Self {
        Flags(v)
    }
}

/// Check a builder's `Option` argument against its flag bit.
pub fn check_gate(flags: u32, bit: u8, present: bool, field: &str) -> Result<()> {
    let set = flags & bit_mask(bit) != 0;
    match (set, present) {
        (true, false) => Err(TlError::InvalidFieldState(format!(
            "flag bit {bit} is set but `{field}` has no value"
        ))),
        (false, true) => Err(TlError::InvalidFieldState(format!(
            "`{field}` has a value but flag bit {bit} is clear"
        ))),
        _ => Ok(()),
    }
}

// --- typed reads ---

/// A value with a boxed wire form (tag included where the type has one).
pub trait TlRead<'a>: Sized {
    /// Bytes one instance at `offset` occupies.
    fn size_of(buf: &[u8], offset: usize) -> Result<usize>;
    /// Read one instance; returns the value and the bytes consumed.
    fn read(buf: &'a [u8], offset: usize) -> Result<(Self, usize)>;
}

/// A value with a bare wire form (no leading tag).
pub trait TlBareRead<'a>: Sized {
    fn bare_size_of(buf: &[u8], offset: usize) -> Result<usize>;
    fn read_bare(buf: &'a [u8], offset: usize) -> Result<(Self, usize)>;
}

/// Reads `T` in its bare form through [`TlRead`] (for `vector<%T>` elements
/// and `%T` fields).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bare<T>(pub T);

impl<'a, T: TlBareRead<'a>> TlRead<'a> for Bare<T> {
    fn size_of(buf: &[u8], offset: usize) -> Result<usize> {
        T::bare_size_of(buf, offset)
    }

    fn read(buf: &'a [u8], offset: usize) -> Result<(Self, usize)> {
        T::read_bare(buf, offset).map(|(v, n)| (Bare(v), n))
    }
}

macro_rules! fixed_read {
    ($t:ty, $len:expr, $read:expr) => {
        impl<'a> TlRead<'a> for $t {
            #[inline]
            fn size_of(buf: &[u8], offset: usize) -> Result<usize> {
                ensure(buf, offset, $len)
            }

            #[inline]
            fn read(buf: &'a [u8], offset: usize) -> Result<(Self, usize)> {
                $read(buf, offset).map(|v| (v, $len))
            }
        }
    };
}

fixed_read!(i32, 4, read_i32);
fixed_read!(u32, 4, read_u32);
fixed_read!(i64, 8, read_i64);
fixed_read!(f64, 8, read_f64);
fixed_read!([u8; 16], 16, read_array::<16>);
fixed_read!([u8; 32], 32, read_array::<32>);

impl<'a> TlRead<'a> for &'a [u8] {
    fn size_of(buf: &[u8], offset: usize) -> Result<usize> {
        bytes_size_of(buf, offset)
    }

    fn read(buf: &'a [u8], offset: usize) -> Result<(Self, usize)> {
        read_bytes(buf, offset)
    }
}

impl<'a> TlRead<'a> for bool {
    fn size_of(buf: &[u8], offset: usize) -> Result<usize> {
        Self::read(buf, offset).map(|(_, n)| n)
    }

    fn read(buf: &'a [u8], offset: usize) -> Result<(Self, usize)> {
        match read_u32(buf, offset)? {
            BOOL_TRUE_TAG => Ok((true, 4)),
            BOOL_FALSE_TAG => Ok((false, 4)),
            tag => Err(TlError::UnknownConstructor { tag }),
        }
    }
}

/// Lazy view over a serialized vector. Elements are read on demand.
pub struct VectorView<'a, T> {
    buf: &'a [u8],
    count: u32,
    header: usize,
    _elem: PhantomData<T>,
}

impl<'a, T> Clone for VectorView<'a, T> {
    fn clone(&self) -> Self {
        VectorView {
            buf: self.buf,
            count: self.count,
            header: self.header,
            _elem: PhantomData,
        }
    }
}

impl<'a, T> std::fmt::Debug for VectorView<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorView")
            .field("count", &self.count)
            .field("bytes", &self.buf.len())
            .finish()
    }
}

impl<'a, T: TlRead<'a>> VectorView<'a, T> {
    pub fn size_of_with(buf: &[u8], offset: usize, boxed: bool) -> Result<usize> {
        vector_size_of(buf, offset, boxed, T::size_of)
    }

    pub fn read_with(buf: &'a [u8], offset: usize, boxed: bool) -> Result<(Self, usize)> {
        let (declared, header) = read_vector_header(buf, offset, boxed)?;
        let mut pos = offset + header;
        let mut count = 0u32;
        while count < declared {
            let n = T::size_of(buf, pos)?;
            count += 1;
            pos += n;
            if n == 0 {
                break;
            }
        }
        let view = VectorView {
            buf: &buf[offset..pos],
            count,
            header,
            _elem: PhantomData,
        };
        Ok((view, pos - offset))
    }

    /// Number of elements [`Self::iter`] yields. Zero-sized elements cannot
    /// be told apart, so a run of them counts once.
    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The whole serialized vector, header included.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    pub fn iter(&self) -> VectorIter<'a, T> {
        VectorIter {
            buf: self.buf,
            pos: self.header,
            remaining: self.count,
            _elem: PhantomData,
        }
    }

    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.iter().collect()
    }
}

impl<'a, T: TlRead<'a>> TlRead<'a> for VectorView<'a, T> {
    fn size_of(buf: &[u8], offset: usize) -> Result<usize> {
        Self::size_of_with(buf, offset, true)
    }

    fn read(buf: &'a [u8], offset: usize) -> Result<(Self, usize)> {
        Self::read_with(buf, offset, true)
    }
}

impl<'a, T: TlRead<'a>> TlBareRead<'a> for VectorView<'a, T> {
    fn bare_size_of(buf: &[u8], offset: usize) -> Result<usize> {
        Self::size_of_with(buf, offset, false)
    }

    fn read_bare(buf: &'a [u8], offset: usize) -> Result<(Self, usize)> {
        Self::read_with(buf, offset, false)
    }
}

pub struct VectorIter<'a, T> {
    buf: &'a [u8],
    pos: usize,
    remaining: u32,
    _elem: PhantomData<T>,
}

impl<'a, T: TlRead<'a>> Iterator for VectorIter<'a, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        match T::read(self.buf, self.pos) {
            Ok((v, n)) => {
                if n == 0 {
                    // Zero-sized elements are indistinguishable; yield one.
                    self.remaining = 0;
                }
                self.pos += n;
                Some(Ok(v))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }
}

// --- typed writes ---

/// A value that builders can serialize into a pre-sized buffer.
pub trait TlWrite {
    fn encoded_len(&self) -> usize;
    fn write_to(&self, buf: &mut [u8], offset: usize) -> Result<usize>;
}

impl<T: TlWrite + ?Sized> TlWrite for &T {
    fn encoded_len(&self) -> usize {
        (**self).encoded_len()
    }

    fn write_to(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        (**self).write_to(buf, offset)
    }
}

impl TlWrite for i32 {
    fn encoded_len(&self) -> usize {
        4
    }
    fn write_to(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        write_i32(buf, offset, *self)
    }
}

impl TlWrite for i64 {
    fn encoded_len(&self) -> usize {
        8
    }
    fn write_to(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        write_i64(buf, offset, *self)
    }
}

impl TlWrite for f64 {
    fn encoded_len(&self) -> usize {
        8
    }
    fn write_to(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        write_f64(buf, offset, *self)
    }
}

impl TlWrite for bool {
    fn encoded_len(&self) -> usize {
        4
    }
    fn write_to(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        write_u32(buf, offset, if *self { BOOL_TRUE_TAG } else { BOOL_FALSE_TAG })
    }
}

impl<const N: usize> TlWrite for [u8; N] {
    fn encoded_len(&self) -> usize {
        N
    }
    fn write_to(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        write_raw(buf, offset, self)
    }
}

/// Byte slices serialize as TL `bytes`.
impl TlWrite for [u8] {
    fn encoded_len(&self) -> usize {
        encoded_bytes_len(self.len())
    }
    fn write_to(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        write_bytes(buf, offset, self)
    }
}

impl TlWrite for str {
    fn encoded_len(&self) -> usize {
        encoded_bytes_len(self.len())
    }
    fn write_to(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        write_bytes(buf, offset, self.as_bytes())
    }
}

/// Pre-serialized bytes (a nested object or vector) copied verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Raw<'a>(pub &'a [u8]);

impl TlWrite for Raw<'_> {
    fn encoded_len(&self) -> usize {
        self.0.len()
    }
    fn write_to(&self, buf: &mut [u8], offset: usize) -> Result<usize> {
        write_raw(buf, offset, self.0)
    }
}

pub fn vector_encoded_len<T: TlWrite>(items: &[T], boxed: bool) -> usize {
    vector_header_len(boxed) + items.iter().map(TlWrite::encoded_len).sum::<usize>()
}

/// Write header and elements of a vector at `offset`; returns bytes written.
pub fn write_vector<T: TlWrite>(buf: &mut [u8], offset: usize, items: &[T], boxed: bool) -> Result<usize> {
    let count = u32::try_from(items.len())
        .map_err(|_| TlError::InvalidFieldState(format!("vector of {} elements", items.len())))?;
    let mut pos = offset + write_vector_header(buf, offset, boxed, count)?;
    for item in items {
        pos += item.write_to(buf, pos)?;
    }
    Ok(pos - offset)
}

/// Serialize a vector of `items` into one exactly-sized allocation.
pub fn build_vector<T: TlWrite>(items: &[T], boxed: bool) -> Result<Vec<u8>> {
    let size = vector_encoded_len(items, boxed);
    let mut out = vec![0u8; size];
    let written = write_vector(&mut out, 0, items, boxed)?;
    debug_assert_eq!(written, size);
    Ok(out)
}

/// Serialize one byte string into an exactly-sized allocation.
pub fn build_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = vec![0u8; encoded_bytes_len(data.len())];
    write_bytes(&mut out, 0, data)?;
    Ok(out)
}

/// Reject a pre-serialized value whose walked size differs from its length.
pub fn check_exact(data: &[u8], size: usize, what: &str) -> Result<()> {
    if size != data.len() {
        return Err(TlError::InvalidFieldState(format!(
            "{what}: {} bytes supplied but the value occupies {size}",
            data.len()
        )));
    }
    Ok(())
}

// --- Layout profiling (feature "layout_profile") ---
//
// Field walks record label -> number of fields skipped. Reset before a run,
// read after it.

#[cfg(feature = "layout_profile")]
thread_local!(static LAYOUT_PROFILE: RefCell<HashMap<&'static str, u64>> = RefCell::new(HashMap::new()));

#[cfg(feature = "layout_profile")]
pub fn record_walk(label: &'static str, fields: usize) {
    LAYOUT_PROFILE.with(|p| *p.borrow_mut().entry(label).or_insert(0) += fields as u64);
}

#[cfg(not(feature = "layout_profile"))]
#[inline(always)]
pub fn record_walk(_label: &'static str, _fields: usize) {}

#[cfg(feature = "layout_profile")]
pub fn reset_layout_profile() {
    LAYOUT_PROFILE.with(|p| p.borrow_mut().clear());
}

#[cfg(not(feature = "layout_profile"))]
pub fn reset_layout_profile() {}

/// Fields skipped per walk label. Empty without the `layout_profile` feature.
#[cfg(feature = "layout_profile")]
pub fn get_layout_profile() -> std::collections::HashMap<String, u64> {
    LAYOUT_PROFILE.with(|p| p.borrow().iter().map(|(k, v)| (k.to_string(), *v)).collect())
}

#[cfg(not(feature = "layout_profile"))]
pub fn get_layout_profile() -> std::collections::HashMap<String, u64> {
    std::collections::HashMap::new()
}
