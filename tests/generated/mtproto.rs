// Generated by tlgen. Do not edit.
#![allow(dead_code, unused_imports, unused_mut, unused_assignments, unused_variables, clippy::all)]

use tlschema as rt;
use rt::layout;
use rt::layout::{TlBareRead as _, TlRead as _, TlWrite as _};

/// `resPQ#05162463 nonce:int128 server_nonce:int128 pq:bytes server_public_key_fingerprints:Vector<long> = ResPQ;`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResPQ<'a> {
    buf: &'a [u8],
    header: usize,
}

impl<'a> ResPQ<'a> {
    pub const TAG: u32 = 0x05162463;
    pub const FIELD_COUNT: usize = 4;

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// Leading tag, not validated; `None` when read bare.
    pub fn constructor_tag(&self) -> Option<u32> {
        if self.header == 0 {
            return None;
        }
        layout::read_u32(self.buf, 0).ok()
    }

    fn offset_of(buf: &[u8], start: usize, stop: usize) -> rt::Result<usize> {
        let mut pos = start;
        for index in 0..stop.min(Self::FIELD_COUNT) {
            match index {
                0 => pos += layout::ensure(buf, pos, 16)?,
                1 => pos += layout::ensure(buf, pos, 16)?,
                2 => pos += layout::bytes_size_of(buf, pos)?,
                3 => pos += layout::vector_size_of(buf, pos, true, |buf, pos| layout::ensure(buf, pos, 8))?,
                _ => {}
            }
        }
        layout::record_walk("resPQ", stop.min(Self::FIELD_COUNT));
        Ok(pos)
    }

    /// Offset of field `index` within [`Self::as_bytes`]. Walks every
    /// earlier field on each call, so the cost grows with `index`;
    /// offsets are not cached.
    pub fn field_offset(&self, index: usize) -> rt::Result<usize> {
        if index >= Self::FIELD_COUNT {
            return Err(rt::TlError::InvalidFieldState(format!("`resPQ` has no field #{}", index)));
        }
        Self::offset_of(self.buf, self.header, index)
    }

    /// `nonce:int128`
    pub fn nonce(&self) -> rt::Result<[u8; 16]> {
        let pos = self.field_offset(0)?;
        <[u8; 16] as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// `server_nonce:int128`
    pub fn server_nonce(&self) -> rt::Result<[u8; 16]> {
        let pos = self.field_offset(1)?;
        <[u8; 16] as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// `pq:bytes`
    pub fn pq(&self) -> rt::Result<&'a [u8]> {
        let pos = self.field_offset(2)?;
        <&'a [u8] as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// `server_public_key_fingerprints:Vector<long>`
    pub fn server_public_key_fingerprints(&self) -> rt::Result<layout::VectorView<'a, i64>> {
        let pos = self.field_offset(3)?;
        layout::VectorView::<'a, i64>::read_with(self.buf, pos, true).map(|(v, _)| v)
    }

    /// Exact encoded size. `*_len` arguments are data lengths for byte
    /// strings and full encoded lengths for vectors and objects.
    pub fn required_size(pq_len: usize, server_public_key_fingerprints_len: usize) -> usize {
        4
            + 16
            + 16
            + layout::encoded_bytes_len(pq_len)
            + server_public_key_fingerprints_len
    }

    /// Serialize into one exactly-sized buffer. Every conditional argument
    /// must agree with its flag bit.
    pub fn build(nonce: &[u8; 16], server_nonce: &[u8; 16], pq: &[u8], server_public_key_fingerprints: &[i64]) -> rt::Result<Vec<u8>> {
        let size = Self::required_size(pq.len(), layout::vector_encoded_len(server_public_key_fingerprints, true));
        let mut buf = vec![0u8; size];
        let mut pos = 0usize;
        pos += layout::write_u32(&mut buf, pos, Self::TAG)?;
        pos += nonce.write_to(&mut buf, pos)?;
        pos += server_nonce.write_to(&mut buf, pos)?;
        pos += layout::write_bytes(&mut buf, pos, pq)?;
        pos += layout::write_vector(&mut buf, pos, server_public_key_fingerprints, true)?;
        debug_assert_eq!(pos, size);
        Ok(buf)
    }
}

impl<'a> layout::TlRead<'a> for ResPQ<'a> {
    fn size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 4)?;
        Ok(Self::offset_of(buf, offset + 4, Self::FIELD_COUNT)? - offset)
    }

    fn read(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlRead<'a>>::size_of(buf, offset)?;
        Ok((ResPQ { buf: &buf[offset..offset + size], header: 4 }, size))
    }
}

impl<'a> layout::TlBareRead<'a> for ResPQ<'a> {
    fn bare_size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 0)?;
        Ok(Self::offset_of(buf, offset, Self::FIELD_COUNT)? - offset)
    }

    fn read_bare(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlBareRead<'a>>::bare_size_of(buf, offset)?;
        Ok((ResPQ { buf: &buf[offset..offset + size], header: 0 }, size))
    }
}

/// `future_salt#0949d9dc valid_since:int valid_until:int salt:long = FutureSalt;`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FutureSalt<'a> {
    buf: &'a [u8],
    header: usize,
}

impl<'a> FutureSalt<'a> {
    pub const TAG: u32 = 0x0949d9dc;
    pub const FIELD_COUNT: usize = 3;

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// Leading tag, not validated; `None` when read bare.
    pub fn constructor_tag(&self) -> Option<u32> {
        if self.header == 0 {
            return None;
        }
        layout::read_u32(self.buf, 0).ok()
    }

    fn offset_of(buf: &[u8], start: usize, stop: usize) -> rt::Result<usize> {
        let mut pos = start;
        for index in 0..stop.min(Self::FIELD_COUNT) {
            match index {
                0 => pos += layout::ensure(buf, pos, 4)?,
                1 => pos += layout::ensure(buf, pos, 4)?,
                2 => pos += layout::ensure(buf, pos, 8)?,
                _ => {}
            }
        }
        layout::record_walk("future_salt", stop.min(Self::FIELD_COUNT));
        Ok(pos)
    }

    /// Offset of field `index` within [`Self::as_bytes`]. Walks every
    /// earlier field on each call, so the cost grows with `index`;
    /// offsets are not cached.
    pub fn field_offset(&self, index: usize) -> rt::Result<usize> {
        if index >= Self::FIELD_COUNT {
            return Err(rt::TlError::InvalidFieldState(format!("`future_salt` has no field #{}", index)));
        }
        Self::offset_of(self.buf, self.header, index)
    }

    /// `valid_since:int`
    pub fn valid_since(&self) -> rt::Result<i32> {
        let pos = self.field_offset(0)?;
        <i32 as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// `valid_until:int`
    pub fn valid_until(&self) -> rt::Result<i32> {
        let pos = self.field_offset(1)?;
        <i32 as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// `salt:long`
    pub fn salt(&self) -> rt::Result<i64> {
        let pos = self.field_offset(2)?;
        <i64 as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// Exact encoded size. `*_len` arguments are data lengths for byte
    /// strings and full encoded lengths for vectors and objects.
    pub fn required_size() -> usize {
        4
            + 4
            + 4
            + 8
    }

    /// Serialize into one exactly-sized buffer. Every conditional argument
    /// must agree with its flag bit.
    pub fn build(valid_since: i32, valid_until: i32, salt: i64) -> rt::Result<Vec<u8>> {
        let size = Self::required_size();
        let mut buf = vec![0u8; size];
        let mut pos = 0usize;
        pos += layout::write_u32(&mut buf, pos, Self::TAG)?;
        pos += valid_since.write_to(&mut buf, pos)?;
        pos += valid_until.write_to(&mut buf, pos)?;
        pos += salt.write_to(&mut buf, pos)?;
        debug_assert_eq!(pos, size);
        Ok(buf)
    }
}

impl<'a> layout::TlRead<'a> for FutureSalt<'a> {
    fn size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 4)?;
        Ok(Self::offset_of(buf, offset + 4, Self::FIELD_COUNT)? - offset)
    }

    fn read(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlRead<'a>>::size_of(buf, offset)?;
        Ok((FutureSalt { buf: &buf[offset..offset + size], header: 4 }, size))
    }
}

impl<'a> layout::TlBareRead<'a> for FutureSalt<'a> {
    fn bare_size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 0)?;
        Ok(Self::offset_of(buf, offset, Self::FIELD_COUNT)? - offset)
    }

    fn read_bare(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlBareRead<'a>>::bare_size_of(buf, offset)?;
        Ok((FutureSalt { buf: &buf[offset..offset + size], header: 0 }, size))
    }
}

/// `future_salts#ae500895 req_msg_id:long now:int salts:vector<future_salt> = FutureSalts;`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FutureSalts<'a> {
    buf: &'a [u8],
    header: usize,
}

impl<'a> FutureSalts<'a> {
    pub const TAG: u32 = 0xae500895;
    pub const FIELD_COUNT: usize = 3;

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// Leading tag, not validated; `None` when read bare.
    pub fn constructor_tag(&self) -> Option<u32> {
        if self.header == 0 {
            return None;
        }
        layout::read_u32(self.buf, 0).ok()
    }

    fn offset_of(buf: &[u8], start: usize, stop: usize) -> rt::Result<usize> {
        let mut pos = start;
        for index in 0..stop.min(Self::FIELD_COUNT) {
            match index {
                0 => pos += layout::ensure(buf, pos, 8)?,
                1 => pos += layout::ensure(buf, pos, 4)?,
                2 => pos += layout::vector_size_of(buf, pos, false, |buf, pos| <FutureSalt as layout::TlBareRead>::bare_size_of(buf, pos))?,
                _ => {}
            }
        }
        layout::record_walk("future_salts", stop.min(Self::FIELD_COUNT));
        Ok(pos)
    }

    /// Offset of field `index` within [`Self::as_bytes`]. Walks every
    /// earlier field on each call, so the cost grows with `index`;
    /// offsets are not cached.
    pub fn field_offset(&self, index: usize) -> rt::Result<usize> {
        if index >= Self::FIELD_COUNT {
            return Err(rt::TlError::InvalidFieldState(format!("`future_salts` has no field #{}", index)));
        }
        Self::offset_of(self.buf, self.header, index)
    }

    /// `req_msg_id:long`
    pub fn req_msg_id(&self) -> rt::Result<i64> {
        let pos = self.field_offset(0)?;
        <i64 as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// `now:int`
    pub fn now(&self) -> rt::Result<i32> {
        let pos = self.field_offset(1)?;
        <i32 as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// `salts:vector<future_salt>`
    pub fn salts(&self) -> rt::Result<layout::VectorView<'a, layout::Bare<FutureSalt<'a>>>> {
        let pos = self.field_offset(2)?;
        layout::VectorView::<'a, layout::Bare<FutureSalt<'a>>>::read_with(self.buf, pos, false).map(|(v, _)| v)
    }

    /// Exact encoded size. `*_len` arguments are data lengths for byte
    /// strings and full encoded lengths for vectors and objects.
    pub fn required_size(salts_len: usize) -> usize {
        4
            + 8
            + 4
            + salts_len
    }

    /// Serialize into one exactly-sized buffer. Every conditional argument
    /// must agree with its flag bit.
    pub fn build(req_msg_id: i64, now: i32, salts: &[u8]) -> rt::Result<Vec<u8>> {
        { let v = salts; layout::check_exact(v, layout::vector_size_of(v, 0, false, |buf, pos| <FutureSalt as layout::TlBareRead>::bare_size_of(buf, pos))?, "salts")?; }
        let size = Self::required_size(salts.len());
        let mut buf = vec![0u8; size];
        let mut pos = 0usize;
        pos += layout::write_u32(&mut buf, pos, Self::TAG)?;
        pos += req_msg_id.write_to(&mut buf, pos)?;
        pos += now.write_to(&mut buf, pos)?;
        pos += layout::write_raw(&mut buf, pos, salts)?;
        debug_assert_eq!(pos, size);
        Ok(buf)
    }
}

impl<'a> layout::TlRead<'a> for FutureSalts<'a> {
    fn size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 4)?;
        Ok(Self::offset_of(buf, offset + 4, Self::FIELD_COUNT)? - offset)
    }

    fn read(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlRead<'a>>::size_of(buf, offset)?;
        Ok((FutureSalts { buf: &buf[offset..offset + size], header: 4 }, size))
    }
}

impl<'a> layout::TlBareRead<'a> for FutureSalts<'a> {
    fn bare_size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 0)?;
        Ok(Self::offset_of(buf, offset, Self::FIELD_COUNT)? - offset)
    }

    fn read_bare(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlBareRead<'a>>::bare_size_of(buf, offset)?;
        Ok((FutureSalts { buf: &buf[offset..offset + size], header: 0 }, size))
    }
}

/// `peerUser#59511722 user_id:long = Peer;`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerUser<'a> {
    buf: &'a [u8],
    header: usize,
}

impl<'a> PeerUser<'a> {
    pub const TAG: u32 = 0x59511722;
    pub const FIELD_COUNT: usize = 1;

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// Leading tag, not validated; `None` when read bare.
    pub fn constructor_tag(&self) -> Option<u32> {
        if self.header == 0 {
            return None;
        }
        layout::read_u32(self.buf, 0).ok()
    }

    fn offset_of(buf: &[u8], start: usize, stop: usize) -> rt::Result<usize> {
        let mut pos = start;
        for index in 0..stop.min(Self::FIELD_COUNT) {
            match index {
                0 => pos += layout::ensure(buf, pos, 8)?,
                _ => {}
            }
        }
        layout::record_walk("peerUser", stop.min(Self::FIELD_COUNT));
        Ok(pos)
    }

    /// Offset of field `index` within [`Self::as_bytes`]. Walks every
    /// earlier field on each call, so the cost grows with `index`;
    /// offsets are not cached.
    pub fn field_offset(&self, index: usize) -> rt::Result<usize> {
        if index >= Self::FIELD_COUNT {
            return Err(rt::TlError::InvalidFieldState(format!("`peerUser` has no field #{}", index)));
        }
        Self::offset_of(self.buf, self.header, index)
    }

    /// `user_id:long`
    pub fn user_id(&self) -> rt::Result<i64> {
        let pos = self.field_offset(0)?;
        <i64 as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// Exact encoded size. `*_len` arguments are data lengths for byte
    /// strings and full encoded lengths for vectors and objects.
    pub fn required_size() -> usize {
        4
            + 8
    }

    /// Serialize into one exactly-sized buffer. Every conditional argument
    /// must agree with its flag bit.
    pub fn build(user_id: i64) -> rt::Result<Vec<u8>> {
        let size = Self::required_size();
        let mut buf = vec![0u8; size];
        let mut pos = 0usize;
        pos += layout::write_u32(&mut buf, pos, Self::TAG)?;
        pos += user_id.write_to(&mut buf, pos)?;
        debug_assert_eq!(pos, size);
        Ok(buf)
    }
}

impl<'a> layout::TlRead<'a> for PeerUser<'a> {
    fn size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 4)?;
        Ok(Self::offset_of(buf, offset + 4, Self::FIELD_COUNT)? - offset)
    }

    fn read(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlRead<'a>>::size_of(buf, offset)?;
        Ok((PeerUser { buf: &buf[offset..offset + size], header: 4 }, size))
    }
}

impl<'a> layout::TlBareRead<'a> for PeerUser<'a> {
    fn bare_size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 0)?;
        Ok(Self::offset_of(buf, offset, Self::FIELD_COUNT)? - offset)
    }

    fn read_bare(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlBareRead<'a>>::bare_size_of(buf, offset)?;
        Ok((PeerUser { buf: &buf[offset..offset + size], header: 0 }, size))
    }
}

/// `peerChat#36c6019a chat_id:long = Peer;`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerChat<'a> {
    buf: &'a [u8],
    header: usize,
}

impl<'a> PeerChat<'a> {
    pub const TAG: u32 = 0x36c6019a;
    pub const FIELD_COUNT: usize = 1;

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// Leading tag, not validated; `None` when read bare.
    pub fn constructor_tag(&self) -> Option<u32> {
        if self.header == 0 {
            return None;
        }
        layout::read_u32(self.buf, 0).ok()
    }

    fn offset_of(buf: &[u8], start: usize, stop: usize) -> rt::Result<usize> {
        let mut pos = start;
        for index in 0..stop.min(Self::FIELD_COUNT) {
            match index {
                0 => pos += layout::ensure(buf, pos, 8)?,
                _ => {}
            }
        }
        layout::record_walk("peerChat", stop.min(Self::FIELD_COUNT));
        Ok(pos)
    }

    /// Offset of field `index` within [`Self::as_bytes`]. Walks every
    /// earlier field on each call, so the cost grows with `index`;
    /// offsets are not cached.
    pub fn field_offset(&self, index: usize) -> rt::Result<usize> {
        if index >= Self::FIELD_COUNT {
            return Err(rt::TlError::InvalidFieldState(format!("`peerChat` has no field #{}", index)));
        }
        Self::offset_of(self.buf, self.header, index)
    }

    /// `chat_id:long`
    pub fn chat_id(&self) -> rt::Result<i64> {
        let pos = self.field_offset(0)?;
        <i64 as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// Exact encoded size. `*_len` arguments are data lengths for byte
    /// strings and full encoded lengths for vectors and objects.
    pub fn required_size() -> usize {
        4
            + 8
    }

    /// Serialize into one exactly-sized buffer. Every conditional argument
    /// must agree with its flag bit.
    pub fn build(chat_id: i64) -> rt::Result<Vec<u8>> {
        let size = Self::required_size();
        let mut buf = vec![0u8; size];
        let mut pos = 0usize;
        pos += layout::write_u32(&mut buf, pos, Self::TAG)?;
        pos += chat_id.write_to(&mut buf, pos)?;
        debug_assert_eq!(pos, size);
        Ok(buf)
    }
}

impl<'a> layout::TlRead<'a> for PeerChat<'a> {
    fn size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 4)?;
        Ok(Self::offset_of(buf, offset + 4, Self::FIELD_COUNT)? - offset)
    }

    fn read(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlRead<'a>>::size_of(buf, offset)?;
        Ok((PeerChat { buf: &buf[offset..offset + size], header: 4 }, size))
    }
}

impl<'a> layout::TlBareRead<'a> for PeerChat<'a> {
    fn bare_size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 0)?;
        Ok(Self::offset_of(buf, offset, Self::FIELD_COUNT)? - offset)
    }

    fn read_bare(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlBareRead<'a>>::bare_size_of(buf, offset)?;
        Ok((PeerChat { buf: &buf[offset..offset + size], header: 0 }, size))
    }
}

/// `message#1f5c0a21 flags:# out:flags.1?true id:int peer:Peer reply_to:flags.3?int text:string = Message;`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    buf: &'a [u8],
    header: usize,
}

impl<'a> Message<'a> {
    pub const TAG: u32 = 0x1f5c0a21;
    pub const FIELD_COUNT: usize = 6;

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// Leading tag, not validated; `None` when read bare.
    pub fn constructor_tag(&self) -> Option<u32> {
        if self.header == 0 {
            return None;
        }
        layout::read_u32(self.buf, 0).ok()
    }

    fn offset_of(buf: &[u8], start: usize, stop: usize) -> rt::Result<usize> {
        let mut pos = start;
        let mut flags_0 = 0u32;
        for index in 0..stop.min(Self::FIELD_COUNT) {
            match index {
                0 => {
                    flags_0 = layout::read_u32(buf, pos)?;
                    pos += 4;
                }
                2 => pos += layout::ensure(buf, pos, 4)?,
                3 => pos += <Peer as layout::TlRead>::size_of(buf, pos)?,
                4 => {
                    if flags_0 & (1u32 << 3) != 0 {
                        pos += layout::ensure(buf, pos, 4)?;
                    }
                }
                5 => pos += layout::bytes_size_of(buf, pos)?,
                _ => {}
            }
        }
        layout::record_walk("message", stop.min(Self::FIELD_COUNT));
        Ok(pos)
    }

    /// Offset of field `index` within [`Self::as_bytes`]. Walks every
    /// earlier field on each call, so the cost grows with `index`;
    /// offsets are not cached.
    pub fn field_offset(&self, index: usize) -> rt::Result<usize> {
        if index >= Self::FIELD_COUNT {
            return Err(rt::TlError::InvalidFieldState(format!("`message` has no field #{}", index)));
        }
        Self::offset_of(self.buf, self.header, index)
    }

    /// `flags:#`
    pub fn flags(&self) -> rt::Result<u32> {
        let pos = self.field_offset(0)?;
        <u32 as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// `out:flags.1?true`
    pub fn out(&self) -> rt::Result<bool> {
        Ok(self.flags()? & (1u32 << 1) != 0)
    }

    /// `id:int`
    pub fn id(&self) -> rt::Result<i32> {
        let pos = self.field_offset(2)?;
        <i32 as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// `peer:Peer`
    pub fn peer(&self) -> rt::Result<Peer<'a>> {
        let pos = self.field_offset(3)?;
        <Peer<'a> as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// `reply_to:flags.3?int`
    pub fn reply_to(&self) -> rt::Result<Option<i32>> {
        if !(self.flags()? & (1u32 << 3) != 0) {
            return Ok(None);
        }
        let pos = self.field_offset(4)?;
        <i32 as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| Some(v))
    }

    /// `text:string`
    pub fn text(&self) -> rt::Result<&'a [u8]> {
        let pos = self.field_offset(5)?;
        <&'a [u8] as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// Exact encoded size. `*_len` arguments are data lengths for byte
    /// strings and full encoded lengths for vectors and objects.
    pub fn required_size(peer_len: usize, has_reply_to: bool, text_len: usize) -> usize {
        4
            + 4
            + 4
            + peer_len
            + (if has_reply_to { 4 } else { 0 })
            + layout::encoded_bytes_len(text_len)
    }

    /// Serialize into one exactly-sized buffer. Every conditional argument
    /// must agree with its flag bit.
    pub fn build(flags: u32, id: i32, peer: &[u8], reply_to: Option<i32>, text: &[u8]) -> rt::Result<Vec<u8>> {
        { let v = peer; layout::check_exact(v, <Peer as layout::TlRead>::size_of(v, 0)?, "peer")?; }
        layout::check_gate(flags, 3, reply_to.is_some(), "reply_to")?;
        let size = Self::required_size(peer.len(), reply_to.is_some(), text.len());
        let mut buf = vec![0u8; size];
        let mut pos = 0usize;
        pos += layout::write_u32(&mut buf, pos, Self::TAG)?;
        pos += layout::write_u32(&mut buf, pos, flags)?;
        pos += id.write_to(&mut buf, pos)?;
        pos += layout::write_raw(&mut buf, pos, peer)?;
        if let Some(v) = reply_to { pos += v.write_to(&mut buf, pos)?; }
        pos += layout::write_bytes(&mut buf, pos, text)?;
        debug_assert_eq!(pos, size);
        Ok(buf)
    }
}

impl<'a> layout::TlRead<'a> for Message<'a> {
    fn size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 4)?;
        Ok(Self::offset_of(buf, offset + 4, Self::FIELD_COUNT)? - offset)
    }

    fn read(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlRead<'a>>::size_of(buf, offset)?;
        Ok((Message { buf: &buf[offset..offset + size], header: 4 }, size))
    }
}

impl<'a> layout::TlBareRead<'a> for Message<'a> {
    fn bare_size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 0)?;
        Ok(Self::offset_of(buf, offset, Self::FIELD_COUNT)? - offset)
    }

    fn read_bare(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlBareRead<'a>>::bare_size_of(buf, offset)?;
        Ok((Message { buf: &buf[offset..offset + size], header: 0 }, size))
    }
}

/// `ipPort ipv4:int port:int = IpPort;`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpPort<'a> {
    buf: &'a [u8],
    header: usize,
}

impl<'a> IpPort<'a> {
    pub const FIELD_COUNT: usize = 2;

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    fn offset_of(buf: &[u8], start: usize, stop: usize) -> rt::Result<usize> {
        let mut pos = start;
        for index in 0..stop.min(Self::FIELD_COUNT) {
            match index {
                0 => pos += layout::ensure(buf, pos, 4)?,
                1 => pos += layout::ensure(buf, pos, 4)?,
                _ => {}
            }
        }
        layout::record_walk("ipPort", stop.min(Self::FIELD_COUNT));
        Ok(pos)
    }

    /// Offset of field `index` within [`Self::as_bytes`]. Walks every
    /// earlier field on each call, so the cost grows with `index`;
    /// offsets are not cached.
    pub fn field_offset(&self, index: usize) -> rt::Result<usize> {
        if index >= Self::FIELD_COUNT {
            return Err(rt::TlError::InvalidFieldState(format!("`ipPort` has no field #{}", index)));
        }
        Self::offset_of(self.buf, self.header, index)
    }

    /// `ipv4:int`
    pub fn ipv4(&self) -> rt::Result<i32> {
        let pos = self.field_offset(0)?;
        <i32 as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// `port:int`
    pub fn port(&self) -> rt::Result<i32> {
        let pos = self.field_offset(1)?;
        <i32 as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// Exact encoded size. `*_len` arguments are data lengths for byte
    /// strings and full encoded lengths for vectors and objects.
    pub fn required_size() -> usize {
        4
            + 4
    }

    /// Serialize into one exactly-sized buffer. Every conditional argument
    /// must agree with its flag bit.
    pub fn build(ipv4: i32, port: i32) -> rt::Result<Vec<u8>> {
        let size = Self::required_size();
        let mut buf = vec![0u8; size];
        let mut pos = 0usize;
        pos += ipv4.write_to(&mut buf, pos)?;
        pos += port.write_to(&mut buf, pos)?;
        debug_assert_eq!(pos, size);
        Ok(buf)
    }
}

impl<'a> layout::TlBareRead<'a> for IpPort<'a> {
    fn bare_size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 0)?;
        Ok(Self::offset_of(buf, offset, Self::FIELD_COUNT)? - offset)
    }

    fn read_bare(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlBareRead<'a>>::bare_size_of(buf, offset)?;
        Ok((IpPort { buf: &buf[offset..offset + size], header: 0 }, size))
    }
}

/// `dcOption#18b7a10d id:int address:IpPort = DcOption;`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DcOption<'a> {
    buf: &'a [u8],
    header: usize,
}

impl<'a> DcOption<'a> {
    pub const TAG: u32 = 0x18b7a10d;
    pub const FIELD_COUNT: usize = 2;

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// Leading tag, not validated; `None` when read bare.
    pub fn constructor_tag(&self) -> Option<u32> {
        if self.header == 0 {
            return None;
        }
        layout::read_u32(self.buf, 0).ok()
    }

    fn offset_of(buf: &[u8], start: usize, stop: usize) -> rt::Result<usize> {
        let mut pos = start;
        for index in 0..stop.min(Self::FIELD_COUNT) {
            match index {
                0 => pos += layout::ensure(buf, pos, 4)?,
                1 => pos += <IpPort as layout::TlBareRead>::bare_size_of(buf, pos)?,
                _ => {}
            }
        }
        layout::record_walk("dcOption", stop.min(Self::FIELD_COUNT));
        Ok(pos)
    }

    /// Offset of field `index` within [`Self::as_bytes`]. Walks every
    /// earlier field on each call, so the cost grows with `index`;
    /// offsets are not cached.
    pub fn field_offset(&self, index: usize) -> rt::Result<usize> {
        if index >= Self::FIELD_COUNT {
            return Err(rt::TlError::InvalidFieldState(format!("`dcOption` has no field #{}", index)));
        }
        Self::offset_of(self.buf, self.header, index)
    }

    /// `id:int`
    pub fn id(&self) -> rt::Result<i32> {
        let pos = self.field_offset(0)?;
        <i32 as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// `address:IpPort`
    pub fn address(&self) -> rt::Result<IpPort<'a>> {
        let pos = self.field_offset(1)?;
        <IpPort<'a> as layout::TlBareRead<'a>>::read_bare(self.buf, pos).map(|(v, _)| v)
    }

    /// Exact encoded size. `*_len` arguments are data lengths for byte
    /// strings and full encoded lengths for vectors and objects.
    pub fn required_size(address_len: usize) -> usize {
        4
            + 4
            + address_len
    }

    /// Serialize into one exactly-sized buffer. Every conditional argument
    /// must agree with its flag bit.
    pub fn build(id: i32, address: &[u8]) -> rt::Result<Vec<u8>> {
        { let v = address; layout::check_exact(v, <IpPort as layout::TlBareRead>::bare_size_of(v, 0)?, "address")?; }
        let size = Self::required_size(address.len());
        let mut buf = vec![0u8; size];
        let mut pos = 0usize;
        pos += layout::write_u32(&mut buf, pos, Self::TAG)?;
        pos += id.write_to(&mut buf, pos)?;
        pos += layout::write_raw(&mut buf, pos, address)?;
        debug_assert_eq!(pos, size);
        Ok(buf)
    }
}

impl<'a> layout::TlRead<'a> for DcOption<'a> {
    fn size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 4)?;
        Ok(Self::offset_of(buf, offset + 4, Self::FIELD_COUNT)? - offset)
    }

    fn read(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlRead<'a>>::size_of(buf, offset)?;
        Ok((DcOption { buf: &buf[offset..offset + size], header: 4 }, size))
    }
}

impl<'a> layout::TlBareRead<'a> for DcOption<'a> {
    fn bare_size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 0)?;
        Ok(Self::offset_of(buf, offset, Self::FIELD_COUNT)? - offset)
    }

    fn read_bare(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlBareRead<'a>>::bare_size_of(buf, offset)?;
        Ok((DcOption { buf: &buf[offset..offset + size], header: 0 }, size))
    }
}

/// `ping#7abe77ec ping_id:long = Pong;`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping<'a> {
    buf: &'a [u8],
    header: usize,
}

impl<'a> Ping<'a> {
    pub const TAG: u32 = 0x7abe77ec;
    pub const FIELD_COUNT: usize = 1;

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// Leading tag, not validated; `None` when read bare.
    pub fn constructor_tag(&self) -> Option<u32> {
        if self.header == 0 {
            return None;
        }
        layout::read_u32(self.buf, 0).ok()
    }

    fn offset_of(buf: &[u8], start: usize, stop: usize) -> rt::Result<usize> {
        let mut pos = start;
        for index in 0..stop.min(Self::FIELD_COUNT) {
            match index {
                0 => pos += layout::ensure(buf, pos, 8)?,
                _ => {}
            }
        }
        layout::record_walk("ping", stop.min(Self::FIELD_COUNT));
        Ok(pos)
    }

    /// Offset of field `index` within [`Self::as_bytes`]. Walks every
    /// earlier field on each call, so the cost grows with `index`;
    /// offsets are not cached.
    pub fn field_offset(&self, index: usize) -> rt::Result<usize> {
        if index >= Self::FIELD_COUNT {
            return Err(rt::TlError::InvalidFieldState(format!("`ping` has no field #{}", index)));
        }
        Self::offset_of(self.buf, self.header, index)
    }

    /// `ping_id:long`
    pub fn ping_id(&self) -> rt::Result<i64> {
        let pos = self.field_offset(0)?;
        <i64 as layout::TlRead<'a>>::read(self.buf, pos).map(|(v, _)| v)
    }

    /// Exact encoded size. `*_len` arguments are data lengths for byte
    /// strings and full encoded lengths for vectors and objects.
    pub fn required_size() -> usize {
        4
            + 8
    }

    /// Serialize into one exactly-sized buffer. Every conditional argument
    /// must agree with its flag bit.
    pub fn build(ping_id: i64) -> rt::Result<Vec<u8>> {
        let size = Self::required_size();
        let mut buf = vec![0u8; size];
        let mut pos = 0usize;
        pos += layout::write_u32(&mut buf, pos, Self::TAG)?;
        pos += ping_id.write_to(&mut buf, pos)?;
        debug_assert_eq!(pos, size);
        Ok(buf)
    }
}

impl<'a> layout::TlRead<'a> for Ping<'a> {
    fn size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 4)?;
        Ok(Self::offset_of(buf, offset + 4, Self::FIELD_COUNT)? - offset)
    }

    fn read(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlRead<'a>>::size_of(buf, offset)?;
        Ok((Ping { buf: &buf[offset..offset + size], header: 4 }, size))
    }
}

impl<'a> layout::TlBareRead<'a> for Ping<'a> {
    fn bare_size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        let _depth = layout::DepthGuard::enter(offset)?;
        layout::ensure(buf, offset, 0)?;
        Ok(Self::offset_of(buf, offset, Self::FIELD_COUNT)? - offset)
    }

    fn read_bare(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = <Self as layout::TlBareRead<'a>>::bare_size_of(buf, offset)?;
        Ok((Ping { buf: &buf[offset..offset + size], header: 0 }, size))
    }
}

/// Union `Peer`: dispatched on the constructor tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peer<'a> {
    PeerUser(PeerUser<'a>),
    PeerChat(PeerChat<'a>),
}

impl<'a> Peer<'a> {
    pub fn constructor_tag(&self) -> u32 {
        match self {
            Peer::PeerUser(_) => PeerUser::TAG,
            Peer::PeerChat(_) => PeerChat::TAG,
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        match self {
            Peer::PeerUser(x) => x.as_bytes(),
            Peer::PeerChat(x) => x.as_bytes(),
        }
    }
}

impl<'a> layout::TlRead<'a> for Peer<'a> {
    fn size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        match layout::read_u32(buf, offset)? {
            0x59511722 => <PeerUser as layout::TlRead>::size_of(buf, offset),
            0x36c6019a => <PeerChat as layout::TlRead>::size_of(buf, offset),
            tag => Err(rt::TlError::UnknownConstructor { tag }),
        }
    }

    fn read(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        match layout::read_u32(buf, offset)? {
            0x59511722 => <PeerUser<'a> as layout::TlRead<'a>>::read(buf, offset).map(|(x, n)| (Peer::PeerUser(x), n)),
            0x36c6019a => <PeerChat<'a> as layout::TlRead<'a>>::read(buf, offset).map(|(x, n)| (Peer::PeerChat(x), n)),
            tag => Err(rt::TlError::UnknownConstructor { tag }),
        }
    }
}

/// Size of any boxed object of this schema (constructors and functions),
/// dispatched on its tag.
pub fn size_of_any(buf: &[u8], offset: usize) -> rt::Result<usize> {
    match layout::read_u32(buf, offset)? {
        0x05162463 => <ResPQ as layout::TlRead>::size_of(buf, offset),
        0x0949d9dc => <FutureSalt as layout::TlRead>::size_of(buf, offset),
        0xae500895 => <FutureSalts as layout::TlRead>::size_of(buf, offset),
        0x59511722 => <PeerUser as layout::TlRead>::size_of(buf, offset),
        0x36c6019a => <PeerChat as layout::TlRead>::size_of(buf, offset),
        0x1f5c0a21 => <Message as layout::TlRead>::size_of(buf, offset),
        0x18b7a10d => <DcOption as layout::TlRead>::size_of(buf, offset),
        0x7abe77ec => <Ping as layout::TlRead>::size_of(buf, offset),
        tag => Err(rt::TlError::UnknownConstructor { tag }),
    }
}

/// Any boxed object, kept as its tag and raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnyObject<'a> {
    buf: &'a [u8],
    tag: u32,
}

impl<'a> AnyObject<'a> {
    pub fn constructor_tag(&self) -> u32 {
        self.tag
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }
}

impl<'a> layout::TlRead<'a> for AnyObject<'a> {
    fn size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {
        size_of_any(buf, offset)
    }

    fn read(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {
        let size = size_of_any(buf, offset)?;
        let tag = layout::read_u32(buf, offset)?;
        Ok((AnyObject { buf: &buf[offset..offset + size], tag }, size))
    }
}
