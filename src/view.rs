//! Lazy field access over one serialized combinator.
//!
//! A [`CombinatorView`] holds the bytes of exactly one instance. Nothing is
//! decoded up front: every [`CombinatorView::field_offset`] call walks the
//! fields before the requested one (reading flags as it passes them and
//! skipping absent conditional fields), so access to field `i` costs O(i).
//! Offsets are not cached. Callers that read many fields should decode once
//! with [`CombinatorView::to_object`].
//!
//! [`CombinatorWriter`] is the construction-side counterpart: it fills a
//! buffer already sized by the builder, one field at a time, in declaration
//! order.

use crate::ast::CombinatorDeclaration;
use crate::codec::{gate_open, zero_value, Codec, FlagValues};
use crate::error::{Result, TlError};
use crate::layout::{self, TAG_LEN};
use crate::schema::{FieldKind, MAX_FLAGS_FIELDS};
use crate::value::{Object, Value};

#[derive(Clone)]
pub struct CombinatorView<'a> {
    codec: &'a Codec,
    ci: usize,
    buf: &'a [u8],
    header: usize,
}

impl std::fmt::Debug for CombinatorView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinatorView")
            .field("combinator", &self.declaration().qualified_name())
            .field("bytes", &self.buf.len())
            .finish()
    }
}

impl<'a> CombinatorView<'a> {
    pub(crate) fn new(codec: &'a Codec, ci: usize, buf: &'a [u8], header: usize) -> Result<Self> {
        let size = codec.combinator_size(ci, buf, 0, header)?;
        if size != buf.len() {
            return Err(TlError::Malformed {
                offset: size,
                reason: "trailing bytes after object",
            });
        }
        Ok(CombinatorView { codec, ci, buf, header })
    }

    pub fn declaration(&self) -> &'a CombinatorDeclaration {
        &self.codec.schema().combinators()[self.ci]
    }

    /// Leading tag, or `None` for a tagless bare combinator. Not validated
    /// against the declaration.
    pub fn constructor_tag(&self) -> Option<u32> {
        if self.header == 0 {
            return None;
        }
        layout::read_u32(self.buf, 0).ok()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    pub fn field_count(&self) -> usize {
        self.declaration().arguments.len()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.declaration().argument_index(name)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.field_count() {
            return Err(TlError::InvalidFieldState(format!(
                "`{}` has no field #{index}",
                self.declaration().qualified_name()
            )));
        }
        Ok(())
    }

    fn walk_to(&self, index: usize) -> Result<(usize, FlagValues)> {
        self.check_index(index)?;
        self.codec.walk(self.ci, self.buf, 0, self.header, index)
    }

    /// Byte offset of field `index`. Absent conditional fields report the
    /// offset where they would start.
    pub fn field_offset(&self, index: usize) -> Result<usize> {
        self.walk_to(index).map(|(pos, _)| pos)
    }

    pub fn is_present(&self, index: usize) -> Result<bool> {
        let (_, flags) = self.walk_to(index)?;
        Ok(gate_open(&self.codec.schema().layout(self.ci)[index], &flags))
    }

    /// Value of field `index`. Absent conditional fields yield their zero
    /// value without touching the buffer; `true` fields yield their bit.
    pub fn field(&self, index: usize) -> Result<Value> {
        let (pos, flags) = self.walk_to(index)?;
        let f = &self.codec.schema().layout(self.ci)[index];
        let open = gate_open(f, &flags);
        if f.is_presence_only() {
            return Ok(Value::Bool(open));
        }
        if !open {
            return Ok(zero_value(&f.kind));
        }
        self.codec.decode_kind(&f.kind, self.buf, pos).map(|(v, _)| v)
    }

    pub fn field_by_name(&self, name: &str) -> Result<Value> {
        let index = self
            .field_index(name)
            .ok_or_else(|| TlError::InvalidFieldState(format!("no field `{name}`")))?;
        self.field(index)
    }

    /// Raw bytes of field `index`; empty when the field is absent.
    pub fn field_bytes(&self, index: usize) -> Result<&'a [u8]> {
        let (pos, flags) = self.walk_to(index)?;
        let f = &self.codec.schema().layout(self.ci)[index];
        if !gate_open(f, &flags) {
            return Ok(&self.buf[pos..pos]);
        }
        let len = self.codec.kind_size(&f.kind, self.buf, pos)?;
        Ok(&self.buf[pos..pos + len])
    }

    /// View over a nested object field. `None` when the field is absent.
    pub fn object_field(&self, index: usize) -> Result<Option<CombinatorView<'a>>> {
        if !self.is_present(index)? {
            return Ok(None);
        }
        let bytes = self.field_bytes(index)?;
        let schema = self.codec.schema();
        let kind = &schema.layout(self.ci)[index].kind;
        if let FieldKind::Object { type_name, bare } = kind {
            if let Some(ci) = self.codec.headerless_target(type_name, *bare)? {
                return CombinatorView::new(self.codec, ci, bytes, 0).map(Some);
            }
        }
        let (ci, header) = match kind {
            FieldKind::Object { .. } | FieldKind::Generic { .. } | FieldKind::AnyObject => {
                let tag = layout::read_u32(bytes, 0)?;
                let ci = schema
                    .index_by_tag(tag)
                    .ok_or(TlError::UnknownConstructor { tag })?;
                (ci, TAG_LEN)
            }
            other => {
                return Err(TlError::InvalidFieldState(format!(
                    "field #{index} is {other:?}, not an object"
                )))
            }
        };
        CombinatorView::new(self.codec, ci, bytes, header).map(Some)
    }

    /// Decode every field at once.
    pub fn to_object(&self) -> Result<Object> {
        self.codec
            .read_combinator(self.ci, self.buf, 0, self.header)
            .map(|(obj, _)| obj)
    }
}

/// Sequential field writer over a pre-sized buffer.
///
/// Fields must be written in declaration order. Absent conditional fields and
/// `true` fields are skipped implicitly; a gap over any other field is an
/// error, as is a value for a field whose flag bit is clear.
pub struct CombinatorWriter<'b> {
    codec: &'b Codec,
    ci: usize,
    buf: &'b mut [u8],
    pos: usize,
    next: usize,
    flags: FlagValues,
}

impl<'b> CombinatorWriter<'b> {
    /// Start writing combinator `ci` at `offset`; writes the tag when
    /// `header` is non-zero.
    pub(crate) fn at(codec: &'b Codec, ci: usize, buf: &'b mut [u8], offset: usize, header: usize) -> Result<Self> {
        let mut pos = offset;
        if header > 0 {
            let tag = codec.schema().combinators()[ci].tag.ok_or_else(|| {
                TlError::InvalidFieldState("tagless combinator written boxed".to_string())
            })?;
            pos += layout::write_u32(buf, offset, tag)?;
        }
        Ok(CombinatorWriter {
            codec,
            ci,
            buf,
            pos,
            next: 0,
            flags: [0; MAX_FLAGS_FIELDS],
        })
    }

    pub fn declaration(&self) -> &'b CombinatorDeclaration {
        &self.codec.schema().combinators()[self.ci]
    }

    /// Offset the next written field will start at.
    pub fn field_offset(&self) -> usize {
        self.pos
    }

    fn skippable(&self, index: usize) -> bool {
        let f = &self.codec.schema().layout(self.ci)[index];
        f.is_presence_only() || !gate_open(f, &self.flags)
    }

    pub fn write(&mut self, index: usize, value: &Value) -> Result<()> {
        let codec = self.codec;
        let decl = &codec.schema().combinators()[self.ci];
        let fields = codec.schema().layout(self.ci);
        let Some(f) = fields.get(index) else {
            return Err(TlError::InvalidFieldState(format!(
                "`{}` has no field #{index}",
                decl.qualified_name()
            )));
        };
        let name = &decl.arguments[index].name;
        if index < self.next {
            return Err(TlError::InvalidFieldState(format!("`{name}` written out of order")));
        }
        if let Some(j) = (self.next..index).find(|&j| !self.skippable(j)) {
            return Err(TlError::InvalidFieldState(format!(
                "`{}` must be written before `{name}`",
                decl.arguments[j].name
            )));
        }
        if let Some(g) = f.gate {
            let open = gate_open(f, &self.flags);
            if f.is_presence_only() {
                if let Value::Bool(b) = value {
                    if *b != open {
                        return Err(TlError::InvalidFieldState(format!(
                            "`{name}` is {b} but flag bit {} is {}",
                            g.bit,
                            if open { "set" } else { "clear" }
                        )));
                    }
                }
            } else if !open {
                return Err(TlError::InvalidFieldState(format!(
                    "`{name}` has a value but flag bit {} is clear",
                    g.bit
                )));
            }
        }
        if let Some(slot) = f.flags_slot {
            self.flags[slot] = value
                .as_flags()
                .ok_or_else(|| TlError::InvalidFieldState(format!("`{name}` expects flags, got {value:?}")))?;
        }
        self.pos += codec.write_value(&f.kind, value, name, self.buf, self.pos)?;
        self.next = index + 1;
        Ok(())
    }

    /// Check that every remaining field may be omitted; returns the end offset.
    pub fn finish(self) -> Result<usize> {
        let count = self.declaration().arguments.len();
        if let Some(j) = (self.next..count).find(|&j| !self.skippable(j)) {
            return Err(TlError::InvalidFieldState(format!(
                "`{}` was never written",
                self.declaration().arguments[j].name
            )));
        }
        Ok(self.pos)
    }
}
