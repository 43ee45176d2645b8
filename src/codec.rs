//! Schema-driven reading and building of TL buffers without generated code.
//!
//! [`Codec`] walks a compiled [`Schema`] at runtime: the same layout rules the
//! generated views follow (little-endian scalars, padded byte strings, tagged
//! or bare vectors, flag-gated fields). Reads borrow the input; builds compute
//! the exact size first and allocate once.

use crate::error::{Result, TlError};
use crate::layout::{self, DepthGuard, TlRead, TlWrite, TAG_LEN};
use crate::schema::{FieldKind, FieldLayout, Schema, MAX_FLAGS_FIELDS};
use crate::value::{FieldValues, Object, Value};
use crate::view::{CombinatorView, CombinatorWriter};
use std::collections::{HashMap, HashSet};

pub(crate) type FlagValues = [u32; MAX_FLAGS_FIELDS];

#[derive(Debug, Clone)]
pub struct Codec {
    schema: Schema,
}

/// Inputs to [`Codec::required_size`]: byte lengths of variable-length fields
/// and which conditional fields are present.
///
/// Lengths are raw data lengths for `bytes`/`string` and full encoded lengths
/// for vectors and nested objects. A field with a length is implicitly present.
#[derive(Debug, Clone, Default)]
pub struct SizeInputs {
    lengths: HashMap<String, usize>,
    present: HashSet<String>,
}

impl SizeInputs {
    pub fn new() -> Self {
        SizeInputs::default()
    }

    pub fn length(mut self, field: &str, n: usize) -> Self {
        self.lengths.insert(field.to_string(), n);
        self
    }

    pub fn present(mut self, field: &str) -> Self {
        self.present.insert(field.to_string());
        self
    }

    fn is_present(&self, field: &str) -> bool {
        self.present.contains(field) || self.lengths.contains_key(field)
    }
}

#[inline]
pub(crate) fn gate_open(f: &FieldLayout, flags: &FlagValues) -> bool {
    match f.gate {
        Some(g) => flags[g.slot] & (1 << g.bit) != 0,
        None => true,
    }
}

/// Zero value reported for absent conditional fields.
pub fn zero_value(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Flags => Value::Flags(0),
        FieldKind::Int => Value::Int(0),
        FieldKind::Long => Value::Long(0),
        FieldKind::Double => Value::Double(0.0),
        FieldKind::Int128 => Value::Int128([0; 16]),
        FieldKind::Int256 => Value::Int256([0; 32]),
        FieldKind::Bytes | FieldKind::String => Value::Bytes(Vec::new()),
        FieldKind::True | FieldKind::Bool => Value::Bool(false),
        FieldKind::Vector { .. } => Value::Vector(Vec::new()),
        FieldKind::Object { .. } | FieldKind::Generic { .. } | FieldKind::AnyObject => Value::Null,
    }
}

fn mismatch(field: &str, kind: &FieldKind, value: &Value) -> TlError {
    TlError::InvalidFieldState(format!("`{field}` expects {kind:?}, got {value:?}"))
}

impl Codec {
    pub fn new(schema: Schema) -> Self {
        Codec { schema }
    }

    pub fn compile(source: &str) -> Result<Self> {
        Schema::compile(source).map(Codec::new)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Combinator index and header length for a name: a combinator reads with
    /// its tag (if declared), a type name dispatches on the tag.
    fn lookup(&self, name: &str) -> Result<(usize, usize)> {
        let ci = self
            .schema
            .combinator_index(name)
            .ok_or_else(|| TlError::UnknownType(name.to_string()))?;
        let header = if self.schema.combinators()[ci].tag.is_some() { TAG_LEN } else { 0 };
        Ok((ci, header))
    }

    /// Bytes one instance of `name` (combinator or type) occupies at `offset`.
    pub fn size_of(&self, name: &str, buf: &[u8], offset: usize) -> Result<usize> {
        if self.schema.group(name).is_some() && self.schema.combinator(name).is_none() {
            return self.type_size(name, false, buf, offset);
        }
        let (ci, header) = self.lookup(name)?;
        self.combinator_size(ci, buf, offset, header)
    }

    /// Size of any boxed object, dispatching on its tag across the whole schema.
    pub fn size_of_any(&self, buf: &[u8], offset: usize) -> Result<usize> {
        let tag = layout::read_u32(buf, offset)?;
        let ci = self
            .schema
            .index_by_tag(tag)
            .ok_or(TlError::UnknownConstructor { tag })?;
        self.combinator_size(ci, buf, offset, TAG_LEN)
    }

    /// Decode one instance of `name`; returns the object and bytes consumed.
    pub fn read(&self, name: &str, buf: &[u8], offset: usize) -> Result<(Object, usize)> {
        if self.schema.group(name).is_some() && self.schema.combinator(name).is_none() {
            return self.read_type(name, false, buf, offset);
        }
        let (ci, header) = self.lookup(name)?;
        self.read_combinator(ci, buf, offset, header)
    }

    pub fn read_any(&self, buf: &[u8], offset: usize) -> Result<(Object, usize)> {
        let tag = layout::read_u32(buf, offset)?;
        let ci = self
            .schema
            .index_by_tag(tag)
            .ok_or(TlError::UnknownConstructor { tag })?;
        self.read_combinator(ci, buf, offset, TAG_LEN)
    }

    /// Next object of a back-to-back stream: `name` if given, otherwise any
    /// boxed object. An object that occupies no bytes cannot advance the
    /// stream and is rejected.
    pub fn read_next(&self, name: Option<&str>, buf: &[u8], offset: usize) -> Result<(Object, usize)> {
        let (obj, used) = match name {
            Some(name) => self.read(name, buf, offset)?,
            None => self.read_any(buf, offset)?,
        };
        if used == 0 {
            return Err(TlError::Malformed {
                offset,
                reason: "zero-sized object in a stream",
            });
        }
        Ok((obj, used))
    }

    /// Lazy view over exactly one serialized instance of combinator `name`.
    pub fn view<'a>(&'a self, name: &str, buf: &'a [u8]) -> Result<CombinatorView<'a>> {
        let (ci, header) = self.lookup(name)?;
        CombinatorView::new(self, ci, buf, header)
    }

    /// Field-by-field writer for combinator `name`. `buf` must already have the
    /// exact size (see [`Codec::required_size`]).
    pub fn writer<'b>(&'b self, name: &str, buf: &'b mut [u8]) -> Result<CombinatorWriter<'b>> {
        let (ci, header) = self.lookup(name)?;
        CombinatorWriter::at(self, ci, buf, 0, header)
    }

    /// Closed-form size of combinator `name` from field lengths and presence.
    pub fn required_size(&self, name: &str, inputs: &SizeInputs) -> Result<usize> {
        let (ci, header) = self.lookup(name)?;
        let decl = &self.schema.combinators()[ci];
        let mut size = header;
        for (arg, f) in decl.arguments.iter().zip(self.schema.layout(ci)) {
            if f.gate.is_some() && !inputs.is_present(&arg.name) {
                continue;
            }
            size += match (&f.kind, f.kind.fixed_width()) {
                (_, Some(w)) => w,
                (FieldKind::Bytes | FieldKind::String, None) => {
                    layout::encoded_bytes_len(inputs.lengths.get(&arg.name).copied().unwrap_or(0))
                }
                (FieldKind::Vector { boxed, .. }, None) => match inputs.lengths.get(&arg.name) {
                    Some(&n) => n,
                    None => layout::vector_header_len(*boxed),
                },
                _ => *inputs.lengths.get(&arg.name).ok_or_else(|| {
                    TlError::InvalidFieldState(format!("no encoded length for `{}`", arg.name))
                })?,
            };
        }
        Ok(size)
    }

    /// Serialize combinator `name` from named field values.
    ///
    /// Flags fields may be given explicitly or omitted; omitted flags are
    /// derived from which conditional fields carry a value. A value for a clear
    /// bit, or a set bit without a value, is [`TlError::InvalidFieldState`].
    /// Unconditional scalar fields default to zero when omitted.
    pub fn build<V: FieldValues + ?Sized>(&self, name: &str, values: &V) -> Result<Vec<u8>> {
        let (ci, header) = self.lookup(name)?;
        let flags = self.resolve_flags(ci, values)?;
        let size = header + self.body_len(ci, values, &flags)?;
        let mut buf = vec![0u8; size];
        let end = self.encode_fields(ci, values, &flags, &mut buf, 0, header)?;
        debug_assert_eq!(end, size);
        tracing::trace!(combinator = name, size, "built");
        Ok(buf)
    }

    // --- size walk ---

    pub(crate) fn combinator_size(&self, ci: usize, buf: &[u8], offset: usize, header: usize) -> Result<usize> {
        let _depth = DepthGuard::enter(offset)?;
        let (end, _) = self.walk(ci, buf, offset, header, usize::MAX)?;
        Ok(end - offset)
    }

    /// Walk the first `stop` fields of combinator `ci`; returns the offset
    /// reached and the flag values read on the way.
    pub(crate) fn walk(
        &self,
        ci: usize,
        buf: &[u8],
        offset: usize,
        header: usize,
        stop: usize,
    ) -> Result<(usize, FlagValues)> {
        if header > 0 {
            layout::ensure(buf, offset, header)?;
        }
        let fields = self.schema.layout(ci);
        let stop = stop.min(fields.len());
        let mut flags = [0u32; MAX_FLAGS_FIELDS];
        let mut pos = offset + header;
        for f in &fields[..stop] {
            if let Some(slot) = f.flags_slot {
                flags[slot] = layout::read_u32(buf, pos)?;
                pos += 4;
                continue;
            }
            if gate_open(f, &flags) {
                pos += self.kind_size(&f.kind, buf, pos)?;
            }
        }
        layout::record_walk("field_walk", stop);
        Ok((pos, flags))
    }

    pub(crate) fn kind_size(&self, kind: &FieldKind, buf: &[u8], pos: usize) -> Result<usize> {
        match kind {
            FieldKind::Bool => bool::size_of(buf, pos),
            FieldKind::Bytes | FieldKind::String => layout::bytes_size_of(buf, pos),
            FieldKind::Vector { boxed, elem } => {
                layout::vector_size_of(buf, pos, *boxed, |b, p| self.kind_size(elem, b, p))
            }
            FieldKind::Object { type_name, bare } => self.type_size(type_name, *bare, buf, pos),
            FieldKind::Generic { .. } | FieldKind::AnyObject => self.size_of_any(buf, pos),
            fixed => match fixed.fixed_width() {
                Some(w) => layout::ensure(buf, pos, w),
                None => Err(TlError::UnknownType(format!("{fixed:?}"))),
            },
        }
    }

    /// Combinator an object of `type_name` is read as without a tag: any bare
    /// reference, or a boxed reference to a type with one tagless constructor.
    pub(crate) fn headerless_target(&self, type_name: &str, bare: bool) -> Result<Option<usize>> {
        if bare {
            return self
                .schema
                .bare_target(type_name)
                .map(Some)
                .ok_or_else(|| TlError::UnknownType(type_name.to_string()));
        }
        Ok(self.schema.tagless_type(type_name))
    }

    fn type_size(&self, type_name: &str, bare: bool, buf: &[u8], pos: usize) -> Result<usize> {
        if let Some(ci) = self.headerless_target(type_name, bare)? {
            return self.combinator_size(ci, buf, pos, 0);
        }
        let ci = self.boxed_member(type_name, buf, pos)?;
        self.combinator_size(ci, buf, pos, TAG_LEN)
    }

    /// Constructor of boxed type `type_name` selected by the tag at `pos`.
    fn boxed_member(&self, type_name: &str, buf: &[u8], pos: usize) -> Result<usize> {
        if self.schema.group(type_name).is_none() {
            return Err(TlError::UnknownType(type_name.to_string()));
        }
        let tag = layout::read_u32(buf, pos)?;
        self.schema
            .group_member_by_tag(type_name, tag)
            .ok_or(TlError::UnknownConstructor { tag })
    }

    // --- decode ---

    pub(crate) fn read_combinator(&self, ci: usize, buf: &[u8], offset: usize, header: usize) -> Result<(Object, usize)> {
        let _depth = DepthGuard::enter(offset)?;
        if header > 0 {
            layout::ensure(buf, offset, header)?;
        }
        let decl = &self.schema.combinators()[ci];
        let mut flags = [0u32; MAX_FLAGS_FIELDS];
        let mut pos = offset + header;
        let mut fields = Vec::with_capacity(decl.arguments.len());
        for (arg, f) in decl.arguments.iter().zip(self.schema.layout(ci)) {
            let value = if let Some(slot) = f.flags_slot {
                flags[slot] = layout::read_u32(buf, pos)?;
                pos += 4;
                Value::Flags(flags[slot])
            } else if f.is_presence_only() {
                Value::Bool(gate_open(f, &flags))
            } else if !gate_open(f, &flags) {
                zero_value(&f.kind)
            } else {
                let (v, n) = self.decode_kind(&f.kind, buf, pos)?;
                pos += n;
                v
            };
            fields.push((arg.name.clone(), value));
        }
        let obj = Object {
            name: decl.qualified_name(),
            tag: decl.tag,
            fields,
        };
        Ok((obj, pos - offset))
    }

    pub(crate) fn decode_kind(&self, kind: &FieldKind, buf: &[u8], pos: usize) -> Result<(Value, usize)> {
        Ok(match kind {
            FieldKind::Flags => (Value::Flags(layout::read_u32(buf, pos)?), 4),
            FieldKind::Int => (Value::Int(layout::read_i32(buf, pos)?), 4),
            FieldKind::Long => (Value::Long(layout::read_i64(buf, pos)?), 8),
            FieldKind::Double => (Value::Double(layout::read_f64(buf, pos)?), 8),
            FieldKind::Int128 => (Value::Int128(layout::read_array(buf, pos)?), 16),
            FieldKind::Int256 => (Value::Int256(layout::read_array(buf, pos)?), 32),
            FieldKind::True => (Value::Bool(true), 0),
            FieldKind::Bool => {
                let (b, n) = bool::read(buf, pos)?;
                (Value::Bool(b), n)
            }
            FieldKind::Bytes | FieldKind::String => {
                let (data, n) = layout::read_bytes(buf, pos)?;
                (Value::Bytes(data.to_vec()), n)
            }
            FieldKind::Vector { boxed, elem } => {
                let (count, header) = layout::read_vector_header(buf, pos, *boxed)?;
                let mut p = pos + header;
                // Never trust the count for preallocation.
                let mut items = Vec::with_capacity((count as usize).min(buf.len().saturating_sub(p) / 4));
                for _ in 0..count {
                    let (v, n) = self.decode_kind(elem, buf, p)?;
                    p += n;
                    items.push(v);
                    if n == 0 {
                        break;
                    }
                }
                (Value::Vector(items), p - pos)
            }
            FieldKind::Object { type_name, bare } => {
                let (obj, n) = self.read_type(type_name, *bare, buf, pos)?;
                (Value::Object(Box::new(obj)), n)
            }
            FieldKind::Generic { .. } | FieldKind::AnyObject => {
                let (obj, n) = self.read_any(buf, pos)?;
                (Value::Object(Box::new(obj)), n)
            }
        })
    }

    fn read_type(&self, type_name: &str, bare: bool, buf: &[u8], pos: usize) -> Result<(Object, usize)> {
        if let Some(ci) = self.headerless_target(type_name, bare)? {
            return self.read_combinator(ci, buf, pos, 0);
        }
        let ci = self.boxed_member(type_name, buf, pos)?;
        self.read_combinator(ci, buf, pos, TAG_LEN)
    }

    // --- build ---

    fn resolve_flags<V: FieldValues + ?Sized>(&self, ci: usize, values: &V) -> Result<FlagValues> {
        let decl = &self.schema.combinators()[ci];
        let fields = self.schema.layout(ci);
        let mut flags = [0u32; MAX_FLAGS_FIELDS];
        let mut explicit = [false; MAX_FLAGS_FIELDS];
        for (arg, f) in decl.arguments.iter().zip(fields) {
            if let (Some(slot), Some(v)) = (f.flags_slot, values.field(&arg.name)) {
                flags[slot] = v.as_flags().ok_or_else(|| mismatch(&arg.name, &f.kind, v))?;
                explicit[slot] = true;
            }
        }
        for (arg, f) in decl.arguments.iter().zip(fields) {
            if let Some(g) = f.gate {
                if !explicit[g.slot] && supplied(f, values.field(&arg.name)) {
                    flags[g.slot] |= 1 << g.bit;
                }
            }
        }
        for (arg, f) in decl.arguments.iter().zip(fields) {
            let Some(g) = f.gate else { continue };
            let set = flags[g.slot] & (1 << g.bit) != 0;
            let value = values.field(&arg.name);
            if f.is_presence_only() {
                if let Some(Value::Bool(b)) = value {
                    if *b != set {
                        return Err(TlError::InvalidFieldState(format!(
                            "`{}` is {b} but flag bit {} is {}",
                            arg.name,
                            g.bit,
                            if set { "set" } else { "clear" }
                        )));
                    }
                }
                continue;
            }
            layout::check_gate(flags[g.slot], g.bit, supplied(f, value), &arg.name)?;
        }
        Ok(flags)
    }

    fn body_len<V: FieldValues + ?Sized>(&self, ci: usize, values: &V, flags: &FlagValues) -> Result<usize> {
        let decl = &self.schema.combinators()[ci];
        let mut size = 0;
        for (arg, f) in decl.arguments.iter().zip(self.schema.layout(ci)) {
            if f.flags_slot.is_some() {
                size += layout::FLAGS_LEN;
                continue;
            }
            if f.is_presence_only() || !gate_open(f, flags) {
                continue;
            }
            let default;
            let value = match values.field(&arg.name) {
                Some(v) => v,
                None => {
                    default = default_for(&f.kind, &arg.name)?;
                    &default
                }
            };
            size += self.encoded_len(&f.kind, value, &arg.name)?;
        }
        Ok(size)
    }

    fn encoded_len(&self, kind: &FieldKind, value: &Value, field: &str) -> Result<usize> {
        if let Some(w) = kind.fixed_width() {
            return Ok(w);
        }
        match (kind, value) {
            (FieldKind::Bytes | FieldKind::String, Value::Bytes(b)) => Ok(layout::encoded_bytes_len(b.len())),
            (FieldKind::Vector { boxed, elem }, Value::Vector(items)) => {
                let mut n = layout::vector_header_len(*boxed);
                for item in items {
                    n += self.encoded_len(elem, item, field)?;
                }
                Ok(n)
            }
            (FieldKind::Object { type_name, bare }, Value::Object(obj)) => {
                self.object_len(obj, *bare || self.schema.tagless_type(type_name).is_some())
            }
            (FieldKind::Generic { .. } | FieldKind::AnyObject, Value::Object(obj)) => self.object_len(obj, false),
            // Pre-serialized vectors and objects; checked when written.
            (FieldKind::Vector { .. } | FieldKind::Object { .. } | FieldKind::Generic { .. } | FieldKind::AnyObject, Value::Bytes(raw)) => {
                Ok(raw.len())
            }
            _ => Err(mismatch(field, kind, value)),
        }
    }

    fn object_len(&self, obj: &Object, bare: bool) -> Result<usize> {
        let (ci, header) = self.object_header(obj, bare)?;
        let flags = self.resolve_flags(ci, obj)?;
        Ok(header + self.body_len(ci, obj, &flags)?)
    }

    fn object_header(&self, obj: &Object, bare: bool) -> Result<(usize, usize)> {
        let (ci, header) = self.lookup(&obj.name)?;
        if !bare && header == 0 {
            return Err(TlError::InvalidFieldState(format!(
                "`{}` has no constructor tag and cannot be written boxed",
                obj.name
            )));
        }
        Ok((ci, if bare { 0 } else { header }))
    }

    pub(crate) fn encode_fields<V: FieldValues + ?Sized>(
        &self,
        ci: usize,
        values: &V,
        flags: &FlagValues,
        buf: &mut [u8],
        offset: usize,
        header: usize,
    ) -> Result<usize> {
        let decl = &self.schema.combinators()[ci];
        let mut w = CombinatorWriter::at(self, ci, buf, offset, header)?;
        for (i, (arg, f)) in decl.arguments.iter().zip(self.schema.layout(ci)).enumerate() {
            if let Some(slot) = f.flags_slot {
                w.write(i, &Value::Flags(flags[slot]))?;
                continue;
            }
            if f.is_presence_only() || !gate_open(f, flags) {
                continue;
            }
            let default;
            let value = match values.field(&arg.name) {
                Some(v) => v,
                None => {
                    default = default_for(&f.kind, &arg.name)?;
                    &default
                }
            };
            w.write(i, value)?;
        }
        w.finish()
    }

    /// Write one field value at `pos`; returns bytes written.
    pub(crate) fn write_value(&self, kind: &FieldKind, value: &Value, field: &str, buf: &mut [u8], pos: usize) -> Result<usize> {
        match (kind, value) {
            (FieldKind::Flags, v) => {
                let bits = v.as_flags().ok_or_else(|| mismatch(field, kind, v))?;
                layout::write_u32(buf, pos, bits)
            }
            (FieldKind::Int, Value::Int(x)) => x.write_to(buf, pos),
            (FieldKind::Long, v) => {
                let x = v.as_i64().ok_or_else(|| mismatch(field, kind, v))?;
                x.write_to(buf, pos)
            }
            (FieldKind::Double, Value::Double(x)) => x.write_to(buf, pos),
            (FieldKind::Int128, Value::Int128(x)) => x.write_to(buf, pos),
            (FieldKind::Int256, Value::Int256(x)) => x.write_to(buf, pos),
            (FieldKind::Int128, Value::Bytes(b)) if b.len() == 16 => layout::write_raw(buf, pos, b),
            (FieldKind::Int256, Value::Bytes(b)) if b.len() == 32 => layout::write_raw(buf, pos, b),
            (FieldKind::Bool, Value::Bool(b)) => b.write_to(buf, pos),
            (FieldKind::True, Value::Bool(_)) => Ok(0),
            (FieldKind::Bytes | FieldKind::String, Value::Bytes(b)) => layout::write_bytes(buf, pos, b),
            (FieldKind::Vector { boxed, elem }, Value::Vector(items)) => {
                let count = u32::try_from(items.len())
                    .map_err(|_| TlError::InvalidFieldState(format!("`{field}` has too many elements")))?;
                let mut p = pos + layout::write_vector_header(buf, pos, *boxed, count)?;
                for item in items {
                    p += self.write_value(elem, item, field, buf, p)?;
                }
                Ok(p - pos)
            }
            (FieldKind::Object { type_name, bare }, Value::Object(obj)) => {
                let bare = *bare || self.schema.tagless_type(type_name).is_some();
                self.write_object(obj, Some(type_name), bare, buf, pos)
            }
            (FieldKind::Generic { .. } | FieldKind::AnyObject, Value::Object(obj)) => {
                self.write_object(obj, None, false, buf, pos)
            }
            (FieldKind::Vector { .. } | FieldKind::Object { .. } | FieldKind::Generic { .. } | FieldKind::AnyObject, Value::Bytes(raw)) => {
                let size = self.kind_size(kind, raw, 0)?;
                layout::check_exact(raw, size, field)?;
                layout::write_raw(buf, pos, raw)
            }
            _ => Err(mismatch(field, kind, value)),
        }
    }

    fn write_object(&self, obj: &Object, expected: Option<&str>, bare: bool, buf: &mut [u8], pos: usize) -> Result<usize> {
        let (ci, header) = self.object_header(obj, bare)?;
        if let Some(type_name) = expected {
            let decl = &self.schema.combinators()[ci];
            let fits = if bare {
                self.schema.bare_target(type_name) == Some(ci)
            } else {
                !decl.is_function && decl.result.qualified_name() == type_name
            };
            if !fits {
                return Err(TlError::InvalidFieldState(format!(
                    "`{}` is not a constructor of `{}`",
                    obj.name, type_name
                )));
            }
        }
        let flags = self.resolve_flags(ci, obj)?;
        let end = self.encode_fields(ci, obj, &flags, buf, pos, header)?;
        Ok(end - pos)
    }
}

fn supplied(f: &FieldLayout, value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) if f.is_presence_only() => *b,
        Some(_) => true,
    }
}

fn default_for(kind: &FieldKind, field: &str) -> Result<Value> {
    match zero_value(kind) {
        Value::Null => Err(TlError::InvalidFieldState(format!("missing value for `{field}`"))),
        v => Ok(v),
    }
}
