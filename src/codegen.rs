//! Compile a [`Schema`] into Rust source: one zero-copy view per combinator,
//! one enum per union, and an any-object dispatcher.
//!
//! For `foo#1 a:int b:long = Foo;` the output contains roughly:
//!
//! ```text
//! pub struct Foo<'a> { buf: &'a [u8], header: usize }
//! impl<'a> Foo<'a> {
//!     pub const TAG: u32 = 0x00000001;
//!     pub fn a(&self) -> rt::Result<i32>;
//!     pub fn field_offset(&self, index: usize) -> rt::Result<usize>;
//!     pub fn required_size() -> usize;
//!     pub fn build(a: i32, b: i64) -> rt::Result<Vec<u8>>;
//! }
//! impl<'a> TlRead<'a> for Foo<'a> { /* size_of, read */ }
//! ```
//!
//! Generated code refers to the runtime only through `rt::layout`, so schema
//! type names (`Result`, `Vector`, ...) never collide with runtime items.
//! Conditional fields read as `Option<T>`. Nested objects and non-scalar
//! vectors are passed to `build` pre-serialized and validated against their
//! own `size_of`.

use crate::ast::CombinatorDeclaration;
use crate::error::{Result, TlError};
use crate::schema::{FieldKind, FieldLayout, Schema};
use std::collections::{HashMap, HashSet};

/// Generator configuration (set from `tlgen` flags).
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Path of the runtime crate as seen from the generated module
    /// (`tlschema`, or `crate` when generating inside this crate).
    pub runtime_path: String,
    /// Emit `///` doc comments carrying each combinator's declaration.
    pub emit_docs: bool,
    /// First line of the module; defaults to a "generated" notice.
    pub module_header: Option<String>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            runtime_path: "tlschema".to_string(),
            emit_docs: true,
            module_header: None,
        }
    }
}

const DEFAULT_HEADER: &str = "// Generated by tlgen. Do not edit.";

/// Methods every view defines; accessors with these names get a `_field` suffix.
const VIEW_METHODS: &[&str] = &[
    "as_bytes",
    "build",
    "constructor_tag",
    "field_offset",
    "offset_of",
    "required_size",
];

/// Locals used inside generated `build` bodies.
const BUILD_LOCALS: &[&str] = &["buf", "pos", "size", "v"];

/// Compile a whole schema to one Rust module.
pub fn generate(schema: &Schema, options: &GeneratorOptions) -> Result<String> {
    let gen = Generator::new(schema, options);
    gen.module()
}

/// Convert `ns.some_name` / `someName` to `NsSomeName` / `SomeName`.
pub fn to_pascal_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for part in s.split(|c| c == '.' || c == '_').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Convert `someName` to `some_name`; snake_case input is unchanged.
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            out.push(c);
        }
    }
    out
}

/// Escapes Rust reserved keywords by suffixing with an underscore.
pub fn escape_rust_keyword(s: &str) -> String {
    const KEYWORDS: &[&str] = &[
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
        "extern", "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod",
        "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super",
        "trait", "true", "try", "type", "unsafe", "use", "where", "while", "abstract", "become",
        "box", "do", "final", "macro", "override", "priv", "typeof", "unsized", "virtual", "yield",
    ];
    if KEYWORDS.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

/// How a field refers to another combinator's view type.
enum Target {
    Boxed(String),
    Bare(String),
}

/// Per-argument names used in the emitted code.
struct FieldNames {
    accessor: String,
    param: String,
    /// Unescaped snake name, for derived `<name>_len` / `has_<name>`.
    base: String,
}

struct Generator<'s> {
    schema: &'s Schema,
    options: &'s GeneratorOptions,
    structs: Vec<String>,
    /// Type name -> Rust type used for boxed references (enum or struct).
    types: HashMap<String, String>,
    out: String,
}

impl<'s> Generator<'s> {
    fn new(schema: &'s Schema, options: &'s GeneratorOptions) -> Self {
        let mut used: HashSet<String> = HashSet::new();
        let mut types = HashMap::new();
        used.insert("AnyObject".to_string());
        for g in schema.unions() {
            let name = unique(to_pascal_case(&g.name), &mut used);
            types.insert(g.name.clone(), name);
        }
        let mut structs = Vec::with_capacity(schema.combinators().len());
        for c in schema.combinators() {
            let base = to_pascal_case(&c.qualified_name());
            let name = if used.contains(&base) {
                unique(format!("{}Ctor", base), &mut used)
            } else {
                unique(base, &mut used)
            };
            structs.push(name);
        }
        for g in schema.groups().iter().filter(|g| !g.is_union()) {
            types.insert(g.name.clone(), structs[g.members[0]].clone());
        }
        Generator {
            schema,
            options,
            structs,
            types,
            out: String::new(),
        }
    }

    fn line(&mut self, s: impl AsRef<str>) {
        self.out.push_str(s.as_ref());
        self.out.push('\n');
    }

    fn module(mut self) -> Result<String> {
        let header = self
            .options
            .module_header
            .clone()
            .unwrap_or_else(|| DEFAULT_HEADER.to_string());
        self.line(header);
        self.line("#![allow(dead_code, unused_imports, unused_mut, unused_assignments, unused_variables, clippy::all)]");
        self.line("");
        self.line(format!("use {} as rt;", self.options.runtime_path));
        self.line("use rt::layout;");
        self.line("use rt::layout::{TlBareRead as _, TlRead as _, TlWrite as _};");

        for ci in 0..self.schema.combinators().len() {
            self.line("");
            self.combinator(ci)?;
            tracing::trace!(combinator = %self.schema.combinators()[ci].qualified_name(), "emitted view");
        }
        let unions: Vec<(String, Vec<usize>)> = self
            .schema
            .unions()
            .map(|g| (g.name.clone(), g.members.clone()))
            .collect();
        for (name, members) in &unions {
            self.line("");
            self.union(name, members);
        }
        self.line("");
        self.any_object();

        tracing::debug!(
            combinators = self.structs.len(),
            unions = unions.len(),
            bytes = self.out.len(),
            "generated module"
        );
        Ok(self.out)
    }

    // --- type mapping ---

    fn object_target(&self, type_name: &str, bare: bool) -> Result<Target> {
        if bare {
            let ci = self
                .schema
                .bare_target(type_name)
                .ok_or_else(|| TlError::UnknownType(type_name.to_string()))?;
            return Ok(Target::Bare(self.structs[ci].clone()));
        }
        let g = self
            .schema
            .group(type_name)
            .ok_or_else(|| TlError::UnknownType(type_name.to_string()))?;
        let ty = self.types[&g.name].clone();
        if !g.is_union() && self.schema.combinators()[g.members[0]].tag.is_none() {
            // Tagless types only exist bare.
            return Ok(Target::Bare(ty));
        }
        Ok(Target::Boxed(ty))
    }

    /// Expression of type `rt::Result<usize>` sizing `kind` at `buf[pos..]`.
    fn size_expr(&self, kind: &FieldKind, buf: &str, pos: &str) -> Result<String> {
        Ok(match kind {
            FieldKind::True => "Ok(0)".to_string(),
            FieldKind::Bool => format!("<bool as layout::TlRead>::size_of({buf}, {pos})"),
            FieldKind::Bytes | FieldKind::String => format!("layout::bytes_size_of({buf}, {pos})"),
            FieldKind::Vector { boxed, elem } => format!(
                "layout::vector_size_of({buf}, {pos}, {boxed}, |buf, pos| {})",
                self.size_expr(elem, "buf", "pos")?
            ),
            FieldKind::Object { type_name, bare } => match self.object_target(type_name, *bare)? {
                Target::Boxed(ty) => format!("<{ty} as layout::TlRead>::size_of({buf}, {pos})"),
                Target::Bare(ty) => format!("<{ty} as layout::TlBareRead>::bare_size_of({buf}, {pos})"),
            },
            FieldKind::Generic { .. } | FieldKind::AnyObject => format!("size_of_any({buf}, {pos})"),
            fixed => {
                let w = fixed.fixed_width().unwrap_or(0);
                format!("layout::ensure({buf}, {pos}, {w})")
            }
        })
    }

    /// Rust type an accessor returns for `kind`.
    fn read_type(&self, kind: &FieldKind) -> Result<String> {
        Ok(match kind {
            FieldKind::Flags => "u32".into(),
            FieldKind::Int => "i32".into(),
            FieldKind::Long => "i64".into(),
            FieldKind::Double => "f64".into(),
            FieldKind::Int128 => "[u8; 16]".into(),
            FieldKind::Int256 => "[u8; 32]".into(),
            FieldKind::Bytes | FieldKind::String => "&'a [u8]".into(),
            FieldKind::Bool | FieldKind::True => "bool".into(),
            FieldKind::Vector { elem, .. } => format!("layout::VectorView<'a, {}>", self.elem_type(elem)?),
            FieldKind::Object { type_name, bare } => match self.object_target(type_name, *bare)? {
                Target::Boxed(ty) | Target::Bare(ty) => format!("{ty}<'a>"),
            },
            FieldKind::Generic { .. } | FieldKind::AnyObject => "AnyObject<'a>".into(),
        })
    }

    /// Vector element type: must implement `TlRead` in the element's wire form.
    fn elem_type(&self, kind: &FieldKind) -> Result<String> {
        Ok(match kind {
            FieldKind::Object { type_name, bare } => match self.object_target(type_name, *bare)? {
                Target::Boxed(ty) => format!("{ty}<'a>"),
                Target::Bare(ty) => format!("layout::Bare<{ty}<'a>>"),
            },
            FieldKind::Vector { boxed: false, .. } => format!("layout::Bare<{}>", self.read_type(kind)?),
            _ => self.read_type(kind)?,
        })
    }

    /// Expression of type `rt::Result<(T, usize)>` reading `kind` at `buf[pos..]`.
    fn read_expr(&self, kind: &FieldKind, buf: &str, pos: &str) -> Result<String> {
        Ok(match kind {
            FieldKind::Vector { boxed, elem } => format!(
                "layout::VectorView::<'a, {}>::read_with({buf}, {pos}, {boxed})",
                self.elem_type(elem)?
            ),
            FieldKind::Object { type_name, bare } => match self.object_target(type_name, *bare)? {
                Target::Boxed(ty) => format!("<{ty}<'a> as layout::TlRead<'a>>::read({buf}, {pos})"),
                Target::Bare(ty) => format!("<{ty}<'a> as layout::TlBareRead<'a>>::read_bare({buf}, {pos})"),
            },
            other => format!("<{} as layout::TlRead<'a>>::read({buf}, {pos})", self.read_type(other)?),
        })
    }

    // --- concrete combinators ---

    fn field_names(&self, c: &CombinatorDeclaration) -> Vec<FieldNames> {
        let mut used: HashSet<String> = HashSet::new();
        c.arguments
            .iter()
            .map(|a| {
                let base = to_snake_case(&a.name);
                let mut accessor = escape_rust_keyword(&base);
                if VIEW_METHODS.contains(&accessor.as_str()) {
                    accessor = format!("{}_field", accessor);
                }
                let accessor = unique(accessor, &mut used);
                let mut param = accessor.clone();
                if BUILD_LOCALS.contains(&param.as_str()) {
                    param = format!("{}_", param);
                }
                FieldNames { accessor, param, base }
            })
            .collect()
    }

    fn combinator(&mut self, ci: usize) -> Result<()> {
        let schema = self.schema;
        let c = &schema.combinators()[ci];
        let fields = schema.layout(ci);
        let name = self.structs[ci].clone();
        let names = self.field_names(c);
        let qualified = c.qualified_name();

        if self.options.emit_docs {
            self.line(format!("/// `{}`", c));
        }
        self.line("#[derive(Debug, Clone, Copy, PartialEq, Eq)]");
        self.line(format!("pub struct {name}<'a> {{"));
        self.line("    buf: &'a [u8],");
        self.line("    header: usize,");
        self.line("}");
        self.line("");
        self.line(format!("impl<'a> {name}<'a> {{"));
        if let Some(tag) = c.tag {
            self.line(format!("    pub const TAG: u32 = 0x{tag:08x};"));
        }
        self.line(format!("    pub const FIELD_COUNT: usize = {};", fields.len()));
        self.line("");
        self.line("    pub fn as_bytes(&self) -> &'a [u8] {");
        self.line("        self.buf");
        self.line("    }");
        if c.tag.is_some() {
            self.line("");
            if self.options.emit_docs {
                self.line("    /// Leading tag, not validated; `None` when read bare.");
            }
            self.line("    pub fn constructor_tag(&self) -> Option<u32> {");
            self.line("        if self.header == 0 {");
            self.line("            return None;");
            self.line("        }");
            self.line("        layout::read_u32(self.buf, 0).ok()");
            self.line("    }");
        }
        self.line("");
        self.offset_of(&qualified, fields)?;
        self.line("");
        if self.options.emit_docs {
            self.line("    /// Offset of field `index` within [`Self::as_bytes`]. Walks every");
            self.line("    /// earlier field on each call, so the cost grows with `index`;");
            self.line("    /// offsets are not cached.");
        }
        self.line("    pub fn field_offset(&self, index: usize) -> rt::Result<usize> {");
        self.line("        if index >= Self::FIELD_COUNT {");
        self.line(format!(
            "            return Err(rt::TlError::InvalidFieldState(format!(\"`{qualified}` has no field #{{}}\", index)));"
        ));
        self.line("        }");
        self.line("        Self::offset_of(self.buf, self.header, index)");
        self.line("    }");
        for (i, (arg, f)) in c.arguments.iter().zip(fields).enumerate() {
            self.line("");
            self.accessor(c, fields, &names, i, f, &arg.type_term.to_string())?;
        }
        self.line("");
        self.required_size(c, fields, &names)?;
        self.line("");
        self.build(c, fields, &names)?;
        self.line("}");

        if c.tag.is_some() {
            self.line("");
            self.line(format!("impl<'a> layout::TlRead<'a> for {name}<'a> {{"));
            self.line("    fn size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {");
            self.line("        let _depth = layout::DepthGuard::enter(offset)?;");
            self.line("        layout::ensure(buf, offset, 4)?;");
            self.line("        Ok(Self::offset_of(buf, offset + 4, Self::FIELD_COUNT)? - offset)");
            self.line("    }");
            self.line("");
            self.line("    fn read(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {");
            self.line("        let size = <Self as layout::TlRead<'a>>::size_of(buf, offset)?;");
            self.line(format!("        Ok(({name} {{ buf: &buf[offset..offset + size], header: 4 }}, size))"));
            self.line("    }");
            self.line("}");
        }
        self.line("");
        self.line(format!("impl<'a> layout::TlBareRead<'a> for {name}<'a> {{"));
        self.line("    fn bare_size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {");
        self.line("        let _depth = layout::DepthGuard::enter(offset)?;");
        self.line("        layout::ensure(buf, offset, 0)?;");
        self.line("        Ok(Self::offset_of(buf, offset, Self::FIELD_COUNT)? - offset)");
        self.line("    }");
        self.line("");
        self.line("    fn read_bare(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {");
        self.line("        let size = <Self as layout::TlBareRead<'a>>::bare_size_of(buf, offset)?;");
        self.line(format!("        Ok(({name} {{ buf: &buf[offset..offset + size], header: 0 }}, size))"));
        self.line("    }");
        self.line("}");
        Ok(())
    }

    /// `offset_of(buf, start, stop)`: walk the first `stop` fields from `start`.
    fn offset_of(&mut self, qualified: &str, fields: &[FieldLayout]) -> Result<()> {
        self.line("    fn offset_of(buf: &[u8], start: usize, stop: usize) -> rt::Result<usize> {");
        if fields.is_empty() {
            self.line("        let _ = (buf, stop);");
            self.line("        Ok(start)");
            self.line("    }");
            return Ok(());
        }
        self.line("        let mut pos = start;");
        for (i, f) in fields.iter().enumerate() {
            if f.flags_slot.is_some() {
                self.line(format!("        let mut flags_{i} = 0u32;"));
            }
        }
        self.line("        for index in 0..stop.min(Self::FIELD_COUNT) {");
        self.line("            match index {");
        for (i, f) in fields.iter().enumerate() {
            if f.flags_slot.is_some() {
                self.line(format!("                {i} => {{"));
                self.line(format!("                    flags_{i} = layout::read_u32(buf, pos)?;"));
                self.line("                    pos += 4;");
                self.line("                }");
                continue;
            }
            if f.is_presence_only() {
                continue;
            }
            let size = self.size_expr(&f.kind, "buf", "pos")?;
            match f.gate {
                Some(g) => {
                    let flags_field = flags_field_index(fields, g.slot);
                    self.line(format!("                {i} => {{"));
                    self.line(format!("                    if flags_{flags_field} & (1u32 << {}) != 0 {{", g.bit));
                    self.line(format!("                        pos += {size}?;"));
                    self.line("                    }");
                    self.line("                }");
                }
                None => self.line(format!("                {i} => pos += {size}?,")),
            }
        }
        self.line("                _ => {}");
        self.line("            }");
        self.line("        }");
        self.line(format!("        layout::record_walk(\"{qualified}\", stop.min(Self::FIELD_COUNT));"));
        self.line("        Ok(pos)");
        self.line("    }");
        Ok(())
    }

    fn accessor(
        &mut self,
        c: &CombinatorDeclaration,
        fields: &[FieldLayout],
        names: &[FieldNames],
        i: usize,
        f: &FieldLayout,
        declared: &str,
    ) -> Result<()> {
        let arg = &c.arguments[i];
        let accessor = &names[i].accessor;
        if self.options.emit_docs {
            match &arg.conditional {
                Some(cond) => self.line(format!("    /// `{}:{}.{}?{}`", arg.name, cond.flags_field, cond.bit, declared)),
                None => self.line(format!("    /// `{}:{}`", arg.name, declared)),
            }
        }
        let gate = f.gate.map(|g| {
            let flags_accessor = &names[flags_field_index(fields, g.slot)].accessor;
            format!("self.{flags_accessor}()? & (1u32 << {}) != 0", g.bit)
        });

        if f.is_presence_only() {
            self.line(format!("    pub fn {accessor}(&self) -> rt::Result<bool> {{"));
            match gate {
                Some(cond) => self.line(format!("        Ok({cond})")),
                None => self.line("        Ok(true)"),
            }
            self.line("    }");
            return Ok(());
        }

        let ty = self.read_type(&f.kind)?;
        let read = self.read_expr(&f.kind, "self.buf", "pos")?;
        match gate {
            Some(cond) => {
                self.line(format!("    pub fn {accessor}(&self) -> rt::Result<Option<{ty}>> {{"));
                self.line(format!("        if !({cond}) {{"));
                self.line("            return Ok(None);");
                self.line("        }");
                self.line(format!("        let pos = self.field_offset({i})?;"));
                self.line(format!("        {read}.map(|(v, _)| Some(v))"));
            }
            None => {
                self.line(format!("    pub fn {accessor}(&self) -> rt::Result<{ty}> {{"));
                self.line(format!("        let pos = self.field_offset({i})?;"));
                self.line(format!("        {read}.map(|(v, _)| v)"));
            }
        }
        self.line("    }");
        Ok(())
    }

    // --- builder ---

    fn required_size(&mut self, c: &CombinatorDeclaration, fields: &[FieldLayout], names: &[FieldNames]) -> Result<()> {
        let mut params = Vec::new();
        let mut terms = Vec::new();
        if c.tag.is_some() {
            terms.push("4".to_string());
        }
        for (f, n) in fields.iter().zip(names) {
            if f.is_presence_only() {
                continue;
            }
            let conditional = f.gate.is_some();
            match (&f.kind, f.kind.fixed_width()) {
                (_, Some(w)) if conditional => {
                    params.push(format!("has_{}: bool", n.base));
                    terms.push(format!("(if has_{} {{ {w} }} else {{ 0 }})", n.base));
                }
                (_, Some(w)) => terms.push(w.to_string()),
                (FieldKind::Bytes | FieldKind::String, None) if conditional => {
                    params.push(format!("{}_len: Option<usize>", n.base));
                    terms.push(format!("{}_len.map_or(0, layout::encoded_bytes_len)", n.base));
                }
                (FieldKind::Bytes | FieldKind::String, None) => {
                    params.push(format!("{}_len: usize", n.base));
                    terms.push(format!("layout::encoded_bytes_len({}_len)", n.base));
                }
                (_, None) if conditional => {
                    params.push(format!("{}_len: Option<usize>", n.base));
                    terms.push(format!("{}_len.unwrap_or(0)", n.base));
                }
                (_, None) => {
                    params.push(format!("{}_len: usize", n.base));
                    terms.push(format!("{}_len", n.base));
                }
            }
        }
        if terms.is_empty() {
            terms.push("0".to_string());
        }
        if self.options.emit_docs {
            self.line("    /// Exact encoded size. `*_len` arguments are data lengths for byte");
            self.line("    /// strings and full encoded lengths for vectors and objects.");
        }
        self.line(format!("    pub fn required_size({}) -> usize {{", params.join(", ")));
        self.line(format!("        {}", terms.join("\n            + ")));
        self.line("    }");
        Ok(())
    }

    fn build(&mut self, c: &CombinatorDeclaration, fields: &[FieldLayout], names: &[FieldNames]) -> Result<()> {
        let mut params = Vec::new();
        let mut size_args = Vec::new();
        let mut checks = Vec::new();
        let mut writes = Vec::new();

        for (i, (f, n)) in fields.iter().zip(names).enumerate() {
            if f.is_presence_only() {
                continue;
            }
            let p = &n.param;
            let conditional = f.gate.is_some();
            let (ty, len_expr, write) = self.build_parts(&f.kind)?;
            params.push(if conditional {
                format!("{p}: Option<{ty}>")
            } else {
                format!("{p}: {ty}")
            });

            if let Some(g) = f.gate {
                let flags_param = &names[flags_field_index(fields, g.slot)].param;
                checks.push(format!(
                    "layout::check_gate({flags_param}, {}, {p}.is_some(), \"{}\")?;",
                    g.bit, c.arguments[i].name
                ));
            }
            if needs_validation(&f.kind) {
                let size = self.size_expr(&f.kind, "v", "0")?;
                let check = format!("layout::check_exact(v, {size}?, \"{}\")?;", c.arguments[i].name);
                if conditional {
                    checks.push(format!("if let Some(v) = {p} {{ {check} }}"));
                } else {
                    checks.push(format!("{{ let v = {p}; {check} }}"));
                }
            }

            match (f.kind.fixed_width(), conditional) {
                (Some(_), false) => {}
                (Some(_), true) => size_args.push(format!("{p}.is_some()")),
                (None, false) => size_args.push(len_expr.replace("{v}", p)),
                (None, true) => size_args.push(format!("{p}.map(|v| {})", len_expr.replace("{v}", "v"))),
            }

            if conditional {
                writes.push(format!("if let Some(v) = {p} {{ pos += {}?; }}", write.replace("{v}", "v")));
            } else {
                writes.push(format!("pos += {}?;", write.replace("{v}", p)));
            }
        }

        if self.options.emit_docs {
            self.line("    /// Serialize into one exactly-sized buffer. Every conditional argument");
            self.line("    /// must agree with its flag bit.");
        }
        self.line(format!("    pub fn build({}) -> rt::Result<Vec<u8>> {{", params.join(", ")));
        for check in &checks {
            self.line(format!("        {check}"));
        }
        self.line(format!("        let size = Self::required_size({});", size_args.join(", ")));
        self.line("        let mut buf = vec![0u8; size];");
        self.line("        let mut pos = 0usize;");
        if c.tag.is_some() {
            self.line("        pos += layout::write_u32(&mut buf, pos, Self::TAG)?;");
        }
        for w in &writes {
            self.line(format!("        {w}"));
        }
        self.line("        debug_assert_eq!(pos, size);");
        self.line("        Ok(buf)");
        self.line("    }");
        Ok(())
    }

    /// `(param type, length expr, write expr)` for a builder argument.
    /// `{v}` in the expressions stands for the argument value.
    fn build_parts(&self, kind: &FieldKind) -> Result<(String, String, String)> {
        let scalar = |ty: &str| (ty.to_string(), String::new(), "{v}.write_to(&mut buf, pos)".to_string());
        Ok(match kind {
            FieldKind::Flags => ("u32".into(), String::new(), "layout::write_u32(&mut buf, pos, {v})".into()),
            FieldKind::Int => scalar("i32"),
            FieldKind::Long => scalar("i64"),
            FieldKind::Double => scalar("f64"),
            FieldKind::Bool => scalar("bool"),
            FieldKind::Int128 => scalar("&[u8; 16]"),
            FieldKind::Int256 => scalar("&[u8; 32]"),
            FieldKind::True => ("bool".into(), String::new(), "Ok::<usize, rt::TlError>(0)".into()),
            FieldKind::Bytes | FieldKind::String => (
                "&[u8]".into(),
                "{v}.len()".into(),
                "layout::write_bytes(&mut buf, pos, {v})".into(),
            ),
            FieldKind::Vector { boxed, elem } => match scalar_elem(elem) {
                Some(t) => (
                    format!("&[{t}]"),
                    format!("layout::vector_encoded_len({{v}}, {boxed})"),
                    format!("layout::write_vector(&mut buf, pos, {{v}}, {boxed})"),
                ),
                None => raw_parts(),
            },
            FieldKind::Object { .. } | FieldKind::Generic { .. } | FieldKind::AnyObject => raw_parts(),
        })
    }

    // --- unions and any-object dispatch ---

    fn union(&mut self, type_name: &str, members: &[usize]) {
        let enum_name = self.types[type_name].clone();
        let variants: Vec<(String, u32)> = members
            .iter()
            .map(|&m| (self.structs[m].clone(), self.schema.combinators()[m].tag.unwrap_or(0)))
            .collect();
        if self.options.emit_docs {
            self.line(format!("/// Union `{type_name}`: dispatched on the constructor tag."));
        }
        self.line("#[derive(Debug, Clone, Copy, PartialEq, Eq)]");
        self.line(format!("pub enum {enum_name}<'a> {{"));
        for (v, _) in &variants {
            self.line(format!("    {v}({v}<'a>),"));
        }
        self.line("}");
        self.line("");
        self.line(format!("impl<'a> {enum_name}<'a> {{"));
        self.line("    pub fn constructor_tag(&self) -> u32 {");
        self.line("        match self {");
        for (v, _) in &variants {
            self.line(format!("            {enum_name}::{v}(_) => {v}::TAG,"));
        }
        self.line("        }");
        self.line("    }");
        self.line("");
        self.line("    pub fn as_bytes(&self) -> &'a [u8] {");
        self.line("        match self {");
        for (v, _) in &variants {
            self.line(format!("            {enum_name}::{v}(x) => x.as_bytes(),"));
        }
        self.line("        }");
        self.line("    }");
        self.line("}");
        self.line("");
        self.line(format!("impl<'a> layout::TlRead<'a> for {enum_name}<'a> {{"));
        self.line("    fn size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {");
        self.line("        match layout::read_u32(buf, offset)? {");
        for (v, tag) in &variants {
            self.line(format!("            0x{tag:08x} => <{v} as layout::TlRead>::size_of(buf, offset),"));
        }
        self.line("            tag => Err(rt::TlError::UnknownConstructor { tag }),");
        self.line("        }");
        self.line("    }");
        self.line("");
        self.line("    fn read(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {");
        self.line("        match layout::read_u32(buf, offset)? {");
        for (v, tag) in &variants {
            self.line(format!(
                "            0x{tag:08x} => <{v}<'a> as layout::TlRead<'a>>::read(buf, offset).map(|(x, n)| ({enum_name}::{v}(x), n)),"
            ));
        }
        self.line("            tag => Err(rt::TlError::UnknownConstructor { tag }),");
        self.line("        }");
        self.line("    }");
        self.line("}");
    }

    fn any_object(&mut self) {
        let tagged: Vec<(String, u32)> = self
            .schema
            .combinators()
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.tag.map(|t| (self.structs[i].clone(), t)))
            .collect();
        if self.options.emit_docs {
            self.line("/// Size of any boxed object of this schema (constructors and functions),");
            self.line("/// dispatched on its tag.");
        }
        self.line("pub fn size_of_any(buf: &[u8], offset: usize) -> rt::Result<usize> {");
        self.line("    match layout::read_u32(buf, offset)? {");
        for (s, tag) in &tagged {
            self.line(format!("        0x{tag:08x} => <{s} as layout::TlRead>::size_of(buf, offset),"));
        }
        self.line("        tag => Err(rt::TlError::UnknownConstructor { tag }),");
        self.line("    }");
        self.line("}");
        self.line("");
        if self.options.emit_docs {
            self.line("/// Any boxed object, kept as its tag and raw bytes.");
        }
        self.line("#[derive(Debug, Clone, Copy, PartialEq, Eq)]");
        self.line("pub struct AnyObject<'a> {");
        self.line("    buf: &'a [u8],");
        self.line("    tag: u32,");
        self.line("}");
        self.line("");
        self.line("impl<'a> AnyObject<'a> {");
        self.line("    pub fn constructor_tag(&self) -> u32 {");
        self.line("        self.tag");
        self.line("    }");
        self.line("");
        self.line("    pub fn as_bytes(&self) -> &'a [u8] {");
        self.line("        self.buf");
        self.line("    }");
        self.line("}");
        self.line("");
        self.line("impl<'a> layout::TlRead<'a> for AnyObject<'a> {");
        self.line("    fn size_of(buf: &[u8], offset: usize) -> rt::Result<usize> {");
        self.line("        size_of_any(buf, offset)");
        self.line("    }");
        self.line("");
        self.line("    fn read(buf: &'a [u8], offset: usize) -> rt::Result<(Self, usize)> {");
        self.line("        let size = size_of_any(buf, offset)?;");
        self.line("        let tag = layout::read_u32(buf, offset)?;");
        self.line("        Ok((AnyObject { buf: &buf[offset..offset + size], tag }, size))");
        self.line("    }");
        self.line("}");
    }
}

fn raw_parts() -> (String, String, String) {
    (
        "&[u8]".into(),
        "{v}.len()".into(),
        "layout::write_raw(&mut buf, pos, {v})".into(),
    )
}

/// Element types a builder accepts as a plain slice.
fn scalar_elem(kind: &FieldKind) -> Option<&'static str> {
    match kind {
        FieldKind::Int => Some("i32"),
        FieldKind::Long => Some("i64"),
        FieldKind::Double => Some("f64"),
        FieldKind::Int128 => Some("[u8; 16]"),
        FieldKind::Int256 => Some("[u8; 32]"),
        FieldKind::Bytes | FieldKind::String => Some("&[u8]"),
        FieldKind::Bool => Some("bool"),
        _ => None,
    }
}

/// Pre-serialized builder arguments are checked against their own size.
fn needs_validation(kind: &FieldKind) -> bool {
    match kind {
        FieldKind::Vector { elem, .. } => scalar_elem(elem).is_none(),
        FieldKind::Object { .. } | FieldKind::Generic { .. } | FieldKind::AnyObject => true,
        _ => false,
    }
}

fn flags_field_index(fields: &[FieldLayout], slot: usize) -> usize {
    fields
        .iter()
        .position(|f| f.flags_slot == Some(slot))
        .unwrap_or(0)
}

fn unique(name: String, used: &mut HashSet<String>) -> String {
    let mut candidate = name.clone();
    let mut n = 2;
    while used.contains(&candidate) {
        candidate = format!("{}{}", name, n);
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}
