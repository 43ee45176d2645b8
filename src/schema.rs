//! Schema model: combinators grouped by result type, with every argument
//! resolved to its wire layout.
//!
//! A [`TypeGroup`] with one member is a concrete type; with several it is a
//! polymorphic union read by tag inspection. Tags are unique across the whole
//! schema and qualified names are unique too; either collision fails
//! compilation with [`TlError::InvalidFieldState`].

use crate::ast::*;
use crate::error::{Result, TlError};
use crate::parser;
use std::collections::HashMap;

/// Upper bound on `#` fields in one combinator (real schemas use at most two).
pub const MAX_FLAGS_FIELDS: usize = 8;

/// Wire layout class of one argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// `#`: 32-bit bitmask.
    Flags,
    Int,
    Long,
    Double,
    Int128,
    Int256,
    Bytes,
    String,
    /// `true`: no storage; the value is the gating flag bit.
    True,
    /// Builtin boxed `Bool` (`boolTrue` / `boolFalse`).
    Bool,
    Vector { boxed: bool, elem: Box<FieldKind> },
    /// User type. Bare references name a combinator (or a single-constructor
    /// type) and carry no tag; boxed references name a type and are read by tag.
    Object { type_name: String, bare: bool },
    /// `X` / `!X` for a `{X:Type}` parameter: any boxed object.
    Generic { param: String },
    /// The universal `Object` type: any boxed object.
    AnyObject,
}

impl FieldKind {
    /// Width of fixed-size kinds; `None` for variable-length ones.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            FieldKind::Flags | FieldKind::Int | FieldKind::Bool => Some(4),
            FieldKind::Long | FieldKind::Double => Some(8),
            FieldKind::Int128 => Some(16),
            FieldKind::Int256 => Some(32),
            FieldKind::True => Some(0),
            _ => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        self.fixed_width().is_none()
    }
}

/// Presence condition resolved to a flags slot (index among the combinator's
/// `#` fields) and a bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub slot: usize,
    pub bit: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub kind: FieldKind,
    pub gate: Option<Gate>,
    /// Set for `#` fields: which slot their value fills.
    pub flags_slot: Option<usize>,
}

impl FieldLayout {
    pub fn is_presence_only(&self) -> bool {
        self.kind == FieldKind::True
    }
}

/// All constructors sharing one result type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeGroup {
    pub name: String,
    /// Indices into [`Schema::combinators`], in declaration order.
    pub members: Vec<usize>,
}

impl TypeGroup {
    pub fn is_union(&self) -> bool {
        self.members.len() > 1
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    combinators: Vec<CombinatorDeclaration>,
    layouts: Vec<Vec<FieldLayout>>,
    groups: Vec<TypeGroup>,
    groups_by_name: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    by_tag: HashMap<u32, usize>,
}

impl Schema {
    /// Lex, parse and group a schema source in one pass.
    pub fn compile(source: &str) -> Result<Self> {
        let declarations = parser::parse(source)?;
        Schema::from_declarations(declarations)
    }

    pub fn from_declarations(combinators: Vec<CombinatorDeclaration>) -> Result<Self> {
        let mut by_name = HashMap::new();
        let mut by_tag: HashMap<u32, usize> = HashMap::new();
        let mut groups: Vec<TypeGroup> = Vec::new();
        let mut groups_by_name: HashMap<String, usize> = HashMap::new();
        let mut layouts = Vec::with_capacity(combinators.len());

        for (i, c) in combinators.iter().enumerate() {
            let name = c.qualified_name();
            if let Some(prev) = by_name.insert(name.clone(), i) {
                return Err(TlError::InvalidFieldState(format!(
                    "combinator `{}` declared twice (line {} and line {})",
                    name, combinators[prev].position.line, c.position.line
                )));
            }
            if let Some(tag) = c.tag {
                if let Some(prev) = by_tag.insert(tag, i) {
                    return Err(TlError::InvalidFieldState(format!(
                        "constructor tag 0x{:08x} used by both `{}` and `{}`",
                        tag,
                        combinators[prev].qualified_name(),
                        name
                    )));
                }
            }
            layouts.push(resolve_layout(c)?);
            if c.is_function {
                continue;
            }
            let result = c.result.qualified_name();
            match groups_by_name.get(&result) {
                Some(&g) => groups[g].members.push(i),
                None => {
                    groups_by_name.insert(result.clone(), groups.len());
                    groups.push(TypeGroup {
                        name: result,
                        members: vec![i],
                    });
                }
            }
        }

        for g in groups.iter().filter(|g| g.is_union()) {
            if let Some(&m) = g.members.iter().find(|&&m| combinators[m].tag.is_none()) {
                return Err(TlError::InvalidFieldState(format!(
                    "union `{}` member `{}` has no constructor tag",
                    g.name,
                    combinators[m].qualified_name()
                )));
            }
            tracing::debug!(union = %g.name, members = g.members.len(), "discovered union");
        }

        tracing::info!(
            combinators = combinators.len(),
            groups = groups.len(),
            unions = groups.iter().filter(|g| g.is_union()).count(),
            "schema compiled"
        );

        Ok(Schema {
            combinators,
            layouts,
            groups,
            groups_by_name,
            by_name,
            by_tag,
        })
    }

    pub fn combinators(&self) -> &[CombinatorDeclaration] {
        &self.combinators
    }

    pub fn combinator(&self, name: &str) -> Option<&CombinatorDeclaration> {
        self.by_name.get(name).map(|&i| &self.combinators[i])
    }

    pub fn combinator_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn combinator_by_tag(&self, tag: u32) -> Option<&CombinatorDeclaration> {
        self.by_tag.get(&tag).map(|&i| &self.combinators[i])
    }

    pub fn index_by_tag(&self, tag: u32) -> Option<usize> {
        self.by_tag.get(&tag).copied()
    }

    /// Resolved layout of the combinator at `index`, one entry per argument.
    pub fn layout(&self, index: usize) -> &[FieldLayout] {
        &self.layouts[index]
    }

    pub fn groups(&self) -> &[TypeGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&TypeGroup> {
        self.groups_by_name.get(name).map(|&i| &self.groups[i])
    }

    pub fn unions(&self) -> impl Iterator<Item = &TypeGroup> {
        self.groups.iter().filter(|g| g.is_union())
    }

    pub fn functions(&self) -> impl Iterator<Item = &CombinatorDeclaration> {
        self.combinators.iter().filter(|c| c.is_function)
    }

    /// Member of group `name` whose tag is `tag`.
    pub fn group_member_by_tag(&self, name: &str, tag: u32) -> Option<usize> {
        let i = self.index_by_tag(tag)?;
        let c = &self.combinators[i];
        (!c.is_function && c.result.qualified_name() == name).then_some(i)
    }

    /// Sole constructor of type `name` when that constructor has no tag. Such
    /// a type is serialized bare even where it is referenced boxed.
    pub fn tagless_type(&self, name: &str) -> Option<usize> {
        match self.group(name)?.members.as_slice() {
            [only] if self.combinators[*only].tag.is_none() => Some(*only),
            _ => None,
        }
    }

    /// Combinator read by a bare reference: either a combinator name, or a
    /// type with exactly one constructor.
    pub fn bare_target(&self, name: &str) -> Option<usize> {
        if let Some(i) = self.combinator_index(name) {
            return Some(i);
        }
        match self.group(name) {
            Some(g) if g.members.len() == 1 => Some(g.members[0]),
            _ => None,
        }
    }
}

fn resolve_layout(c: &CombinatorDeclaration) -> Result<Vec<FieldLayout>> {
    let mut slots: Vec<&str> = Vec::new();
    let mut out = Vec::with_capacity(c.arguments.len());
    for arg in &c.arguments {
        let kind = resolve_kind(&arg.type_term, c);
        let flags_slot = if kind == FieldKind::Flags {
            if slots.len() == MAX_FLAGS_FIELDS {
                return Err(TlError::InvalidFieldState(format!(
                    "`{}` declares more than {} flags fields",
                    c.qualified_name(),
                    MAX_FLAGS_FIELDS
                )));
            }
            slots.push(&arg.name);
            Some(slots.len() - 1)
        } else {
            None
        };
        let gate = match &arg.conditional {
            Some(cond) => {
                let slot = slots
                    .iter()
                    .position(|s| *s == cond.flags_field)
                    .ok_or_else(|| {
                        TlError::InvalidFieldState(format!(
                            "`{}.{}` refers to undeclared flags field `{}`",
                            c.qualified_name(),
                            arg.name,
                            cond.flags_field
                        ))
                    })?;
                Some(Gate { slot, bit: cond.bit })
            }
            None => None,
        };
        out.push(FieldLayout {
            kind,
            gate,
            flags_slot,
        });
    }
    Ok(out)
}

/// Map a declared type to its wire layout class.
pub fn resolve_kind(term: &TypeTerm, owner: &CombinatorDeclaration) -> FieldKind {
    if term.is_flags() {
        return FieldKind::Flags;
    }
    if term.namespace.is_none() && owner.is_generic_param(&term.identifier) {
        return FieldKind::Generic {
            param: term.identifier.clone(),
        };
    }
    if term.is_vector() {
        let elem = term
            .generic_arg
            .as_ref()
            .map(|a| resolve_kind(a, owner))
            .unwrap_or(FieldKind::AnyObject);
        return FieldKind::Vector {
            boxed: !term.bare,
            elem: Box::new(elem),
        };
    }
    if term.namespace.is_none() {
        match term.identifier.as_str() {
            "int" => return FieldKind::Int,
            "long" => return FieldKind::Long,
            "double" => return FieldKind::Double,
            "int128" => return FieldKind::Int128,
            "int256" => return FieldKind::Int256,
            "bytes" => return FieldKind::Bytes,
            "string" => return FieldKind::String,
            "true" => return FieldKind::True,
            "Bool" => return FieldKind::Bool,
            "Object" => return FieldKind::AnyObject,
            _ => {}
        }
    }
    FieldKind::Object {
        type_name: term.qualified_name(),
        bare: term.bare,
    }
}
