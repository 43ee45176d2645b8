//! Abstract syntax for TL combinator declarations.

use crate::lexer::Position;
use std::fmt;

/// Declared type of an argument or of a combinator's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTerm {
    pub namespace: Option<String>,
    /// Base identifier: `int`, `bytes`, `Vector`, `#`, a user type, or a generic parameter.
    pub identifier: String,
    /// Single generic argument (`Vector<T>`).
    pub generic_arg: Option<Box<TypeTerm>>,
    /// Bare types carry no leading constructor tag on the wire.
    pub bare: bool,
    /// Written as `!X`: bare invocation of a generic parameter.
    pub bang: bool,
}

impl TypeTerm {
    pub fn simple(identifier: &str) -> Self {
        let (namespace, identifier) = split_namespace(identifier);
        let bare = identifier
            .chars()
            .next()
            .map(|c| c.is_ascii_lowercase())
            .unwrap_or(false);
        TypeTerm {
            namespace,
            identifier,
            generic_arg: None,
            bare,
            bang: false,
        }
    }

    /// `namespace.identifier`, or `identifier` when no namespace is set.
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.identifier),
            None => self.identifier.clone(),
        }
    }

    pub fn is_flags(&self) -> bool {
        self.identifier == "#"
    }

    pub fn is_vector(&self) -> bool {
        self.namespace.is_none() && self.identifier.eq_ignore_ascii_case("vector")
    }
}

impl fmt::Display for TypeTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bang {
            write!(f, "!")?;
        }
        write!(f, "{}", self.qualified_name())?;
        if let Some(arg) = &self.generic_arg {
            write!(f, "<{}>", arg)?;
        }
        Ok(())
    }
}

/// `flags.N?` prefix: the argument is present iff bit `bit` of `flags_field` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conditional {
    pub flags_field: String,
    pub bit: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub type_term: TypeTerm,
    pub conditional: Option<Conditional>,
}

impl Argument {
    /// `flags.N?true`: the value is the flag bit itself and occupies no bytes.
    pub fn is_presence_only(&self) -> bool {
        self.type_term.identifier == "true" && self.type_term.namespace.is_none()
    }
}

/// `{X:Type}` generic constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericParam {
    pub name: String,
    pub constraint: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinatorDeclaration {
    pub namespace: Option<String>,
    pub name: String,
    /// Constructor tag; `None` for tagless bare types.
    pub tag: Option<u32>,
    pub generic_params: Vec<GenericParam>,
    pub arguments: Vec<Argument>,
    pub result: TypeTerm,
    /// Declared after `---functions---`.
    pub is_function: bool,
    pub position: Position,
}

impl CombinatorDeclaration {
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    pub fn argument_index(&self, name: &str) -> Option<usize> {
        self.arguments.iter().position(|a| a.name == name)
    }

    pub fn is_generic_param(&self, ident: &str) -> bool {
        self.generic_params.iter().any(|p| p.name == ident)
    }
}

impl fmt::Display for CombinatorDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())?;
        if let Some(tag) = self.tag {
            write!(f, "#{:08x}", tag)?;
        }
        for p in &self.generic_params {
            write!(f, " {{{}:{}}}", p.name, p.constraint)?;
        }
        for a in &self.arguments {
            write!(f, " {}:", a.name)?;
            if let Some(c) = &a.conditional {
                write!(f, "{}.{}?", c.flags_field, c.bit)?;
            }
            if a.type_term.bare && !a.type_term.bang && !a.type_term.is_flags() && starts_upper(&a.type_term.identifier) {
                write!(f, "%")?;
            }
            write!(f, "{}", a.type_term)?;
        }
        write!(f, " = {};", self.result)
    }
}

fn starts_upper(s: &str) -> bool {
    s.chars().next().map(|c| c.is_ascii_uppercase()).unwrap_or(false)
}

/// Split `ns.name` at the last dot. Identifiers without a dot have no namespace.
pub fn split_namespace(ident: &str) -> (Option<String>, String) {
    match ident.rfind('.') {
        Some(i) if i > 0 && i + 1 < ident.len() => {
            (Some(ident[..i].to_string()), ident[i + 1..].to_string())
        }
        _ => (None, ident.to_string()),
    }
}
