//! IDL AST Module for the Probe Compiler
//!
//! Typed WebIDL definitions. Fragments arrive either as JSON (already parsed by an
//! upstream collector) or as IDL text through `idl_parser::parse_idl`.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// DEFINITIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefinitionKind {
    Interface,
    InterfaceMixin,
    Namespace,
    Dictionary,
    Enum,
    Typedef,
    CallbackFunction,
    CallbackInterface,
    Includes,
}

impl DefinitionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DefinitionKind::Interface => "interface",
            DefinitionKind::InterfaceMixin => "interface mixin",
            DefinitionKind::Namespace => "namespace",
            DefinitionKind::Dictionary => "dictionary",
            DefinitionKind::Enum => "enum",
            DefinitionKind::Typedef => "typedef",
            DefinitionKind::CallbackFunction => "callback",
            DefinitionKind::CallbackInterface => "callback interface",
            DefinitionKind::Includes => "includes",
        }
    }

    /// Interfaces and namespaces are the only kinds that produce probes.
    pub fn is_probed(self) -> bool {
        matches!(self, DefinitionKind::Interface | DefinitionKind::Namespace)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    pub kind: DefinitionKind,
    /// Definition name. For `includes` statements this is the target.
    pub name: String,
    #[serde(default)]
    pub partial: bool,
    #[serde(default)]
    pub inheritance: Option<String>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub ext_attrs: Vec<ExtendedAttribute>,
    /// Mixin name of an `includes` statement.
    #[serde(default)]
    pub includes: Option<String>,
    /// Aliased type of a typedef, return type of a callback function.
    #[serde(default)]
    pub idl_type: Option<IdlType>,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    /// Enum values.
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub line: u32,
}

impl Definition {
    pub fn new(kind: DefinitionKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            partial: false,
            inheritance: None,
            members: Vec::new(),
            ext_attrs: Vec::new(),
            includes: None,
            idl_type: None,
            arguments: Vec::new(),
            values: Vec::new(),
            line: 0,
        }
    }

    pub fn ext_attr(&self, name: &str) -> Option<&ExtendedAttribute> {
        find_ext_attr(&self.ext_attrs, name)
    }

    pub fn has_ext_attr(&self, name: &str) -> bool {
        self.ext_attr(name).is_some()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MEMBERS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemberKind {
    Attribute,
    Operation,
    Constructor,
    Const,
    Iterable,
    Maplike,
    Setlike,
    /// Dictionary field
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Special {
    Static,
    Stringifier,
    Getter,
    Setter,
    Deleter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub kind: MemberKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub special: Option<Special>,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default, rename = "async")]
    pub is_async: bool,
    /// Attribute/const/field type or operation return type.
    #[serde(default)]
    pub idl_type: Option<IdlType>,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    /// Declared types of iterable/maplike/setlike declarations.
    #[serde(default)]
    pub type_args: Vec<IdlType>,
    #[serde(default)]
    pub ext_attrs: Vec<ExtendedAttribute>,
    #[serde(default)]
    pub line: u32,
}

impl Member {
    pub fn new(kind: MemberKind, name: Option<&str>) -> Self {
        Self {
            kind,
            name: name.map(str::to_string),
            special: None,
            readonly: false,
            is_async: false,
            idl_type: None,
            arguments: Vec::new(),
            type_args: Vec::new(),
            ext_attrs: Vec::new(),
            line: 0,
        }
    }

    pub fn ext_attr(&self, name: &str) -> Option<&ExtendedAttribute> {
        find_ext_attr(&self.ext_attrs, name)
    }

    pub fn has_ext_attr(&self, name: &str) -> bool {
        self.ext_attr(name).is_some()
    }

    pub fn is_static(&self) -> bool {
        self.special == Some(Special::Static)
    }

    pub fn is_stringifier(&self) -> bool {
        self.special == Some(Special::Stringifier)
    }

    /// Every type the member mentions, arguments included.
    pub fn referenced_types(&self) -> Vec<&IdlType> {
        let mut types: Vec<&IdlType> = Vec::new();
        types.extend(self.idl_type.iter());
        types.extend(self.type_args.iter());
        types.extend(self.arguments.iter().map(|a| &a.idl_type));
        types
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argument {
    pub name: String,
    pub idl_type: IdlType,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub variadic: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdlType {
    /// A single type name, including multi-word primitives (`unsigned long`).
    Named(String),
    /// `sequence<T>`, `record<K, V>`, `Promise<T>`, `FrozenArray<T>`, ...
    Generic { name: String, args: Vec<IdlType> },
    Union(Vec<IdlType>),
    Nullable(Box<IdlType>),
}

impl IdlType {
    pub fn named(name: &str) -> Self {
        IdlType::Named(name.to_string())
    }

    /// Walks the type and reports every leaf type name.
    pub fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            IdlType::Named(name) => out.push(name),
            IdlType::Generic { args, .. } => {
                for arg in args {
                    arg.collect_names(out);
                }
            }
            IdlType::Union(types) => {
                for t in types {
                    t.collect_names(out);
                }
            }
            IdlType::Nullable(inner) => inner.collect_names(out),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXTENDED ATTRIBUTES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedAttribute {
    pub name: String,
    #[serde(default)]
    pub rhs: Option<ExtAttrRhs>,
    /// `[LegacyFactoryFunction=Image(unsigned long width)]` carries arguments.
    #[serde(default)]
    pub arguments: Vec<Argument>,
}

impl ExtendedAttribute {
    pub fn new(name: &str, rhs: Option<ExtAttrRhs>) -> Self {
        Self {
            name: name.to_string(),
            rhs,
            arguments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtAttrRhs {
    Identifier(String),
    IdentifierList(Vec<String>),
    Wildcard,
    Integer(String),
    Decimal(String),
    String(String),
    StringList(Vec<String>),
}

impl ExtAttrRhs {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ExtAttrRhs::Identifier(_) => "identifier",
            ExtAttrRhs::IdentifierList(_) => "identifier-list",
            ExtAttrRhs::Wildcard => "*",
            ExtAttrRhs::Integer(_) => "integer",
            ExtAttrRhs::Decimal(_) => "decimal",
            ExtAttrRhs::String(_) => "string",
            ExtAttrRhs::StringList(_) => "string-list",
        }
    }
}

pub fn find_ext_attr<'a>(attrs: &'a [ExtendedAttribute], name: &str) -> Option<&'a ExtendedAttribute> {
    attrs.iter().find(|attr| attr.name == name)
}
