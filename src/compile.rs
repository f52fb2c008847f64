//! Test Code Compiler for the Probe Compiler
//!
//! Turns a probe description into one boolean JavaScript expression.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::custom_tests::Resource;

// ═══════════════════════════════════════════════════════════════════════════════
// PROBE TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// A property probed on an owner expression (`self`, `Foo`, `Foo.prototype`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRef {
    pub owner: String,
    /// Property name, or `constructor.X` / `Symbol.x` for the special forms.
    pub property: String,
    /// Probe an own property instead of `in`.
    #[serde(default)]
    pub inherit: bool,
    /// Property is a well-known symbol even without the `Symbol.` prefix.
    #[serde(default)]
    pub symbol: bool,
}

impl MemberRef {
    pub fn new(owner: &str, property: &str) -> Self {
        Self {
            owner: owner.to_string(),
            property: property.to_string(),
            inherit: false,
            symbol: false,
        }
    }

    pub fn inherited(owner: &str, property: &str) -> Self {
        Self {
            inherit: true,
            ..Self::new(owner, property)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinator {
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
}

impl Combinator {
    fn separator(self) -> &'static str {
        match self {
            Combinator::And => " && ",
            Combinator::Or => " || ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestCode {
    /// Hand-written script, passed through untouched.
    Raw(String),
    Member(MemberRef),
    Combined {
        items: Vec<TestCode>,
        combinator: Combinator,
    },
}

impl From<&str> for TestCode {
    fn from(code: &str) -> Self {
        TestCode::Raw(code.to_string())
    }
}

impl From<String> for TestCode {
    fn from(code: String) -> Self {
        TestCode::Raw(code)
    }
}

impl From<MemberRef> for TestCode {
    fn from(member: MemberRef) -> Self {
        TestCode::Member(member)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTest {
    pub code: TestCode,
    #[serde(default)]
    pub resources: BTreeMap<String, Resource>,
    pub exposure: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledTest {
    pub code: String,
    pub exposure: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<BTreeMap<String, Resource>>,
}

/// Dotted test path → compiled probe. Sorted, so serialization is stable.
pub type TestTable = BTreeMap<String, CompiledTest>;

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILATION
// ═══════════════════════════════════════════════════════════════════════════════

/// `"A" in self && "B" in A` for a dotted owner name.
fn owner_guard(owner_name: &str) -> String {
    let segments: Vec<&str> = owner_name.split('.').collect();
    let mut parts = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        let holder = if i == 0 {
            "self".to_string()
        } else {
            segments[..i].join(".")
        };
        parts.push(format!("\"{}\" in {}", segment, holder));
    }
    parts.join(" && ")
}

fn compile_member_ref(member: &MemberRef) -> String {
    let owner = member.owner.as_str();
    let owner_name = owner.strip_suffix(".prototype").unwrap_or(owner);

    if let Some(constructor) = member.property.strip_prefix("constructor.") {
        return format!("bcd.testConstructor(\"{}\")", constructor);
    }

    let symbol = member
        .property
        .strip_prefix("Symbol.")
        .or_else(|| member.property.strip_prefix("@@"))
        .or(member.symbol.then_some(member.property.as_str()));
    if let Some(symbol) = symbol {
        let check = format!("\"Symbol\" in self && \"{}\" in Symbol", symbol);
        return if owner == "self" {
            format!("{} && Symbol.{} in self", check, symbol)
        } else {
            format!(
                "{} && {} && Symbol.{} in {}",
                check,
                owner_guard(owner_name),
                symbol,
                owner
            )
        };
    }

    if owner == "self" {
        return if member.inherit {
            format!(
                "Object.prototype.hasOwnProperty.call(self, \"{}\")",
                member.property
            )
        } else {
            format!("\"{}\" in self", member.property)
        };
    }

    if member.inherit {
        format!(
            "{} && Object.prototype.hasOwnProperty.call({}, \"{}\")",
            owner_guard(owner_name),
            owner,
            member.property
        )
    } else {
        format!(
            "{} && \"{}\" in {}",
            owner_guard(owner_name),
            member.property,
            owner
        )
    }
}

pub fn compile_test_code(code: &TestCode) -> String {
    match code {
        TestCode::Raw(script) => script.clone(),
        TestCode::Member(member) => compile_member_ref(member),
        TestCode::Combined { items, combinator } => {
            let mut parts: Vec<String> = Vec::with_capacity(items.len());
            for item in items {
                let compiled = compile_test_code(item);
                if parts.last() != Some(&compiled) {
                    parts.push(compiled);
                }
            }
            parts.join(combinator.separator())
        }
    }
}

pub fn compile_test(raw: &RawTest) -> CompiledTest {
    CompiledTest {
        code: compile_test_code(&raw.code),
        exposure: raw.exposure.clone(),
        resources: if raw.resources.is_empty() {
            None
        } else {
            Some(raw.resources.clone())
        },
    }
}

/// Insert a compiled test, merging exposure when the path is already taken.
pub fn insert_test(table: &mut TestTable, path: String, test: CompiledTest) {
    match table.get_mut(&path) {
        Some(existing) => {
            for scope in test.exposure {
                if !existing.exposure.contains(&scope) {
                    existing.exposure.push(scope);
                }
            }
            existing.exposure.sort();
            if let Some(resources) = test.resources {
                existing
                    .resources
                    .get_or_insert_with(BTreeMap::new)
                    .extend(resources);
            }
        }
        None => {
            table.insert(path, test);
        }
    }
}
