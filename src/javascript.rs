//! JS Builtin Test Builder for the Probe Compiler
//!
//! Builtins are listed by dotted path (`Array`, `Array.from`,
//! `Array.prototype.at`, `Array.prototype.@@iterator`). Each becomes an
//! own-property probe under `javascript.builtins`, with `prototype` dropped from
//! the output path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::compile::{compile_test, compile_test_code, insert_test, MemberRef, RawTest, TestCode, TestTable};
use crate::custom_tests::CustomTests;
use crate::diagnostics::{BuildError, Diagnostics};
use crate::script::{js_string, wrap_iife};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuiltinEntry {
    /// Argument list used to instantiate the builtin; enables the constructor probe.
    #[serde(default)]
    pub ctor_args: Option<String>,
    /// `false` for builtins that are called rather than constructed (`Symbol()`).
    #[serde(default)]
    pub ctor_new: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomJs {
    #[serde(default)]
    pub builtins: BTreeMap<String, BuiltinEntry>,
}

/// Probe reference for a builtin member, or `None` for a root global.
fn member_ref(segments: &[&str]) -> Option<MemberRef> {
    if segments.len() < 2 {
        return None;
    }
    let split = segments
        .iter()
        .position(|s| *s == "prototype")
        .map(|i| i + 1)
        .unwrap_or(segments.len() - 1);
    let owner = segments[..split].join(".");
    let property = segments[split..].join(".");

    Some(match property.strip_prefix("@@") {
        Some(symbol) => MemberRef::new(&owner, &format!("Symbol.{}", symbol)),
        None => MemberRef::inherited(&owner, &property),
    })
}

fn constructor_probe(name: &str, entry: &BuiltinEntry, args: &str) -> String {
    let guard = match name.rsplit_once('.') {
        Some((parent, last)) => compile_test_code(&TestCode::Member(MemberRef::new(parent, last))),
        None => format!("{} in self", js_string(name)),
    };
    let call = if entry.ctor_new == Some(false) {
        format!("{}({})", name, args)
    } else {
        format!("new {}({})", name, args)
    };
    wrap_iife(&format!(
        "if (!({})) {{\n  return {{result: false, message: {}}};\n}}\nreturn !!{};",
        guard,
        js_string(&format!("{} is not defined", name)),
        call
    ))
}

fn emit(
    table: &mut TestTable,
    path: String,
    default: TestCode,
    exposure: &[String],
    custom: &CustomTests,
    diagnostics: &mut Diagnostics,
) -> Result<(), BuildError> {
    let custom_test = custom.get_custom_test(&path, diagnostics)?;
    let test = compile_test(&RawTest {
        code: custom_test.test.map(TestCode::Raw).unwrap_or(default),
        resources: custom_test.resources,
        exposure: exposure.to_vec(),
    });
    insert_test(table, path, test);
    Ok(())
}

pub fn build_js(
    custom_js: &CustomJs,
    custom: &CustomTests,
    exposure: &[String],
    diagnostics: &mut Diagnostics,
) -> Result<TestTable, BuildError> {
    let mut table = TestTable::new();

    for (builtin, entry) in &custom_js.builtins {
        let segments: Vec<&str> = builtin.split('.').collect();
        let visible: Vec<&str> = segments
            .iter()
            .copied()
            .filter(|s| *s != "prototype")
            .collect();
        let path = format!("javascript.builtins.{}", visible.join("."));

        let default = match member_ref(&segments) {
            Some(member) => TestCode::Member(member),
            None => TestCode::Raw(format!("self.hasOwnProperty({})", js_string(builtin))),
        };
        emit(&mut table, path.clone(), default, exposure, custom, diagnostics)?;

        if let Some(args) = &entry.ctor_args {
            let Some(last) = visible.last() else {
                continue;
            };
            emit(
                &mut table,
                format!("{}.{}", path, last),
                TestCode::Raw(constructor_probe(builtin, entry, args)),
                exposure,
                custom,
                diagnostics,
            )?;
        }
    }

    tracing::debug!(tests = table.len(), "built JavaScript tests");
    Ok(table)
}
