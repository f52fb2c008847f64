//! CSS Test Builder for the Probe Compiler
//!
//! Emits `css.properties.<name>` probes for every property known to the spec
//! catalogs plus the hand-maintained custom catalog.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::compile::{compile_test, insert_test, Combinator, RawTest, TestCode, TestTable};
use crate::custom_tests::CustomTests;
use crate::diagnostics::{BuildError, Diagnostics};
use crate::script::js_string;

/// Properties listed by one spec fragment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecCss {
    #[serde(default)]
    pub properties: Vec<String>,
}

/// Fragment name → its properties.
pub type SpecCssCatalog = BTreeMap<String, SpecCss>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomCssProperty {
    /// Values probed one by one under `<name>.<value>`.
    #[serde(default, rename = "__values")]
    pub values: Vec<String>,
    /// Named groups of synonymous spellings, any of which counts.
    #[serde(default, rename = "__additional_values")]
    pub additional_values: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomCss {
    #[serde(default)]
    pub properties: BTreeMap<String, CustomCssProperty>,
}

fn property_probe(name: &str, value: Option<&str>) -> TestCode {
    match value {
        Some(value) => TestCode::Raw(format!(
            "bcd.testCSSProperty({}, {})",
            js_string(name),
            js_string(value)
        )),
        None => TestCode::Raw(format!("bcd.testCSSProperty({})", js_string(name))),
    }
}

fn emit(
    table: &mut TestTable,
    path: String,
    default: TestCode,
    custom: &CustomTests,
    diagnostics: &mut Diagnostics,
) -> Result<(), BuildError> {
    let custom_test = custom.get_custom_test(&path, diagnostics)?;
    let test = compile_test(&RawTest {
        code: custom_test.test.map(TestCode::Raw).unwrap_or(default),
        resources: custom_test.resources,
        exposure: vec!["Window".to_string()],
    });
    insert_test(table, path, test);
    Ok(())
}

pub fn build_css(
    spec_css: &SpecCssCatalog,
    custom_css: &CustomCss,
    custom: &CustomTests,
    diagnostics: &mut Diagnostics,
) -> Result<TestTable, BuildError> {
    let known: BTreeSet<&str> = spec_css
        .values()
        .flat_map(|fragment| fragment.properties.iter().map(String::as_str))
        .collect();

    let mut properties: BTreeMap<&str, Option<&CustomCssProperty>> =
        known.iter().map(|name| (*name, None)).collect();
    for (name, property) in &custom_css.properties {
        if known.contains(name.as_str()) {
            return Err(BuildError::CssPropertyAlreadyKnown { name: name.clone() });
        }
        properties.insert(name, Some(property));
    }

    let mut table = TestTable::new();
    for (name, property) in properties {
        let path = format!("css.properties.{}", name);
        emit(&mut table, path.clone(), property_probe(name, None), custom, diagnostics)?;

        let Some(property) = property else {
            continue;
        };
        for value in &property.values {
            emit(
                &mut table,
                format!("{}.{}", path, value),
                property_probe(name, Some(value.as_str())),
                custom,
                diagnostics,
            )?;
        }
        for (group, aliases) in &property.additional_values {
            let items = aliases
                .iter()
                .map(|alias| property_probe(name, Some(alias.as_str())))
                .collect();
            emit(
                &mut table,
                format!("{}.{}", path, group),
                TestCode::Combined {
                    items,
                    combinator: Combinator::Or,
                },
                custom,
                diagnostics,
            )?;
        }
    }

    tracing::debug!(tests = table.len(), "built CSS tests");
    Ok(table)
}
