//! Build Pipeline for the Probe Compiler
//!
//! One entry point that takes every catalog, runs the API, CSS and JavaScript
//! builders and merges their tables. Loading catalogs and writing the result are
//! left to the caller.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::api::build_idl;
use crate::compile::{insert_test, TestTable};
use crate::css::{build_css, CustomCss, SpecCssCatalog};
use crate::custom_tests::CustomTests;
use crate::diagnostics::{BuildError, Diagnostic, Diagnostics};
use crate::flatten::IdlFragments;
use crate::idl::Definition;
use crate::idl_parser::parse_idl;
use crate::javascript::{build_js, CustomJs};

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

const DEFAULT_SCOPES: &[&str] = &[
    "AnimationWorklet",
    "AudioWorklet",
    "LayoutWorklet",
    "PaintWorklet",
    "RTCIdentityProvider",
    "ServiceWorker",
    "SharedWorker",
    "Window",
    "Worker",
    "Worklet",
];

const DEFAULT_JS_EXPOSURE: &[&str] = &["Window", "Worker"];

fn default_valid_scopes() -> BTreeSet<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}

fn default_js_exposure() -> Vec<String> {
    DEFAULT_JS_EXPOSURE.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    /// Global scopes an `Exposed` attribute may name.
    #[serde(default = "default_valid_scopes")]
    pub valid_scopes: BTreeSet<String>,
    /// Scopes JavaScript builtins are probed in, before filtering by `valid_scopes`.
    #[serde(default = "default_js_exposure")]
    pub js_exposure: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            valid_scopes: default_valid_scopes(),
            js_exposure: default_js_exposure(),
        }
    }
}

impl BuildOptions {
    pub fn js_scopes(&self) -> Vec<String> {
        self.js_exposure
            .iter()
            .filter(|scope| self.valid_scopes.contains(*scope))
            .cloned()
            .collect()
    }
}

/// One IDL fragment, as raw text or as already-parsed definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlSource {
    Text(String),
    Definitions(Vec<Definition>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInput {
    #[serde(default)]
    pub spec_idl: BTreeMap<String, IdlSource>,
    #[serde(default)]
    pub custom_idl: BTreeMap<String, IdlSource>,
    #[serde(default)]
    pub spec_css: SpecCssCatalog,
    #[serde(default)]
    pub custom_css: CustomCss,
    #[serde(default)]
    pub custom_js: CustomJs,
    /// Custom test catalog, including its `__resources` table.
    #[serde(default)]
    pub custom_tests: serde_json::Value,
    #[serde(default)]
    pub options: BuildOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    pub tests: TestTable,
    pub diagnostics: Vec<Diagnostic>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILD
// ═══════════════════════════════════════════════════════════════════════════════

fn load_fragments(sources: &BTreeMap<String, IdlSource>) -> Result<IdlFragments, BuildError> {
    let mut fragments = IdlFragments::new();
    for (name, source) in sources {
        let definitions = match source {
            IdlSource::Text(text) => parse_idl(text, name)?,
            IdlSource::Definitions(definitions) => definitions.clone(),
        };
        fragments.insert(name.clone(), definitions);
    }
    Ok(fragments)
}

fn load_custom_tests(catalog: &serde_json::Value) -> Result<CustomTests, BuildError> {
    if catalog.is_null() {
        return Ok(CustomTests::default());
    }
    CustomTests::from_json(catalog.clone())
}

pub fn build_tests(input: &BuildInput) -> Result<BuildOutput, BuildError> {
    let mut diagnostics = Diagnostics::new();
    let custom = load_custom_tests(&input.custom_tests)?;
    let spec_idl = load_fragments(&input.spec_idl)?;
    let custom_idl = load_fragments(&input.custom_idl)?;
    tracing::debug!(
        spec_fragments = spec_idl.len(),
        custom_fragments = custom_idl.len(),
        "loaded IDL"
    );

    let mut tests = build_idl(
        &spec_idl,
        &custom_idl,
        &input.options.valid_scopes,
        &custom,
        &mut diagnostics,
    )?;
    let css = build_css(&input.spec_css, &input.custom_css, &custom, &mut diagnostics)?;
    let js = build_js(
        &input.custom_js,
        &custom,
        &input.options.js_scopes(),
        &mut diagnostics,
    )?;
    for (path, test) in css.into_iter().chain(js) {
        insert_test(&mut tests, path, test);
    }

    tracing::debug!(
        tests = tests.len(),
        diagnostics = diagnostics.len(),
        "build finished"
    );
    Ok(BuildOutput {
        tests,
        diagnostics: diagnostics.into_vec(),
    })
}

/// JSON in, JSON out. Malformed input is reported as a catalog error.
pub fn build_tests_json(input_json: &str) -> Result<String, BuildError> {
    let input: BuildInput =
        serde_json::from_str(input_json).map_err(|e| BuildError::InvalidCatalog {
            path: "<input>".to_string(),
            message: e.to_string(),
        })?;
    let output = build_tests(&input)?;
    serde_json::to_string(&output).map_err(|e| BuildError::InvalidCatalog {
        path: "<output>".to_string(),
        message: e.to_string(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
#[napi_derive::napi]
pub fn build_tests_native(input_json: String) -> napi::Result<String> {
    build_tests_json(&input_json)
        .map_err(|e| napi::Error::from_reason(format!("[{}] {}", e.code(), e)))
}
