//! # Probe Compiler
//!
//! Compiles WebIDL plus CSS and JavaScript builtin catalogs into a flat table of
//! feature-detection probes keyed by dotted path (`api.Node.appendChild`,
//! `css.properties.color`, `javascript.builtins.Array.from`).
//!
//! ## Pipeline
//!
//! 1. **Parse**: IDL text becomes `Definition`s (`idl_parser`).
//! 2. **Flatten**: partials and mixins fold into their targets; members of
//!    `WindowOrWorkerGlobalScope` on `Window` or `[Global]` interfaces become globals.
//! 3. **Validate**: every interface is `Exposed`, every type is known.
//! 4. **Synthesize**: each member shape yields a default probe, replaced by a
//!    custom test where the catalog has one.
//!
//! ## Failure Model
//!
//! Incoherent catalogs abort the build with a `BuildError`. A broken custom
//! test only degrades its own entry to a throwing stub and adds a `Diagnostic`.

mod api;
mod compile;
mod css;
mod diagnostics;
mod exposure;
mod flatten;
mod idl;
mod idl_parser;
mod idl_validate;
mod javascript;
mod pipeline;
mod script;

#[cfg(test)]
mod custom_tests_tests;
#[cfg(test)]
mod flatten_tests;

pub use api::{build_idl, build_idl_tests};
pub use compile::{
    compile_test, compile_test_code, insert_test, Combinator, CompiledTest, MemberRef, RawTest,
    TestCode, TestTable,
};
pub use css::{build_css, CustomCss, CustomCssProperty, SpecCss, SpecCssCatalog};
pub use custom_tests::{
    CustomTest, CustomTestData, CustomTestNode, CustomTests, MemberType, Resource,
};
pub use diagnostics::{BuildError, Diagnostic, Diagnostics};
pub use exposure::{get_exposure_set, resolve_exposed, ExposureSet};
pub use flatten::{flatten_idl, FlattenedIdl, GlobalMember, IdlFragments, GLOBAL_MIXIN};
pub use idl::{
    Argument, Definition, DefinitionKind, ExtAttrRhs, ExtendedAttribute, IdlType, Member,
    MemberKind, Special,
};
pub use idl_parser::parse_idl;
pub use idl_validate::validate_idl;
pub use javascript::{build_js, BuiltinEntry, CustomJs};
pub use pipeline::{build_tests, build_tests_json, BuildInput, BuildOptions, BuildOutput, IdlSource};

#[cfg(feature = "napi")]
pub use pipeline::build_tests_native;
