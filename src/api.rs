//! API Test Builder for the Probe Compiler
//!
//! Walks the flattened IDL and emits one probe per interface/namespace and one per
//! observable member, under `api.<Interface>[.<member>]`.

use std::collections::BTreeSet;

use crate::compile::{compile_test, insert_test, MemberRef, RawTest, TestCode, TestTable};
use crate::custom_tests::{CustomTest, CustomTests, MemberType};
use crate::diagnostics::{BuildError, Diagnostics};
use crate::exposure::{get_exposure_set, resolve_exposed, ExposureSet};
use crate::flatten::{flatten_idl, FlattenedIdl, IdlFragments};
use crate::idl::{Definition, DefinitionKind, ExtAttrRhs, ExtendedAttribute, Member, MemberKind};
use crate::idl_validate::validate_idl;

// ═══════════════════════════════════════════════════════════════════════════════
// MEMBER EXPANSION
// ═══════════════════════════════════════════════════════════════════════════════

const ITERABLE_METHODS: &[&str] = &["entries", "forEach", "keys", "values"];
const ASYNC_ITERABLE_PAIR_METHODS: &[&str] = &["entries", "keys"];
const MAPLIKE_METHODS: &[&str] = &["entries", "forEach", "get", "has", "keys", "size", "values"];
const MAPLIKE_MUTATORS: &[&str] = &["clear", "delete", "set"];
const SETLIKE_METHODS: &[&str] = &["entries", "forEach", "has", "keys", "size", "values"];
const SETLIKE_MUTATORS: &[&str] = &["add", "clear", "delete"];

/// One observable member after expanding declarations like `maplike<K, V>`.
#[derive(Debug, Clone, PartialEq)]
struct ProbeMember<'a> {
    name: String,
    member_type: MemberType,
    /// Attributes of the declaring member, for member-level `Exposed`.
    ext_attrs: &'a [ExtendedAttribute],
}

impl<'a> ProbeMember<'a> {
    fn new(name: &str, member_type: MemberType, ext_attrs: &'a [ExtendedAttribute]) -> Self {
        Self {
            name: name.to_string(),
            member_type,
            ext_attrs,
        }
    }
}

fn expand_member<'a>(definition: &Definition, member: &'a Member, out: &mut Vec<ProbeMember<'a>>) {
    let attrs = member.ext_attrs.as_slice();
    let is_static = member.is_static() || definition.kind == DefinitionKind::Namespace;
    let property = if is_static {
        MemberType::Static
    } else {
        MemberType::Property
    };

    match member.kind {
        MemberKind::Attribute | MemberKind::Operation => {
            if let Some(name) = &member.name {
                out.push(ProbeMember::new(name, property, attrs));
            }
            // Anonymous getters, setters and deleters are not observable by name.
            if member.is_stringifier() {
                out.push(ProbeMember::new("toString", MemberType::Property, attrs));
            }
        }
        MemberKind::Constructor => {
            // [HTMLConstructor] elements are only constructible through markup.
            if !member.has_ext_attr("HTMLConstructor") {
                out.push(ProbeMember::new(&definition.name, MemberType::Constructor, attrs));
            }
        }
        MemberKind::Iterable => {
            if member.is_async {
                out.push(ProbeMember::new("@@asyncIterator", MemberType::Symbol, attrs));
                out.push(ProbeMember::new("values", MemberType::Property, attrs));
                if member.type_args.len() == 2 {
                    for name in ASYNC_ITERABLE_PAIR_METHODS {
                        out.push(ProbeMember::new(name, MemberType::Property, attrs));
                    }
                }
            } else {
                out.push(ProbeMember::new("@@iterator", MemberType::Symbol, attrs));
                for name in ITERABLE_METHODS {
                    out.push(ProbeMember::new(name, MemberType::Property, attrs));
                }
            }
        }
        MemberKind::Maplike | MemberKind::Setlike => {
            let (methods, mutators) = if member.kind == MemberKind::Maplike {
                (MAPLIKE_METHODS, MAPLIKE_MUTATORS)
            } else {
                (SETLIKE_METHODS, SETLIKE_MUTATORS)
            };
            out.push(ProbeMember::new("@@iterator", MemberType::Symbol, attrs));
            for name in methods {
                out.push(ProbeMember::new(name, MemberType::Property, attrs));
            }
            if !member.readonly {
                for name in mutators {
                    out.push(ProbeMember::new(name, MemberType::Property, attrs));
                }
            }
        }
        // Constants are only observable through the interface itself.
        MemberKind::Const | MemberKind::Field => {}
    }
}

fn flatten_members(definition: &Definition) -> Vec<ProbeMember<'_>> {
    let mut members = Vec::new();
    for member in &definition.members {
        expand_member(definition, member, &mut members);
    }

    if let Some(ExtendedAttribute {
        rhs: Some(ExtAttrRhs::Identifier(name)),
        ..
    }) = definition.ext_attr("LegacyFactoryFunction")
    {
        members.push(ProbeMember::new(name, MemberType::Constructor, &[]));
    }
    members
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROBE SYNTHESIS
// ═══════════════════════════════════════════════════════════════════════════════

fn default_member_code(definition: &Definition, member: &ProbeMember, is_global: bool) -> TestCode {
    let iface = definition.name.as_str();
    let prototype = format!("{}.prototype", iface);
    let member_ref = match member.member_type {
        MemberType::Constructor => {
            MemberRef::new(iface, &format!("constructor.{}", member.name))
        }
        MemberType::Symbol => {
            let owner = if is_global { "self" } else { prototype.as_str() };
            let symbol = member.name.trim_start_matches("@@");
            MemberRef::new(owner, &format!("Symbol.{}", symbol))
        }
        _ if is_global => MemberRef::new("self", &member.name),
        MemberType::Static => MemberRef::new(iface, &member.name),
        MemberType::Property => MemberRef::new(&prototype, &member.name),
    };
    TestCode::Member(member_ref)
}

fn narrow_exposure(
    owner: &str,
    member: &str,
    ext_attrs: &[ExtendedAttribute],
    exposure: &ExposureSet,
    valid_scopes: &BTreeSet<String>,
) -> Result<ExposureSet, BuildError> {
    if !ext_attrs.iter().any(|a| a.name == "Exposed") {
        return Ok(exposure.clone());
    }
    let own = resolve_exposed(
        "member",
        &format!("{}.{}", owner, member),
        ext_attrs,
        valid_scopes,
    )?;
    Ok(exposure.intersection(&own).cloned().collect())
}

fn emit(table: &mut TestTable, path: String, code: TestCode, custom: CustomTest, exposure: &ExposureSet) {
    let code = custom.test.map(TestCode::Raw).unwrap_or(code);
    let test = compile_test(&RawTest {
        code,
        resources: custom.resources,
        exposure: exposure.iter().cloned().collect(),
    });
    insert_test(table, path, test);
}

fn build_definition_tests(
    table: &mut TestTable,
    definition: &Definition,
    valid_scopes: &BTreeSet<String>,
    custom: &CustomTests,
    diagnostics: &mut Diagnostics,
) -> Result<(), BuildError> {
    let iface = definition.name.as_str();
    let exposure = get_exposure_set(definition, valid_scopes)?;
    let is_global = definition.has_ext_attr("Global");

    let iface_custom = custom.get_custom_test_api(iface, None, MemberType::Property, diagnostics)?;
    emit(
        table,
        format!("api.{}", iface),
        TestCode::Member(MemberRef::new("self", iface)),
        iface_custom,
        &exposure,
    );

    let members = flatten_members(definition);
    for member in &members {
        let member_exposure =
            narrow_exposure(iface, &member.name, member.ext_attrs, &exposure, valid_scopes)?;
        let member_custom = custom.get_custom_test_api(
            iface,
            Some(&member.name),
            member.member_type,
            diagnostics,
        )?;
        emit(
            table,
            format!("api.{}.{}", iface, member.name),
            default_member_code(definition, member, is_global),
            member_custom,
            &member_exposure,
        );
    }

    let known: BTreeSet<String> = members.into_iter().map(|m| m.name).collect();
    for (relative, subtest) in custom.get_custom_subtests_api(iface, &known, diagnostics)? {
        let Some(code) = subtest.test.clone() else {
            continue;
        };
        emit(
            table,
            format!("api.{}.{}", iface, relative),
            TestCode::Raw(code),
            subtest,
            &exposure,
        );
    }
    Ok(())
}

/// Probes for every interface, namespace and global member of the flattened IDL.
pub fn build_idl_tests(
    idl: &FlattenedIdl,
    valid_scopes: &BTreeSet<String>,
    custom: &CustomTests,
    diagnostics: &mut Diagnostics,
) -> Result<TestTable, BuildError> {
    let mut table = TestTable::new();

    for definition in idl.ast.iter().filter(|d| d.kind.is_probed()) {
        // Legacy namespaces are reached through another object, never as a global.
        if definition.has_ext_attr("LegacyNamespace") {
            continue;
        }
        build_definition_tests(&mut table, definition, valid_scopes, custom, diagnostics)?;
    }

    for global in &idl.globals {
        let Some(name) = &global.member.name else {
            continue;
        };
        if global.member.kind == MemberKind::Const {
            continue;
        }

        let mut exposure = ExposureSet::new();
        for target in &global.targets {
            if let Some(definition) = idl.find(target) {
                exposure.extend(get_exposure_set(definition, valid_scopes)?);
            }
        }
        let exposure = narrow_exposure(
            &global.mixin,
            name,
            &global.member.ext_attrs,
            &exposure,
            valid_scopes,
        )?;

        let global_custom = custom.get_custom_test_api(name, None, MemberType::Property, diagnostics)?;
        emit(
            &mut table,
            format!("api.{}", name),
            TestCode::Member(MemberRef::new("self", name)),
            global_custom,
            &exposure,
        );
    }

    tracing::debug!(tests = table.len(), "built API tests");
    Ok(table)
}

/// Flatten, validate and build the API table in one go.
pub fn build_idl(
    spec_idls: &IdlFragments,
    custom_idls: &IdlFragments,
    valid_scopes: &BTreeSet<String>,
    custom: &CustomTests,
    diagnostics: &mut Diagnostics,
) -> Result<TestTable, BuildError> {
    let idl = flatten_idl(spec_idls, custom_idls)?;
    validate_idl(&idl)?;
    build_idl_tests(&idl, valid_scopes, custom, diagnostics)
}
