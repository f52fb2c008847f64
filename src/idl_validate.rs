//! IDL Validator for the Probe Compiler
//!
//! Structural pre-flight over the flattened AST. Any violation aborts the build:
//! probes generated from incoherent IDL cannot be trusted.

use std::collections::HashSet;

use crate::diagnostics::BuildError;
use crate::flatten::FlattenedIdl;
use crate::idl::{Definition, IdlType};

/// Types defined by WebIDL itself.
const BUILTIN_TYPES: &[&str] = &[
    "any",
    "undefined",
    "boolean",
    "byte",
    "octet",
    "short",
    "unsigned short",
    "long",
    "unsigned long",
    "long long",
    "unsigned long long",
    "float",
    "unrestricted float",
    "double",
    "unrestricted double",
    "bigint",
    "DOMString",
    "ByteString",
    "USVString",
    "object",
    "symbol",
    "ArrayBuffer",
    "SharedArrayBuffer",
    "DataView",
    "Int8Array",
    "Int16Array",
    "Int32Array",
    "Uint8Array",
    "Uint16Array",
    "Uint32Array",
    "Uint8ClampedArray",
    "BigInt64Array",
    "BigUint64Array",
    "Float16Array",
    "Float32Array",
    "Float64Array",
];

/// Typedefs that specifications use without shipping their definition.
const LOOSE_TYPES: &[&str] = &[
    "CSSOMString",
    "ArrayBufferView",
    "BufferSource",
    "AllowSharedBufferSource",
    "DOMTimeStamp",
    "DOMHighResTimeStamp",
    "EpochTimeStamp",
    "Function",
    "VoidFunction",
    "WindowProxy",
];

pub fn validate_idl(idl: &FlattenedIdl) -> Result<(), BuildError> {
    // LegacyNoInterfaceObject is deliberately not flagged: such interfaces are
    // still reachable through instances.
    for definition in idl.ast.iter().filter(|d| d.kind.is_probed()) {
        if !definition.has_ext_attr("Exposed") {
            return Err(BuildError::MissingExposed {
                kind: definition.kind.as_str().to_string(),
                name: definition.name.clone(),
                line: definition.line,
            });
        }
    }

    let known: HashSet<&str> = idl
        .ast
        .iter()
        .map(|d| d.name.as_str())
        .chain(BUILTIN_TYPES.iter().copied())
        .chain(LOOSE_TYPES.iter().copied())
        .collect();

    for definition in &idl.ast {
        check_definition_types(definition, &known)?;
    }
    for global in &idl.globals {
        check_types(global.member.referenced_types(), &known)?;
    }
    Ok(())
}

fn check_definition_types(definition: &Definition, known: &HashSet<&str>) -> Result<(), BuildError> {
    if let Some(parent) = &definition.inheritance {
        check_name(parent, known)?;
    }

    let mut types: Vec<&IdlType> = Vec::new();
    types.extend(definition.idl_type.iter());
    types.extend(definition.arguments.iter().map(|a| &a.idl_type));
    for attr in &definition.ext_attrs {
        types.extend(attr.arguments.iter().map(|a| &a.idl_type));
    }
    check_types(types, known)?;

    for member in &definition.members {
        check_types(member.referenced_types(), known)?;
    }
    Ok(())
}

fn check_types(types: Vec<&IdlType>, known: &HashSet<&str>) -> Result<(), BuildError> {
    let mut names = Vec::new();
    for idl_type in types {
        idl_type.collect_names(&mut names);
    }
    for name in names {
        check_name(name, known)?;
    }
    Ok(())
}

fn check_name(name: &str, known: &HashSet<&str>) -> Result<(), BuildError> {
    if known.contains(name) {
        Ok(())
    } else {
        Err(BuildError::UnknownType {
            name: name.to_string(),
        })
    }
}
