//! Exposure Resolver for the Probe Compiler
//!
//! Maps the `Exposed` extended attribute of a definition onto the set of global
//! scopes the probe runs in.

use std::collections::BTreeSet;

use crate::diagnostics::BuildError;
use crate::idl::{find_ext_attr, Definition, ExtAttrRhs, ExtendedAttribute};

/// Scope names used by specifications that the harness knows under another name.
const SCOPE_ALIASES: &[(&str, &str)] = &[
    ("DedicatedWorker", "Worker"),
    ("RTCIdentityProviderGlobalScope", "RTCIdentityProvider"),
];

pub type ExposureSet = BTreeSet<String>;

fn remap_scope(scope: &str) -> &str {
    SCOPE_ALIASES
        .iter()
        .find(|(from, _)| *from == scope)
        .map(|(_, to)| *to)
        .unwrap_or(scope)
}

/// Resolve the exposure set of a definition.
pub fn get_exposure_set(
    definition: &Definition,
    valid_scopes: &BTreeSet<String>,
) -> Result<ExposureSet, BuildError> {
    resolve_exposed(
        definition.kind.as_str(),
        &definition.name,
        &definition.ext_attrs,
        valid_scopes,
    )
}

/// Resolve `Exposed` from a raw attribute list. `kind` and `name` only feed error messages.
pub fn resolve_exposed(
    kind: &str,
    name: &str,
    ext_attrs: &[ExtendedAttribute],
    valid_scopes: &BTreeSet<String>,
) -> Result<ExposureSet, BuildError> {
    let exposed = find_ext_attr(ext_attrs, "Exposed").ok_or_else(|| BuildError::ExposedNotFound {
        kind: kind.to_string(),
        name: name.to_string(),
    })?;

    let declared: Vec<&str> = match &exposed.rhs {
        Some(ExtAttrRhs::Wildcard) => return Ok(valid_scopes.clone()),
        Some(ExtAttrRhs::Identifier(scope)) => vec![scope.as_str()],
        Some(ExtAttrRhs::IdentifierList(scopes)) => scopes.iter().map(String::as_str).collect(),
        Some(other) => {
            return Err(BuildError::UnexpectedExposedRhs {
                rhs: other.kind_name().to_string(),
            })
        }
        None => {
            return Err(BuildError::UnexpectedExposedRhs {
                rhs: "none".to_string(),
            })
        }
    };

    let mut exposure = ExposureSet::new();
    for scope in declared {
        let scope = remap_scope(scope);
        if !valid_scopes.contains(scope) {
            return Err(BuildError::InvalidScope {
                kind: kind.to_string(),
                name: name.to_string(),
                scope: scope.to_string(),
            });
        }
        exposure.insert(scope.to_string());
    }
    Ok(exposure)
}
