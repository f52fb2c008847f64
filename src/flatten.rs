//! IDL Flattener for the Probe Compiler
//!
//! Folds partial definitions and mixin inclusions from every fragment into one
//! definition per name. Members of the global-scope mixin included into
//! `Window` or a `[Global]` interface are split out so they can be probed as
//! bare identifiers.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::diagnostics::BuildError;
use crate::idl::{Definition, DefinitionKind, ExtendedAttribute, Member};

/// Mixin whose members live on the global object rather than on an interface.
pub const GLOBAL_MIXIN: &str = "WindowOrWorkerGlobalScope";

/// Interface that is the global object even when the IDL omits `[Global]`.
pub const GLOBAL_INTERFACE: &str = "Window";

/// Fragment name → definitions parsed from that fragment.
pub type IdlFragments = BTreeMap<String, Vec<Definition>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalMember {
    pub member: Member,
    /// Mixin the member was declared in.
    pub mixin: String,
    /// Global interfaces that include the mixin.
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlattenedIdl {
    pub ast: Vec<Definition>,
    pub globals: Vec<GlobalMember>,
}

impl FlattenedIdl {
    pub fn find(&self, name: &str) -> Option<&Definition> {
        self.ast.iter().find(|d| d.name == name)
    }
}

/// Stamp the container's `Exposed` onto members that do not narrow it themselves,
/// so the restriction survives once the members move into another definition.
fn inherit_exposure(members: &mut [Member], container_attrs: &[ExtendedAttribute]) {
    let Some(exposed) = container_attrs.iter().find(|a| a.name == "Exposed") else {
        return;
    };
    for member in members.iter_mut() {
        if !member.has_ext_attr("Exposed") {
            member.ext_attrs.push(exposed.clone());
        }
    }
}

/// Members merged in from another definition may not reuse a name the owner
/// already has. Overloads within one definition are fine.
fn reject_duplicates(
    owner: &str,
    existing: &[Member],
    incoming: &[Member],
) -> Result<(), BuildError> {
    for name in incoming.iter().filter_map(|m| m.name.as_ref()) {
        if existing.iter().any(|m| m.name.as_ref() == Some(name)) {
            return Err(BuildError::DuplicateMember {
                owner: owner.to_string(),
                member: name.clone(),
            });
        }
    }
    Ok(())
}

pub fn flatten_idl(
    spec_idls: &IdlFragments,
    custom_idls: &IdlFragments,
) -> Result<FlattenedIdl, BuildError> {
    let all: Vec<&Definition> = spec_idls
        .values()
        .chain(custom_idls.values())
        .flatten()
        .collect();

    // 1. Base definitions, one per name.
    let mut ast: Vec<Definition> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for definition in all
        .iter()
        .filter(|d| !d.partial && d.kind != DefinitionKind::Includes)
    {
        if index.contains_key(&definition.name) {
            return Err(BuildError::DuplicateDefinition {
                name: definition.name.clone(),
            });
        }
        index.insert(definition.name.clone(), ast.len());
        ast.push((*definition).clone());
    }

    // 2. Partials append to their base.
    for partial in all.iter().filter(|d| d.partial) {
        let base = index
            .get(&partial.name)
            .copied()
            .filter(|&i| ast[i].kind == partial.kind)
            .ok_or_else(|| BuildError::PartialWithoutBase {
                kind: partial.kind.as_str().to_string(),
                name: partial.name.clone(),
            })?;

        let target = &mut ast[base];
        reject_duplicates(&partial.name, &target.members, &partial.members)?;

        let mut members = partial.members.clone();
        inherit_exposure(&mut members, &partial.ext_attrs);
        target.members.extend(members);
    }

    // 3. Mixin inclusions.
    let mut globals: Vec<GlobalMember> = Vec::new();
    for include in all.iter().filter(|d| d.kind == DefinitionKind::Includes) {
        let mixin_name = include.includes.clone().unwrap_or_default();

        let target = index
            .get(&include.name)
            .copied()
            .filter(|&i| ast[i].kind == DefinitionKind::Interface)
            .ok_or_else(|| BuildError::MixinTargetNotFound {
                target: include.name.clone(),
                mixin: mixin_name.clone(),
            })?;
        let mixin = index
            .get(&mixin_name)
            .copied()
            .filter(|&i| ast[i].kind == DefinitionKind::InterfaceMixin)
            .ok_or_else(|| BuildError::MixinNotFound {
                mixin: mixin_name.clone(),
                target: include.name.clone(),
            })?;

        let mut members = ast[mixin].members.clone();
        inherit_exposure(&mut members, &ast[mixin].ext_attrs);

        let global_target =
            ast[target].name == GLOBAL_INTERFACE || ast[target].has_ext_attr("Global");
        if mixin_name == GLOBAL_MIXIN && global_target {
            let target_name = ast[target].name.clone();
            let seen = globals.iter().any(|g| g.mixin == mixin_name);
            if !seen {
                globals.extend(members.into_iter().map(|member| GlobalMember {
                    member,
                    mixin: mixin_name.clone(),
                    targets: vec![target_name.clone()],
                }));
            } else {
                for global in globals.iter_mut().filter(|g| g.mixin == mixin_name) {
                    if !global.targets.contains(&target_name) {
                        global.targets.push(target_name.clone());
                    }
                }
            }
            continue;
        }

        reject_duplicates(&ast[target].name, &ast[target].members, &members)?;
        ast[target].members.extend(members);
    }

    // 4. Mixins are fully distributed now.
    ast.retain(|d| d.kind != DefinitionKind::InterfaceMixin);

    tracing::debug!(
        definitions = ast.len(),
        globals = globals.len(),
        "flattened IDL"
    );

    Ok(FlattenedIdl { ast, globals })
}
