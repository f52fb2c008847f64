//! Script Analysis for Custom Tests
//!
//! Custom test bodies are hand-written JavaScript. Oxc checks that the assembled
//! probe parses and tells the resolver what shape a setup snippet has.

use std::collections::HashSet;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingIdentifier, BindingProperty, Expression, IdentifierReference, ObjectProperty, Program,
    Statement,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::{ParseOptions, Parser};
use oxc_span::{SourceType, Span};

/// Check that `code` parses as a script. Returns the first parser message on failure.
pub fn check_syntax(code: &str) -> Result<(), String> {
    let allocator = Allocator::default();
    // Probes run as classic scripts, not modules.
    let ret = Parser::new(&allocator, code, SourceType::cjs()).parse();
    if let Some(error) = ret.errors.first() {
        return Err(error.to_string());
    }
    if ret.panicked {
        return Err("unrecoverable syntax error".to_string());
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// SETUP SHAPE
// ═══════════════════════════════════════════════════════════════════════════════

/// How a `__base` snippet hands its instance to the member assertion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaseShape {
    /// Declares `promise`; the instance arrives through `.then()`.
    pub promise: bool,
    /// Passes an undeclared `callback`; the instance arrives asynchronously.
    pub callback: bool,
}

impl BaseShape {
    pub fn detect(base: &str) -> Self {
        let allocator = Allocator::default();
        let Some(program) = parse_setup(&allocator, base) else {
            return Self::default();
        };

        let mut collector = IdentifierCollector::default();
        collector.visit_program(&program);

        Self {
            promise: top_level_declarations(&program).contains("promise"),
            callback: collector.references.contains("callback")
                && !collector.bindings.contains("callback"),
        }
    }
}

/// Parse setup code as the body it ends up in. Setup may `return` early.
fn parse_setup<'a>(allocator: &'a Allocator, code: &'a str) -> Option<Program<'a>> {
    let options = ParseOptions {
        allow_return_outside_function: true,
        ..ParseOptions::default()
    };
    let ret = Parser::new(allocator, code, SourceType::cjs())
        .with_options(options)
        .parse();
    if !ret.errors.is_empty() || ret.panicked {
        return None;
    }
    Some(ret.program)
}

/// Names declared by `var`/`let`/`const` statements directly in the body.
fn top_level_declarations(program: &Program) -> HashSet<String> {
    program
        .body
        .iter()
        .filter_map(|statement| match statement {
            Statement::VariableDeclaration(declaration) => Some(declaration),
            _ => None,
        })
        .flat_map(|declaration| declaration.declarations.iter())
        .filter_map(|declarator| declarator.id.get_binding_identifier())
        .map(|ident| ident.name.to_string())
        .collect()
}

#[derive(Default)]
struct IdentifierCollector {
    bindings: HashSet<String>,
    references: HashSet<String>,
}

impl<'a> Visit<'a> for IdentifierCollector {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.references.insert(ident.name.to_string());
    }

    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.bindings.insert(ident.name.to_string());
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BINDING RENAME
// ═══════════════════════════════════════════════════════════════════════════════

/// Rename the bindings in `names`, and references to them, to `to`.
///
/// Only identifiers are touched. Strings, property keys and member names keep
/// their spelling; a shorthand property keeps its key (`{instance}` becomes
/// `{instance: to}`). Code that does not parse is returned unchanged.
pub fn rename_bindings(code: &str, names: &[&str], to: &str) -> String {
    let allocator = Allocator::default();
    let Some(program) = parse_setup(&allocator, code) else {
        return code.to_string();
    };

    let mut renamer = BindingRenamer {
        names,
        to,
        edits: Vec::new(),
    };
    renamer.visit_program(&program);
    renamer.edits.sort_by_key(|(span, _)| span.start);

    let mut renamed = String::with_capacity(code.len());
    let mut last = 0;
    for (span, text) in renamer.edits {
        let (start, end) = (span.start as usize, span.end as usize);
        if start < last {
            continue;
        }
        renamed.push_str(&code[last..start]);
        renamed.push_str(&text);
        last = end;
    }
    renamed.push_str(&code[last..]);
    renamed
}

struct BindingRenamer<'n> {
    names: &'n [&'n str],
    to: &'n str,
    edits: Vec<(Span, String)>,
}

impl BindingRenamer<'_> {
    fn matches(&self, name: &str) -> bool {
        self.names.iter().any(|candidate| *candidate == name)
    }

    fn rename(&mut self, span: Span, name: &str) {
        if self.matches(name) {
            self.edits.push((span, self.to.to_string()));
        }
    }

    fn expand_shorthand(&mut self, span: Span, name: &str) -> bool {
        if !self.matches(name) {
            return false;
        }
        self.edits.push((span, format!("{}: {}", name, self.to)));
        true
    }
}

impl<'a> Visit<'a> for BindingRenamer<'_> {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.rename(ident.span, ident.name.as_str());
    }

    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.rename(ident.span, ident.name.as_str());
    }

    fn visit_object_property(&mut self, prop: &ObjectProperty<'a>) {
        if prop.shorthand {
            if let Expression::Identifier(ident) = &prop.value {
                if self.expand_shorthand(ident.span, ident.name.as_str()) {
                    return;
                }
            }
        }
        walk::walk_object_property(self, prop);
    }

    fn visit_binding_property(&mut self, prop: &BindingProperty<'a>) {
        if prop.shorthand {
            if let Some(ident) = prop.value.get_binding_identifier() {
                if self.expand_shorthand(ident.span, ident.name.as_str()) {
                    return;
                }
            }
        }
        walk::walk_binding_property(self, prop);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CODE ASSEMBLY
// ═══════════════════════════════════════════════════════════════════════════════

/// Double-quoted JavaScript string literal.
pub fn js_string(value: &str) -> String {
    // JSON string syntax is a subset of JavaScript's.
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

pub fn indent(code: &str) -> String {
    code.lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("  {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Self-invoking wrapper so custom bodies can `return` their result.
pub fn wrap_iife(body: &str) -> String {
    format!("(function () {{\n{}\n}})()", indent(body.trim_end()))
}

/// Join snippets with newlines, skipping empty ones.
pub fn join_code<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(str::trim_end)
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
