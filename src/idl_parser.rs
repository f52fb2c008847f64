//! IDL Parser Module for the Probe Compiler
//!
//! Recursive-descent WebIDL parser. Covers the grammar the probe builders care about:
//! interfaces, mixins, namespaces, partials, includes statements, dictionaries, enums,
//! typedefs, callbacks, and every interface member shape. Source lines are kept on
//! definitions and members so validation errors can point at the offending construct.

use crate::diagnostics::BuildError;
use crate::idl::{
    Argument, Definition, DefinitionKind, ExtAttrRhs, ExtendedAttribute, IdlType, Member,
    MemberKind, Special,
};

const GENERIC_TYPES: &[&str] = &[
    "sequence",
    "record",
    "Promise",
    "FrozenArray",
    "ObservableArray",
    "async_sequence",
];

// ═══════════════════════════════════════════════════════════════════════════════
// TOKENIZER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Identifier,
    Integer,
    Decimal,
    Str,
    Punct,
    Ellipsis,
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    text: String,
    line: u32,
}

fn tokenize(source: &str, fragment: &str) -> Result<Vec<Token>, BuildError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1u32;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Comments
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                if chars[i] == '\n' {
                    line += 1;
                }
                i += 1;
            }
            i += 2;
            continue;
        }

        if c == '"' {
            let start = i + 1;
            i += 1;
            while i < chars.len() && chars[i] != '"' {
                if chars[i] == '\n' {
                    line += 1;
                }
                i += 1;
            }
            if i >= chars.len() {
                return Err(syntax_error(fragment, line, "Unterminated string"));
            }
            tokens.push(Token {
                kind: TokenKind::Str,
                text: chars[start..i].iter().collect(),
                line,
            });
            i += 1;
            continue;
        }

        let next = chars.get(i + 1).copied();
        let starts_identifier = c.is_ascii_alphabetic()
            || ((c == '_' || c == '-') && next.is_some_and(|n| n.is_ascii_alphabetic()));
        if starts_identifier {
            let start = i;
            i += 1;
            while i < chars.len()
                && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '-')
            {
                i += 1;
            }
            let raw: String = chars[start..i].iter().collect();
            // A leading underscore escapes keywords and is not part of the name.
            let text = raw.strip_prefix('_').map(str::to_string).unwrap_or(raw);
            tokens.push(Token {
                kind: TokenKind::Identifier,
                text,
                line,
            });
            continue;
        }

        let starts_number = c.is_ascii_digit()
            || (c == '-' && next.is_some_and(|n| n.is_ascii_digit() || n == '.'))
            || (c == '.' && next.is_some_and(|n| n.is_ascii_digit()));
        if starts_number {
            let start = i;
            let mut is_decimal = false;
            i += 1;
            while i < chars.len() {
                let d = chars[i];
                if d == '.' || d == 'e' || d == 'E' {
                    // Hex digits include `e`, so only treat it as an exponent in decimal form.
                    let is_hex = chars[start..i].iter().any(|&h| h == 'x' || h == 'X');
                    if d != '.' && is_hex {
                        i += 1;
                        continue;
                    }
                    is_decimal = true;
                    i += 1;
                    if (d == 'e' || d == 'E') && matches!(chars.get(i), Some('+') | Some('-')) {
                        i += 1;
                    }
                } else if d.is_ascii_alphanumeric() {
                    i += 1;
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: if is_decimal {
                    TokenKind::Decimal
                } else {
                    TokenKind::Integer
                },
                text: chars[start..i].iter().collect(),
                line,
            });
            continue;
        }

        if c == '.' && next == Some('.') && chars.get(i + 2) == Some(&'.') {
            tokens.push(Token {
                kind: TokenKind::Ellipsis,
                text: "...".to_string(),
                line,
            });
            i += 3;
            continue;
        }

        if "(){}[]<>,;:=?*".contains(c) {
            tokens.push(Token {
                kind: TokenKind::Punct,
                text: c.to_string(),
                line,
            });
            i += 1;
            continue;
        }

        return Err(syntax_error(
            fragment,
            line,
            &format!("Unexpected character '{}'", c),
        ));
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        line,
    });
    Ok(tokens)
}

fn syntax_error(fragment: &str, line: u32, message: &str) -> BuildError {
    BuildError::IdlSyntax {
        fragment: fragment.to_string(),
        line,
        message: message.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSER
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse one IDL fragment. `fragment` names the source in error messages.
pub fn parse_idl(source: &str, fragment: &str) -> Result<Vec<Definition>, BuildError> {
    let tokens = tokenize(source, fragment)?;
    let mut parser = IdlParser {
        tokens,
        pos: 0,
        fragment,
    };
    parser.parse_definitions()
}

struct IdlParser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    fragment: &'a str,
}

impl<'a> IdlParser<'a> {
    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn is_punct(&self, c: &str) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Punct && token.text == c
    }

    fn is_word(&self, word: &str) -> bool {
        Self::token_is_word(self.peek(), word)
    }

    fn token_is_word(token: &Token, word: &str) -> bool {
        token.kind == TokenKind::Identifier && token.text == word
    }

    fn eat_punct(&mut self, c: &str) -> bool {
        if self.is_punct(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.is_word(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: &str) -> Result<(), BuildError> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            Err(self.error(&format!("Expected '{}'", c)))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, BuildError> {
        if self.peek().kind == TokenKind::Identifier {
            Ok(self.advance().text)
        } else {
            Err(self.error("Expected identifier"))
        }
    }

    fn error(&self, message: &str) -> BuildError {
        let token = self.peek();
        let found = match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", token.text),
        };
        syntax_error(
            self.fragment,
            token.line,
            &format!("{}, found {}", message, found),
        )
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Definitions
    // ───────────────────────────────────────────────────────────────────────────

    fn parse_definitions(&mut self) -> Result<Vec<Definition>, BuildError> {
        let mut definitions = Vec::new();
        while self.peek().kind != TokenKind::Eof {
            let ext_attrs = self.parse_ext_attrs()?;
            let line = self.peek().line;
            let mut definition = self.parse_definition()?;
            definition.ext_attrs = ext_attrs;
            definition.line = line;
            definitions.push(definition);
        }
        Ok(definitions)
    }

    fn parse_definition(&mut self) -> Result<Definition, BuildError> {
        if self.eat_word("callback") {
            if self.eat_word("interface") {
                let name = self.expect_identifier()?;
                let mut definition = Definition::new(DefinitionKind::CallbackInterface, name);
                definition.members = self.parse_member_block(DefinitionKind::CallbackInterface)?;
                return Ok(definition);
            }
            let name = self.expect_identifier()?;
            self.expect_punct("=")?;
            let mut definition = Definition::new(DefinitionKind::CallbackFunction, name);
            definition.idl_type = Some(self.parse_type()?);
            definition.arguments = self.parse_arguments()?;
            self.expect_punct(";")?;
            return Ok(definition);
        }

        let partial = self.eat_word("partial");

        let mut definition = if self.eat_word("interface") {
            if self.eat_word("mixin") {
                let name = self.expect_identifier()?;
                let mut definition = Definition::new(DefinitionKind::InterfaceMixin, name);
                definition.members = self.parse_member_block(DefinitionKind::InterfaceMixin)?;
                definition
            } else {
                let name = self.expect_identifier()?;
                let mut definition = Definition::new(DefinitionKind::Interface, name);
                definition.inheritance = self.parse_inheritance()?;
                definition.members = self.parse_member_block(DefinitionKind::Interface)?;
                definition
            }
        } else if self.eat_word("namespace") {
            let name = self.expect_identifier()?;
            let mut definition = Definition::new(DefinitionKind::Namespace, name);
            definition.members = self.parse_member_block(DefinitionKind::Namespace)?;
            definition
        } else if self.eat_word("dictionary") {
            let name = self.expect_identifier()?;
            let mut definition = Definition::new(DefinitionKind::Dictionary, name);
            definition.inheritance = self.parse_inheritance()?;
            definition.members = self.parse_member_block(DefinitionKind::Dictionary)?;
            definition
        } else if partial {
            return Err(self.error("Expected interface, namespace or dictionary after partial"));
        } else if self.eat_word("enum") {
            let name = self.expect_identifier()?;
            let mut definition = Definition::new(DefinitionKind::Enum, name);
            definition.values = self.parse_enum_values()?;
            definition
        } else if self.eat_word("typedef") {
            let idl_type = self.parse_type()?;
            let name = self.expect_identifier()?;
            self.expect_punct(";")?;
            let mut definition = Definition::new(DefinitionKind::Typedef, name);
            definition.idl_type = Some(idl_type);
            definition
        } else if self.peek().kind == TokenKind::Identifier
            && Self::token_is_word(self.peek_at(1), "includes")
        {
            let target = self.expect_identifier()?;
            self.advance();
            let mixin = self.expect_identifier()?;
            self.expect_punct(";")?;
            let mut definition = Definition::new(DefinitionKind::Includes, target);
            definition.includes = Some(mixin);
            definition
        } else {
            return Err(self.error("Expected definition"));
        };

        definition.partial = partial;
        Ok(definition)
    }

    fn parse_inheritance(&mut self) -> Result<Option<String>, BuildError> {
        if self.eat_punct(":") {
            Ok(Some(self.expect_identifier()?))
        } else {
            Ok(None)
        }
    }

    fn parse_enum_values(&mut self) -> Result<Vec<String>, BuildError> {
        self.expect_punct("{")?;
        let mut values = Vec::new();
        while !self.is_punct("}") {
            if self.peek().kind != TokenKind::Str {
                return Err(self.error("Expected string in enum"));
            }
            values.push(self.advance().text);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("}")?;
        self.expect_punct(";")?;
        Ok(values)
    }

    fn parse_member_block(&mut self, owner: DefinitionKind) -> Result<Vec<Member>, BuildError> {
        self.expect_punct("{")?;
        let mut members = Vec::new();
        while !self.is_punct("}") {
            if self.peek().kind == TokenKind::Eof {
                return Err(self.error("Unterminated definition body"));
            }
            let ext_attrs = self.parse_ext_attrs()?;
            let line = self.peek().line;
            let mut member = if owner == DefinitionKind::Dictionary {
                self.parse_field()?
            } else {
                self.parse_member()?
            };
            member.ext_attrs = ext_attrs;
            member.line = line;
            members.push(member);
        }
        self.expect_punct("}")?;
        self.expect_punct(";")?;
        Ok(members)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Members
    // ───────────────────────────────────────────────────────────────────────────

    fn parse_field(&mut self) -> Result<Member, BuildError> {
        self.eat_word("required");
        let idl_type = self.parse_type()?;
        let name = self.expect_identifier()?;
        if self.eat_punct("=") {
            self.parse_default_value()?;
        }
        self.expect_punct(";")?;
        let mut member = Member::new(MemberKind::Field, Some(&name));
        member.idl_type = Some(idl_type);
        Ok(member)
    }

    fn parse_member(&mut self) -> Result<Member, BuildError> {
        if self.eat_word("const") {
            let idl_type = self.parse_type()?;
            let name = self.expect_identifier()?;
            self.expect_punct("=")?;
            self.parse_default_value()?;
            self.expect_punct(";")?;
            let mut member = Member::new(MemberKind::Const, Some(&name));
            member.idl_type = Some(idl_type);
            return Ok(member);
        }

        if self.is_word("constructor") && Self::token_is_punct(self.peek_at(1), "(") {
            self.advance();
            let mut member = Member::new(MemberKind::Constructor, None);
            member.arguments = self.parse_arguments()?;
            self.expect_punct(";")?;
            return Ok(member);
        }

        if self.eat_word("stringifier") {
            if self.eat_punct(";") {
                let mut member = Member::new(MemberKind::Operation, None);
                member.special = Some(Special::Stringifier);
                return Ok(member);
            }
            let mut member = self.parse_attribute_or_operation()?;
            member.special = Some(Special::Stringifier);
            return Ok(member);
        }

        if self.eat_word("static") {
            let mut member = self.parse_attribute_or_operation()?;
            member.special = Some(Special::Static);
            return Ok(member);
        }

        if self.is_word("inherit")
            && (Self::token_is_word(self.peek_at(1), "readonly")
                || Self::token_is_word(self.peek_at(1), "attribute"))
        {
            self.advance();
        }

        let readonly = self.is_word("readonly")
            && ["attribute", "maplike", "setlike"]
                .iter()
                .any(|w| Self::token_is_word(self.peek_at(1), w));
        if readonly {
            self.advance();
        }

        if self.eat_word("maplike") {
            let mut member = Member::new(MemberKind::Maplike, None);
            member.readonly = readonly;
            member.type_args = self.parse_type_args()?;
            self.expect_punct(";")?;
            return Ok(member);
        }
        if self.eat_word("setlike") {
            let mut member = Member::new(MemberKind::Setlike, None);
            member.readonly = readonly;
            member.type_args = self.parse_type_args()?;
            self.expect_punct(";")?;
            return Ok(member);
        }
        if self.is_word("attribute") {
            let mut member = self.parse_attribute_or_operation()?;
            member.readonly = readonly;
            return Ok(member);
        }

        let is_async =
            self.is_word("async") && Self::token_is_word(self.peek_at(1), "iterable");
        if is_async {
            self.advance();
        }
        if self.eat_word("iterable") {
            let mut member = Member::new(MemberKind::Iterable, None);
            member.is_async = is_async;
            member.type_args = self.parse_type_args()?;
            if self.is_punct("(") {
                member.arguments = self.parse_arguments()?;
            }
            self.expect_punct(";")?;
            return Ok(member);
        }

        let mut special = None;
        loop {
            let next = if self.is_word("getter") {
                Special::Getter
            } else if self.is_word("setter") {
                Special::Setter
            } else if self.is_word("deleter") {
                Special::Deleter
            } else {
                break;
            };
            self.advance();
            special = Some(next);
        }
        let mut member = self.parse_operation()?;
        member.special = special;
        Ok(member)
    }

    fn token_is_punct(token: &Token, c: &str) -> bool {
        token.kind == TokenKind::Punct && token.text == c
    }

    fn parse_attribute_or_operation(&mut self) -> Result<Member, BuildError> {
        if self.eat_word("readonly") {
            let mut member = self.parse_attribute_or_operation()?;
            member.readonly = true;
            return Ok(member);
        }
        if self.eat_word("attribute") {
            let idl_type = self.parse_type()?;
            let name = self.expect_identifier()?;
            self.expect_punct(";")?;
            let mut member = Member::new(MemberKind::Attribute, Some(&name));
            member.idl_type = Some(idl_type);
            return Ok(member);
        }
        self.parse_operation()
    }

    fn parse_operation(&mut self) -> Result<Member, BuildError> {
        let idl_type = self.parse_type()?;
        let name = if self.peek().kind == TokenKind::Identifier {
            Some(self.advance().text)
        } else {
            None
        };
        let mut member = Member::new(MemberKind::Operation, name.as_deref());
        member.idl_type = Some(idl_type);
        member.arguments = self.parse_arguments()?;
        self.expect_punct(";")?;
        Ok(member)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Argument>, BuildError> {
        self.expect_punct("(")?;
        let mut arguments = Vec::new();
        while !self.is_punct(")") {
            self.parse_ext_attrs()?;
            let optional = self.eat_word("optional");
            let idl_type = self.parse_type()?;
            let variadic = if self.peek().kind == TokenKind::Ellipsis {
                self.advance();
                true
            } else {
                false
            };
            let name = self.expect_identifier()?;
            if self.eat_punct("=") {
                self.parse_default_value()?;
            }
            arguments.push(Argument {
                name,
                idl_type,
                optional,
                variadic,
            });
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(arguments)
    }

    fn parse_default_value(&mut self) -> Result<(), BuildError> {
        if self.eat_punct("[") {
            return self.expect_punct("]");
        }
        if self.eat_punct("{") {
            return self.expect_punct("}");
        }
        match self.peek().kind {
            TokenKind::Identifier | TokenKind::Integer | TokenKind::Decimal | TokenKind::Str => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error("Expected default value")),
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Types
    // ───────────────────────────────────────────────────────────────────────────

    fn parse_type_args(&mut self) -> Result<Vec<IdlType>, BuildError> {
        self.expect_punct("<")?;
        let mut args = vec![self.parse_type()?];
        while self.eat_punct(",") {
            args.push(self.parse_type()?);
        }
        self.expect_punct(">")?;
        Ok(args)
    }

    fn parse_type(&mut self) -> Result<IdlType, BuildError> {
        // Extended attributes on types ([EnforceRange] long) do not affect probes.
        self.parse_ext_attrs()?;

        let base = if self.eat_punct("(") {
            let mut types = vec![self.parse_type()?];
            while self.eat_word("or") {
                types.push(self.parse_type()?);
            }
            self.expect_punct(")")?;
            IdlType::Union(types)
        } else {
            self.parse_single_type()?
        };

        if self.eat_punct("?") {
            Ok(IdlType::Nullable(Box::new(base)))
        } else {
            Ok(base)
        }
    }

    fn parse_single_type(&mut self) -> Result<IdlType, BuildError> {
        let first = self.expect_identifier()?;
        let name = match first.as_str() {
            "unsigned" => {
                let rest = self.expect_identifier()?;
                if rest == "long" && self.eat_word("long") {
                    "unsigned long long".to_string()
                } else {
                    format!("unsigned {}", rest)
                }
            }
            "unrestricted" => format!("unrestricted {}", self.expect_identifier()?),
            "long" if self.is_word("long") => {
                self.advance();
                "long long".to_string()
            }
            generic if GENERIC_TYPES.contains(&generic) && self.is_punct("<") => {
                let args = self.parse_type_args()?;
                return Ok(IdlType::Generic {
                    name: generic.to_string(),
                    args,
                });
            }
            _ => first,
        };
        Ok(IdlType::Named(name))
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Extended attributes
    // ───────────────────────────────────────────────────────────────────────────

    fn parse_ext_attrs(&mut self) -> Result<Vec<ExtendedAttribute>, BuildError> {
        let mut attrs = Vec::new();
        if !self.eat_punct("[") {
            return Ok(attrs);
        }
        loop {
            attrs.push(self.parse_ext_attr()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("]")?;
        Ok(attrs)
    }

    fn parse_ext_attr(&mut self) -> Result<ExtendedAttribute, BuildError> {
        let name = self.expect_identifier()?;
        let mut attr = ExtendedAttribute::new(&name, None);

        if self.eat_punct("=") {
            attr.rhs = Some(if self.eat_punct("*") {
                ExtAttrRhs::Wildcard
            } else if self.eat_punct("(") {
                self.parse_rhs_list()?
            } else {
                let token = self.advance();
                match token.kind {
                    TokenKind::Identifier => ExtAttrRhs::Identifier(token.text),
                    TokenKind::Integer => ExtAttrRhs::Integer(token.text),
                    TokenKind::Decimal => ExtAttrRhs::Decimal(token.text),
                    TokenKind::Str => ExtAttrRhs::String(token.text),
                    _ => {
                        return Err(syntax_error(
                            self.fragment,
                            token.line,
                            &format!("Invalid value for extended attribute {}", name),
                        ))
                    }
                }
            });
        }

        if self.is_punct("(") {
            attr.arguments = self.parse_arguments()?;
        }
        Ok(attr)
    }

    fn parse_rhs_list(&mut self) -> Result<ExtAttrRhs, BuildError> {
        let strings = self.peek().kind == TokenKind::Str;
        let mut items = Vec::new();
        while !self.is_punct(")") {
            let token = self.advance();
            let expected = if strings {
                TokenKind::Str
            } else {
                TokenKind::Identifier
            };
            if token.kind != expected {
                return Err(syntax_error(
                    self.fragment,
                    token.line,
                    "Mixed or invalid extended attribute list",
                ));
            }
            items.push(token.text);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(if strings {
            ExtAttrRhs::StringList(items)
        } else {
            ExtAttrRhs::IdentifierList(items)
        })
    }
}
