//! Recursive-descent parser for fluent-DSL schemas (`z.object({...})`).

use crate::error::SchemaError;
use crate::ir::{AdditionalProperties, Schema, SchemaType};
use crate::types::ParsedSchema;
use std::collections::BTreeMap;

const MAX_NESTING: usize = 128;

/// Parse the first `z.` expression in `text`.
pub fn parse_fluent(text: &str) -> Result<ParsedSchema, SchemaError> {
    let mut parser = FluentParser::new(text);
    parser.pos = parser.find_root()?;
    let parsed = parser.parse_type()?;
    Ok(ParsedSchema {
        schema: parsed.schema,
        warnings: parser.warnings,
    })
}

/// A parsed type together with whether its parent should treat it as optional.
#[derive(Debug)]
struct Parsed {
    schema: Schema,
    optional: bool,
}

impl Parsed {
    fn required(schema: Schema) -> Self {
        Self {
            schema,
            optional: false,
        }
    }
}

struct FluentParser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    path: Vec<String>,
    depth: usize,
    warnings: Vec<String>,
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

impl<'a> FluentParser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            path: Vec::new(),
            depth: 0,
            warnings: Vec::new(),
        }
    }

    fn err(&self, message: impl Into<String>) -> SchemaError {
        SchemaError::syntax(self.pos, message)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.bytes[self.pos..].starts_with(s.as_bytes())
    }

    /// Skip whitespace and comments.
    fn skip_ws(&mut self) {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if self.starts_with("//") => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some(b'/') if self.starts_with("/*") => {
                    self.pos += 2;
                    while self.peek().is_some() && !self.starts_with("*/") {
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(self.bytes.len());
                }
                _ => break,
            }
        }
    }

    fn eat(&mut self, b: u8) -> bool {
        self.skip_ws();
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, b: u8) -> Result<(), SchemaError> {
        if self.eat(b) {
            Ok(())
        } else {
            Err(self.err(format!("expected `{}`", b as char)))
        }
    }

    fn ident(&mut self) -> Result<&'a str, SchemaError> {
        self.skip_ws();
        let start = self.pos;
        while self.peek().is_some_and(is_ident_byte) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.err("expected identifier"));
        }
        let src = self.src;
        Ok(&src[start..self.pos])
    }

    /// Read a quoted literal starting at the current byte.
    fn string_literal(&mut self) -> Result<String, SchemaError> {
        self.skip_ws();
        let start = self.pos;
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'' | b'`')) => q,
            _ => return Err(self.err("expected string literal")),
        };
        self.pos += 1;
        let src = self.src;
        let mut out = String::new();
        let mut chars = src[self.pos..].char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        out.push(escaped);
                    }
                }
                c if c as u32 == quote as u32 => {
                    self.pos += offset + 1;
                    return Ok(out);
                }
                c => out.push(c),
            }
        }
        Err(SchemaError::syntax(start, "unterminated string literal"))
    }

    /// Skip a parenthesized, bracketed or braced group including nested groups.
    fn skip_group(&mut self) -> Result<(), SchemaError> {
        self.skip_ws();
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'"' | b'\'' | b'`' => {
                    self.string_literal()?;
                    continue;
                }
                b'/' if self.starts_with("//") || self.starts_with("/*") => {
                    self.skip_ws();
                    continue;
                }
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.pos += 1;
                        return Ok(());
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(SchemaError::syntax(start, "unbalanced arguments"))
    }

    /// Skip a call's argument list when one follows.
    fn skip_args(&mut self) -> Result<(), SchemaError> {
        self.skip_ws();
        if self.peek() == Some(b'(') {
            self.skip_group()?;
        }
        Ok(())
    }

    fn find_root(&self) -> Result<usize, SchemaError> {
        let mut scan = FluentParser::new(self.src);
        loop {
            scan.skip_ws();
            let Some(b) = scan.peek() else {
                return Err(SchemaError::syntax(0, "no `z.` schema expression found"));
            };
            let at_boundary = scan.pos == 0 || !is_ident_byte(scan.bytes[scan.pos - 1]);
            if at_boundary && scan.starts_with("z.") {
                return Ok(scan.pos);
            }
            if matches!(b, b'"' | b'\'' | b'`') {
                scan.string_literal()?;
            } else {
                scan.pos += 1;
            }
        }
    }

    fn location(&self) -> (String, String) {
        let field = self.path.last().cloned().unwrap_or_else(|| "(root)".into());
        let parents = self.path.len().saturating_sub(1);
        let record = std::iter::once("root".to_string())
            .chain(self.path[..parents].iter().cloned())
            .collect::<Vec<_>>()
            .join(".");
        (record, field)
    }

    fn parse_type(&mut self) -> Result<Parsed, SchemaError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.err("schema nesting too deep"));
        }
        let result = self.parse_type_inner();
        self.depth -= 1;
        result
    }

    fn parse_type_inner(&mut self) -> Result<Parsed, SchemaError> {
        self.skip_ws();
        let start = self.pos;
        let head = self.ident()?;
        if head != "z" {
            return Err(SchemaError::syntax(
                start,
                format!("expected `z.`, found `{head}`"),
            ));
        }
        self.expect(b'.')?;
        let name = self.ident()?;

        let parsed = match name {
            "string" | "date" => self.scalar(SchemaType::String)?,
            "number" => self.scalar(SchemaType::Number)?,
            "bigint" | "int" => self.scalar(SchemaType::Integer)?,
            "boolean" => self.scalar(SchemaType::Boolean)?,
            "null" => self.scalar(SchemaType::Null)?,
            "enum" => self.scalar(SchemaType::String)?,
            "literal" => self.literal()?,
            "object" => self.object()?,
            "array" => {
                self.expect(b'(')?;
                let items = self.parse_type()?;
                self.expect(b')')?;
                Parsed::required(Schema::array(items.schema))
            }
            "record" => {
                self.expect(b'(')?;
                let mut values = self.parse_type()?;
                if self.eat(b',') {
                    values = self.parse_type()?;
                }
                self.expect(b')')?;
                Parsed::required(Schema::map(values.schema))
            }
            "union" => {
                self.expect(b'(')?;
                let union = self.union_list()?;
                self.expect(b')')?;
                Parsed::required(union)
            }
            "discriminatedUnion" => {
                self.expect(b'(')?;
                self.string_literal()?;
                self.expect(b',')?;
                let union = self.union_list()?;
                self.expect(b')')?;
                Parsed::required(union)
            }
            "optional" | "nullable" => {
                self.expect(b'(')?;
                let inner = self.parse_type()?;
                self.expect(b')')?;
                if name == "optional" {
                    Parsed {
                        schema: inner.schema,
                        optional: true,
                    }
                } else {
                    Parsed {
                        schema: Schema::nullable(inner.schema),
                        optional: inner.optional,
                    }
                }
            }
            "any" | "unknown" => {
                let (record, field) = self.location();
                return Err(SchemaError::forbidden(record, field, format!("z.{name}()")));
            }
            other => {
                return Err(SchemaError::syntax(
                    start,
                    format!("unsupported type `z.{other}`"),
                ))
            }
        };

        self.modifiers(parsed)
    }

    fn scalar(&mut self, schema_type: SchemaType) -> Result<Parsed, SchemaError> {
        self.skip_args()?;
        Ok(Parsed::required(Schema::of(schema_type)))
    }

    fn literal(&mut self) -> Result<Parsed, SchemaError> {
        self.expect(b'(')?;
        self.skip_ws();
        let schema_type = match self.peek() {
            Some(b'"' | b'\'' | b'`') => {
                self.string_literal()?;
                SchemaType::String
            }
            Some(b) if b == b'-' || b.is_ascii_digit() => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'+' | b'.'))
                {
                    self.pos += 1;
                }
                let src = self.src;
                let number = &src[start..self.pos];
                if number.contains(['.', 'e', 'E']) {
                    SchemaType::Number
                } else {
                    SchemaType::Integer
                }
            }
            _ => match self.ident()? {
                "true" | "false" => SchemaType::Boolean,
                "null" => SchemaType::Null,
                other => return Err(self.err(format!("unsupported literal `{other}`"))),
            },
        };
        self.expect(b')')?;
        Ok(Parsed::required(Schema::of(schema_type)))
    }

    fn object(&mut self) -> Result<Parsed, SchemaError> {
        self.expect(b'(')?;
        self.expect(b'{')?;

        let mut properties = BTreeMap::new();
        let mut required: Vec<String> = Vec::new();
        loop {
            if self.eat(b'}') {
                break;
            }
            let name = self.property_name()?;
            self.expect(b':')?;

            self.path.push(name.clone());
            let child = self.parse_type()?;
            self.path.pop();

            required.retain(|r| r != &name);
            if !child.optional {
                required.push(name.clone());
            }
            properties.insert(name, child.schema);

            if !self.eat(b',') {
                self.expect(b'}')?;
                break;
            }
        }
        self.expect(b')')?;
        Ok(Parsed::required(Schema::object(properties, required)))
    }

    fn property_name(&mut self) -> Result<String, SchemaError> {
        self.skip_ws();
        match self.peek() {
            Some(b'"' | b'\'') => self.string_literal(),
            _ => Ok(self.ident()?.to_string()),
        }
    }

    /// `[T, T, ...]` into an `anyOf`; a single member is returned as is.
    fn union_list(&mut self) -> Result<Schema, SchemaError> {
        self.expect(b'[')?;
        let mut variants = Vec::new();
        loop {
            if self.eat(b']') {
                break;
            }
            variants.push(self.parse_type()?.schema);
            if !self.eat(b',') {
                self.expect(b']')?;
                break;
            }
        }
        match variants.len() {
            0 => Err(self.err("empty union")),
            1 => Ok(variants.remove(0)),
            _ => Ok(Schema::any_of(variants)),
        }
    }

    fn modifiers(&mut self, mut parsed: Parsed) -> Result<Parsed, SchemaError> {
        loop {
            let save = self.pos;
            if !self.eat(b'.') {
                self.pos = save;
                return Ok(parsed);
            }
            match self.ident()? {
                "optional" => {
                    self.skip_args()?;
                    parsed.optional = true;
                }
                "nullable" => {
                    self.skip_args()?;
                    parsed.schema = Schema::nullable(parsed.schema);
                }
                "nullish" => {
                    self.skip_args()?;
                    parsed.schema = Schema::nullable(parsed.schema);
                    parsed.optional = true;
                }
                "default" => {
                    self.skip_args()?;
                    parsed.optional = true;
                }
                "array" => {
                    self.skip_args()?;
                    parsed = Parsed::required(Schema::array(parsed.schema));
                }
                "or" => {
                    self.expect(b'(')?;
                    let other = self.parse_type()?;
                    self.expect(b')')?;
                    parsed.schema = union_of(parsed.schema, other.schema);
                }
                "strict" => {
                    self.skip_args()?;
                    set_additional(&mut parsed.schema, false);
                }
                "passthrough" => {
                    self.skip_args()?;
                    set_additional(&mut parsed.schema, true);
                }
                other => {
                    if !is_decorative(other) {
                        self.warnings
                            .push(format!("unknown modifier `.{other}()` ignored"));
                    }
                    self.skip_args()?;
                }
            }
        }
    }
}

/// Modifiers that refine values without changing the schema shape.
fn is_decorative(name: &str) -> bool {
    matches!(
        name,
        "describe"
            | "min"
            | "max"
            | "length"
            | "email"
            | "url"
            | "uuid"
            | "regex"
            | "int"
            | "positive"
            | "negative"
            | "nonnegative"
            | "nonpositive"
            | "nonempty"
            | "finite"
            | "safe"
            | "transform"
            | "refine"
            | "superRefine"
            | "catch"
            | "brand"
            | "readonly"
            | "pipe"
            | "trim"
            | "toLowerCase"
            | "toUpperCase"
            | "datetime"
            | "strip"
    )
}

fn union_of(a: Schema, b: Schema) -> Schema {
    let mut variants = if a.schema_type.is_none() && a.reference.is_none() && !a.any_of.is_empty()
    {
        a.any_of
    } else {
        vec![a]
    };
    variants.push(b);
    Schema::any_of(variants)
}

fn set_additional(schema: &mut Schema, allowed: bool) {
    if schema.schema_type == Some(SchemaType::Object) {
        schema.additional_properties = Some(AdditionalProperties::Allowed(allowed));
    }
    for variant in &mut schema.any_of {
        set_additional(variant, allowed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(text: &str) -> Schema {
        parse_fluent(text).unwrap().schema
    }

    #[test]
    fn test_object_with_optional_fields() {
        let schema = parse(
            r#"
import { z } from "zod";

export const User = z.object({
  id: z.number().int().positive(),
  name: z.string().min(1).max(64),
  email: z.string().email().optional(),
  role: z.enum(["admin", "user"]).default("user"),
  "display-name": z.string().nullable(),
});
"#,
        );
        assert_eq!(
            schema.to_value().unwrap(),
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "number"},
                    "name": {"type": "string"},
                    "email": {"type": "string"},
                    "role": {"type": "string"},
                    "display-name": {"anyOf": [{"type": "string"}, {"type": "null"}]}
                },
                "required": ["id", "name", "display-name"]
            })
        );
    }

    #[test]
    fn test_nested_array_union_and_record() {
        let schema = parse(
            "z.object({ items: z.array(z.object({ sku: z.string(), qty: z.number() })), \
             value: z.union([z.string(), z.number()]), \
             meta: z.record(z.string(), z.boolean()) })",
        );
        let value = schema.to_value().unwrap();
        assert_eq!(value["properties"]["items"]["items"]["required"], json!(["sku", "qty"]));
        assert_eq!(
            value["properties"]["value"],
            json!({"anyOf": [{"type": "string"}, {"type": "number"}]})
        );
        assert_eq!(
            value["properties"]["meta"]["additionalProperties"],
            json!({"type": "boolean"})
        );
    }

    #[test]
    fn test_literals() {
        let schema = parse(
            "z.object({ a: z.literal('x'), b: z.literal(42), c: z.literal(1.5), d: z.literal(true), e: z.literal(null) })",
        );
        let props = schema.properties.unwrap();
        assert_eq!(props["a"], Schema::of(SchemaType::String));
        assert_eq!(props["b"], Schema::of(SchemaType::Integer));
        assert_eq!(props["c"], Schema::of(SchemaType::Number));
        assert_eq!(props["d"], Schema::of(SchemaType::Boolean));
        assert_eq!(props["e"], Schema::of(SchemaType::Null));
    }

    #[test]
    fn test_forbidden_any_reports_location() {
        let err = parse_fluent("z.object({ meta: z.object({ blob: z.any() }) })").unwrap_err();
        assert_eq!(
            err,
            SchemaError::ForbiddenType {
                record: "root.meta".into(),
                field: "blob".into(),
                type_name: "z.any()".into(),
            }
        );
        assert!(matches!(
            parse_fluent("z.array(z.unknown())"),
            Err(SchemaError::ForbiddenType { .. })
        ));
    }

    #[test]
    fn test_supplementary_modifiers() {
        let schema = parse(
            "z.object({ a: z.string().nullish(), b: z.optional(z.number()), \
             c: z.string().array(), d: z.string().or(z.number()), \
             e: z.object({}).strict(), f: z.object({}).passthrough(), \
             g: z.nullable(z.bigint()), h: z.date() })",
        );
        assert_eq!(schema.required, vec!["c", "d", "e", "f", "g", "h"]);
        let props = schema.properties.unwrap();
        assert!(props["a"].accepts_null());
        assert_eq!(props["c"], Schema::array(Schema::of(SchemaType::String)));
        assert_eq!(props["d"].any_of.len(), 2);
        assert_eq!(
            props["e"].additional_properties,
            Some(AdditionalProperties::Allowed(false))
        );
        assert_eq!(
            props["f"].additional_properties,
            Some(AdditionalProperties::Allowed(true))
        );
        assert_eq!(props["g"], Schema::nullable(Schema::of(SchemaType::Integer)));
        assert_eq!(props["h"], Schema::of(SchemaType::String));
    }

    #[test]
    fn test_optional_inside_array_is_required_in_parent() {
        let schema = parse("z.object({ tags: z.string().optional().array() })");
        assert_eq!(schema.required, vec!["tags"]);
    }

    #[test]
    fn test_comments_and_strings_with_parens() {
        let schema = parse(
            "// leading comment\nz.object({\n  /* block */ a: z.string().regex(/\\d+/).describe(\"a (paren\"), // trailing\n})",
        );
        assert_eq!(schema.required, vec!["a"]);
    }

    #[test]
    fn test_comments_inside_modifier_arguments() {
        let schema = parse(
            "z.object({\n  a: z.string().describe(/* don't */ \"x\"),\n  b: z.number().default(1 // it's fine\n  ).optional(),\n})",
        );
        assert_eq!(schema.required, vec!["a"]);
        assert_eq!(schema.properties.unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_modifier_warns() {
        let parsed = parse_fluent("z.string().frobnicate(1, [2])").unwrap();
        assert_eq!(parsed.schema, Schema::of(SchemaType::String));
        assert_eq!(parsed.warnings.len(), 1);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            parse_fluent("const x = 1;"),
            Err(SchemaError::Syntax { .. })
        ));
        assert!(matches!(
            parse_fluent("z.object({ a: z.string() "),
            Err(SchemaError::Syntax { .. })
        ));
        assert!(matches!(
            parse_fluent("z.tuple([z.string()])"),
            Err(SchemaError::Syntax { position: 0, .. })
        ));
    }
}
