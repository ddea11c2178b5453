// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP/IFC Parser using nom
//!
//! Zero-copy tokenization, header parsing and quote-aware record scanning.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{map, map_res, opt, recognize},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::error::{Error, Result};
use crate::schema::IfcType;

/// STEP/IFC Token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Entity reference: #123
    EntityRef(u32),
    /// String literal: 'text' (raw, escapes not yet decoded)
    String(&'a str),
    /// Integer: 42
    Integer(i64),
    /// Float: 3.14
    Float(f64),
    /// Enum: .TRUE., .FALSE., .UNKNOWN.
    Enum(&'a str),
    /// List: (1, 2, 3)
    List(Vec<Token<'a>>),
    /// Typed value: IFCLABEL('x'), IFCMASSMEASURE(66.)
    TypedValue(&'a str, Vec<Token<'a>>),
    /// Null value: $
    Null,
    /// Asterisk (derived value): *
    Derived,
}

/// Parse entity reference: #123
fn entity_ref(input: &str) -> IResult<&str, Token> {
    map(
        preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
        Token::EntityRef,
    )(input)
}

/// Body of a quoted string. A doubled quote is an escaped quote.
fn string_content(input: &str, quote: char) -> IResult<&str, &str> {
    let bytes = input.as_bytes();
    let q = quote as u8;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == q {
            if bytes.get(i + 1) == Some(&q) {
                i += 2;
                continue;
            }
            return Ok((&input[i..], &input[..i]));
        }
        i += 1;
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

/// Parse string literal: 'text' or "text"
fn string_literal(input: &str) -> IResult<&str, Token> {
    alt((
        map(
            delimited(char('\''), |i| string_content(i, '\''), char('\'')),
            Token::String,
        ),
        map(
            delimited(char('"'), |i| string_content(i, '"'), char('"')),
            Token::String,
        ),
    ))(input)
}

/// Parse integer: 42, -42
fn integer(input: &str) -> IResult<&str, Token> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
        s.parse::<i64>().map(Token::Integer)
    })(input)
}

/// Parse float: 3.14, -3.14, 1.5E-10, 0.
fn float(input: &str) -> IResult<&str, Token> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            char('.'),
            opt(digit1),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| s.parse::<f64>().map(Token::Float),
    )(input)
}

/// Parse enum: .T., .LENGTHUNIT., .MILLI.
fn enum_value(input: &str) -> IResult<&str, Token> {
    map(
        delimited(
            char('.'),
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            char('.'),
        ),
        Token::Enum,
    )(input)
}

fn null(input: &str) -> IResult<&str, Token> {
    map(char('$'), |_| Token::Null)(input)
}

fn derived(input: &str) -> IResult<&str, Token> {
    map(char('*'), |_| Token::Derived)(input)
}

/// Comma separated tokens inside parentheses
fn arguments(input: &str) -> IResult<&str, Vec<Token>> {
    delimited(
        char('('),
        separated_list0(delimited(ws, char(','), ws), token),
        preceded(ws, char(')')),
    )(input)
}

/// Parse typed value: IFCLABEL('x'), IFCBOOLEAN(.T.)
fn typed_value(input: &str) -> IResult<&str, Token> {
    map(
        pair(
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            preceded(ws, arguments),
        ),
        |(type_name, args)| Token::TypedValue(type_name, args),
    )(input)
}

/// Skip whitespace
fn ws(input: &str) -> IResult<&str, ()> {
    map(take_while(|c: char| c.is_whitespace()), |_| ())(input)
}

/// Parse a token with optional surrounding whitespace
fn token(input: &str) -> IResult<&str, Token> {
    delimited(
        ws,
        alt((
            float, // before integer, float includes '.'
            integer,
            entity_ref,
            string_literal,
            enum_value,
            list,
            typed_value,
            null,
            derived,
        )),
        ws,
    )(input)
}

/// Parse list: (1, 2, 3) or nested lists
fn list(input: &str) -> IResult<&str, Token> {
    map(arguments, Token::List)(input)
}

/// Parse a complete entity record
/// Example: #123=IFCBEAM('guid',#2,'B-1',$,$,#5,#9,'T1',$);
pub fn parse_entity(input: &str) -> Result<(u32, IfcType, Vec<Token>)> {
    let result: IResult<&str, (u32, &str, Vec<Token>)> = tuple((
        delimited(
            ws,
            preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
            ws,
        ),
        preceded(
            char('='),
            delimited(
                ws,
                take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
                ws,
            ),
        ),
        tuple((arguments, ws, char(';'))),
    ))(input)
    .map(|(rest, (id, type_name, (args, _, _)))| (rest, (id, type_name, args)));

    match result {
        Ok((_, (id, type_str, args))) => {
            let ifc_type = IfcType::from_str(type_str)
                .ok_or_else(|| Error::parse(0, format!("Empty entity type in #{}", id)))?;
            Ok((id, ifc_type, args))
        }
        Err(e) => {
            let preview: String = input.chars().take(80).collect();
            Err(Error::parse(0, format!("Failed to parse entity {:?}: {}", preview, e)))
        }
    }
}

/// STEP file header information
#[derive(Debug, Clone, PartialEq)]
pub struct StepHeader {
    /// First identifier of FILE_SCHEMA, e.g. `IFC4` or `IFC2X3`
    pub schema: String,
    /// Byte offset just past `DATA;`
    pub data_start: usize,
}

/// Validate the ISO 10303-21 envelope and read FILE_SCHEMA.
pub fn parse_header(content: &str) -> Result<StepHeader> {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();
    let lead = content.len() - trimmed.len();
    if !trimmed.starts_with("ISO-10303-21;") {
        return Err(Error::NotStep(
            "missing ISO-10303-21 magic line".to_string(),
        ));
    }

    let header_end = trimmed
        .find("ENDSEC;")
        .ok_or_else(|| Error::NotStep("unterminated HEADER section".to_string()))?;
    let header = &trimmed[..header_end];

    let data_rel = trimmed[header_end..]
        .find("DATA;")
        .ok_or_else(|| Error::NotStep("missing DATA section".to_string()))?;
    let data_start = lead + header_end + data_rel + "DATA;".len();

    let schema = header
        .find("FILE_SCHEMA")
        .and_then(|pos| {
            let after = &header[pos + "FILE_SCHEMA".len()..];
            preceded(ws, arguments)(after).ok()
        })
        .and_then(|(_, args)| first_string(&args).map(str::to_string))
        .unwrap_or_default();

    Ok(StepHeader { schema, data_start })
}

fn first_string<'a>(tokens: &[Token<'a>]) -> Option<&'a str> {
    tokens.iter().find_map(|t| match t {
        Token::String(s) => Some(*s),
        Token::List(inner) => first_string(inner),
        _ => None,
    })
}

/// Byte offset one past the `;` that ends the record containing `from`.
/// Semicolons inside quoted strings are skipped.
pub(crate) fn record_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    loop {
        let at = pos + memchr::memchr2(b';', b'\'', &bytes[pos..])?;
        if bytes[at] == b';' {
            return Some(at + 1);
        }
        // A doubled quote closes and reopens, which needs no special case
        let close = memchr::memchr(b'\'', &bytes[at + 1..])?;
        pos = at + 1 + close + 1;
    }
}

/// Offset of the next `#` outside strings and comments.
pub(crate) fn next_hash(bytes: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    loop {
        let at = pos + memchr::memchr3(b'#', b'\'', b'/', bytes.get(pos..)?)?;
        match bytes[at] {
            b'#' => return Some(at),
            b'\'' => {
                let close = memchr::memchr(b'\'', &bytes[at + 1..])?;
                pos = at + 1 + close + 1;
            }
            _ => {
                if bytes.get(at + 1) == Some(&b'*') {
                    let end = memchr::memmem::find(&bytes[at + 2..], b"*/")?;
                    pos = at + 2 + end + 2;
                } else {
                    pos = at + 1;
                }
            }
        }
    }
}

/// Fast entity scanner - walks `#id=TYPE(...);` records in file order
/// without decoding attributes.
pub struct EntityScanner<'a> {
    content: &'a str,
    position: usize,
}

impl<'a> EntityScanner<'a> {
    /// Create a scanner that starts at a byte offset (e.g. after `DATA;`)
    pub fn from_offset(content: &'a str, offset: usize) -> Self {
        Self {
            content,
            position: offset.min(content.len()),
        }
    }

    /// Scan for the next entity
    /// Returns (entity_id, type_name, record_start, record_end)
    pub fn next_entity(&mut self) -> Option<(u32, &'a str, usize, usize)> {
        let bytes = self.content.as_bytes();

        loop {
            let start = next_hash(bytes, self.position)?;
            let mut pos = start + 1;

            let id_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            let id_end = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }

            if id_end == id_start || bytes.get(pos) != Some(&b'=') {
                self.position = start + 1;
                continue;
            }

            let end = record_end(bytes, pos)?;
            self.position = end;

            let id = match self.content[id_start..id_end].parse::<u32>() {
                Ok(id) => id,
                Err(_) => continue,
            };

            let after_eq = &self.content[pos + 1..end];
            let type_offset = after_eq.len() - after_eq.trim_start().len();
            let type_start = pos + 1 + type_offset;
            let type_end = self.content[type_start..end]
                .find(|c: char| c == '(' || c.is_whitespace())
                .map(|i| type_start + i)
                .unwrap_or(end);

            return Some((id, &self.content[type_start..type_end], start, end));
        }
    }
}
