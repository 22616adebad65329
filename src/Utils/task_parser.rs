/// parse configuration documents with structure like " layout key1: value1, value2 key2: value2 logging key3: value3"
/// which have section titles and pairs key-vector of values, e.g.
/// ```text
/// // layout constraints
/// layout
///   min_font_size: 8
///   max_font_size: 128
///   depth_shrink: 0.6666667
/// logging
///   level: info
///   log_dir: logs
/// ```
/// Readers look values up by section and key; a missing section or key reads as `None`.
use crate::formula::errors::FormulaError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, multispace0, space0},
    combinator::{map, map_res, recognize},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, separated_pair, terminated},
};
use std::collections::HashMap;
use std::fmt::Display;

pub type SectionMap = HashMap<String, Vec<Value>>;
pub type DocumentMap = HashMap<String, SectionMap>;

/// enum to represent different value types:
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    /// numeric value; integers are widened so `8` and `8.0` read the same
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Float(val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Boolean(val) => write!(f, "{}", val),
        }
    }
}

/// identifier: a letter or underscore followed by word characters
fn identifier(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    let mut parser = map(parser, String::from);
    parser.parse(input)
}

/// Parses a section title, dropping the whitespace that follows it
pub(crate) fn parse_title(input: &str) -> IResult<&str, String> {
    let (input, result) = identifier(input)?;
    Ok((input.trim(), result))
}

pub(crate) fn parse_key(input: &str) -> IResult<&str, String> {
    identifier(input)
}

/// Parses a single value - everything up to a comma, whitespace, newline or semicolon
pub(crate) fn parse_value(input: &str) -> IResult<&str, Value> {
    let value_parser = take_while1(|c: char| !matches!(c, ',' | ' ' | '\t' | '\n' | '\r' | ';'));
    let mut value_parser = map_res(value_parser, |s: &str| -> Result<Value, String> {
        let s = s.trim();
        // most specific type first
        if let Ok(val) = s.parse::<i64>() {
            Ok(Value::Integer(val))
        } else if let Ok(val) = s.parse::<f64>() {
            Ok(Value::Float(val))
        } else if let Ok(val) = s.parse::<bool>() {
            Ok(Value::Boolean(val))
        } else {
            Ok(Value::String(s.to_string()))
        }
    });
    value_parser.parse(input)
}

pub(crate) fn parse_value_list(input: &str) -> IResult<&str, Vec<Value>> {
    let (input, _) = multispace0(input)?;
    let separator_coma = delimited(space0, tag(","), space0);
    let mut value_parser = separated_list0(separator_coma, parse_value);
    value_parser.parse(input)
}

/// Parses `key: value1, value2`
pub(crate) fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let colon_separator = delimited(space0, tag(":"), space0);
    let mut parser = separated_pair(parse_key, colon_separator, parse_value_list);
    let (input, result) = parser.parse(input)?;
    Ok((input.trim(), result))
}

/// Parses a section: a title followed by one or more key-value pairs
pub(crate) fn parse_section(input: &str) -> IResult<&str, (String, SectionMap)> {
    let (input, _) = space0(input)?;
    let (input, title) = parse_title(input)?;
    let (input, _) = multispace0(input)?;
    let mut parser = many1(terminated(parse_key_value_pair, space0));
    let (input, pairs) = parser.parse(input)?;
    Ok((input, (title, pairs.into_iter().collect())))
}

/// Filters out comment lines (starting with //, #, %, or ;) and blank lines
pub fn filter_comments(input: &str) -> String {
    input
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("//")
                && !trimmed.starts_with('#')
                && !trimmed.starts_with('%')
                && !trimmed.starts_with(';')
                && !trimmed.is_empty()
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Parses comment-free text into a map of sections
pub(crate) fn parse_document(input: &str) -> IResult<&str, DocumentMap> {
    let mut parser = many1(delimited(space0, parse_section, multispace0));
    let (input, sections) = parser.parse(input)?;
    Ok((input, sections.into_iter().collect()))
}

/// Parses a whole configuration document; comment lines are dropped first.
pub fn parse_config_document(input: &str) -> Result<DocumentMap, FormulaError> {
    let filtered = filter_comments(input);
    let (remaining, parsed) = parse_document(&filtered)
        .map_err(|e| FormulaError::Config(format!("parsing error: {:?}", e)))?;
    if !remaining.trim().is_empty() {
        return Err(FormulaError::Config(format!(
            "failed to parse entire document, remaining: '{}'",
            remaining
        )));
    }
    Ok(parsed)
}

fn first_value<'a>(document: &'a DocumentMap, section: &str, key: &str) -> Option<&'a Value> {
    document.get(section).and_then(|s| s.get(key)).and_then(|values| values.first())
}

/// First value stored under `section.key` as a float.
///
/// `Ok(None)` when the section or the key is missing; a present but non-numeric value
/// is an error.
pub fn get_f64(document: &DocumentMap, section: &str, key: &str) -> Result<Option<f64>, FormulaError> {
    let Some(value) = first_value(document, section, key) else {
        return Ok(None);
    };
    value.as_float().map(Some).ok_or_else(|| {
        FormulaError::Config(format!("{}.{}: '{}' is not a number", section, key, value))
    })
}

/// First value stored under `section.key` as a string.
pub fn get_string(document: &DocumentMap, section: &str, key: &str) -> Option<String> {
    first_value(document, section, key).map(|value| value.to_string())
}

/////////////////////////////TESTS////////////////////////////////////////////////////
