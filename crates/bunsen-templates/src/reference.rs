//! Reference expressions
//!
//! Grammar:
//!
//! ```text
//! reference := anchor? path?
//! anchor    := "./" | ("../")+
//! path      := (index | key) (index | "." index | "." key)*
//! index     := "[" digits "]"
//! key       := [^.\[\]]+
//! ```
//!
//! Relative references are resolved from the object that owns the start path:
//! the parent of the start path when it ends in a property name, the start
//! path itself when it ends in an array index (it then designates an item).
//! `./` stays on that object, each `../` climbs one segment.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{char, digit1},
    combinator::{all_consuming, map, map_res, opt},
    multi::{many0, many1},
    sequence::{delimited, pair, preceded},
    IResult,
};
use serde_json::Value;

use crate::error::TemplateError;

// ============================================================================
// Types
// ============================================================================

/// One step of a value path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    /// Segment text as used in a dotted bunsen id
    pub fn as_id_part(&self) -> String {
        match self {
            PathSegment::Key(key) => key.clone(),
            PathSegment::Index(index) => index.to_string(),
        }
    }
}

/// Where a reference starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// No prefix: resolved against the root of the value tree
    Root,
    /// `./`: resolved against the object owning the start path
    Current,
    /// `../` repeated n times
    Up(usize),
}

/// A parsed reference expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub anchor: Anchor,
    pub segments: Vec<PathSegment>,
}

impl Reference {
    /// Parse a reference expression such as `../[0].foo`
    pub fn parse(expr: &str) -> Result<Self, TemplateError> {
        match all_consuming(reference)(expr.trim()) {
            Ok((_, parsed)) => Ok(parsed),
            Err(e) => Err(TemplateError::InvalidReference {
                expr: expr.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn is_relative(&self) -> bool {
        self.anchor != Anchor::Root
    }

    /// Absolute segments this reference designates when evaluated from `start_path`
    ///
    /// Returns `None` when the reference climbs above the root.
    pub fn absolute_segments(&self, start_path: Option<&str>) -> Option<Vec<PathSegment>> {
        let mut base = match self.anchor {
            Anchor::Root => Vec::new(),
            Anchor::Current | Anchor::Up(_) => {
                let start = match start_path {
                    Some(path) if !path.is_empty() => parse_path(path).ok()?,
                    _ => Vec::new(),
                };
                owning_object(start)
            }
        };

        if let Anchor::Up(levels) = self.anchor {
            if levels > base.len() {
                return None;
            }
            base.truncate(base.len() - levels);
        }

        base.extend(self.segments.iter().cloned());
        Some(base)
    }
}

/// The object a start path belongs to
fn owning_object(mut start: Vec<PathSegment>) -> Vec<PathSegment> {
    match start.last() {
        Some(PathSegment::Key(_)) => {
            start.pop();
            start
        }
        _ => start,
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Parse a dotted/bracketed path such as `fizz.futz[0].foo` or `a.b.[1].c`
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, TemplateError> {
    match all_consuming(path_segments)(path) {
        Ok((_, segments)) => Ok(segments),
        Err(e) => Err(TemplateError::InvalidReference {
            expr: path.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Render segments as a dotted bunsen id (`a.b.1.c`)
pub fn format_path(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(PathSegment::as_id_part)
        .collect::<Vec<_>>()
        .join(".")
}

/// Walk `segments` from `root`
///
/// Keys that are pure digits index arrays and indices look up numeric keys on
/// objects, mirroring how dotted paths address values elsewhere in the engine.
pub fn lookup<'a>(root: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
            (PathSegment::Key(key), Value::Array(items)) => items.get(key.parse::<usize>().ok()?)?,
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
            (PathSegment::Index(index), Value::Object(map)) => map.get(&index.to_string())?,
            _ => return None,
        };
    }
    Some(current)
}

/// Resolve a reference expression against `root`
///
/// Missing segments and malformed expressions both yield `None`.
pub fn find_value<'a>(root: &'a Value, expr: &str, start_path: Option<&str>) -> Option<&'a Value> {
    let reference = match Reference::parse(expr) {
        Ok(reference) => reference,
        Err(e) => {
            tracing::debug!("unresolvable reference: {}", e);
            return None;
        }
    };

    let segments = reference.absolute_segments(start_path)?;
    lookup(root, &segments)
}

// ============================================================================
// Internal Parsers
// ============================================================================

fn index(input: &str) -> IResult<&str, PathSegment> {
    map(
        delimited(char('['), map_res(digit1, |s: &str| s.parse::<usize>()), char(']')),
        PathSegment::Index,
    )(input)
}

fn key(input: &str) -> IResult<&str, PathSegment> {
    map(is_not(".[]"), |s: &str| PathSegment::Key(s.to_string()))(input)
}

fn step(input: &str) -> IResult<&str, PathSegment> {
    alt((index, preceded(char('.'), alt((index, key)))))(input)
}

fn path_segments(input: &str) -> IResult<&str, Vec<PathSegment>> {
    map(pair(alt((index, key)), many0(step)), |(first, rest)| {
        let mut segments = Vec::with_capacity(rest.len() + 1);
        segments.push(first);
        segments.extend(rest);
        segments
    })(input)
}

fn anchor(input: &str) -> IResult<&str, Anchor> {
    alt((
        map(many1(tag("../")), |ups: Vec<&str>| Anchor::Up(ups.len())),
        map(tag("./"), |_| Anchor::Current),
    ))(input)
}

fn reference(input: &str) -> IResult<&str, Reference> {
    map(pair(opt(anchor), opt(path_segments)), |(anchor, segments)| {
        Reference {
            anchor: anchor.unwrap_or(Anchor::Root),
            segments: segments.unwrap_or_default(),
        }
    })(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn obj_to_mine() -> Value {
        json!({
            "foo": "bar",
            "fizz": {
                "foo": "bar",
                "futz": [
                    {"foo": "bar"},
                    {"fizz": "buzz", "farz": "barz"}
                ],
                "fatz": "batz"
            }
        })
    }

    #[test]
    fn test_parse_path_mixed_notation() {
        assert_eq!(
            parse_path("fizz.futz[0].foo").unwrap(),
            vec![
                PathSegment::Key("fizz".into()),
                PathSegment::Key("futz".into()),
                PathSegment::Index(0),
                PathSegment::Key("foo".into()),
            ]
        );
        assert_eq!(parse_path("a.b.[1].c").unwrap(), parse_path("a.b[1].c").unwrap());
        assert_eq!(
            parse_path("[1].fizz").unwrap(),
            vec![PathSegment::Index(1), PathSegment::Key("fizz".into())]
        );
    }

    #[test]
    fn test_parse_path_rejects_malformed_input() {
        assert!(parse_path("").is_err());
        assert!(parse_path("foo..bar").is_err());
        assert!(parse_path("foo[x]").is_err());
        assert!(parse_path("foo.").is_err());
    }

    #[test]
    fn test_parse_reference_anchors() {
        assert_eq!(Reference::parse("foo").unwrap().anchor, Anchor::Root);
        assert_eq!(Reference::parse("./foo").unwrap().anchor, Anchor::Current);
        assert_eq!(Reference::parse("../../foo").unwrap().anchor, Anchor::Up(2));
        assert!(Reference::parse("../").unwrap().segments.is_empty());
    }

    #[test]
    fn test_find_absolute_paths() {
        let value = obj_to_mine();
        assert_eq!(find_value(&value, "fizz.futz.[0].foo", None), Some(&json!("bar")));
        assert_eq!(find_value(&value, "fizz.futz[1].farz", None), Some(&json!("barz")));
    }

    #[test]
    fn test_find_parent_paths() {
        let value = obj_to_mine();
        let start = Some("fizz.futz.[1].fizz");
        assert_eq!(find_value(&value, "../../fatz", start), Some(&json!("batz")));
        assert_eq!(find_value(&value, "../[0].foo", start), Some(&json!("bar")));
    }

    #[test]
    fn test_find_sibling_paths() {
        let value = obj_to_mine();
        assert_eq!(
            find_value(&value, "./farz", Some("fizz.futz.[1].fizz")),
            Some(&json!("barz"))
        );
    }

    #[test]
    fn test_start_path_ending_in_index_designates_item() {
        let value = json!({"a": {"b": [{"c": 1}, {"c": 2}]}});
        assert_eq!(find_value(&value, "a.b.[1].c", None), Some(&json!(2)));
        assert_eq!(find_value(&value, "../[0].c", Some("a.b.[1]")), Some(&json!(1)));
        assert_eq!(find_value(&value, "./c", Some("a.b.[1]")), Some(&json!(2)));
    }

    #[test]
    fn test_missing_segments_yield_none() {
        let value = obj_to_mine();
        assert_eq!(find_value(&value, "fizz.nope.deeper", None), None);
        assert_eq!(find_value(&value, "fizz.futz.[9]", None), None);
        assert_eq!(find_value(&value, "../../../../foo", Some("fizz.foo")), None);
        assert_eq!(find_value(&value, "foo[", None), None);
    }

    #[test]
    fn test_numeric_keys_index_arrays() {
        let value = obj_to_mine();
        assert_eq!(find_value(&value, "fizz.futz.1.fizz", None), Some(&json!("buzz")));
    }

    #[test]
    fn test_format_path() {
        let segments = parse_path("a.b[1].c").unwrap();
        assert_eq!(format_path(&segments), "a.b.1.c");
    }
}
