//! A small JSON path dialect for response assertions.
//!
//! Supported syntax:
//!
//! | Form            | Meaning                                  |
//! |-----------------|------------------------------------------|
//! | `$`             | the document root (optional prefix)      |
//! | `.name`         | object member                            |
//! | `['name']`      | object member, any characters but quotes |
//! | `[2]`, `[-1]`   | array element; negative counts from end  |
//!
//! A path may also start with a bare member name (`data.items[0]`).
//! Wildcards, filters and slices are not supported.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::ClauseError;

/// One step of a [`JsonPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object member by name.
    Key(String),
    /// Array element; negative indices count from the end.
    Index(i64),
}

/// A parsed JSON path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    source: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    /// Parse a path.
    pub fn parse(path: &str) -> Result<Self, ClauseError> {
        let invalid = |reason: String| ClauseError::InvalidJsonPath {
            path: path.to_string(),
            reason,
        };

        let chars: Vec<char> = path.trim().chars().collect();
        if chars.is_empty() {
            return Err(invalid("path is empty".into()));
        }

        let mut segments = Vec::new();
        let mut i = 0;
        if chars[0] == '$' {
            i = 1;
        } else if chars[0] != '[' {
            let name = take_name(&chars, &mut i);
            if name.is_empty() {
                return Err(invalid("path must start with '$', '[' or a member name".into()));
            }
            segments.push(Segment::Key(name));
        }

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    i += 1;
                    let name = take_name(&chars, &mut i);
                    if name.is_empty() {
                        return Err(invalid(format!("empty member name at offset {i}")));
                    }
                    segments.push(Segment::Key(name));
                }
                '[' => {
                    i += 1;
                    segments.push(take_bracket(&chars, &mut i).map_err(invalid)?);
                }
                c => {
                    return Err(invalid(format!("unexpected '{c}' at offset {i}")));
                }
            }
        }

        Ok(Self {
            source: path.to_string(),
            segments,
        })
    }

    /// The path as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The parsed steps.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Follow the path from `root`.
    #[must_use]
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |value, segment| match segment {
                Segment::Key(key) => value.as_object()?.get(key),
                Segment::Index(index) => {
                    let items = value.as_array()?;
                    let position = if *index < 0 {
                        let back = usize::try_from(index.unsigned_abs()).ok()?;
                        items.len().checked_sub(back)?
                    } else {
                        usize::try_from(*index).ok()?
                    };
                    items.get(position)
                }
            })
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for JsonPath {
    type Err = ClauseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn take_name(chars: &[char], i: &mut usize) -> String {
    let start = *i;
    while *i < chars.len() && !matches!(chars[*i], '.' | '[' | ']') {
        *i += 1;
    }
    chars[start..*i].iter().collect()
}

/// Parse the inside of `[...]`, with `i` just past the opening bracket.
fn take_bracket(chars: &[char], i: &mut usize) -> Result<Segment, String> {
    if let Some(&quote) = chars.get(*i)
        && (quote == '\'' || quote == '"')
    {
        *i += 1;
        let start = *i;
        while *i < chars.len() && chars[*i] != quote {
            *i += 1;
        }
        if *i >= chars.len() {
            return Err("unterminated quoted member name".into());
        }
        let name: String = chars[start..*i].iter().collect();
        *i += 1;
        if chars.get(*i) != Some(&']') {
            return Err(format!("expected ']' at offset {}", *i));
        }
        *i += 1;
        return Ok(Segment::Key(name));
    }

    let start = *i;
    while *i < chars.len() && chars[*i] != ']' {
        *i += 1;
    }
    if *i >= chars.len() {
        return Err("unclosed '['".into());
    }
    let raw: String = chars[start..*i].iter().collect();
    *i += 1;
    raw.trim()
        .parse::<i64>()
        .map(Segment::Index)
        .map_err(|_| format!("invalid index '{raw}'"))
}

/// Compare two JSON values, treating numbers by value (`1 == 1.0`).
#[must_use]
#[allow(clippy::float_cmp)]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, x)| y.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "data": {
                "items": [{"id": 1}, {"id": 2}, {"id": 3}],
                "odd key": true
            },
            "ok": true
        })
    }

    #[test]
    fn parse_segments() {
        let path = JsonPath::parse("$.data.items[-1]['id']").unwrap();
        assert_eq!(
            path.segments(),
            [
                Segment::Key("data".into()),
                Segment::Key("items".into()),
                Segment::Index(-1),
                Segment::Key("id".into()),
            ]
        );
        assert_eq!(path.to_string(), "$.data.items[-1]['id']");
    }

    #[test]
    fn resolve_members_and_indices() {
        let doc = doc();
        let get = |p: &str| JsonPath::parse(p).unwrap().resolve(&doc).cloned();

        assert_eq!(get("$.ok"), Some(json!(true)));
        assert_eq!(get("data.items[0].id"), Some(json!(1)));
        assert_eq!(get("$.data.items[-1].id"), Some(json!(3)));
        assert_eq!(get(r#"$.data["odd key"]"#), Some(json!(true)));
        assert_eq!(get("$"), Some(doc.clone()));
    }

    #[test]
    fn missing_targets_resolve_to_none() {
        let doc = doc();
        for path in ["$.nope", "$.data.items[3]", "$.data.items[-4]", "$.ok.deeper", "$[0]"] {
            assert!(
                JsonPath::parse(path).unwrap().resolve(&doc).is_none(),
                "{path} should not resolve"
            );
        }
    }

    #[test]
    fn malformed_paths_are_rejected() {
        for path in ["", "$.", "$..a", "$.a[", "$.a[x]", "$['a'", "$.a]", "$['a'x]"] {
            assert!(
                matches!(
                    JsonPath::parse(path),
                    Err(ClauseError::InvalidJsonPath { .. })
                ),
                "{path:?} should be rejected"
            );
        }
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(values_equal(&json!({"a": [1, 2.0]}), &json!({"a": [1.0, 2]})));
        assert!(!values_equal(&json!(1), &json!("1")));
        assert!(!values_equal(&json!([1]), &json!([1, 2])));
    }
}
