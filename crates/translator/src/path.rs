//! Path expressions and resolution over JSON value trees

use std::fmt;

use serde_json::Value;

/// One segment of a path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Plain field name
    Field(String),
    /// Positional access written as `[n]`
    Index {
        /// Zero-based position
        position: usize,
        /// Segment as written, used when the node is a mapping
        literal: String,
    },
}

impl PathSegment {
    /// Classify a raw segment
    ///
    /// `[n]` with `n` made only of ASCII digits becomes an index marker;
    /// everything else is a field name.
    pub fn parse(raw: &str) -> Self {
        let position = raw
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<usize>().ok());

        match position {
            Some(position) => Self::Index {
                position,
                literal: raw.to_string(),
            },
            None => Self::Field(raw.to_string()),
        }
    }

    /// Segment text as a mapping key
    pub fn as_key(&self) -> &str {
        match self {
            Self::Field(name) => name,
            Self::Index { literal, .. } => literal,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Parsed, segment-wise address into a value tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    segments: Vec<PathSegment>,
}

impl PathExpression {
    /// Split `raw` on `separator`
    ///
    /// An empty separator falls back to `.`.
    pub fn parse(raw: &str, separator: &str) -> Self {
        let separator = if separator.is_empty() { "." } else { separator };
        Self {
            segments: raw.split(separator).map(PathSegment::parse).collect(),
        }
    }

    /// All segments
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// First segment (always present, `split` yields at least one piece)
    pub fn head(&self) -> &PathSegment {
        &self.segments[0]
    }

    /// Segments after the first one
    pub fn tail(&self) -> &[PathSegment] {
        &self.segments[1..]
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Resolve `path` against `tree`
///
/// Resolution order:
/// - index marker on a sequence: positional access, absent when out of bounds
/// - field on a sequence: first element that is a mapping holding the key wins
/// - any segment on a mapping: direct key lookup
/// - anything else: absent
///
/// An empty path resolves to `tree` itself.
pub fn resolve<'a>(tree: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    let Some((segment, rest)) = path.split_first() else {
        return Some(tree);
    };

    let next = match (tree, segment) {
        (Value::Array(items), PathSegment::Index { position, .. }) => items.get(*position)?,
        (Value::Array(items), PathSegment::Field(name)) => items
            .iter()
            .find_map(|item| item.as_object().and_then(|map| map.get(name)))?,
        (Value::Object(map), segment) => map.get(segment.as_key())?,
        _ => return None,
    };

    if rest.is_empty() {
        Some(next)
    } else {
        resolve(next, rest)
    }
}
