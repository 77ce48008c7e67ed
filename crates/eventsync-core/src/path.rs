#![forbid(unsafe_code)]

//! Dot-path reads and immutable writes over a [`Value`] tree.
//!
//! A path is a string of `.`-separated segments (`"user.name"`). Segments
//! are opaque: no character is rejected, and the empty path is the single
//! segment `""`. The first segment is the *root key*.
//!
//! # Writes
//!
//! [`write`] never mutates an existing container. Every container along the
//! path is shallow-copied (cloning a `Value` is an `Rc` bump), so the new
//! root shares every untouched subtree with the old one:
//!
//! ```text
//! write(root, "a.b", 2)
//!
//!   root ──► {a, z}            root' ──► {a', z}
//!             │  └─► Z  ◄───────────────────┘
//!             ▼                  │
//!            {b:1, c} ◄─ old     ▼
//!                 └─► C ◄──── {b:2, c}  new a'
//! ```
//!
//! # Failure Modes
//!
//! | Situation                              | Read   | Write                           |
//! |----------------------------------------|--------|---------------------------------|
//! | Missing key                            | `None` | fresh object created            |
//! | Scalar in the spine                    | `None` | scalar replaced by fresh object |
//! | Array addressed by a non-index segment | `None` | array replaced by fresh object  |
//! | Index equal to the array length        | `None` | value appended                  |
//! | Index past the array length            | `None` | array replaced by fresh object  |
//!
//! Only canonical decimal segments (`"0"`, `"17"`, no sign, no leading zero)
//! are array indices; see [`parse_index`]. Anything else, including an
//! index too large for `usize`, is an ordinary key.

use std::rc::Rc;

use crate::value::{Map, Value};

/// Segment separator.
pub const SEPARATOR: char = '.';

/// Default substitute for [`SEPARATOR`] in flat keys.
pub const DEFAULT_KEY_SUBSTITUTE: char = '_';

/// Iterate the segments of a path.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR)
}

/// The first segment of a path.
#[must_use]
pub fn root_key(path: &str) -> &str {
    path.split(SEPARATOR).next().unwrap_or(path)
}

/// Parse `segment` as an array index.
///
/// Accepts ASCII digits without a leading zero (`"0"` itself excepted)
/// that fit in `usize`. `"+1"`, `"01"` and `""` are keys, not indices.
#[must_use]
pub fn parse_index(segment: &str) -> Option<usize> {
    let bytes = segment.as_bytes();
    let canonical = match bytes {
        [] => false,
        [b'0'] => true,
        [b'0', ..] => false,
        _ => bytes.iter().all(u8::is_ascii_digit),
    };
    if canonical { segment.parse().ok() } else { None }
}

/// Whether a write of `segment` into `items` stays an array write.
fn array_slot(items: &[Value], segment: &str) -> Option<usize> {
    parse_index(segment).filter(|&index| index <= items.len())
}

/// Read the value at `path`, or `None` if any segment is missing or not
/// traversable.
#[must_use]
pub fn read<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(tree, |node, segment| node.child(segment))
}

/// Return a new tree with `value` stored at `path`.
///
/// The input tree is left untouched; see the module docs for how
/// non-container segments are handled.
#[must_use]
pub fn write(tree: &Value, path: &str, value: Value) -> Value {
    let segs: Vec<&str> = segments(path).collect();
    write_at(Some(tree), &segs, value)
}

fn write_at(node: Option<&Value>, segs: &[&str], value: Value) -> Value {
    let Some((head, rest)) = segs.split_first() else {
        return value;
    };

    match node {
        Some(Value::Array(items)) => match array_slot(items, head) {
            Some(index) => {
                let mut items = Vec::clone(items);
                let child = write_at(items.get(index), rest, value);
                if index < items.len() {
                    items[index] = child;
                } else {
                    items.push(child);
                }
                Value::Array(Rc::new(items))
            }
            None => fresh_object(head, rest, value),
        },
        Some(Value::Object(map)) => {
            let mut map = Map::clone(map);
            let child = write_at(map.get(*head), rest, value);
            map.insert((*head).to_owned(), child);
            Value::Object(Rc::new(map))
        }
        _ => fresh_object(head, rest, value),
    }
}

fn fresh_object(head: &str, rest: &[&str], value: Value) -> Value {
    let mut map = Map::new();
    map.insert(head.to_owned(), write_at(None, rest, value));
    Value::Object(Rc::new(map))
}

/// Find the spine prefix whose existing value a write to `path` would
/// discard.
///
/// Returns the dotted prefix of the first spine segment that holds a
/// non-null scalar, or an array addressed by a segment that is not an
/// index within or just past its end. Absent
/// and `Null` slots are not reported: nothing is lost by filling them.
/// Diagnostic only; [`write`] behaves the same either way.
#[must_use]
pub fn overwritten_scalar(tree: &Value, path: &str) -> Option<String> {
    let segs: Vec<&str> = segments(path).collect();
    let (last, spine) = segs.split_last()?;

    let mut node = tree;
    for (depth, segment) in spine.iter().enumerate() {
        let next = match node {
            Value::Object(map) => map.get(*segment),
            Value::Array(items) => match array_slot(items, segment) {
                Some(i) => items.get(i),
                None => return Some(spine[..depth].join(".")),
            },
            _ => None,
        }?;
        if !next.is_container() && !next.is_null() {
            return Some(spine[..=depth].join("."));
        }
        node = next;
    }
    if let Value::Array(items) = node
        && array_slot(items, last).is_none()
    {
        return Some(spine.join("."));
    }
    None
}

/// Flatten a path into a single identifier by replacing every separator
/// with `substitute`.
///
/// Not injective: `"a.b"` and `"a_b"` both map to `"a_b"` with the default
/// substitute.
#[must_use]
pub fn key_of(path: &str, substitute: char) -> String {
    path.replace(SEPARATOR, substitute.encode_utf8(&mut [0; 4]))
}

/// Setter name for a flat key: `"set"` followed by the key with its first
/// character upper-cased (`"user_name"` → `"setUser_name"`).
#[must_use]
pub fn setter_key(key: &str) -> String {
    let mut chars = key.chars();
    let mut out = String::with_capacity(key.len() + 3);
    out.push_str("set");
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.push_str(chars.as_str());
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
