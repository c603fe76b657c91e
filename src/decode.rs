//! Tolerant decoders for fields whose wire shape varies between endpoints.
//!
//! The helpdesk API is not consistent about how it encodes some fields: a
//! ticket's `status` may be a plain string on one endpoint and a nested
//! `{"id": .., "name": ..}` object on another, and reference ids or counts
//! sometimes arrive quoted. Each such field is decoded in two steps:
//!
//! 1. the raw JSON value is classified into a [`WireShape`], and
//! 2. a normalization function maps every accepted shape to the target type.
//!
//! The `deserialize_with` adapters ([`flexible_string`], [`flexible_int`],
//! [`lenient_string`]) wire this into `serde` derives.
//!
//! [`DecodeOptions`] holds the decode configuration shared by the fetcher
//! and is passed explicitly to the components that need it.

use std::borrow::Cow;

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Prefix of every error message produced by a tolerant decoder.
///
/// [`DeskError::decode`](crate::error::DeskError::decode) looks for it to
/// tell field-level failures apart from whole-document failures.
pub(crate) const MALFORMED_FIELD_MARKER: &str = "malformed field: ";

/// Keys consulted, in order, when an object arrives where a string is expected.
pub const NAME_KEYS: [&str; 3] = ["brandName", "name", "displayName"];

/// Default number of body characters kept in parse error previews.
const DEFAULT_BODY_PREVIEW_LEN: usize = 200;

/// The JSON shapes a single field value can take on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum WireShape {
    /// `null`.
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// Any integer representable as `i64` or `u64`.
    Integer(i128),
    /// A number with a fractional part or exponent.
    Float(f64),
    /// A JSON string.
    Text(String),
    /// A JSON object.
    Object(Map<String, Value>),
    /// A JSON array.
    Array(Vec<Value>),
}

impl From<Value> for WireShape {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => WireShape::Null,
            Value::Bool(b) => WireShape::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    WireShape::Integer(i128::from(i))
                } else if let Some(u) = n.as_u64() {
                    WireShape::Integer(i128::from(u))
                } else {
                    WireShape::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => WireShape::Text(s),
            Value::Object(map) => WireShape::Object(map),
            Value::Array(items) => WireShape::Array(items),
        }
    }
}

impl WireShape {
    /// Normalizes the shape to an optional string.
    ///
    /// Total over every JSON shape:
    ///
    /// - string: as-is
    /// - null: `None`
    /// - boolean: `"true"` / `"false"`
    /// - integer: decimal digits, no grouping
    /// - float: shortest representation that round-trips
    /// - object: the first string-valued key of [`NAME_KEYS`], otherwise the
    ///   object's JSON text
    /// - array: the array's JSON text
    pub fn into_flexible_string(self) -> Option<String> {
        match self {
            WireShape::Null => None,
            WireShape::Bool(b) => Some(b.to_string()),
            WireShape::Integer(i) => Some(i.to_string()),
            WireShape::Float(f) => Some(f.to_string()),
            WireShape::Text(s) => Some(s),
            WireShape::Object(map) => Some(name_or_json_text(map)),
            WireShape::Array(items) => Some(Value::Array(items).to_string()),
        }
    }

    /// Normalizes the shape to an optional integer.
    ///
    /// - integer: itself (error if outside the `i64` range)
    /// - string: the parsed integer, or `None` if it does not parse
    /// - null: `None`
    /// - object: `None` (the field does not apply to this record)
    /// - boolean, float, array: error
    pub fn into_nullable_int(self) -> Result<Option<i64>, String> {
        match self {
            WireShape::Integer(i) => i64::try_from(i)
                .map(Some)
                .map_err(|_| format!("integer {i} does not fit in 64 bits")),
            WireShape::Text(s) => Ok(s.trim().parse::<i64>().ok()),
            WireShape::Null | WireShape::Object(_) => Ok(None),
            WireShape::Bool(b) => Err(format!("expected an integer, found boolean {b}")),
            WireShape::Float(f) => Err(format!("expected an integer, found float {f}")),
            WireShape::Array(_) => Err("expected an integer, found array".to_string()),
        }
    }
}

fn name_or_json_text(map: Map<String, Value>) -> String {
    NAME_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| Value::Object(map).to_string())
}

/// Deserializes a field that may be a string, number, boolean, object or array
/// into `Option<String>`. See [`WireShape::into_flexible_string`].
///
/// Use with `#[serde(default, deserialize_with = "...")]`.
pub fn flexible_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer)
        .map(WireShape::from)
        .map(WireShape::into_flexible_string)
}

/// Like [`flexible_string`], but `null` becomes the empty string.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    flexible_string(deserializer).map(Option::unwrap_or_default)
}

/// Deserializes a field that may be an integer, a numeric string, null or an
/// object into `Option<i64>`. See [`WireShape::into_nullable_int`].
///
/// Use with `#[serde(default, deserialize_with = "...")]`.
pub fn flexible_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let shape = WireShape::from(Value::deserialize(deserializer)?);
    shape
        .into_nullable_int()
        .map_err(|detail| de::Error::custom(format!("{MALFORMED_FIELD_MARKER}{detail}")))
}

/// Deserializes a list of integers, applying [`flexible_int`] to every element
/// and dropping the elements that normalize to `None`.
pub fn flexible_int_list<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        let id = WireShape::from(item)
            .into_nullable_int()
            .map_err(|detail| de::Error::custom(format!("{MALFORMED_FIELD_MARKER}{detail}")))?;
        ids.extend(id);
    }
    Ok(ids)
}

/// Deserializes a list that may be absent or `null`, both giving an empty list.
///
/// Use with `#[serde(default, deserialize_with = "...")]`.
pub fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Decode configuration, constructed once and handed to the fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Rewrite PascalCase object keys to camelCase before typed decoding,
    /// so `TicketId` and `ticketId` decode to the same field.
    pub normalize_key_case: bool,

    /// Maximum number of characters of a body kept in parse error previews.
    pub body_preview_len: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            normalize_key_case: true,
            body_preview_len: DEFAULT_BODY_PREVIEW_LEN,
        }
    }
}

impl DecodeOptions {
    /// Decodes a typed value out of a parsed JSON document.
    pub fn decode<T>(&self, value: Value) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        let value = if self.normalize_key_case {
            normalize_keys(value)
        } else {
            value
        };
        serde_json::from_value(value)
    }

    /// Returns the leading part of `body` used in error previews.
    pub fn preview<'a>(&self, body: &'a str) -> &'a str {
        match body.char_indices().nth(self.body_preview_len) {
            Some((idx, _)) => &body[..idx],
            None => body,
        }
    }
}

/// Rewrites record keys with [`camel_case_key`].
///
/// Records are the document object and objects reached through arrays
/// (`result` items, error `errors`). Object-valued fields are left as sent so
/// [`flexible_string`] renders them verbatim.
fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (camel_case_key(&key).into_owned(), normalize_records(value)))
                .collect(),
        ),
        other => normalize_records(other),
    }
}

fn normalize_records(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// Converts a PascalCase key to camelCase.
///
/// A leading run of capitals is lowered as a unit, keeping the last capital
/// when it starts the next word: `TicketId` → `ticketId`, `ID` → `id`,
/// `URLPath` → `urlPath`. Keys that already start lowercase are untouched.
pub fn camel_case_key(key: &str) -> Cow<'_, str> {
    let upper_run = key.bytes().take_while(u8::is_ascii_uppercase).count();
    if upper_run == 0 {
        return Cow::Borrowed(key);
    }

    let lower_len = if upper_run == key.len() || upper_run == 1 {
        upper_run
    } else if key.as_bytes()[upper_run].is_ascii_lowercase() {
        upper_run - 1
    } else {
        upper_run
    };

    let mut out = key[..lower_len].to_ascii_lowercase();
    out.push_str(&key[lower_len..]);
    Cow::Owned(out)
}
