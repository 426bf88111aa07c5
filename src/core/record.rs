//! Entity records and their identity.
//!
//! A [`Record`] is the unit both storage backends manage: a class tag, an
//! immutable id, two timestamps, and an attribute bag the store treats as
//! opaque. Records convert to and from the flat attribute mapping used at
//! rest (`to_dict` / `from_dict`) and render a display form for the console.

use crate::core::class_tag::ClassTag;
use crate::error::StorageError;
use chrono::{Local, NaiveDateTime, SubsecRound};
use serde_json::{Map, Value};
use std::fmt::{self, Write};

/// Canonical timestamp format used at rest.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Reserved key carrying the class tag in a serialized record.
pub const CLASS_KEY: &str = "__class__";

/// In-memory name of the write-only secret attribute.
pub const SECRET_ATTR: &str = "_password";

/// Name of the secret attribute at rest.
pub const SECRET_PUBLIC: &str = "password";

/// Keys a caller can never overwrite through the attribute bag.
pub const RESERVED_KEYS: [&str; 4] = ["id", "created_at", "updated_at", CLASS_KEY];

/// Relationship collections that never appear in a serialized record.
const RELATION_KEYS: [&str; 2] = ["amenities", "reviews"];

/// Returns the current local time truncated to the stored precision.
#[must_use]
pub fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(6)
}

/// Formats a timestamp in the canonical format.
#[must_use]
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIME_FORMAT).to_string()
}

/// Parses a timestamp written in the canonical format.
///
/// A space separator and a missing fractional part are also accepted.
///
/// # Errors
///
/// Returns the chrono parse error if neither layout matches.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
}

/// An entity record.
///
/// # Examples
///
/// ```
/// use hbnb_store::core::{ClassTag, Record};
///
/// let mut city = Record::new(ClassTag::City);
/// city.set("name", "Texas");
/// assert!(city.to_string().contains("'name': 'Texas'"));
/// assert_eq!(city.identity_key(), format!("City.{}", city.id));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Entity type.
    pub class: ClassTag,
    /// Unique id, assigned at creation and never changed.
    pub id: String,
    /// Creation time.
    pub created_at: NaiveDateTime,
    /// Time of the last successful save.
    pub updated_at: NaiveDateTime,
    /// Type-specific attributes.
    pub attributes: Map<String, Value>,
}

impl Record {
    /// Creates a record with a fresh UUID and both timestamps set to now.
    #[must_use]
    pub fn new(class: ClassTag) -> Self {
        Self::with_id(class, uuid::Uuid::new_v4().to_string())
    }

    /// Creates a record with a caller-chosen id.
    #[must_use]
    pub fn with_id(class: ClassTag, id: impl Into<String>) -> Self {
        let ts = now();
        Self {
            class,
            id: id.into(),
            created_at: ts,
            updated_at: ts,
            attributes: Map::new(),
        }
    }

    /// Returns the identity key `"<class>.<id>"`.
    #[must_use]
    pub fn identity_key(&self) -> String {
        format!("{}.{}", self.class, self.id)
    }

    /// Refreshes `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = now();
    }

    /// Sets an attribute.
    ///
    /// Reserved keys are ignored and `false` is returned. Setting `password`
    /// stores the secret under its in-memory name.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> bool {
        if RESERVED_KEYS.contains(&key) {
            return false;
        }
        let key = if key == SECRET_PUBLIC { SECRET_ATTR } else { key };
        self.attributes.insert(key.to_string(), value.into());
        true
    }

    /// Stores the write-only secret.
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.attributes
            .insert(SECRET_ATTR.to_string(), Value::String(password.into()));
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Returns an attribute as a string slice, if it is a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Converts the record to a flat attribute mapping.
    ///
    /// Timestamps become canonical text, the class tag is added under
    /// [`CLASS_KEY`], relationship collections are stripped, and the secret
    /// is renamed to its public name. The secret is only included when
    /// `save_to_disk` is true.
    #[must_use]
    pub fn to_dict(&self, save_to_disk: bool) -> Map<String, Value> {
        let mut dict = Map::new();
        dict.insert("id".to_string(), Value::String(self.id.clone()));
        dict.insert(
            "created_at".to_string(),
            Value::String(format_timestamp(&self.created_at)),
        );
        dict.insert(
            "updated_at".to_string(),
            Value::String(format_timestamp(&self.updated_at)),
        );
        for (key, value) in &self.attributes {
            if RELATION_KEYS.contains(&key.as_str()) {
                continue;
            }
            if key == SECRET_ATTR {
                if save_to_disk {
                    dict.insert(SECRET_PUBLIC.to_string(), value.clone());
                }
                continue;
            }
            dict.insert(key.clone(), value.clone());
        }
        dict.insert(
            CLASS_KEY.to_string(),
            Value::String(self.class.as_str().to_string()),
        );
        dict
    }

    /// Rebuilds a record from a mapping produced by `to_dict(true)`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownClass`] for an unrecognized class tag
    /// and [`StorageError::InvalidRecord`] for a missing id or a malformed
    /// timestamp.
    pub fn from_dict(dict: &Map<String, Value>) -> Result<Self, StorageError> {
        let tag = dict
            .get(CLASS_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| StorageError::InvalidRecord {
                key: dict_label(dict),
                reason: format!("missing {CLASS_KEY}"),
            })?;
        let class = tag.parse::<ClassTag>()?;

        let id = dict
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StorageError::InvalidRecord {
                key: dict_label(dict),
                reason: "missing id".to_string(),
            })?;

        let mut record = Self::with_id(class, id);
        for field in ["created_at", "updated_at"] {
            let Some(raw) = dict.get(field) else {
                continue;
            };
            let ts = raw
                .as_str()
                .and_then(|text| parse_timestamp(text).ok())
                .ok_or_else(|| StorageError::InvalidRecord {
                    key: record.identity_key(),
                    reason: format!("bad {field}: {raw}"),
                })?;
            if field == "created_at" {
                record.created_at = ts;
            } else {
                record.updated_at = ts;
            }
        }

        for (key, value) in dict {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let key = if key == SECRET_PUBLIC { SECRET_ATTR } else { key };
            record.attributes.insert(key.to_string(), value.clone());
        }

        Ok(record)
    }
}

fn dict_label(dict: &Map<String, Value>) -> String {
    dict.get("id")
        .and_then(Value::as_str)
        .unwrap_or("<no id>")
        .to_string()
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut body = String::new();
        body.push('{');
        let _ = write!(body, "'id': {}", python_quote(&self.id));
        let _ = write!(body, ", 'created_at': {}", py_datetime(&self.created_at));
        let _ = write!(body, ", 'updated_at': {}", py_datetime(&self.updated_at));
        for (key, value) in &self.attributes {
            if key == SECRET_ATTR {
                continue;
            }
            let _ = write!(body, ", {}: ", python_quote(key));
            py_repr(value, &mut body);
        }
        body.push('}');
        write!(f, "[{}] ({}) {}", self.class, self.id, body)
    }
}

fn py_datetime(ts: &NaiveDateTime) -> String {
    use chrono::{Datelike, Timelike};
    let micros = ts.nanosecond() / 1_000;
    let mut out = format!(
        "datetime.datetime({}, {}, {}, {}, {}",
        ts.year(),
        ts.month(),
        ts.day(),
        ts.hour(),
        ts.minute()
    );
    if ts.second() != 0 || micros != 0 {
        let _ = write!(out, ", {}", ts.second());
    }
    if micros != 0 {
        let _ = write!(out, ", {micros}");
    }
    out.push(')');
    out
}

/// Quotes a string the way Python's `repr` does.
#[must_use]
pub fn python_quote(s: &str) -> String {
    if s.contains('\'') && !s.contains('"') {
        format!("\"{s}\"")
    } else {
        format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

fn py_repr(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 => {
                let _ = write!(out, "{f:.1}");
            }
            _ => {
                let _ = write!(out, "{n}");
            }
        },
        Value::String(s) => out.push_str(&python_quote(s)),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                py_repr(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&python_quote(key));
                out.push_str(": ");
                py_repr(item, out);
            }
            out.push('}');
        }
    }
}
