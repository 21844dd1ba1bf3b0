//! normalize
//!
//! Repairs per-layer encoding defects and coerces raw fields to typed
//! values.
//!
//! # Design
//!
//! Each layer declares a schema of [`FieldSpec`]s. For every declared field
//! present in a raw row, the layer's repair rule is applied and the value is
//! converted to its target scalar type. An unparseable field yields a
//! [`MalformedField`]: it is logged and left unset, the row is retained, and
//! the batch is never aborted.

use std::collections::BTreeMap;

use tracing::warn;

use crate::tabular::RawRow;

/// Target scalar type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Boolean,
    /// ISO 8601 timestamps coerced to epoch seconds. Raw epoch values are
    /// accepted as well.
    Timestamp,
    Text,
}

/// Known encoding-repair rule for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    None,
    /// Compensate for UTF-8 text that was decoded as Latin-1 and re-encoded
    /// as UTF-8 by a downstream import step.
    DoubleEncoding,
}

/// Declaration of one field in a layer schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub repair: Repair,
}

impl FieldSpec {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            repair: Repair::None,
        }
    }

    pub const fn damaged_text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            repair: Repair::DoubleEncoding,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Integer,
            repair: Repair::None,
        }
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Boolean,
            repair: Repair::None,
        }
    }

    pub const fn timestamp(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Timestamp,
            repair: Repair::None,
        }
    }
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Boolean(bool),
    /// Epoch seconds.
    Timestamp(i64),
    Text(String),
}

impl FieldValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) | FieldValue::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// A normalized row: declared fields that parsed, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRow {
    fields: BTreeMap<&'static str, FieldValue>,
}

impl NormalizedRow {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn integer(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(FieldValue::as_integer)
    }

    pub fn boolean(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(FieldValue::as_boolean)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    fn insert(&mut self, field: &'static str, value: FieldValue) {
        self.fields.insert(field, value);
    }
}

/// A field-level, non-fatal defect: the field is left unset and the row
/// retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedField {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
}

/// Normalize one raw row against a layer schema.
///
/// Returns the typed row and any field-level defects. Absent and empty
/// fields are simply unset; only present-but-unparseable values are
/// malformed.
pub fn normalize_row(raw: &RawRow, schema: &[FieldSpec]) -> (NormalizedRow, Vec<MalformedField>) {
    let mut row = NormalizedRow::default();
    let mut defects = Vec::new();

    for spec in schema {
        let raw_value = match raw.get(spec.name) {
            Some(value) if !value.is_empty() => value,
            _ => continue,
        };
        let repaired = match spec.repair {
            Repair::None => raw_value.clone(),
            Repair::DoubleEncoding => repair_double_encoding(raw_value),
        };
        match coerce(&repaired, spec.kind) {
            Ok(value) => row.insert(spec.name, value),
            Err(reason) => {
                warn!(field = spec.name, value = %raw_value, %reason, "malformed field");
                defects.push(MalformedField {
                    field: spec.name,
                    value: raw_value.clone(),
                    reason,
                });
            }
        }
    }

    (row, defects)
}

/// Reverse a UTF-8-as-Latin-1 re-encoding.
///
/// Text that went through the damaged import path contains only code points
/// below U+0100 whose byte values form valid UTF-8. If either condition
/// fails the value did not take the damaged path and is returned unchanged.
pub fn repair_double_encoding(value: &str) -> String {
    let mut bytes = Vec::with_capacity(value.len());
    for c in value.chars() {
        let code = c as u32;
        if code > 0xFF {
            return value.to_string();
        }
        bytes.push(code as u8);
    }
    match String::from_utf8(bytes) {
        Ok(repaired) => repaired,
        Err(_) => value.to_string(),
    }
}

fn coerce(value: &str, kind: FieldKind) -> Result<FieldValue, String> {
    match kind {
        FieldKind::Text => Ok(FieldValue::Text(value.to_string())),
        FieldKind::Integer => value
            .parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|e| format!("not an integer: {e}")),
        FieldKind::Boolean => parse_boolean(value)
            .map(FieldValue::Boolean)
            .ok_or_else(|| "not a boolean".to_string()),
        FieldKind::Timestamp => parse_timestamp(value)
            .map(FieldValue::Timestamp)
            .ok_or_else(|| "not an ISO 8601 timestamp or epoch value".to_string()),
    }
}

/// The raw exports spell booleans several ways (`True`, `false`, `1`).
fn parse_boolean(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_timestamp(value: &str) -> Option<i64> {
    if let Ok(epoch) = value.parse::<i64>() {
        return Some(epoch);
    }
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &[FieldSpec] = &[
        FieldSpec::integer("id"),
        FieldSpec::text("owner"),
        FieldSpec::damaged_text("name"),
        FieldSpec::boolean("has_gradle_files"),
        FieldSpec::timestamp("created_at"),
    ];

    fn raw(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn coerces_declared_fields() {
        let (row, defects) = normalize_row(
            &raw(&[
                ("id", "42"),
                ("owner", "alice"),
                ("has_gradle_files", "True"),
                ("created_at", "2015-03-01T10:00:00Z"),
            ]),
            SCHEMA,
        );
        assert!(defects.is_empty());
        assert_eq!(row.integer("id"), Some(42));
        assert_eq!(row.text("owner"), Some("alice"));
        assert_eq!(row.boolean("has_gradle_files"), Some(true));
        assert_eq!(row.integer("created_at"), Some(1425204000));
    }

    #[test]
    fn epoch_timestamps_pass_through() {
        let (row, defects) = normalize_row(&raw(&[("created_at", "1425204000")]), SCHEMA);
        assert!(defects.is_empty());
        assert_eq!(row.integer("created_at"), Some(1425204000));
    }

    #[test]
    fn malformed_field_is_unset_and_row_retained() {
        let (row, defects) = normalize_row(&raw(&[("id", "not-a-number"), ("owner", "bob")]), SCHEMA);
        assert_eq!(defects.len(), 1);
        assert_eq!(defects[0].field, "id");
        assert_eq!(row.integer("id"), None);
        // The rest of the row survives.
        assert_eq!(row.text("owner"), Some("bob"));
    }

    #[test]
    fn undeclared_fields_are_ignored() {
        let (row, defects) = normalize_row(&raw(&[("unknown", "x"), ("id", "1")]), SCHEMA);
        assert!(defects.is_empty());
        assert_eq!(row.get("unknown"), None);
        assert_eq!(row.integer("id"), Some(1));
    }

    #[test]
    fn double_encoding_repair_restores_text() {
        // "héllo" encoded as UTF-8 then mis-decoded as Latin-1: "hÃ©llo"
        let (row, _) = normalize_row(&raw(&[("name", "h\u{c3}\u{a9}llo")]), SCHEMA);
        assert_eq!(row.text("name"), Some("héllo"));
    }

    #[test]
    fn repair_leaves_clean_ascii_untouched() {
        assert_eq!(repair_double_encoding("plain-name"), "plain-name");
    }

    #[test]
    fn repair_leaves_genuine_unicode_untouched() {
        // Contains a code point above U+00FF, so it cannot be mojibake.
        assert_eq!(repair_double_encoding("日本語"), "日本語");
    }

    #[test]
    fn repair_leaves_invalid_byte_sequences_untouched() {
        // Latin-1 text that does not decode as UTF-8 stays as-is.
        assert_eq!(repair_double_encoding("caf\u{e9}"), "caf\u{e9}");
    }
}
