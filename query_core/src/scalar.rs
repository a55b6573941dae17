//! Scalar literal values
//!
//! Values accepted by comparison operators, with the quoting rules the
//! engine embeds them under: string and date literals are single-quoted
//! (embedded quotes doubled, dates serialized to ISO-8601 millisecond UTC
//! text); numeric comparison literals are quoted as well, but set members
//! stay bare.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// A scalar literal usable on the right-hand side of a condition
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl ScalarValue {
    /// Raw text form, before any quoting
    fn raw(&self) -> String {
        match self {
            ScalarValue::Text(s) => s.replace('\'', "''"),
            ScalarValue::Int(n) => n.to_string(),
            ScalarValue::Float(n) => n.to_string(),
            ScalarValue::Bool(b) => b.to_string(),
            ScalarValue::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::Millis, true),
            ScalarValue::Uuid(id) => id.to_string(),
        }
    }

    /// Quoted literal for comparison operators, e.g. `'roy'` or `'10'`
    pub fn render_quoted(&self) -> String {
        format!("'{}'", self.raw())
    }

    /// Pattern literal for LIKE operators. Affixes are applied inside the
    /// quotes; the insensitive variant lower-cases the whole literal.
    pub fn render_pattern(&self, begins_with: bool, ends_with: bool, insensitive: bool) -> String {
        let mut body = self.raw();
        if ends_with {
            body = format!("%{}", body);
        }
        if begins_with {
            body = format!("{}%", body);
        }
        let literal = format!("'{}'", body);
        if insensitive {
            literal.to_lowercase()
        } else {
            literal
        }
    }

    /// Member rendering inside IN/NOT IN lists: strings quoted, numbers bare
    pub fn render_set_member(&self) -> String {
        match self {
            ScalarValue::Text(_) | ScalarValue::Timestamp(_) | ScalarValue::Uuid(_) => {
                self.render_quoted()
            }
            ScalarValue::Int(_) | ScalarValue::Float(_) | ScalarValue::Bool(_) => self.raw(),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Text(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Int(value as i64)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for ScalarValue {
    fn from(value: DateTime<Utc>) -> Self {
        ScalarValue::Timestamp(value)
    }
}

impl From<Uuid> for ScalarValue {
    fn from(value: Uuid) -> Self {
        ScalarValue::Uuid(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn quoted_literals() {
        assert_eq!(ScalarValue::from("roy").render_quoted(), "'roy'");
        assert_eq!(ScalarValue::from(10).render_quoted(), "'10'");
        assert_eq!(ScalarValue::from(true).render_quoted(), "'true'");
    }

    #[test]
    fn embedded_quotes_doubled() {
        assert_eq!(ScalarValue::from("o'neil").render_quoted(), "'o''neil'");
    }

    #[test]
    fn timestamp_iso_millis() {
        let ts = Utc.with_ymd_and_hms(2020, 11, 15, 0, 0, 0).unwrap();
        assert_eq!(
            ScalarValue::from(ts).render_quoted(),
            "'2020-11-15T00:00:00.000Z'"
        );
    }

    #[test]
    fn pattern_affixes() {
        let value = ScalarValue::from("roy");
        assert_eq!(value.render_pattern(true, true, false), "'%roy%'");
        assert_eq!(value.render_pattern(true, false, false), "'roy%'");
        assert_eq!(value.render_pattern(false, true, false), "'%roy'");
    }

    #[test]
    fn insensitive_pattern_lowercases() {
        let value = ScalarValue::from("RoY");
        assert_eq!(value.render_pattern(true, true, true), "'%roy%'");
    }

    #[test]
    fn set_members() {
        assert_eq!(ScalarValue::from(1).render_set_member(), "1");
        assert_eq!(ScalarValue::from("ABC").render_set_member(), "'ABC'");
    }
}
