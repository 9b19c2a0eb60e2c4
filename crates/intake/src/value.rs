//! Field values.
//!
//! Every entry in the form state holds one [`FieldValue`]. The empty value of
//! a field depends on its kind (`""`, `[]` or `false`), and conditional
//! branches use [`FieldValue::is_truthy`] to decide whether they are shown.

use serde_json::{Number, Value as JsonValue};

use crate::schema::FieldKind;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Unset,
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<String>),
}

impl FieldValue {
    /// Empty value for a field of the given kind (`""` if the kind is unknown).
    pub fn empty_for(kind: Option<FieldKind>) -> Self {
        match kind {
            Some(FieldKind::Multiselect) => FieldValue::List(Vec::new()),
            Some(FieldKind::Checkbox) => FieldValue::Bool(false),
            _ => FieldValue::Text(String::new()),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Non-finite numbers have no JSON form and are kept as their text.
    pub fn normalized(self) -> Self {
        match self {
            FieldValue::Number(n) if !n.is_finite() => FieldValue::Text(format_number(n)),
            other => other,
        }
    }

    /// Presence check used for `required` fields.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Unset => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Number(n) => n.is_nan(),
            FieldValue::Bool(b) => !b,
            FieldValue::List(items) => items.is_empty(),
        }
    }

    /// Truthiness used by checkbox branches.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Unset => false,
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Number(n) => *n != 0.0 && !n.is_nan(),
            FieldValue::Bool(b) => *b,
            FieldValue::List(items) => !items.is_empty(),
        }
    }

    /// Scalar string form, used to match select trigger values.
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Unset => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::List(items) => items.join(", "),
        }
    }

    pub fn as_list(&self) -> &[String] {
        match self {
            FieldValue::List(items) => items,
            _ => &[],
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Unset => JsonValue::Null,
            FieldValue::Text(s) => JsonValue::String(s.clone()),
            FieldValue::Number(n) => number_to_json(*n),
            FieldValue::Bool(b) => JsonValue::Bool(*b),
            FieldValue::List(items) => {
                JsonValue::Array(items.iter().cloned().map(JsonValue::String).collect())
            }
        }
    }

    /// Convert a JSON leaf back into a value. Objects are not leaves and yield `None`.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        Some(match value {
            JsonValue::Null => FieldValue::Unset,
            JsonValue::Bool(b) => FieldValue::Bool(*b),
            JsonValue::Number(n) => FieldValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => FieldValue::Text(s.clone()),
            JsonValue::Array(items) => FieldValue::List(
                items
                    .iter()
                    .map(|item| match item {
                        JsonValue::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            JsonValue::Object(_) => return None,
        })
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn number_to_json(n: f64) -> JsonValue {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        JsonValue::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map_or_else(|| JsonValue::String(format_number(n)), JsonValue::Number)
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_follow_kind() {
        assert_eq!(FieldValue::empty_for(Some(FieldKind::Multiselect)), FieldValue::List(vec![]));
        assert_eq!(FieldValue::empty_for(Some(FieldKind::Checkbox)), FieldValue::Bool(false));
        assert_eq!(FieldValue::empty_for(Some(FieldKind::Email)), FieldValue::text(""));
        assert_eq!(FieldValue::empty_for(None), FieldValue::text(""));
    }

    #[test]
    fn truthiness() {
        assert!(!FieldValue::Unset.is_truthy());
        assert!(!FieldValue::Bool(false).is_truthy());
        assert!(FieldValue::Bool(true).is_truthy());
        assert!(!FieldValue::text("").is_truthy());
        assert!(FieldValue::text("x").is_truthy());
        assert!(!FieldValue::Number(0.0).is_truthy());
        assert!(FieldValue::Number(2.5).is_truthy());
        assert!(!FieldValue::List(vec![]).is_truthy());
    }

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(FieldValue::Number(12.0).to_json(), serde_json::json!(12));
        assert_eq!(FieldValue::Number(1.5).to_json(), serde_json::json!(1.5));
        assert_eq!(FieldValue::Number(12.0).as_text(), "12");
    }

    #[test]
    fn non_finite_numbers_keep_their_text() {
        assert_eq!(FieldValue::Number(f64::NAN).to_json(), serde_json::json!("NaN"));
        assert_eq!(FieldValue::Number(f64::INFINITY).to_json(), serde_json::json!("inf"));
        assert_eq!(FieldValue::Number(f64::NEG_INFINITY).normalized(), FieldValue::text("-inf"));
        assert_eq!(FieldValue::Number(2.5).normalized(), FieldValue::Number(2.5));
    }

    #[test]
    fn json_leaves_convert_back() {
        let v = FieldValue::list(["A", "B"]);
        assert_eq!(FieldValue::from_json(&v.to_json()), Some(v));
        assert_eq!(FieldValue::from_json(&serde_json::json!({})), None);
    }
}
