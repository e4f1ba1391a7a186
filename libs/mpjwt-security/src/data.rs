//! Native representation of claim values.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::claims::ClaimType;

/// A claim value after it has been lifted out of the token's JSON payload.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum ClaimData {
    String(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
    StringSet(BTreeSet<String>),
    List(Vec<ClaimData>),
    Object(BTreeMap<String, ClaimData>),
}

impl ClaimData {
    /// Convert a JSON value, honoring the standard claim type when one is known.
    ///
    /// Returns `None` for JSON `null`, which is treated as an absent claim.
    #[must_use]
    pub fn from_json(value: &Value, hint: Option<ClaimType>) -> Option<Self> {
        match (hint, value) {
            (_, Value::Null) => None,
            (Some(ClaimType::StringSet), Value::String(s)) => {
                Some(Self::StringSet(BTreeSet::from([s.clone()])))
            }
            (Some(ClaimType::StringSet), Value::Array(items))
                if items.iter().all(Value::is_string) =>
            {
                Some(Self::StringSet(
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_owned)
                        .collect(),
                ))
            }
            (_, Value::String(s)) => Some(Self::String(s.clone())),
            (_, Value::Bool(b)) => Some(Self::Boolean(*b)),
            (_, Value::Number(n)) => n
                .as_i64()
                .map(Self::Long)
                .or_else(|| n.as_f64().map(Self::Double)),
            (_, Value::Array(items)) => Some(Self::List(
                items.iter().filter_map(|v| Self::from_json(v, None)).collect(),
            )),
            (_, Value::Object(map)) => Some(Self::Object(
                map.iter()
                    .filter_map(|(k, v)| Self::from_json(v, None).map(|d| (k.clone(), d)))
                    .collect(),
            )),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Long(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&BTreeMap<String, ClaimData>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// View the value as a set of strings.
    ///
    /// Accepts a normalized `StringSet`, a list made only of strings, or a
    /// single string.
    #[must_use]
    pub fn to_string_set(&self) -> Option<BTreeSet<String>> {
        match self {
            Self::StringSet(set) => Some(set.clone()),
            Self::String(s) => Some(BTreeSet::from([s.clone()])),
            Self::List(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_owned))
                .collect(),
            _ => None,
        }
    }

    /// Whether the value is usable where the given standard type is expected.
    #[must_use]
    pub fn conforms_to(&self, ty: ClaimType) -> bool {
        match ty {
            ClaimType::String => matches!(self, Self::String(_)),
            ClaimType::Long => matches!(self, Self::Long(_)),
            ClaimType::Boolean => matches!(self, Self::Boolean(_)),
            ClaimType::StringSet => self.to_string_set().is_some(),
            ClaimType::JsonObject => matches!(self, Self::Object(_)),
        }
    }
}

impl From<&str> for ClaimData {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for ClaimData {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ClaimData {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<bool> for ClaimData {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<BTreeSet<String>> for ClaimData {
    fn from(value: BTreeSet<String>) -> Self {
        Self::StringSet(value)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_audience_string_becomes_set() {
        let data = ClaimData::from_json(&json!("s6BhdRkqt3"), Some(ClaimType::StringSet)).unwrap();
        assert_eq!(
            data,
            ClaimData::StringSet(BTreeSet::from(["s6BhdRkqt3".to_owned()]))
        );
    }

    #[test]
    fn untyped_array_stays_a_list() {
        let data = ClaimData::from_json(&json!(["a", 1]), None).unwrap();
        assert_eq!(
            data,
            ClaimData::List(vec![ClaimData::from("a"), ClaimData::Long(1)])
        );
        assert!(data.to_string_set().is_none());
    }

    #[test]
    fn nulls_are_dropped_recursively() {
        assert!(ClaimData::from_json(&json!(null), None).is_none());

        let data = ClaimData::from_json(&json!({"street": "Main", "unit": null}), None).unwrap();
        let map = data.as_object().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["street"], ClaimData::from("Main"));
    }

    #[test]
    fn numbers_prefer_integers() {
        assert_eq!(
            ClaimData::from_json(&json!(1_311_281_970), None),
            Some(ClaimData::Long(1_311_281_970))
        );
        assert!(matches!(
            ClaimData::from_json(&json!(1.5), None),
            Some(ClaimData::Double(_))
        ));
    }

    #[test]
    fn string_list_conforms_to_string_set() {
        let data = ClaimData::List(vec![ClaimData::from("Echoer"), ClaimData::from("Tester")]);
        assert!(data.conforms_to(ClaimType::StringSet));
        assert!(!data.conforms_to(ClaimType::String));
    }
}
