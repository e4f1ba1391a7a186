//! Claim values as structured JSON.

use mpjwt_security::ClaimData;
use serde_json::{Number, Value};

use crate::binding::JsonKind;

/// Convert a claim value into JSON.
///
/// Non-finite doubles have no JSON form and convert to `None`; inside
/// arrays and objects such members are dropped.
#[must_use]
pub fn to_json(data: &ClaimData) -> Option<Value> {
    match data {
        ClaimData::String(s) => Some(Value::String(s.clone())),
        ClaimData::Long(n) => Some(Value::from(*n)),
        ClaimData::Double(n) => Number::from_f64(*n).map(Value::Number),
        ClaimData::Boolean(b) => Some(Value::Bool(*b)),
        ClaimData::StringSet(set) => Some(Value::Array(
            set.iter().cloned().map(Value::String).collect(),
        )),
        ClaimData::List(items) => Some(Value::Array(items.iter().filter_map(to_json).collect())),
        ClaimData::Object(map) => Some(Value::Object(
            map.iter()
                .filter_map(|(k, v)| to_json(v).map(|json| (k.clone(), json)))
                .collect(),
        )),
    }
}

impl JsonKind {
    /// Whether `value` is of this JSON kind.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Value => true,
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}
