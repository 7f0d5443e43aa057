// Dynamic Value - the runtime-tagged value moved across protocol boundaries

use serde::Serialize;
use serde_json::Value as Json;
use std::fmt;

/// Underlying type of a property, fixed at registration time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Int,
    Float,
    Bool,
    List,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::String => write!(f, "string"),
            ValueKind::Int => write!(f, "int"),
            ValueKind::Float => write!(f, "float"),
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::List => write!(f, "list"),
        }
    }
}

/// Property contents in transit between an exposed object and a protocol
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<DynamicValue>),
}

impl DynamicValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            DynamicValue::String(_) => ValueKind::String,
            DynamicValue::Int(_) => ValueKind::Int,
            DynamicValue::Float(_) => ValueKind::Float,
            DynamicValue::Bool(_) => ValueKind::Bool,
            DynamicValue::List(_) => ValueKind::List,
        }
    }

    /// Coerce into `kind`, or `None` when the contents cannot be represented.
    ///
    /// Text is parsed after trimming, floats round to the nearest integer,
    /// a scalar becomes a one-element list and a one-element list collapses
    /// back into its element.
    pub fn convert(&self, kind: ValueKind) -> Option<DynamicValue> {
        use DynamicValue as V;

        match (self, kind) {
            (V::List(items), ValueKind::List) => Some(V::List(items.clone())),
            (V::List(items), _) => match items.as_slice() {
                [single] => single.convert(kind),
                _ => None,
            },
            // Text in the form `to_text` renders a list in parses back into that list
            (V::String(s), ValueKind::List) => {
                Some(parse_list(s).unwrap_or_else(|| V::List(vec![self.clone()])))
            }
            (scalar, ValueKind::List) => Some(V::List(vec![scalar.clone()])),
            (scalar, ValueKind::String) => Some(V::String(scalar.to_text())),

            (V::String(s), ValueKind::Int) => s.trim().parse::<i64>().ok().map(V::Int),
            (V::String(s), ValueKind::Float) => s.trim().parse::<f64>().ok().map(V::Float),
            (V::String(s), ValueKind::Bool) => parse_bool(s).map(V::Bool),

            (V::Int(i), ValueKind::Int) => Some(V::Int(*i)),
            (V::Int(i), ValueKind::Float) => Some(V::Float(*i as f64)),
            (V::Int(i), ValueKind::Bool) => Some(V::Bool(*i != 0)),

            (V::Float(f), ValueKind::Int) => float_to_int(*f).map(V::Int),
            (V::Float(f), ValueKind::Float) => Some(V::Float(*f)),
            (V::Float(f), ValueKind::Bool) => Some(V::Bool(*f != 0.0)),

            (V::Bool(b), ValueKind::Int) => Some(V::Int(i64::from(*b))),
            (V::Bool(b), ValueKind::Float) => Some(V::Float(if *b { 1.0 } else { 0.0 })),
            (V::Bool(b), ValueKind::Bool) => Some(V::Bool(*b)),
        }
    }

    /// Plain-text rendering used by the REST adapter
    pub fn to_text(&self) -> String {
        match self {
            DynamicValue::String(s) => s.clone(),
            DynamicValue::Int(i) => i.to_string(),
            DynamicValue::Float(f) => f.to_string(),
            DynamicValue::Bool(b) => b.to_string(),
            DynamicValue::List(_) => self.to_json().to_string(),
        }
    }

    /// Map a JSON value; `null` and objects have no Dynamic Value form.
    pub fn from_json(value: &Json) -> Option<DynamicValue> {
        match value {
            Json::Bool(b) => Some(DynamicValue::Bool(*b)),
            Json::Number(n) => n
                .as_i64()
                .map(DynamicValue::Int)
                .or_else(|| n.as_f64().map(DynamicValue::Float)),
            Json::String(s) => Some(DynamicValue::String(s.clone())),
            Json::Array(items) => items
                .iter()
                .map(DynamicValue::from_json)
                .collect::<Option<Vec<_>>>()
                .map(DynamicValue::List),
            Json::Null | Json::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            DynamicValue::String(s) => Json::String(s.clone()),
            DynamicValue::Int(i) => Json::from(*i),
            // JSON has no NaN/Infinity
            DynamicValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            DynamicValue::Bool(b) => Json::Bool(*b),
            DynamicValue::List(items) => Json::Array(items.iter().map(DynamicValue::to_json).collect()),
        }
    }
}

impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<DynamicValue> for Json {
    fn from(value: DynamicValue) -> Self {
        value.to_json()
    }
}

impl From<&str> for DynamicValue {
    fn from(s: &str) -> Self {
        DynamicValue::String(s.to_string())
    }
}

impl From<String> for DynamicValue {
    fn from(s: String) -> Self {
        DynamicValue::String(s)
    }
}

impl From<i64> for DynamicValue {
    fn from(i: i64) -> Self {
        DynamicValue::Int(i)
    }
}

impl From<i32> for DynamicValue {
    fn from(i: i32) -> Self {
        DynamicValue::Int(i64::from(i))
    }
}

impl From<f64> for DynamicValue {
    fn from(f: f64) -> Self {
        DynamicValue::Float(f)
    }
}

impl From<bool> for DynamicValue {
    fn from(b: bool) -> Self {
        DynamicValue::Bool(b)
    }
}

impl From<Vec<DynamicValue>> for DynamicValue {
    fn from(items: Vec<DynamicValue>) -> Self {
        DynamicValue::List(items)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" | "" => Some(false),
        _ => None,
    }
}

fn parse_list(text: &str) -> Option<DynamicValue> {
    match serde_json::from_str::<Json>(text.trim()).ok()? {
        list @ Json::Array(_) => DynamicValue::from_json(&list),
        _ => None,
    }
}

fn float_to_int(f: f64) -> Option<i64> {
    let rounded = f.round();
    // i64::MAX as f64 is 2^63, one past the largest i64
    if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
        Some(rounded as i64)
    } else {
        None
    }
}

/// Rust types usable as the declared type of an exposed property
///
/// `from_value` receives a value already converted to `KIND`.
pub trait PropertyType: Sized + Send + 'static {
    const KIND: ValueKind;

    fn into_value(self) -> DynamicValue;

    fn from_value(value: DynamicValue) -> Option<Self>;
}

impl PropertyType for String {
    const KIND: ValueKind = ValueKind::String;

    fn into_value(self) -> DynamicValue {
        DynamicValue::String(self)
    }

    fn from_value(value: DynamicValue) -> Option<Self> {
        match value {
            DynamicValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl PropertyType for i64 {
    const KIND: ValueKind = ValueKind::Int;

    fn into_value(self) -> DynamicValue {
        DynamicValue::Int(self)
    }

    fn from_value(value: DynamicValue) -> Option<Self> {
        match value {
            DynamicValue::Int(i) => Some(i),
            _ => None,
        }
    }
}

impl PropertyType for i32 {
    const KIND: ValueKind = ValueKind::Int;

    fn into_value(self) -> DynamicValue {
        DynamicValue::Int(i64::from(self))
    }

    fn from_value(value: DynamicValue) -> Option<Self> {
        match value {
            DynamicValue::Int(i) => i32::try_from(i).ok(),
            _ => None,
        }
    }
}

impl PropertyType for u32 {
    const KIND: ValueKind = ValueKind::Int;

    fn into_value(self) -> DynamicValue {
        DynamicValue::Int(i64::from(self))
    }

    fn from_value(value: DynamicValue) -> Option<Self> {
        match value {
            DynamicValue::Int(i) => u32::try_from(i).ok(),
            _ => None,
        }
    }
}

impl PropertyType for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn into_value(self) -> DynamicValue {
        DynamicValue::Float(self)
    }

    fn from_value(value: DynamicValue) -> Option<Self> {
        match value {
            DynamicValue::Float(f) => Some(f),
            _ => None,
        }
    }
}

impl PropertyType for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn into_value(self) -> DynamicValue {
        DynamicValue::Bool(self)
    }

    fn from_value(value: DynamicValue) -> Option<Self> {
        match value {
            DynamicValue::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl PropertyType for Vec<DynamicValue> {
    const KIND: ValueKind = ValueKind::List;

    fn into_value(self) -> DynamicValue {
        DynamicValue::List(self)
    }

    fn from_value(value: DynamicValue) -> Option<Self> {
        match value {
            DynamicValue::List(items) => Some(items),
            _ => None,
        }
    }
}
