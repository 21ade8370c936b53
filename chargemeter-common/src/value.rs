use serde::{Deserialize, Serialize};

/// A value held by a bus attribute.
///
/// Attributes on the bus are loosely typed: the same path may carry a float
/// while the device is reporting and `null` once it stops.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BusValue {
    /// No value (device not reporting, or attribute invalidated).
    #[default]
    Null,

    /// Integer value (states, identifiers, counters).
    Integer(i64),

    /// Floating point measurement.
    Float(f64),

    /// Text value.
    Text(String),

    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl BusValue {
    /// Numeric view of the value. Integers are widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            BusValue::Float(v) => Some(*v),
            BusValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Integer view of the value. Floats with no fractional part are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            BusValue::Integer(v) => Some(*v),
            BusValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    /// Text view of the value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BusValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for BusValue {
    fn from(v: i64) -> Self {
        BusValue::Integer(v)
    }
}

impl From<i32> for BusValue {
    fn from(v: i32) -> Self {
        BusValue::Integer(v as i64)
    }
}

impl From<u8> for BusValue {
    fn from(v: u8) -> Self {
        BusValue::Integer(v as i64)
    }
}

impl From<u32> for BusValue {
    fn from(v: u32) -> Self {
        BusValue::Integer(v as i64)
    }
}

impl From<bool> for BusValue {
    fn from(v: bool) -> Self {
        BusValue::Integer(v as i64)
    }
}

impl From<f64> for BusValue {
    fn from(v: f64) -> Self {
        BusValue::Float(v)
    }
}

impl From<String> for BusValue {
    fn from(v: String) -> Self {
        BusValue::Text(v)
    }
}

impl From<&str> for BusValue {
    fn from(v: &str) -> Self {
        BusValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for BusValue {
    fn from(v: Vec<u8>) -> Self {
        BusValue::Bytes(v)
    }
}

impl<T: Into<BusValue>> From<Option<T>> for BusValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(BusValue::Null)
    }
}

impl std::fmt::Display for BusValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusValue::Null => write!(f, "null"),
            BusValue::Integer(v) => write!(f, "{}", v),
            BusValue::Float(v) => write!(f, "{}", v),
            BusValue::Text(v) => write!(f, "{}", v),
            BusValue::Bytes(v) => write!(f, "{:02x?}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        assert_eq!(BusValue::from(42i64), BusValue::Integer(42));
        assert_eq!(BusValue::from(12.8), BusValue::Float(12.8));
        assert_eq!(BusValue::from("ip22"), BusValue::Text("ip22".to_string()));
        assert_eq!(BusValue::from(true), BusValue::Integer(1));
        assert_eq!(BusValue::from(None::<f64>), BusValue::Null);
        assert_eq!(BusValue::from(Some(3i64)), BusValue::Integer(3));
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(BusValue::Integer(18).as_f64(), Some(18.0));
        assert_eq!(BusValue::Float(3.0).as_i64(), Some(3));
        assert_eq!(BusValue::Float(3.5).as_i64(), None);
        assert_eq!(BusValue::Null.as_f64(), None);
        assert_eq!(BusValue::Text("x".into()).as_f64(), None);
    }

    #[test]
    fn test_null_json_shape() {
        let json = serde_json::to_string(&BusValue::Null).unwrap();
        assert_eq!(json, "null");

        let decoded: BusValue = serde_json::from_str("null").unwrap();
        assert_eq!(decoded, BusValue::Null);

        let decoded: BusValue = serde_json::from_str("-2").unwrap();
        assert_eq!(decoded, BusValue::Integer(-2));

        let decoded: BusValue = serde_json::from_str("14.8").unwrap();
        assert_eq!(decoded, BusValue::Float(14.8));
    }
}
