//! Forgiving deserializers for values that historically came from an untyped
//! parameter store, where every value might arrive as a string.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}
impl Scalar {
    fn into_integer(self) -> i64 {
        match self {
            Self::Bool(b) => i64::from(b),
            Self::Int(n) => n,
            // Truncation towards zero, like any integer cast.
            Self::Float(f) => f as i64,
            Self::Text(s) => leading_integer(&s),
        }
    }

    fn into_boolean(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Int(n) => n != 0,
            Self::Float(f) => f != 0.0,
            Self::Text(s) => !matches!(s.trim().to_ascii_lowercase().as_str(), "" | "0" | "false" | "no" | "off"),
        }
    }

    fn into_strings(self) -> Vec<String> {
        match self {
            Self::Text(s) => s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect(),
            Self::Int(n) => vec![n.to_string()],
            Self::Float(f) => vec![f.to_string()],
            Self::Bool(b) => vec![b.to_string()],
        }
    }
}

/// The optionally signed run of digits a string starts with, ignoring leading
/// whitespace: `"10abc"` is 10, `"abc"` is 0. Out-of-range values saturate.
fn leading_integer(s: &str) -> i64 {
    let s = s.trim_start();
    let unsigned = s.strip_prefix(['-', '+']).unwrap_or(s);
    let digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return 0;
    }
    let negative = s.starts_with('-');
    let number = &s[..s.len() - unsigned.len() + digits];
    number.parse().unwrap_or(if negative { i64::MIN } else { i64::MAX })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Scalar>),
    One(Scalar),
}

/// Any scalar as an integer. Strings use their leading digits (`"10 days"`
/// is 10); strings without any become `0`.
pub(crate) fn integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Scalar::deserialize(deserializer).map(Scalar::into_integer)
}

/// Any scalar as a boolean; `""`, `"0"`, `"false"`, `"no"` and `"off"` are false.
pub(crate) fn boolean<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Scalar::deserialize(deserializer).map(Scalar::into_boolean)
}

/// A list of scalars, a single scalar, or a comma-separated string, as strings.
pub(crate) fn strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(values) => values.into_iter().flat_map(Scalar::into_strings).collect(),
        OneOrMany::One(value) => value.into_strings(),
    })
}
