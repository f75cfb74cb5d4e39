use std::{borrow::Cow, fmt};

use crate::error::CsvError;

/// A field value handed to a writer.
///
/// Values are turned into text before any quoting decision. Numbers keep
/// their canonical text form in [`Value::Number`] so that the writer can tell
/// them apart from text under [`Quoting::QuoteNonNumeric`].
///
/// [`Quoting::QuoteNonNumeric`]: super::dialect::Quoting::QuoteNonNumeric
///
/// # Examples
///
/// ```
/// use csv_dialect::item::csv::value::Value;
///
/// assert_eq!(Value::from(167.5).as_text(), "167.5");
/// assert_eq!(Value::from(2.0_f64).as_text(), "2.0");
/// assert_eq!(Value::from(42_u8).as_text(), "42");
/// assert_eq!(Value::from(None::<&str>).as_text(), "");
/// assert!(Value::from(-3_i64).is_numeric());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value, written as an empty unquoted field.
    Null,
    Text(String),
    /// Canonical text of a number.
    Number(String),
    Bool(bool),
}

impl Value {
    /// The text written for this value, before quoting.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Text(text) | Value::Number(text) => Cow::Borrowed(text),
            Value::Bool(yes) => Cow::Borrowed(if *yes { "true" } else { "false" }),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Number(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Floats always carry a fractional part so that `2.0` stays distinguishable
/// from the integer `2`.
///
/// Takes the `Display` form of either float width, so an `f32` keeps its own
/// shortest representation.
fn float_text(value: impl fmt::Display, finite: bool) -> String {
    let text = value.to_string();
    if finite && !text.contains('.') {
        format!("{text}.0")
    } else {
        text
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<&String> for Value {
    fn from(text: &String) -> Self {
        Value::Text(text.clone())
    }
}

impl From<Cow<'_, str>> for Value {
    fn from(text: Cow<'_, str>) -> Self {
        Value::Text(text.into_owned())
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Text(c.to_string())
    }
}

impl From<bool> for Value {
    fn from(yes: bool) -> Self {
        Value::Bool(yes)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(float_text(value, value.is_finite()))
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Number(float_text(value, value.is_finite()))
    }
}

macro_rules! integer_values {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::Number(value.to_string())
                }
            }
        )*
    };
}

integer_values!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

impl From<&Option<String>> for Value {
    fn from(value: &Option<String>) -> Self {
        value.as_deref().map_or(Value::Null, Into::into)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = CsvError;

    /// Scalars convert to the matching value; arrays and objects have no
    /// field representation.
    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(yes) => Ok(Value::Bool(yes)),
            serde_json::Value::Number(number) => Ok(match number.as_f64() {
                Some(float) if number.is_f64() => Value::from(float),
                _ => Value::Number(number.to_string()),
            }),
            serde_json::Value::String(text) => Ok(Value::Text(text)),
            nested => Err(CsvError::UnrepresentableValue(format!(
                "nested value {nested} cannot be written as a field"
            ))),
        }
    }
}
