use std::borrow::{Borrow, Cow};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::controller::FormResult;

/// Flat field name. Nested payload paths are spelled with dots
/// (`monto.cantidad`) and never split by the form engine.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(Arc<str>);

impl FieldKey {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(Arc::from(value.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FieldKey {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<&FieldKey> for FieldKey {
    fn from(value: &FieldKey) -> Self {
        value.clone()
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum FieldValue {
    #[default]
    Null,
    Text(String),
    Number(Decimal),
    Bool(bool),
}

impl FieldValue {
    /// Mirrors the truthiness a browser form applies to raw input:
    /// null, empty text, zero and `false` are all falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Text(text) => !text.is_empty(),
            FieldValue::Number(number) => !number.is_zero(),
            FieldValue::Bool(flag) => *flag,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.as_text().trim().is_empty()
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Null => Cow::Borrowed(""),
            FieldValue::Text(text) => Cow::Borrowed(text),
            FieldValue::Number(number) => Cow::Owned(number.normalize().to_string()),
            FieldValue::Bool(flag) => Cow::Borrowed(if *flag { "true" } else { "false" }),
        }
    }

    /// Numeric reading of the value. Text is trimmed and accepts plain or
    /// scientific notation; booleans and null are not numbers.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Number(number) => Some(*number),
            FieldValue::Text(text) => parse_decimal(text),
            FieldValue::Null | FieldValue::Bool(_) => None,
        }
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(Decimal::from(value))
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Number(Decimal::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Number(Decimal::from(value))
    }
}

impl<T> From<Option<T>> for FieldValue
where
    T: Into<FieldValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Reads a typed value back out of a [`FieldValue`]. `None` means the
/// stored value has the wrong shape for `Self`.
pub trait FromFieldValue: Sized {
    fn from_field_value(value: &FieldValue) -> Option<Self>;
}

impl FromFieldValue for FieldValue {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromFieldValue for String {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Text(text) => Some(text.clone()),
            FieldValue::Number(_) => Some(value.as_text().into_owned()),
            FieldValue::Null => Some(String::new()),
            FieldValue::Bool(_) => None,
        }
    }
}

impl FromFieldValue for Decimal {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value.as_decimal()
    }
}

impl FromFieldValue for bool {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }
}

impl FromFieldValue for i64 {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        let number = value.as_decimal()?;
        if !number.fract().is_zero() {
            return None;
        }
        number.to_i64()
    }
}

impl<T> FromFieldValue for Option<T>
where
    T: FromFieldValue,
{
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Null => Some(None),
            FieldValue::Text(text) if text.is_empty() => Some(None),
            other => T::from_field_value(other).map(Some),
        }
    }
}

pub type FieldValues = BTreeMap<FieldKey, FieldValue>;

pub fn field_values<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> FieldValues
where
    K: Into<FieldKey>,
    V: Into<FieldValue>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

/// A typed form that flattens into the controller's value map and can be
/// rebuilt from it inside a submit callback. Usually derived.
pub trait FormModel: Sized {
    fn to_values(&self) -> FieldValues;
    fn from_values(values: &FieldValues) -> FormResult<Self>;
}
