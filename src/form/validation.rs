use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::i18n::I18nManager;

use super::value::{FieldKey, FieldValue};

/// The built-in rule a [`FieldError`] was produced by. Also names the
/// message group in the locale catalog.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Rule {
    Username,
    Password,
    PasswordConfirm,
    Email,
    Amount,
    Description,
    Category,
    PaymentMethod,
    Period,
}

impl Rule {
    pub const fn catalog_group(self) -> &'static str {
        match self {
            Rule::Username => "username",
            Rule::Password => "password",
            Rule::PasswordConfirm => "password_confirm",
            Rule::Email => "email",
            Rule::Amount => "amount",
            Rule::Description => "description",
            Rule::Category => "category",
            Rule::PaymentMethod => "payment_method",
            Rule::Period => "period",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldError {
    Required(Rule),
    TooShort { rule: Rule, min: usize },
    TooLong { rule: Rule, max: usize },
    Malformed(Rule),
    NotPositive(Rule),
    TooLarge(Rule),
    Mismatch(Rule),
    Custom(String),
}

impl FieldError {
    pub fn custom(message: impl Into<String>) -> Self {
        FieldError::Custom(message.into())
    }

    pub fn rule(&self) -> Option<Rule> {
        match self {
            FieldError::Required(rule)
            | FieldError::TooShort { rule, .. }
            | FieldError::TooLong { rule, .. }
            | FieldError::Malformed(rule)
            | FieldError::NotPositive(rule)
            | FieldError::TooLarge(rule)
            | FieldError::Mismatch(rule) => Some(*rule),
            FieldError::Custom(_) => None,
        }
    }

    pub fn catalog_key(&self) -> Option<String> {
        let kind = match self {
            FieldError::Required(_) => "required",
            FieldError::TooShort { .. } => "too_short",
            FieldError::TooLong { .. } => "too_long",
            FieldError::Malformed(_) => "malformed",
            FieldError::NotPositive(_) => "not_positive",
            FieldError::TooLarge(_) => "too_large",
            FieldError::Mismatch(_) => "mismatch",
            FieldError::Custom(_) => return None,
        };
        let rule = self.rule()?;
        Some(format!("validation.{}.{kind}", rule.catalog_group()))
    }

    pub fn message(&self, i18n: &I18nManager) -> String {
        let Some(key) = self.catalog_key() else {
            return match self {
                FieldError::Custom(message) => message.clone(),
                _ => String::new(),
            };
        };
        match self {
            FieldError::TooShort { min, .. } => i18n.t_with(&key, &[("min", &min.to_string())]),
            FieldError::TooLong { max, .. } => i18n.t_with(&key, &[("max", &max.to_string())]),
            _ => i18n.t(&key),
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message(&I18nManager::fallback()))
    }
}

impl std::error::Error for FieldError {}

/// `Ok` when the value passes, otherwise the reason it does not.
pub type ValidationResult = Result<(), FieldError>;

/// A pure, total check over a single field value. Implemented for any
/// `Fn(&FieldValue) -> ValidationResult`.
pub trait FieldValidator: Send + Sync {
    fn validate(&self, value: &FieldValue) -> ValidationResult;
}

impl<F> FieldValidator for F
where
    F: Fn(&FieldValue) -> ValidationResult + Send + Sync,
{
    fn validate(&self, value: &FieldValue) -> ValidationResult {
        (self)(value)
    }
}

pub(super) type FieldValidatorFn = Arc<dyn FieldValidator>;

/// Field name to validator. Fields without an entry are always valid.
#[derive(Clone, Default)]
pub struct ValidationRegistry {
    validators: BTreeMap<FieldKey, FieldValidatorFn>,
}

impl ValidationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<V>(mut self, key: impl Into<FieldKey>, validator: V) -> Self
    where
        V: FieldValidator + 'static,
    {
        self.insert(key, validator);
        self
    }

    pub fn insert<V>(&mut self, key: impl Into<FieldKey>, validator: V)
    where
        V: FieldValidator + 'static,
    {
        self.validators.insert(key.into(), Arc::new(validator));
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.validators.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.validators.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.validators.keys()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn validate(&self, key: &str, value: &FieldValue) -> ValidationResult {
        match self.validators.get(key) {
            Some(validator) => validator.validate(value),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ValidationRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationRegistry")
            .field("fields", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Registry plus the message catalog; turns a validator verdict into the
/// message stored in a form's error map.
#[derive(Clone, Copy)]
pub(super) struct FieldCheck<'a> {
    pub(super) registry: &'a ValidationRegistry,
    pub(super) i18n: &'a I18nManager,
}

impl FieldCheck<'_> {
    pub(super) fn message_for(&self, key: &str, value: &FieldValue) -> Option<String> {
        self.registry
            .validate(key, value)
            .err()
            .map(|error| error.message(self.i18n))
    }
}
