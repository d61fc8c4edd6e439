//! Field rules of the finance tracker forms and the composite checks that
//! run them together.
//!
//! Every validator is total over [`FieldValue`]: null, empty and
//! non-text input produce a structured error, never a panic.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::form::{
    FieldError, FieldKey, FieldValue, FieldValues, FormController, FormResult, Rule,
    ValidationRegistry, ValidationResult,
};

/// Flat keys of the transaction, budget and register forms. Dotted keys
/// stand for nested payload fields and are rebuilt by the submit callback.
pub mod keys {
    pub const USERNAME: &str = "username";
    pub const EMAIL: &str = "email";
    pub const PASSWORD: &str = "password";
    pub const PASSWORD_CONFIRM: &str = "passwordConfirm";
    pub const CATEGORY_ID: &str = "categoriaId";
    pub const AMOUNT: &str = "monto.cantidad";
    pub const DETAIL: &str = "detalle";
    pub const PAYMENT_METHOD: &str = "metodo_pago";
    pub const MAX_AMOUNT: &str = "monto_max.cantidad";
    pub const PERIOD: &str = "periodo";
}

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 100;
pub const DESCRIPTION_MIN: usize = 3;
pub const DESCRIPTION_MAX: usize = 255;
pub const AMOUNT_MAX: Decimal = Decimal::from_parts(999_999_999, 0, 0, false, 0);

pub const PAYMENT_METHODS: [&str; 4] = ["efectivo", "tarjeta", "transferencia", "cheque"];
pub const PERIODS: [&str; 3] = ["mensual", "semanal", "anual"];

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern must compile")
});

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn check_length(rule: Rule, text: &str, min: usize, max: usize) -> ValidationResult {
    let len = char_len(text);
    if len < min {
        return Err(FieldError::TooShort { rule, min });
    }
    if len > max {
        return Err(FieldError::TooLong { rule, max });
    }
    Ok(())
}

pub fn validate_username(value: &FieldValue) -> ValidationResult {
    let text = value.as_text();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Required(Rule::Username));
    }
    check_length(Rule::Username, trimmed, USERNAME_MIN, USERNAME_MAX)
}

/// Length is measured on the raw input; surrounding spaces count.
pub fn validate_password(value: &FieldValue) -> ValidationResult {
    let text = value.as_text();
    if text.is_empty() {
        return Err(FieldError::Required(Rule::Password));
    }
    check_length(Rule::Password, &text, PASSWORD_MIN, PASSWORD_MAX)
}

pub fn validate_email(value: &FieldValue) -> ValidationResult {
    let text = value.as_text();
    if text.trim().is_empty() {
        return Err(FieldError::Required(Rule::Email));
    }
    if !EMAIL_PATTERN.is_match(&text) {
        return Err(FieldError::Malformed(Rule::Email));
    }
    Ok(())
}

/// Strictly positive and at most [`AMOUNT_MAX`]. A falsy value (null,
/// empty text, numeric zero, `false`) reads as missing. Anything else is
/// read the way a browser's `Number()` coerces form input: `true` is 1,
/// `0x`/`0o`/`0b` prefixes are integers, `Infinity` is too large, and text
/// that is not a number reads as not positive.
pub fn validate_amount(value: &FieldValue) -> ValidationResult {
    if !value.is_truthy() {
        return Err(FieldError::Required(Rule::Amount));
    }
    match read_amount(value) {
        AmountReading::Number(amount) if amount <= Decimal::ZERO => {
            Err(FieldError::NotPositive(Rule::Amount))
        }
        AmountReading::Number(amount) if amount > AMOUNT_MAX => {
            Err(FieldError::TooLarge(Rule::Amount))
        }
        AmountReading::Number(_) => Ok(()),
        AmountReading::Overflow { negative: false } => Err(FieldError::TooLarge(Rule::Amount)),
        AmountReading::Overflow { negative: true } | AmountReading::NotANumber => {
            Err(FieldError::NotPositive(Rule::Amount))
        }
    }
}

enum AmountReading {
    Number(Decimal),
    Overflow { negative: bool },
    NotANumber,
}

const RADIX_PREFIXES: [(&str, u32); 6] = [
    ("0x", 16),
    ("0X", 16),
    ("0o", 8),
    ("0O", 8),
    ("0b", 2),
    ("0B", 2),
];

fn read_amount(value: &FieldValue) -> AmountReading {
    match value {
        FieldValue::Text(text) => read_amount_text(text.trim()),
        FieldValue::Bool(flag) => AmountReading::Number(Decimal::from(u8::from(*flag))),
        other => other
            .as_decimal()
            .map_or(AmountReading::NotANumber, AmountReading::Number),
    }
}

fn read_amount_text(text: &str) -> AmountReading {
    match text {
        "Infinity" | "+Infinity" => return AmountReading::Overflow { negative: false },
        "-Infinity" => return AmountReading::Overflow { negative: true },
        _ => {}
    }

    for (prefix, radix) in RADIX_PREFIXES {
        let Some(digits) = text.strip_prefix(prefix) else {
            continue;
        };
        if digits.starts_with('+') {
            return AmountReading::NotANumber;
        }
        return match u128::from_str_radix(digits, radix) {
            Ok(number) => i128::try_from(number)
                .ok()
                .and_then(|number| Decimal::try_from_i128_with_scale(number, 0).ok())
                .map_or(AmountReading::Overflow { negative: false }, AmountReading::Number),
            Err(_) => AmountReading::NotANumber,
        };
    }

    if let Some(amount) = FieldValue::from(text).as_decimal() {
        return AmountReading::Number(amount);
    }
    // Exponents past the decimal range still read as numbers.
    match text.parse::<f64>() {
        Ok(number) if number.is_infinite() && text.ends_with(|c: char| c.is_ascii_digit()) => {
            AmountReading::Overflow {
                negative: number.is_sign_negative(),
            }
        }
        _ => AmountReading::NotANumber,
    }
}

pub fn validate_description(value: &FieldValue) -> ValidationResult {
    let text = value.as_text();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Required(Rule::Description));
    }
    check_length(Rule::Description, trimmed, DESCRIPTION_MIN, DESCRIPTION_MAX)
}

pub fn validate_category(value: &FieldValue) -> ValidationResult {
    if value.is_truthy() {
        Ok(())
    } else {
        Err(FieldError::Required(Rule::Category))
    }
}

pub fn validate_payment_method(value: &FieldValue) -> ValidationResult {
    let text = value.as_text();
    if text.trim().is_empty() {
        return Err(FieldError::Required(Rule::PaymentMethod));
    }
    let lowered = text.to_lowercase();
    if !PAYMENT_METHODS.contains(&lowered.as_str()) {
        return Err(FieldError::Malformed(Rule::PaymentMethod));
    }
    Ok(())
}

/// Budget period; matched exactly, unlike payment methods.
pub fn validate_period(value: &FieldValue) -> ValidationResult {
    match value {
        FieldValue::Text(text) if PERIODS.contains(&text.as_str()) => Ok(()),
        _ => Err(FieldError::Malformed(Rule::Period)),
    }
}

/// Every failure of a multi-field check, keyed by field.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CompositeValidation {
    pub errors: BTreeMap<FieldKey, FieldError>,
}

impl CompositeValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&self, key: &str) -> Option<&FieldError> {
        self.errors.get(key)
    }

    fn check(&mut self, key: &str, result: ValidationResult) {
        if let Err(error) = result {
            self.errors.insert(FieldKey::new(key), error);
        }
    }

    /// Writes every failure into `controller`'s error map, rendered in the
    /// controller's locale.
    pub fn apply_to(&self, controller: &FormController) -> FormResult<()> {
        for (key, error) in &self.errors {
            controller.set_field_error(key, error.message(controller.i18n()))?;
        }
        Ok(())
    }
}

fn field<'a>(data: &'a FieldValues, key: &str) -> &'a FieldValue {
    static NULL: FieldValue = FieldValue::Null;
    data.get(key).unwrap_or(&NULL)
}

pub fn validate_transaction(data: &FieldValues) -> CompositeValidation {
    let mut result = CompositeValidation::default();
    result.check(keys::CATEGORY_ID, validate_category(field(data, keys::CATEGORY_ID)));
    result.check(keys::AMOUNT, validate_amount(field(data, keys::AMOUNT)));
    result.check(keys::DETAIL, validate_description(field(data, keys::DETAIL)));
    result.check(
        keys::PAYMENT_METHOD,
        validate_payment_method(field(data, keys::PAYMENT_METHOD)),
    );
    result
}

pub fn validate_budget(data: &FieldValues) -> CompositeValidation {
    let mut result = CompositeValidation::default();
    result.check(keys::CATEGORY_ID, validate_category(field(data, keys::CATEGORY_ID)));
    result.check(keys::MAX_AMOUNT, validate_amount(field(data, keys::MAX_AMOUNT)));
    result.check(keys::PERIOD, validate_period(field(data, keys::PERIOD)));
    result
}

pub fn validate_register(data: &FieldValues) -> CompositeValidation {
    let mut result = CompositeValidation::default();
    result.check(keys::USERNAME, validate_username(field(data, keys::USERNAME)));
    result.check(keys::EMAIL, validate_email(field(data, keys::EMAIL)));
    result.check(keys::PASSWORD, validate_password(field(data, keys::PASSWORD)));
    if field(data, keys::PASSWORD) != field(data, keys::PASSWORD_CONFIRM) {
        result.check(
            keys::PASSWORD_CONFIRM,
            Err(FieldError::Mismatch(Rule::PasswordConfirm)),
        );
    }
    result
}

impl ValidationRegistry {
    pub fn register_form() -> Self {
        Self::new()
            .field(keys::USERNAME, validate_username)
            .field(keys::EMAIL, validate_email)
            .field(keys::PASSWORD, validate_password)
    }

    pub fn transaction_form() -> Self {
        Self::new()
            .field(keys::CATEGORY_ID, validate_category)
            .field(keys::AMOUNT, validate_amount)
            .field(keys::DETAIL, validate_description)
            .field(keys::PAYMENT_METHOD, validate_payment_method)
    }

    pub fn budget_form() -> Self {
        Self::new()
            .field(keys::CATEGORY_ID, validate_category)
            .field(keys::MAX_AMOUNT, validate_amount)
            .field(keys::PERIOD, validate_period)
    }
}
