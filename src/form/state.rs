use std::collections::{BTreeMap, BTreeSet};

use super::controller::{FormError, FormResult};
use super::validation::FieldCheck;
use super::value::{FieldKey, FieldValue, FieldValues};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitState {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

/// How an in-flight submit settled, with the message already resolved.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) enum Settlement {
    Succeeded(String),
    Failed(String),
}

/// Everything one form instance owns. Transitions are plain methods so the
/// engine can be driven and inspected without a controller.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormState {
    initial_values: FieldValues,
    values: FieldValues,
    errors: BTreeMap<FieldKey, String>,
    touched: BTreeSet<FieldKey>,
    submit_state: SubmitState,
    submit_count: u32,
    general_error: Option<String>,
    success_message: Option<String>,
}

impl FormState {
    pub fn new(initial_values: FieldValues) -> Self {
        Self {
            values: initial_values.clone(),
            initial_values,
            errors: BTreeMap::new(),
            touched: BTreeSet::new(),
            submit_state: SubmitState::Idle,
            submit_count: 0,
            general_error: None,
            success_message: None,
        }
    }

    pub fn initial_values(&self) -> &FieldValues {
        &self.initial_values
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn errors(&self) -> &BTreeMap<FieldKey, String> {
        &self.errors
    }

    pub fn touched(&self) -> &BTreeSet<FieldKey> {
        &self.touched
    }

    pub fn submit_state(&self) -> SubmitState {
        self.submit_state
    }

    pub fn submit_count(&self) -> u32 {
        self.submit_count
    }

    pub fn is_submitting(&self) -> bool {
        self.submit_state == SubmitState::Submitting
    }

    pub fn general_error(&self) -> Option<&str> {
        self.general_error.as_deref()
    }

    pub fn success_message(&self) -> Option<&str> {
        self.success_message.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.values != self.initial_values
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub(super) fn apply_change(
        &mut self,
        key: &str,
        value: FieldValue,
        check: &FieldCheck<'_>,
    ) -> FormResult<()> {
        let key = self.known_key(key)?;
        if self.touched.contains(&key) {
            let error = check.message_for(key.as_str(), &value);
            self.write_error(key.clone(), error);
        }
        self.values.insert(key, value);
        Ok(())
    }

    /// Validates the value the field reported on blur; the stored value is
    /// left as the last change put it.
    pub(super) fn apply_blur(
        &mut self,
        key: &str,
        value: &FieldValue,
        check: &FieldCheck<'_>,
    ) -> FormResult<()> {
        let key = self.known_key(key)?;
        let error = check.message_for(key.as_str(), value);
        self.touched.insert(key.clone());
        self.write_error(key, error);
        Ok(())
    }

    /// Replaces the error map with the failures of every field, touched or
    /// not. Touched state is left alone.
    pub(super) fn apply_validate_all(&mut self, check: &FieldCheck<'_>) -> bool {
        self.errors = self
            .values
            .iter()
            .filter_map(|(key, value)| {
                check
                    .message_for(key.as_str(), value)
                    .map(|message| (key.clone(), message))
            })
            .collect();
        self.errors.is_empty()
    }

    pub(super) fn apply_submit_start(&mut self) -> FormResult<()> {
        if self.is_submitting() {
            return Err(FormError::AlreadySubmitting);
        }
        transition_submit_state(self, SubmitState::Validating)?;
        self.submit_count = self.submit_count.saturating_add(1);
        self.general_error = None;
        self.success_message = None;
        Ok(())
    }

    pub(super) fn apply_validation_failed(&mut self, message: String) -> FormResult<()> {
        self.general_error = Some(message);
        transition_submit_state(self, SubmitState::Failed)
    }

    pub(super) fn apply_submitting(&mut self) -> FormResult<FieldValues> {
        transition_submit_state(self, SubmitState::Submitting)?;
        Ok(self.values.clone())
    }

    /// Settles the in-flight submit. The submitting flag is the last thing
    /// cleared, after values and messages are in their final shape.
    pub(super) fn apply_submit_end(&mut self, settlement: Settlement) -> FormResult<SubmitState> {
        if !self.is_submitting() {
            return Err(FormError::InvalidStateTransition {
                from: self.submit_state,
                to: match settlement {
                    Settlement::Succeeded(_) => SubmitState::Succeeded,
                    Settlement::Failed(_) => SubmitState::Failed,
                },
            });
        }
        let next = match settlement {
            Settlement::Succeeded(message) => {
                self.values = self.initial_values.clone();
                self.touched.clear();
                self.errors.clear();
                self.success_message = Some(message);
                SubmitState::Succeeded
            }
            Settlement::Failed(message) => {
                self.general_error = Some(message);
                SubmitState::Failed
            }
        };
        transition_submit_state(self, next)?;
        Ok(next)
    }

    pub(super) fn set_value(&mut self, key: &str, value: FieldValue) -> FormResult<()> {
        let key = self.known_key(key)?;
        self.values.insert(key, value);
        Ok(())
    }

    pub(super) fn set_error(&mut self, key: FieldKey, message: Option<String>) {
        self.write_error(key, message);
    }

    pub(super) fn reset(&mut self) {
        self.values = self.initial_values.clone();
        self.errors.clear();
        self.touched.clear();
        self.general_error = None;
        self.success_message = None;
        // An in-flight submit still owns the flag until it settles.
        if !self.is_submitting() {
            self.submit_state = SubmitState::Idle;
        }
    }

    fn write_error(&mut self, key: FieldKey, message: Option<String>) {
        match message.filter(|message| !message.is_empty()) {
            Some(message) => {
                self.errors.insert(key, message);
            }
            None => {
                self.errors.remove(&key);
            }
        }
    }

    fn known_key(&self, key: &str) -> FormResult<FieldKey> {
        self.values
            .get_key_value(key)
            .map(|(known, _)| known.clone())
            .ok_or_else(|| FormError::UnknownField(FieldKey::new(key)))
    }
}

pub(super) fn transition_submit_state(
    state: &mut FormState,
    next: SubmitState,
) -> FormResult<()> {
    let current = state.submit_state;
    if current == next {
        return Ok(());
    }

    let allowed = matches!(
        (current, next),
        (SubmitState::Idle, SubmitState::Validating)
            | (SubmitState::Validating, SubmitState::Submitting)
            | (SubmitState::Validating, SubmitState::Failed)
            | (SubmitState::Submitting, SubmitState::Succeeded)
            | (SubmitState::Submitting, SubmitState::Failed)
            | (SubmitState::Succeeded, SubmitState::Validating)
            | (SubmitState::Failed, SubmitState::Validating)
            | (_, SubmitState::Idle)
    );
    if !allowed {
        return Err(FormError::InvalidStateTransition {
            from: current,
            to: next,
        });
    }
    state.submit_state = next;
    Ok(())
}
