use std::collections::BTreeMap;

use super::controller::{FormController, FormResult, read_lock};
use super::state::FormState;
use super::value::FieldKey;

/// The one message block a form shows at a time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Feedback {
    None,
    FieldErrors(BTreeMap<FieldKey, String>),
    GeneralError(String),
    Success(String),
}

impl Feedback {
    pub fn is_none(&self) -> bool {
        matches!(self, Feedback::None)
    }
}

impl FormController {
    /// The field's error, but only once the user has left the field.
    pub fn field_error_for_display(&self, name: &str) -> FormResult<Option<String>> {
        let state = read_lock(&self.state, "reading display error message")?;
        Ok(display_error(&state, name))
    }

    /// Errors of every touched field.
    pub fn visible_errors(&self) -> FormResult<BTreeMap<FieldKey, String>> {
        let state = read_lock(&self.state, "reading visible errors")?;
        Ok(visible_errors(&state))
    }

    pub fn feedback(&self) -> FormResult<Feedback> {
        let state = read_lock(&self.state, "reading form feedback")?;
        Ok(feedback(&state))
    }
}

fn display_error(state: &FormState, name: &str) -> Option<String> {
    if !state.touched().contains(name) {
        return None;
    }
    state.errors().get(name).cloned()
}

fn visible_errors(state: &FormState) -> BTreeMap<FieldKey, String> {
    state
        .errors()
        .iter()
        .filter(|(key, _)| state.touched().contains(*key))
        .map(|(key, message)| (key.clone(), message.clone()))
        .collect()
}

fn feedback(state: &FormState) -> Feedback {
    if let Some(error) = state.general_error() {
        return Feedback::GeneralError(error.to_string());
    }
    if let Some(message) = state.success_message() {
        return Feedback::Success(message.to_string());
    }
    let visible = visible_errors(state);
    if visible.is_empty() {
        Feedback::None
    } else {
        Feedback::FieldErrors(visible)
    }
}
