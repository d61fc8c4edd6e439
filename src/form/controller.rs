use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::i18n::{I18nManager, Locale};

use super::state::{FormState, Settlement, SubmitState};
use super::validation::{FieldCheck, ValidationRegistry};
use super::value::{FieldKey, FieldValue, FieldValues, FormModel};

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);
static SUBSCRIPTION_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

const VALIDATION_FAILED_KEY: &str = "form.validation_failed";
const SUCCESS_DEFAULT_KEY: &str = "form.success_default";
const FAILURE_DEFAULT_KEY: &str = "form.failure_default";
const REJECTED_DEFAULT_KEY: &str = "form.rejected_default";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FormOptions {
    /// Locale for field errors and submit banners.
    pub locale: Locale,
}

impl FormOptions {
    pub fn locale(mut self, locale: impl Into<Locale>) -> Self {
        self.locale = locale.into();
        self
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormSnapshot {
    pub values: FieldValues,
    pub errors: BTreeMap<FieldKey, String>,
    pub touched: BTreeSet<FieldKey>,
    pub submit_state: SubmitState,
    pub submit_count: u32,
    pub is_submitting: bool,
    pub general_error: Option<String>,
    pub success_message: Option<String>,
    pub is_dirty: bool,
    pub is_valid: bool,
}

impl From<&FormState> for FormSnapshot {
    fn from(state: &FormState) -> Self {
        Self {
            values: state.values().clone(),
            errors: state.errors().clone(),
            touched: state.touched().clone(),
            submit_state: state.submit_state(),
            submit_count: state.submit_count(),
            is_submitting: state.is_submitting(),
            general_error: state.general_error().map(str::to_string),
            success_message: state.success_message().map(str::to_string),
            is_dirty: state.is_dirty(),
            is_valid: state.is_valid(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormError {
    StatePoisoned(&'static str),
    InvalidStateTransition { from: SubmitState, to: SubmitState },
    AlreadySubmitting,
    UnknownField(FieldKey),
    MissingField(FieldKey),
    FieldType(FieldKey),
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::StatePoisoned(context) => {
                write!(f, "form state lock poisoned while {context}")
            }
            FormError::InvalidStateTransition { from, to } => {
                write!(f, "invalid submit state transition: {from:?} -> {to:?}")
            }
            FormError::AlreadySubmitting => f.write_str("form submit is already in progress"),
            FormError::UnknownField(key) => write!(f, "form has no field named `{key}`"),
            FormError::MissingField(key) => write!(f, "form values are missing field `{key}`"),
            FormError::FieldType(key) => write!(f, "field `{key}` holds a value of the wrong type"),
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = Result<T, FormError>;

/// What the submit callback reports back once the remote call settles.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SubmitOutcome {
    Success { message: Option<String> },
    Failure { error: Option<String> },
}

impl SubmitOutcome {
    pub fn success() -> Self {
        SubmitOutcome::Success { message: None }
    }

    pub fn success_with(message: impl Into<String>) -> Self {
        SubmitOutcome::Success {
            message: Some(message.into()),
        }
    }

    pub fn failure() -> Self {
        SubmitOutcome::Failure { error: None }
    }

    pub fn failure_with(error: impl Into<String>) -> Self {
        SubmitOutcome::Failure {
            error: Some(error.into()),
        }
    }
}

/// A submit callback that errors out instead of reporting
/// [`SubmitOutcome::Failure`]. Its `Display` text becomes the banner.
pub type SubmitRejection = Box<dyn std::error::Error + Send + Sync>;

pub type BoxedSubmitFuture =
    Pin<Box<dyn Future<Output = Result<SubmitOutcome, SubmitRejection>> + Send + 'static>>;

pub(super) type SubmitHandler = Arc<dyn Fn(FieldValues) -> BoxedSubmitFuture + Send + Sync>;
pub(super) type Listener = Arc<dyn Fn(&FormSnapshot) + Send + Sync>;

/// State and submit lifecycle of one form. Clones share the same state, so
/// a clone can be moved into each event handler of the page.
#[derive(Clone)]
pub struct FormController {
    pub(super) id: FormId,
    pub(super) i18n: I18nManager,
    pub(super) registry: Arc<ValidationRegistry>,
    pub(super) on_submit: SubmitHandler,
    pub(super) state: Arc<RwLock<FormState>>,
    pub(super) listeners: Arc<RwLock<BTreeMap<SubscriptionId, Listener>>>,
}

impl FormController {
    pub fn new<F, Fut>(initial_values: FieldValues, on_submit: F, registry: ValidationRegistry) -> Self
    where
        F: Fn(FieldValues) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<SubmitOutcome, SubmitRejection>> + Send + 'static,
    {
        Self::with_options(initial_values, on_submit, registry, FormOptions::default())
    }

    pub fn with_options<F, Fut>(
        initial_values: FieldValues,
        on_submit: F,
        registry: ValidationRegistry,
        options: FormOptions,
    ) -> Self
    where
        F: Fn(FieldValues) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<SubmitOutcome, SubmitRejection>> + Send + 'static,
    {
        let on_submit: SubmitHandler =
            Arc::new(move |values: FieldValues| -> BoxedSubmitFuture { Box::pin(on_submit(values)) });
        Self {
            id: FormId::next(),
            i18n: I18nManager::with_locale(options.locale),
            registry: Arc::new(registry),
            on_submit,
            state: Arc::new(RwLock::new(FormState::new(initial_values))),
            listeners: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub fn from_model<M, F, Fut>(
        model: &M,
        on_submit: F,
        registry: ValidationRegistry,
        options: FormOptions,
    ) -> Self
    where
        M: FormModel,
        F: Fn(FieldValues) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<SubmitOutcome, SubmitRejection>> + Send + 'static,
    {
        Self::with_options(model.to_values(), on_submit, registry, options)
    }

    pub fn form_id(&self) -> FormId {
        self.id
    }

    pub fn i18n(&self) -> &I18nManager {
        &self.i18n
    }

    /// Message the registered validator gives for `value`, or `None` when
    /// the value passes or the field has no validator.
    pub fn validate_field(&self, name: &str, value: &FieldValue) -> Option<String> {
        self.field_check().message_for(name, value)
    }

    pub fn validate_all(&self) -> FormResult<bool> {
        let valid = {
            let mut state = write_lock(&self.state, "validating all fields")?;
            state.apply_validate_all(&self.field_check())
        };
        self.notify()?;
        Ok(valid)
    }

    pub fn handle_change(&self, name: &str, value: impl Into<FieldValue>) -> FormResult<()> {
        {
            let mut state = write_lock(&self.state, "applying field change")?;
            state.apply_change(name, value.into(), &self.field_check())?;
        }
        self.notify()
    }

    pub fn handle_blur(&self, name: &str, value: impl Into<FieldValue>) -> FormResult<()> {
        {
            let mut state = write_lock(&self.state, "applying field blur")?;
            state.apply_blur(name, &value.into(), &self.field_check())?;
        }
        self.notify()
    }

    /// Validates every field and, when clean, hands the values to the
    /// submit callback exactly once.
    ///
    /// Returns the settled [`SubmitState`]: `Failed` covers both a blocked
    /// submit and a failed callback. A call made while another submit is in
    /// flight is rejected with [`FormError::AlreadySubmitting`] and changes
    /// nothing. Dropping the returned future while the callback is pending
    /// settles the submit as failed with the rejection message.
    pub async fn handle_submit(&self) -> FormResult<SubmitState> {
        let values = {
            let mut state = write_lock(&self.state, "preparing submit")?;
            if let Err(error) = state.apply_submit_start() {
                warn!(form_id = self.id.0, %error, "submit ignored");
                return Err(error);
            }
            if !state.apply_validate_all(&self.field_check()) {
                let invalid_fields = state.errors().len();
                state.apply_validation_failed(self.i18n.t(VALIDATION_FAILED_KEY))?;
                drop(state);
                debug!(form_id = self.id.0, invalid_fields, "submit blocked by validation");
                self.notify()?;
                return Ok(SubmitState::Failed);
            }
            state.apply_submitting()?
        };
        let mut guard = SubmitGuard::arm(self.clone());
        self.notify()?;
        debug!(form_id = self.id.0, "submit started");

        let settlement = match (self.on_submit)(values).await {
            Ok(SubmitOutcome::Success { message }) => Settlement::Succeeded(
                non_empty(message).unwrap_or_else(|| self.i18n.t(SUCCESS_DEFAULT_KEY)),
            ),
            Ok(SubmitOutcome::Failure { error }) => Settlement::Failed(
                non_empty(error).unwrap_or_else(|| self.i18n.t(FAILURE_DEFAULT_KEY)),
            ),
            Err(rejection) => {
                warn!(form_id = self.id.0, error = %rejection, "submit callback rejected");
                Settlement::Failed(
                    non_empty(Some(rejection.to_string()))
                        .unwrap_or_else(|| self.i18n.t(REJECTED_DEFAULT_KEY)),
                )
            }
        };

        let next = write_lock(&self.state, "completing submit")?.apply_submit_end(settlement)?;
        guard.disarm();
        debug!(form_id = self.id.0, state = ?next, "submit settled");
        self.notify()?;
        Ok(next)
    }

    pub fn set_field_value(&self, name: &str, value: impl Into<FieldValue>) -> FormResult<()> {
        {
            let mut state = write_lock(&self.state, "setting field value")?;
            state.set_value(name, value.into())?;
        }
        self.notify()
    }

    /// Writes an error message directly. An empty message clears the entry.
    /// Any key is accepted, including ones outside the value map.
    pub fn set_field_error(&self, name: impl Into<FieldKey>, error: impl Into<String>) -> FormResult<()> {
        {
            let mut state = write_lock(&self.state, "setting field error")?;
            state.set_error(name.into(), Some(error.into()));
        }
        self.notify()
    }

    pub fn clear_field_error(&self, name: impl Into<FieldKey>) -> FormResult<()> {
        {
            let mut state = write_lock(&self.state, "clearing field error")?;
            state.set_error(name.into(), None);
        }
        self.notify()
    }

    pub fn reset_form(&self) -> FormResult<()> {
        write_lock(&self.state, "resetting form")?.reset();
        self.notify()
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot> {
        let state = read_lock(&self.state, "creating form snapshot")?;
        Ok(FormSnapshot::from(&*state))
    }

    pub fn state(&self) -> FormResult<FormState> {
        Ok(read_lock(&self.state, "cloning form state")?.clone())
    }

    pub fn values(&self) -> FormResult<FieldValues> {
        Ok(read_lock(&self.state, "reading form values")?.values().clone())
    }

    pub fn value(&self, name: &str) -> FormResult<Option<FieldValue>> {
        Ok(read_lock(&self.state, "reading field value")?
            .values()
            .get(name)
            .cloned())
    }

    pub fn errors(&self) -> FormResult<BTreeMap<FieldKey, String>> {
        Ok(read_lock(&self.state, "reading field errors")?.errors().clone())
    }

    pub fn is_touched(&self, name: &str) -> FormResult<bool> {
        Ok(read_lock(&self.state, "reading touched fields")?
            .touched()
            .contains(name))
    }

    pub fn is_submitting(&self) -> FormResult<bool> {
        Ok(read_lock(&self.state, "reading submit flag")?.is_submitting())
    }

    /// Calls `listener` with a fresh snapshot after every state change.
    pub fn subscribe(
        &self,
        listener: impl Fn(&FormSnapshot) + Send + Sync + 'static,
    ) -> FormResult<SubscriptionId> {
        let id = SubscriptionId(SUBSCRIPTION_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst));
        write_lock(&self.listeners, "registering listener")?.insert(id, Arc::new(listener));
        Ok(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> FormResult<bool> {
        Ok(write_lock(&self.listeners, "removing listener")?
            .remove(&id)
            .is_some())
    }

    fn field_check(&self) -> FieldCheck<'_> {
        FieldCheck {
            registry: &self.registry,
            i18n: &self.i18n,
        }
    }

    fn notify(&self) -> FormResult<()> {
        let listeners = read_lock(&self.listeners, "reading listeners")?
            .values()
            .cloned()
            .collect::<Vec<_>>();
        if listeners.is_empty() {
            return Ok(());
        }
        let snapshot = self.snapshot()?;
        for listener in listeners {
            listener(&snapshot);
        }
        Ok(())
    }
}

/// Settles a submit whose `handle_submit` future was dropped while the
/// callback was pending, so the form does not stay `Submitting`.
struct SubmitGuard {
    controller: Option<FormController>,
}

impl SubmitGuard {
    fn arm(controller: FormController) -> Self {
        Self {
            controller: Some(controller),
        }
    }

    fn disarm(&mut self) {
        self.controller = None;
    }
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        let Some(controller) = self.controller.take() else {
            return;
        };
        let settled = match controller.state.write() {
            Ok(mut state) if state.is_submitting() => state
                .apply_submit_end(Settlement::Failed(controller.i18n.t(REJECTED_DEFAULT_KEY)))
                .is_ok(),
            _ => false,
        };
        if settled {
            warn!(form_id = controller.id.0, "submit abandoned before the callback settled");
            let _ = controller.notify();
        }
    }
}

fn non_empty(message: Option<String>) -> Option<String> {
    message.filter(|message| !message.trim().is_empty())
}

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
