pub use crate::form::{
    Feedback, FieldError, FieldKey, FieldValue, FieldValues, FormController, FormError,
    FormModel, FormOptions, FormResult, FormSnapshot, SubmitOutcome, SubmitRejection,
    SubmitState, ValidationRegistry, ValidationResult, field_values,
};
pub use crate::i18n::{I18nManager, Locale};
pub use crate::status::{StatusReport, StatusState};
pub use crate::validators::{CompositeValidation, keys};
