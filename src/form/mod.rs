mod controller;
mod display;
mod state;
mod validation;
mod value;


pub use controller::{
    BoxedSubmitFuture, FormController, FormError, FormId, FormOptions, FormResult, FormSnapshot,
    SubmitOutcome, SubmitRejection, SubscriptionId,
};
pub use display::Feedback;
pub use finform_derive::FormModel;
pub use state::{FormState, SubmitState};
pub use validation::{FieldError, FieldValidator, Rule, ValidationRegistry, ValidationResult};
pub use value::{FieldKey, FieldValue, FieldValues, FormModel, FromFieldValue, field_values};
