pub mod form;
pub mod i18n;
pub mod prelude;
pub mod status;
pub mod validators;

pub use i18n::{I18nManager, Locale};
