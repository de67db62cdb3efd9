//! Profile record, local edit buffer and field validation.

pub mod buffer;
pub mod model;
pub mod validation;

pub use buffer::FieldEditBuffer;
pub use model::{Channel, FieldName, FieldUpdate, FieldValue, OtpVerdict, Profile};
