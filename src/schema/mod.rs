//! Schema validation for aphreton
//!
//! A JSON-Schema-style validator shared by the request envelope parser and
//! endpoint params checks. Violations render as `[<path>] <message>` and
//! are joined with `; ` so callers can script against the combined text.

mod types;
mod validator;

pub use types::{found_type_name, join_violations, JsonType, Violation};
pub use validator::{is_valid, validate};
