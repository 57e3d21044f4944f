pub mod converter;
pub mod error;
#[cfg(test)]
pub mod fake;
pub mod process;
pub mod types;
pub mod validator;

pub use converter::convert;
pub use error::ConvertError;
pub use process::{ProcessRunner, ToolRunner, locate_program};
pub use validator::{Validation, validate};
