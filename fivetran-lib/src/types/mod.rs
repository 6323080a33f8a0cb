#![allow(unreachable_pub)]

mod error;
mod response;

pub use error::ErrorKind;
pub use response::ApiResponse;

/// The fivetran `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
