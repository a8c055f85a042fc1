pub mod error;
pub mod models;
pub mod validation;
pub mod identity;
pub mod results;

pub use error::{ErrorCode, ErrorResponse};
pub use models::*;
pub use validation::*;
pub use identity::*;
pub use results::{percentage, tally};
