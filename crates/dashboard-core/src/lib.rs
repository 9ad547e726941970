pub mod error;
pub mod magnitude;
pub mod traits;
pub mod types;

pub use error::*;
pub use magnitude::*;
pub use traits::*;
pub use types::*;
