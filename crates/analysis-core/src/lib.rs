pub mod error;
pub mod signals;
pub mod stats;
pub mod thresholds;
pub mod traits;
pub mod types;

pub use error::*;
pub use signals::*;
pub use thresholds::*;
pub use traits::*;
pub use types::*;
