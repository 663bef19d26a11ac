pub mod analyzer;
pub mod indicators;
pub mod trend;


pub use analyzer::*;
pub use indicators::*;
pub use trend::*;
