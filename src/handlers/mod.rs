pub mod health;
pub mod diagnostics;
pub mod upload;

pub use health::*;
pub use diagnostics::*;
pub use upload::*;
