pub mod instrument;
pub mod intent;

pub use instrument::*;
pub use intent::*;
