pub mod module;
pub mod randomness;
pub mod rewards;
pub mod schedule;

pub use module::*;
pub use randomness::*;
pub use rewards::*;
pub use schedule::*;

pub const PROTOCOL_VERSION: &str = "1.0";
