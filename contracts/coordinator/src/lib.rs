pub mod active_set;
#[cfg(not(feature = "library"))]
pub mod contract;
pub mod error;
pub mod gate;
pub mod helpers;
pub mod modules;
pub mod msg;
pub mod queries;
pub mod randomness;
pub mod registry;
pub mod rollover;
pub mod state;

pub use crate::error::ContractError;
