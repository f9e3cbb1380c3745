//! Function Compute drivers

pub mod trigger;
pub mod types;
pub mod version;

pub use trigger::FcTriggerDriver;
pub use version::FcVersionDriver;
