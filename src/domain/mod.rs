mod asset;
mod id;
mod partition;

pub use asset::*;
pub use id::*;
pub use partition::*;
