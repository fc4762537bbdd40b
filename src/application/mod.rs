// Application layer - asset lifecycle use cases
// The service is generic over the transaction context so the same logic
// runs against the in-memory context in tests and the SQLite ledger in the CLI.

pub mod error;
mod service;
mod store;
mod transient;

pub use error::*;
pub use service::*;
pub use store::*;
pub use transient::*;
