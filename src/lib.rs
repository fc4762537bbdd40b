pub mod application;
pub mod cli;
pub mod context;
pub mod domain;
pub mod storage;

pub use application::{AppError, AssetLedgerService, ServiceConfig};
pub use context::{MemoryContext, TransactionContext};
pub use domain::*;
pub use storage::{LedgerTransaction, Repository};
