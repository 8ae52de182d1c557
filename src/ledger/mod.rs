//! Ledger module containing account storage, the audit log and the transfer engine

pub mod account;
pub mod audit;
pub mod core;
pub mod engine;
pub mod locks;

pub use account::*;
pub use audit::*;
pub use core::*;
pub use engine::*;
pub use locks::*;
