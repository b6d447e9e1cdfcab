//! In-memory store implementations for tests and single-node use.

pub mod account;
pub mod file;
pub mod share;

pub use account::MemoryAccountStore;
pub use file::MemoryFileStore;
pub use share::MemoryShareLinkStore;
