// # Config Store Implementations
//
// This module provides the ConfigStore implementations that ship with the
// core crate. Remote backends live in their own crates.

pub mod memory;

pub use memory::{MemoryConfigStore, MemoryConfigStoreFactory, MemoryStoreBackend};
