pub mod keyed;

mod memory;
pub use memory::MemoryStore;

pub use keyed::{KeyedStore, StoreError};
