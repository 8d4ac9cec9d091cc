// Adapters layer: concrete implementations of the domain ports.

pub mod cache;
pub mod memory;
pub mod postgrest;

pub use cache::{FileCache, MemoryCache};
pub use memory::InMemoryBackend;
pub use postgrest::PostgrestBackend;
