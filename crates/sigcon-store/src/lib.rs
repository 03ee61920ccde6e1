pub mod error;
pub mod memory;
pub mod repository;
pub mod sqlite;

pub use error::StoreError;
pub use memory::MemoryRepository;
pub use repository::ResearchRepository;
pub use sqlite::SqliteRepository;
