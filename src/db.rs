pub mod store;
pub use store::LedgerStore;

pub mod postgres_store;
pub use postgres_store::PgLedgerStore;

pub mod memory;
pub use memory::InMemoryLedgerStore;
