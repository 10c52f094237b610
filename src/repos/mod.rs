/*
 * Responsibility
 * - drinks の永続化 (DrinkStore trait と実装)
 * - DATABASE_URL があれば Postgres、なければ in-memory
 */
pub mod drink_repo;
pub mod error;
pub mod memory_drink_repo;
pub mod pg_drink_repo;

pub use drink_repo::{DrinkRow, DrinkStore, Ingredient};
pub use memory_drink_repo::MemoryDrinkStore;
pub use pg_drink_repo::PgDrinkStore;
