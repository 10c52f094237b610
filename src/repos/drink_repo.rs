/*
 * Responsibility
 * - drinks の CRUD インターフェース (DrinkStore)
 * - 認可済みの handler からのみ呼ばれる。ここは権限を知らない
 */
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::repos::error::RepoError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    pub parts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrinkRow {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Drink persistence. Implementations must be cheap to share (`Arc<dyn DrinkStore>`).
#[async_trait]
pub trait DrinkStore: Send + Sync {
    /// All drinks ordered by id.
    async fn list(&self) -> Result<Vec<DrinkRow>, RepoError>;

    async fn get(&self, id: i64) -> Result<Option<DrinkRow>, RepoError>;

    /// `RepoError::Conflict` when the title is taken.
    async fn create(&self, title: &str, recipe: &[Ingredient]) -> Result<DrinkRow, RepoError>;

    // None fields are left unchanged. Ok(None) when `id` does not exist.
    async fn update(
        &self,
        id: i64,
        title: Option<&str>,
        recipe: Option<&[Ingredient]>,
    ) -> Result<Option<DrinkRow>, RepoError>;

    async fn delete(&self, id: i64) -> Result<bool, RepoError>;
}
