/*
 * Responsibility
 * - DATABASE_URL 未設定時 / テスト用の in-memory DrinkStore
 * - Postgres 実装と同じ意味 (id 昇順、title unique) を守る
 */
use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::repos::drink_repo::{DrinkRow, DrinkStore, Ingredient};
use crate::repos::error::RepoError;

#[derive(Debug, Default)]
struct Inner {
    last_id: i64,
    drinks: BTreeMap<i64, DrinkRow>,
}

impl Inner {
    fn title_taken(&self, title: &str, except: Option<i64>) -> bool {
        self.drinks
            .values()
            .any(|d| d.title == title && Some(d.id) != except)
    }
}

#[derive(Debug, Default)]
pub struct MemoryDrinkStore {
    inner: RwLock<Inner>,
}

impl MemoryDrinkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DrinkStore for MemoryDrinkStore {
    async fn list(&self) -> Result<Vec<DrinkRow>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner.drinks.values().cloned().collect())
    }

    async fn get(&self, id: i64) -> Result<Option<DrinkRow>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner.drinks.get(&id).cloned())
    }

    async fn create(&self, title: &str, recipe: &[Ingredient]) -> Result<DrinkRow, RepoError> {
        let mut inner = self.inner.write().await;
        if inner.title_taken(title, None) {
            return Err(RepoError::Conflict);
        }

        inner.last_id += 1;
        let row = DrinkRow {
            id: inner.last_id,
            title: title.to_string(),
            recipe: recipe.to_vec(),
        };
        inner.drinks.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        id: i64,
        title: Option<&str>,
        recipe: Option<&[Ingredient]>,
    ) -> Result<Option<DrinkRow>, RepoError> {
        let mut inner = self.inner.write().await;
        // Unknown id wins over a title conflict, as in the Postgres store.
        if !inner.drinks.contains_key(&id) {
            return Ok(None);
        }
        if let Some(title) = title
            && inner.title_taken(title, Some(id))
        {
            return Err(RepoError::Conflict);
        }

        let Some(row) = inner.drinks.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = title {
            row.title = title.to_string();
        }
        if let Some(recipe) = recipe {
            row.recipe = recipe.to_vec();
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepoError> {
        let mut inner = self.inner.write().await;
        Ok(inner.drinks.remove(&id).is_some())
    }
}
