/*
 * Responsibility
 * - drinks テーブル向け SQLx 操作
 * - recipe は JSON 文字列として TEXT 列に保存する
 * - unique 制約違反 (title) は RepoError::Conflict に変換
 */
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};

use crate::repos::drink_repo::{DrinkRow, DrinkStore, Ingredient};
use crate::repos::error::RepoError;

#[derive(Debug, FromRow)]
struct DrinkRecord {
    id: i64,
    title: String,
    recipe: String,
}

impl TryFrom<DrinkRecord> for DrinkRow {
    type Error = RepoError;

    fn try_from(r: DrinkRecord) -> Result<Self, Self::Error> {
        let recipe = serde_json::from_str(&r.recipe)
            .map_err(|e| RepoError::Corrupt(format!("drink {} recipe: {e}", r.id)))?;
        Ok(DrinkRow {
            id: r.id,
            title: r.title,
            recipe,
        })
    }
}

fn encode_recipe(recipe: &[Ingredient]) -> Result<String, RepoError> {
    serde_json::to_string(recipe).map_err(|e| RepoError::Corrupt(e.to_string()))
}

#[derive(Clone, Debug)]
pub struct PgDrinkStore {
    db: PgPool,
}

impl PgDrinkStore {
    /// Connect and apply the embedded migrations.
    pub async fn connect(database_url: &str) -> Result<Self, RepoError> {
        let db = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .map_err(sqlx::Error::from)?;

        Ok(Self { db })
    }
}

#[async_trait]
impl DrinkStore for PgDrinkStore {
    async fn list(&self) -> Result<Vec<DrinkRow>, RepoError> {
        let rows = sqlx::query_as::<_, DrinkRecord>(
            r#"
            SELECT id, title, recipe
            FROM drinks
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(DrinkRow::try_from).collect()
    }

    async fn get(&self, id: i64) -> Result<Option<DrinkRow>, RepoError> {
        let row = sqlx::query_as::<_, DrinkRecord>(
            r#"
            SELECT id, title, recipe
            FROM drinks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(DrinkRow::try_from).transpose()
    }

    async fn create(&self, title: &str, recipe: &[Ingredient]) -> Result<DrinkRow, RepoError> {
        let row = sqlx::query_as::<_, DrinkRecord>(
            r#"
            INSERT INTO drinks (title, recipe)
            VALUES ($1, $2)
            RETURNING id, title, recipe
            "#,
        )
        .bind(title)
        .bind(encode_recipe(recipe)?)
        .fetch_one(&self.db)
        .await
        .map_err(RepoError::from_sqlx)?;

        row.try_into()
    }

    async fn update(
        &self,
        id: i64,
        title: Option<&str>,
        recipe: Option<&[Ingredient]>,
    ) -> Result<Option<DrinkRow>, RepoError> {
        let recipe = recipe.map(encode_recipe).transpose()?;

        let row = sqlx::query_as::<_, DrinkRecord>(
            r#"
            UPDATE drinks
            SET
                title = COALESCE($2, title),
                recipe = COALESCE($3, recipe)
            WHERE id = $1
            RETURNING id, title, recipe
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(recipe)
        .fetch_optional(&self.db)
        .await
        .map_err(RepoError::from_sqlx)?;

        row.map(DrinkRow::try_from).transpose()
    }

    async fn delete(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            DELETE FROM drinks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
