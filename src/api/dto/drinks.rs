/*
 * Responsibility
 * - Drinks の request/response DTO
 * - short (公開) / long (get:drinks-detail 以上) の 2 つの表現
 * - validation (形式チェック) 用の validate()
 */
use serde::{Deserialize, Serialize};

use crate::repos::{DrinkRow, Ingredient};

/// Clients send either one ingredient object or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RecipeInput {
    Many(Vec<Ingredient>),
    One(Ingredient),
}

impl RecipeInput {
    fn into_vec(self) -> Vec<Ingredient> {
        match self {
            Self::Many(v) => v,
            Self::One(i) => vec![i],
        }
    }
}

fn validate_recipe(recipe: RecipeInput) -> Result<Vec<Ingredient>, &'static str> {
    let recipe = recipe.into_vec();
    if recipe.is_empty() {
        return Err("recipe needs at least one ingredient");
    }
    for ingredient in &recipe {
        if ingredient.name.trim().is_empty() || ingredient.color.trim().is_empty() {
            return Err("ingredient name and color are required");
        }
        if ingredient.parts == 0 {
            return Err("ingredient parts must be >= 1");
        }
    }
    Ok(recipe)
}

#[derive(Debug, Deserialize)]
pub struct CreateDrinkRequest {
    pub title: Option<String>,
    pub recipe: Option<RecipeInput>,
}

impl CreateDrinkRequest {
    pub fn validate(self) -> Result<(String, Vec<Ingredient>), &'static str> {
        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or("title is required")?;
        let recipe = self.recipe.ok_or("recipe is required")?;

        Ok((title, validate_recipe(recipe)?))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateDrinkRequest {
    pub title: Option<String>,
    pub recipe: Option<RecipeInput>,
}

impl UpdateDrinkRequest {
    /// Returns the fields to change; at least one must be present.
    pub fn validate(self) -> Result<(Option<String>, Option<Vec<Ingredient>>), &'static str> {
        if self.title.is_none() && self.recipe.is_none() {
            return Err("title or recipe is required");
        }

        let title = match self.title {
            Some(t) if t.trim().is_empty() => return Err("title cannot be empty"),
            Some(t) => Some(t.trim().to_string()),
            None => None,
        };
        let recipe = self.recipe.map(validate_recipe).transpose()?;

        Ok((title, recipe))
    }
}

#[derive(Debug, Serialize)]
pub struct ShortIngredient {
    pub color: String,
    pub parts: u32,
}

/// Public representation: no ingredient names.
#[derive(Debug, Serialize)]
pub struct DrinkShort {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<ShortIngredient>,
}

impl From<DrinkRow> for DrinkShort {
    fn from(row: DrinkRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            recipe: row
                .recipe
                .into_iter()
                .map(|i| ShortIngredient {
                    color: i.color,
                    parts: i.parts,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DrinkLong {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

impl From<DrinkRow> for DrinkLong {
    fn from(row: DrinkRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            recipe: row.recipe,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DrinksResponse<T> {
    pub success: bool,
    pub drinks: Vec<T>,
}

impl<T> DrinksResponse<T> {
    pub fn new(drinks: Vec<T>) -> Self {
        Self {
            success: true,
            drinks,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteDrinkResponse {
    pub success: bool,
    pub delete: i64,
}
