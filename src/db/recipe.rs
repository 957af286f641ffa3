//! Recipe storage with nested categories, ingredients, instructions and timers.
//!
//! Child rows are never edited in place: writes that touch a collection
//! delete and recreate it inside the same transaction as the recipe row.

use serde::Serialize;
use sqlx::SqliteConnection;
use sqlx::sqlite::SqlitePool;

use super::enums::{Category, MeasurementSystem, MeasurementType};

#[derive(Clone)]
pub struct RecipeStore {
    pool: SqlitePool,
}

/// Recipe row with its measurement system resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub id: i64,
    #[serde(rename = "memberid")]
    pub member_id: i64,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub rating: i64,
    pub effort: i64,
    #[serde(rename = "measurementsystemid")]
    pub measurement_system_id: i64,
    #[serde(rename = "createdat")]
    pub created_at: String,
    #[serde(rename = "updatedat")]
    pub updated_at: String,
    pub measurementsystem: MeasurementSystem,
}

/// Full recipe with all child collections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub recipecategories: Vec<Category>,
    pub recipeingredients: Vec<Ingredient>,
    pub recipeinstructions: Vec<Instruction>,
    pub recipetimers: Vec<Timer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitRef {
    pub id: i64,
    pub name: String,
    pub abbreviation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ingredient {
    pub id: i64,
    pub title: String,
    pub measurementamount: f64,
    pub measurementtypeid: i64,
    pub measurementunitid: i64,
    pub measurementtype: MeasurementType,
    pub measurementunit: UnitRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Instruction {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Timer {
    pub id: i64,
    pub title: String,
    pub hours: i64,
    pub minutes: i64,
}

#[derive(sqlx::FromRow)]
struct RecipeRow {
    id: i64,
    member_id: i64,
    title: String,
    description: String,
    image: Option<String>,
    rating: i64,
    effort: i64,
    measurement_system_id: i64,
    measurement_system_name: String,
    created_at: String,
    updated_at: String,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Self {
            id: row.id,
            member_id: row.member_id,
            title: row.title,
            description: row.description,
            image: row.image,
            rating: row.rating,
            effort: row.effort,
            measurement_system_id: row.measurement_system_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            measurementsystem: MeasurementSystem {
                id: row.measurement_system_id,
                name: row.measurement_system_name,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct IngredientRow {
    id: i64,
    title: String,
    measurement_amount: f64,
    type_id: i64,
    type_name: String,
    unit_id: i64,
    unit_name: String,
    unit_abbreviation: String,
}

impl From<IngredientRow> for Ingredient {
    fn from(row: IngredientRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            measurementamount: row.measurement_amount,
            measurementtypeid: row.type_id,
            measurementunitid: row.unit_id,
            measurementtype: MeasurementType {
                id: row.type_id,
                name: row.type_name,
            },
            measurementunit: UnitRef {
                id: row.unit_id,
                name: row.unit_name,
                abbreviation: row.unit_abbreviation,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewIngredient {
    pub title: String,
    pub measurement_type_id: i64,
    pub measurement_unit_id: i64,
    pub measurement_amount: f64,
}

#[derive(Debug, Clone)]
pub struct NewTimer {
    pub title: String,
    pub hours: i64,
    pub minutes: i64,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub member_id: i64,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub rating: i64,
    pub effort: i64,
    pub measurement_system_id: i64,
    pub categories: Vec<i64>,
    pub ingredients: Vec<NewIngredient>,
    pub instructions: Vec<String>,
    pub timers: Vec<NewTimer>,
}

/// Partial recipe update. `None` leaves a column or collection untouched;
/// `Some` collections replace the existing rows.
#[derive(Debug, Clone, Default)]
pub struct RecipeUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub rating: Option<i64>,
    pub effort: Option<i64>,
    pub measurement_system_id: Option<i64>,
    pub categories: Option<Vec<i64>>,
    pub ingredients: Option<Vec<NewIngredient>>,
    pub instructions: Option<Vec<String>>,
    pub timers: Option<Vec<NewTimer>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Listing filter. Recipes must meet the minimum rating and effort and,
/// when `category_ids` is non-empty, belong to at least one of them.
#[derive(Debug, Clone)]
pub struct RecipeFilter {
    pub member_id: i64,
    pub min_rating: i64,
    pub min_effort: i64,
    pub category_ids: Vec<i64>,
    pub order: SortOrder,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone)]
pub struct RecipePage {
    pub recipes: Vec<RecipeDetail>,
    pub total_count: i64,
}

const LIST_ASC: &str = "SELECT r.id, r.member_id, r.title, r.description, r.image, r.rating, r.effort,
        r.measurement_system_id, s.name AS measurement_system_name, r.created_at, r.updated_at
     FROM recipes r
     JOIN measurement_systems s ON s.id = r.measurement_system_id
     WHERE r.member_id = ? AND r.rating >= ? AND r.effort >= ?
       AND (json_array_length(?) = 0 OR r.id IN (
            SELECT recipe_id FROM recipe_categories
            WHERE category_id IN (SELECT value FROM json_each(?))))
     ORDER BY r.created_at ASC, r.id ASC
     LIMIT ? OFFSET ?";

const LIST_DESC: &str = "SELECT r.id, r.member_id, r.title, r.description, r.image, r.rating, r.effort,
        r.measurement_system_id, s.name AS measurement_system_name, r.created_at, r.updated_at
     FROM recipes r
     JOIN measurement_systems s ON s.id = r.measurement_system_id
     WHERE r.member_id = ? AND r.rating >= ? AND r.effort >= ?
       AND (json_array_length(?) = 0 OR r.id IN (
            SELECT recipe_id FROM recipe_categories
            WHERE category_id IN (SELECT value FROM json_each(?))))
     ORDER BY r.created_at DESC, r.id DESC
     LIMIT ? OFFSET ?";

const COUNT: &str = "SELECT COUNT(*) FROM recipes r
     WHERE r.member_id = ? AND r.rating >= ? AND r.effort >= ?
       AND (json_array_length(?) = 0 OR r.id IN (
            SELECT recipe_id FROM recipe_categories
            WHERE category_id IN (SELECT value FROM json_each(?))))";

impl RecipeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a recipe and all of its child rows atomically. Returns the recipe ID.
    pub async fn create(&self, recipe: &NewRecipe) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO recipes (member_id, title, description, image, rating, effort, measurement_system_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(recipe.member_id)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(recipe.image.as_deref())
        .bind(recipe.rating)
        .bind(recipe.effort)
        .bind(recipe.measurement_system_id)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        insert_categories(&mut tx, id, &recipe.categories).await?;
        insert_ingredients(&mut tx, id, &recipe.ingredients).await?;
        insert_instructions(&mut tx, id, &recipe.instructions).await?;
        insert_timers(&mut tx, id, &recipe.timers).await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Get a recipe with all child collections.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<RecipeDetail>, sqlx::Error> {
        let row: Option<RecipeRow> = sqlx::query_as(
            "SELECT r.id, r.member_id, r.title, r.description, r.image, r.rating, r.effort,
                    r.measurement_system_id, s.name AS measurement_system_name, r.created_at, r.updated_at
             FROM recipes r
             JOIN measurement_systems s ON s.id = r.measurement_system_id
             WHERE r.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.load_detail(row.into()).await?)),
            None => Ok(None),
        }
    }

    /// List a member's recipes matching the filter, one page at a time.
    pub async fn list_by_member(&self, filter: &RecipeFilter) -> Result<RecipePage, sqlx::Error> {
        let categories = serde_json::to_string(&filter.category_ids)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let page_size = i64::from(filter.page_size.max(1));
        let offset = i64::from(filter.page.max(1) - 1) * page_size;

        let query = match filter.order {
            SortOrder::Asc => LIST_ASC,
            SortOrder::Desc => LIST_DESC,
        };

        let rows: Vec<RecipeRow> = sqlx::query_as(query)
            .bind(filter.member_id)
            .bind(filter.min_rating)
            .bind(filter.min_effort)
            .bind(&categories)
            .bind(&categories)
            .bind(page_size)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let (total_count,): (i64,) = sqlx::query_as(COUNT)
            .bind(filter.member_id)
            .bind(filter.min_rating)
            .bind(filter.min_effort)
            .bind(&categories)
            .bind(&categories)
            .fetch_one(&self.pool)
            .await?;

        let mut recipes = Vec::with_capacity(rows.len());
        for row in rows {
            recipes.push(self.load_detail(row.into()).await?);
        }

        Ok(RecipePage {
            recipes,
            total_count,
        })
    }

    /// Apply a partial update atomically. Returns true if the recipe exists.
    pub async fn update(&self, id: i64, update: &RecipeUpdate) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE recipes SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                image = COALESCE(?, image),
                rating = COALESCE(?, rating),
                effort = COALESCE(?, effort),
                measurement_system_id = COALESCE(?, measurement_system_id),
                updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
             WHERE id = ?",
        )
        .bind(update.title.as_deref())
        .bind(update.description.as_deref())
        .bind(update.image.as_deref())
        .bind(update.rating)
        .bind(update.effort)
        .bind(update.measurement_system_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(categories) = &update.categories {
            sqlx::query("DELETE FROM recipe_categories WHERE recipe_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_categories(&mut tx, id, categories).await?;
        }
        if let Some(ingredients) = &update.ingredients {
            sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_ingredients(&mut tx, id, ingredients).await?;
        }
        if let Some(instructions) = &update.instructions {
            sqlx::query("DELETE FROM recipe_instructions WHERE recipe_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_instructions(&mut tx, id, instructions).await?;
        }
        if let Some(timers) = &update.timers {
            sqlx::query("DELETE FROM recipe_timers WHERE recipe_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_timers(&mut tx, id, timers).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Delete a recipe. Child rows cascade.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn load_detail(&self, recipe: Recipe) -> Result<RecipeDetail, sqlx::Error> {
        let recipecategories: Vec<Category> = sqlx::query_as(
            "SELECT c.id, c.name FROM recipe_categories rc
             JOIN categories c ON c.id = rc.category_id
             WHERE rc.recipe_id = ? ORDER BY c.id",
        )
        .bind(recipe.id)
        .fetch_all(&self.pool)
        .await?;

        let ingredient_rows: Vec<IngredientRow> = sqlx::query_as(
            "SELECT i.id, i.title, i.measurement_amount,
                    t.id AS type_id, t.name AS type_name,
                    u.id AS unit_id, u.name AS unit_name, u.abbreviation AS unit_abbreviation
             FROM recipe_ingredients i
             JOIN measurement_types t ON t.id = i.measurement_type_id
             JOIN measurement_units u ON u.id = i.measurement_unit_id
             WHERE i.recipe_id = ? ORDER BY i.position",
        )
        .bind(recipe.id)
        .fetch_all(&self.pool)
        .await?;

        let recipeinstructions: Vec<Instruction> = sqlx::query_as(
            "SELECT id, title FROM recipe_instructions WHERE recipe_id = ? ORDER BY position",
        )
        .bind(recipe.id)
        .fetch_all(&self.pool)
        .await?;

        let recipetimers: Vec<Timer> = sqlx::query_as(
            "SELECT id, title, hours, minutes FROM recipe_timers WHERE recipe_id = ? ORDER BY id",
        )
        .bind(recipe.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(RecipeDetail {
            recipe,
            recipecategories,
            recipeingredients: ingredient_rows.into_iter().map(Ingredient::from).collect(),
            recipeinstructions,
            recipetimers,
        })
    }
}

async fn insert_categories(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    categories: &[i64],
) -> Result<(), sqlx::Error> {
    for category_id in categories {
        sqlx::query("INSERT OR IGNORE INTO recipe_categories (recipe_id, category_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(category_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_ingredients(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    ingredients: &[NewIngredient],
) -> Result<(), sqlx::Error> {
    for (position, ingredient) in ingredients.iter().enumerate() {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, position, title, measurement_type_id, measurement_unit_id, measurement_amount)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(recipe_id)
        .bind(position as i64)
        .bind(&ingredient.title)
        .bind(ingredient.measurement_type_id)
        .bind(ingredient.measurement_unit_id)
        .bind(ingredient.measurement_amount)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_instructions(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    instructions: &[String],
) -> Result<(), sqlx::Error> {
    for (position, title) in instructions.iter().enumerate() {
        sqlx::query("INSERT INTO recipe_instructions (recipe_id, position, title) VALUES (?, ?, ?)")
            .bind(recipe_id)
            .bind(position as i64)
            .bind(title)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_timers(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    timers: &[NewTimer],
) -> Result<(), sqlx::Error> {
    for timer in timers {
        sqlx::query("INSERT INTO recipe_timers (recipe_id, title, hours, minutes) VALUES (?, ?, ?, ?)")
            .bind(recipe_id)
            .bind(&timer.title)
            .bind(timer.hours)
            .bind(timer.minutes)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
