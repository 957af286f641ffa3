mod enums;
mod member;
mod recipe;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use enums::{Category, EnumStore, MeasurementSystem, MeasurementType, MeasurementUnit, Theme};
pub use member::{Member, MemberSettings, MemberStore, MemberUpdate, NewMember, SettingsUpdate};
pub use recipe::{
    Ingredient, Instruction, NewIngredient, NewRecipe, NewTimer, Recipe, RecipeDetail,
    RecipeFilter, RecipePage, RecipeStore, RecipeUpdate, SortOrder, Timer,
};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Set the schema version within a transaction.
    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        if version < 2 {
            self.migrate_v2().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                // Reference data
                "CREATE TABLE themes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT UNIQUE NOT NULL
                )",
                "CREATE TABLE categories (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT UNIQUE NOT NULL
                )",
                "CREATE TABLE measurement_systems (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT UNIQUE NOT NULL
                )",
                "CREATE TABLE measurement_types (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT UNIQUE NOT NULL
                )",
                "CREATE TABLE measurement_units (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    abbreviation TEXT NOT NULL,
                    measurement_system_id INTEGER NOT NULL REFERENCES measurement_systems(id),
                    measurement_type_id INTEGER NOT NULL REFERENCES measurement_types(id)
                )",
                // Members table
                "CREATE TABLE members (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    firstname TEXT NOT NULL,
                    lastname TEXT NOT NULL,
                    emailaddress TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    password TEXT NOT NULL,
                    ispremium INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_members_emailaddress ON members(emailaddress)",
                // One settings row per member
                "CREATE TABLE member_settings (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    member_id INTEGER UNIQUE NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                    theme_id INTEGER NOT NULL DEFAULT 1 REFERENCES themes(id),
                    measurement_system_id INTEGER NOT NULL DEFAULT 1 REFERENCES measurement_systems(id),
                    use_pantry INTEGER NOT NULL DEFAULT 0,
                    use_negative_pantry INTEGER NOT NULL DEFAULT 0,
                    display_nutritional_information INTEGER NOT NULL DEFAULT 0
                )",
                // Recipes and their child rows
                "CREATE TABLE recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    member_id INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL,
                    image TEXT,
                    rating INTEGER NOT NULL DEFAULT 0,
                    effort INTEGER NOT NULL DEFAULT 0,
                    measurement_system_id INTEGER NOT NULL REFERENCES measurement_systems(id),
                    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
                    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
                )",
                "CREATE INDEX idx_recipes_member_id ON recipes(member_id, created_at)",
                "CREATE TABLE recipe_categories (
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    category_id INTEGER NOT NULL REFERENCES categories(id),
                    PRIMARY KEY (recipe_id, category_id)
                )",
                "CREATE INDEX idx_recipe_categories_category ON recipe_categories(category_id)",
                "CREATE TABLE recipe_ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    title TEXT NOT NULL,
                    measurement_type_id INTEGER NOT NULL REFERENCES measurement_types(id),
                    measurement_unit_id INTEGER NOT NULL REFERENCES measurement_units(id),
                    measurement_amount REAL NOT NULL
                )",
                "CREATE INDEX idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_id)",
                "CREATE TABLE recipe_instructions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    title TEXT NOT NULL
                )",
                "CREATE INDEX idx_recipe_instructions_recipe ON recipe_instructions(recipe_id)",
                "CREATE TABLE recipe_timers (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    hours INTEGER NOT NULL DEFAULT 0,
                    minutes INTEGER NOT NULL DEFAULT 0
                )",
                "CREATE INDEX idx_recipe_timers_recipe ON recipe_timers(recipe_id)",
            ],
        )
        .await
    }

    async fn migrate_v2(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            2,
            &[
                "INSERT INTO themes (id, name) VALUES (1, 'Light'), (2, 'Dark')",
                "INSERT INTO measurement_systems (id, name) VALUES (1, 'Metric'), (2, 'Imperial')",
                "INSERT INTO measurement_types (id, name) VALUES (1, 'Weight'), (2, 'Volume'), (3, 'Quantity')",
                "INSERT INTO measurement_units (id, name, abbreviation, measurement_system_id, measurement_type_id) VALUES
                    (1, 'Gram', 'g', 1, 1),
                    (2, 'Kilogram', 'kg', 1, 1),
                    (3, 'Millilitre', 'ml', 1, 2),
                    (4, 'Litre', 'l', 1, 2),
                    (5, 'Ounce', 'oz', 2, 1),
                    (6, 'Pound', 'lb', 2, 1),
                    (7, 'Teaspoon', 'tsp', 2, 2),
                    (8, 'Tablespoon', 'tbsp', 2, 2),
                    (9, 'Cup', 'cup', 2, 2),
                    (10, 'Fluid ounce', 'fl oz', 2, 2),
                    (11, 'Piece', 'pc', 1, 3),
                    (12, 'Piece', 'pc', 2, 3)",
                "INSERT INTO categories (id, name) VALUES
                    (1, 'Breakfast'),
                    (2, 'Lunch'),
                    (3, 'Dinner'),
                    (4, 'Dessert'),
                    (5, 'Snack'),
                    (6, 'Side'),
                    (7, 'Drink'),
                    (8, 'Vegetarian'),
                    (9, 'Vegan')",
            ],
        )
        .await
    }

    /// Get the member store.
    pub fn members(&self) -> MemberStore {
        MemberStore::new(self.pool.clone())
    }

    /// Get the recipe store.
    pub fn recipes(&self) -> RecipeStore {
        RecipeStore::new(self.pool.clone())
    }

    /// Get the reference data store.
    pub fn enums(&self) -> EnumStore {
        EnumStore::new(self.pool.clone())
    }

    /// Get the underlying connection pool (for tests that need raw SQL access).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
