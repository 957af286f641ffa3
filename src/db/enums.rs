//! Read-only reference data: categories, themes and measurement enums.

use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct EnumStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Theme {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct MeasurementSystem {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct MeasurementType {
    pub id: i64,
    pub name: String,
}

/// A unit together with the system and type it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementUnit {
    pub id: i64,
    pub name: String,
    pub abbreviation: String,
    pub measurementsystemid: i64,
    pub measurementtypeid: i64,
    pub measurementsystem: MeasurementSystem,
    pub measurementtype: MeasurementType,
}

#[derive(sqlx::FromRow)]
struct MeasurementUnitRow {
    id: i64,
    name: String,
    abbreviation: String,
    system_id: i64,
    system_name: String,
    type_id: i64,
    type_name: String,
}

impl From<MeasurementUnitRow> for MeasurementUnit {
    fn from(row: MeasurementUnitRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            abbreviation: row.abbreviation,
            measurementsystemid: row.system_id,
            measurementtypeid: row.type_id,
            measurementsystem: MeasurementSystem {
                id: row.system_id,
                name: row.system_name,
            },
            measurementtype: MeasurementType {
                id: row.type_id,
                name: row.type_name,
            },
        }
    }
}

impl EnumStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn categories(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as("SELECT id, name FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn themes(&self) -> Result<Vec<Theme>, sqlx::Error> {
        sqlx::query_as("SELECT id, name FROM themes ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn measurement_systems(&self) -> Result<Vec<MeasurementSystem>, sqlx::Error> {
        sqlx::query_as("SELECT id, name FROM measurement_systems ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn measurement_types(&self) -> Result<Vec<MeasurementType>, sqlx::Error> {
        sqlx::query_as("SELECT id, name FROM measurement_types ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    /// List units with their system and type resolved.
    pub async fn measurement_units(&self) -> Result<Vec<MeasurementUnit>, sqlx::Error> {
        let rows: Vec<MeasurementUnitRow> = sqlx::query_as(
            "SELECT u.id, u.name, u.abbreviation,
                    s.id AS system_id, s.name AS system_name,
                    t.id AS type_id, t.name AS type_name
             FROM measurement_units u
             JOIN measurement_systems s ON s.id = u.measurement_system_id
             JOIN measurement_types t ON t.id = u.measurement_type_id
             ORDER BY u.id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(MeasurementUnit::from).collect())
    }
}
