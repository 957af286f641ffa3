use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct MemberStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct Member {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub emailaddress: String,
    pub password_hash: String,
    pub ispremium: bool,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    id: i64,
    firstname: String,
    lastname: String,
    emailaddress: String,
    password: String,
    ispremium: bool,
    created_at: String,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Self {
            id: row.id,
            firstname: row.firstname,
            lastname: row.lastname,
            emailaddress: row.emailaddress,
            password_hash: row.password,
            ispremium: row.ispremium,
            created_at: row.created_at,
        }
    }
}

/// Per-member preferences.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct MemberSettings {
    pub id: i64,
    pub theme: i64,
    pub measurementsystem: i64,
    pub usepantry: bool,
    pub usenegativepantry: bool,
    pub displaynutritionalinformation: bool,
}

pub struct NewMember<'a> {
    pub firstname: &'a str,
    pub lastname: &'a str,
    pub emailaddress: &'a str,
    pub password_hash: &'a str,
    pub ispremium: bool,
}

/// Partial member update. `None` leaves a column unchanged.
#[derive(Debug, Default)]
pub struct MemberUpdate {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub emailaddress: Option<String>,
    pub ispremium: Option<bool>,
}

/// Partial settings update. `None` leaves a column unchanged.
#[derive(Debug, Default)]
pub struct SettingsUpdate {
    pub theme: Option<i64>,
    pub measurementsystem: Option<i64>,
    pub usepantry: Option<bool>,
    pub usenegativepantry: Option<bool>,
    pub displaynutritionalinformation: Option<bool>,
}

impl MemberStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a member together with its default settings row. Returns the member ID.
    pub async fn create(&self, member: &NewMember<'_>) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO members (firstname, lastname, emailaddress, password, ispremium) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(member.firstname)
        .bind(member.lastname)
        .bind(member.emailaddress)
        .bind(member.password_hash)
        .bind(member.ispremium)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        sqlx::query("INSERT INTO member_settings (member_id) VALUES (?)")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Get a member by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Member>, sqlx::Error> {
        let row: Option<MemberRow> = sqlx::query_as(
            "SELECT id, firstname, lastname, emailaddress, password, ispremium, created_at
             FROM members WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Member::from))
    }

    /// Get a member by email address (case-insensitive).
    pub async fn get_by_email(&self, emailaddress: &str) -> Result<Option<Member>, sqlx::Error> {
        let row: Option<MemberRow> = sqlx::query_as(
            "SELECT id, firstname, lastname, emailaddress, password, ispremium, created_at
             FROM members WHERE emailaddress = ?",
        )
        .bind(emailaddress)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Member::from))
    }

    /// Check whether an email address is already registered (case-insensitive).
    pub async fn email_taken(&self, emailaddress: &str) -> Result<bool, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM members WHERE emailaddress = ?")
            .bind(emailaddress)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Apply a partial update. Returns true if the member exists.
    pub async fn update(&self, id: i64, update: &MemberUpdate) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE members SET
                firstname = COALESCE(?, firstname),
                lastname = COALESCE(?, lastname),
                emailaddress = COALESCE(?, emailaddress),
                ispremium = COALESCE(?, ispremium)
             WHERE id = ?",
        )
        .bind(update.firstname.as_deref())
        .bind(update.lastname.as_deref())
        .bind(update.emailaddress.as_deref())
        .bind(update.ispremium)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the stored password hash.
    pub async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE members SET password = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a member. Settings and recipes cascade.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM members WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Get the settings row of a member.
    pub async fn get_settings(&self, member_id: i64) -> Result<Option<MemberSettings>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id,
                    theme_id AS theme,
                    measurement_system_id AS measurementsystem,
                    use_pantry AS usepantry,
                    use_negative_pantry AS usenegativepantry,
                    display_nutritional_information AS displaynutritionalinformation
             FROM member_settings WHERE member_id = ?",
        )
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Apply a partial settings update. Returns true if the settings row exists.
    pub async fn update_settings(
        &self,
        member_id: i64,
        update: &SettingsUpdate,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE member_settings SET
                theme_id = COALESCE(?, theme_id),
                measurement_system_id = COALESCE(?, measurement_system_id),
                use_pantry = COALESCE(?, use_pantry),
                use_negative_pantry = COALESCE(?, use_negative_pantry),
                display_nutritional_information = COALESCE(?, display_nutritional_information)
             WHERE member_id = ?",
        )
        .bind(update.theme)
        .bind(update.measurementsystem)
        .bind(update.usepantry)
        .bind(update.usenegativepantry)
        .bind(update.displaynutritionalinformation)
        .bind(member_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
