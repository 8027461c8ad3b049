use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use super::{Credentials, NewUser, RecordStore};
use crate::error::{AppError, Result};
use crate::metrics::profile_average_cycle_length;
use crate::models::{CycleRecord, FlowIntensity, NewCycleRecord, PainLevel, User, UserProfile};

const SELECT_RECORDS: &str =
    "SELECT id, user_id, start_date, end_date, duration, cycle_length, flow_intensity,
            pain_level, symptoms, is_missed, is_pregnant, notes, created_at
     FROM cycle_records
     WHERE user_id = $1
     ORDER BY start_date DESC, created_at DESC";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool and bring the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("🗄️ Database migrations applied");

        Ok(Self::new(pool))
    }
}

fn profile_from_row(row: &PgRow) -> Result<UserProfile> {
    Ok(UserProfile {
        age: row.try_get("age")?,
        average_cycle_length: row.try_get("average_cycle_length")?,
        location: row.try_get("location")?,
    })
}

fn record_from_row(row: &PgRow) -> Result<CycleRecord> {
    let flow: String = row.try_get("flow_intensity")?;
    let pain: String = row.try_get("pain_level")?;

    Ok(CycleRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        duration: row.try_get("duration")?,
        cycle_length: row.try_get("cycle_length")?,
        flow_intensity: flow
            .parse::<FlowIntensity>()
            .map_err(|e| AppError::Corrupt(e.to_string()))?,
        pain_level: pain
            .parse::<PainLevel>()
            .map_err(|e| AppError::Corrupt(e.to_string()))?,
        symptoms: row.try_get("symptoms")?,
        is_missed: row.try_get("is_missed")?,
        is_pregnant: row.try_get("is_pregnant")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl RecordStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let id = Uuid::new_v4();
        let profile = UserProfile::default();

        sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, salt, age, average_cycle_length)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.salt)
        .bind(profile.age)
        .bind(profile.average_cycle_length)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => {
                tracing::info!("🔒 Email already registered: {}", user.email);
                AppError::UserExists
            }
            _ => AppError::Database(e),
        })?;

        Ok(User {
            id,
            email: user.email,
            name: user.name,
        })
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>> {
        let row = sqlx::query("SELECT id, email, name, password_hash, salt FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Credentials {
            user: User {
                id: row.try_get("id")?,
                email: row.try_get("email")?,
                name: row.try_get("name")?,
            },
            password_hash: row.try_get("password_hash")?,
            salt: row.try_get("salt")?,
        }))
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        let row = sqlx::query("SELECT age, average_cycle_length, location FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    async fn update_details(&self, user_id: Uuid, profile: &UserProfile) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET age = $2, location = $3 WHERE id = $1")
            .bind(user_id)
            .bind(profile.age)
            .bind(&profile.location)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn refresh_cycle_stats(&self, user_id: Uuid, age: Option<i32>) -> Result<UserProfile> {
        let mut tx = self.pool.begin().await?;

        // row lock serializes concurrent refreshes for this user
        let locked = sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(AppError::NotFound("User"));
        }

        let rows = sqlx::query(SELECT_RECORDS)
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;
        let records = rows.iter().map(record_from_row).collect::<Result<Vec<_>>>()?;
        let average = profile_average_cycle_length(&records);

        let row = sqlx::query(
            "UPDATE users SET average_cycle_length = $2, age = COALESCE($3, age)
             WHERE id = $1
             RETURNING age, average_cycle_length, location",
        )
        .bind(user_id)
        .bind(average)
        .bind(age)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        profile_from_row(&row)
    }

    async fn create_record(&self, user_id: Uuid, record: NewCycleRecord) -> Result<CycleRecord> {
        let record = record.into_record(Uuid::new_v4(), user_id, Utc::now());

        sqlx::query(
            "INSERT INTO cycle_records
                (id, user_id, start_date, end_date, duration, cycle_length, flow_intensity,
                 pain_level, symptoms, is_missed, is_pregnant, notes, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(record.duration)
        .bind(record.cycle_length)
        .bind(record.flow_intensity.as_str())
        .bind(record.pain_level.as_str())
        .bind(&record.symptoms)
        .bind(record.is_missed)
        .bind(record.is_pregnant)
        .bind(&record.notes)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<CycleRecord>> {
        let rows = sqlx::query(SELECT_RECORDS)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn delete_by_id(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cycle_records WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_by_user(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cycle_records WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
