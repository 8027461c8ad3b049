//! Persistence for accounts, profiles and cycle records.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CycleRecord, NewCycleRecord, User, UserProfile};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Account data needed to create a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub salt: String,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
    pub salt: String,
}

/// Every query is scoped to a single account.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fails with `UserExists` when the email is taken. The profile starts at defaults.
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>>;

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>>;

    /// Writes the user-editable fields (age, location) only.
    /// Returns `false` if the user does not exist.
    async fn update_details(&self, user_id: Uuid, profile: &UserProfile) -> Result<bool>;

    /// Recompute the stored average cycle length from the records as they are
    /// now, optionally setting the age, and return the resulting profile.
    /// Calls for the same user are serialized so the last one sees every
    /// committed record; the location is never touched.
    async fn refresh_cycle_stats(&self, user_id: Uuid, age: Option<i32>) -> Result<UserProfile>;

    async fn create_record(&self, user_id: Uuid, record: NewCycleRecord) -> Result<CycleRecord>;

    /// Newest start date first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<CycleRecord>>;

    /// Deletes only if the record belongs to `user_id`.
    async fn delete_by_id(&self, user_id: Uuid, id: Uuid) -> Result<bool>;

    async fn delete_all_by_user(&self, user_id: Uuid) -> Result<u64>;
}

pub(crate) fn newest_first(records: &mut [CycleRecord]) {
    records.sort_by(|a, b| {
        b.start_date
            .cmp(&a.start_date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}
