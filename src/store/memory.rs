use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{newest_first, Credentials, NewUser, RecordStore};
use crate::error::{AppError, Result};
use crate::metrics::profile_average_cycle_length;
use crate::models::{CycleRecord, NewCycleRecord, User, UserProfile};

/// Process-local store for running without a database.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<Uuid, Account>,
    records: HashMap<Uuid, CycleRecord>,
}

struct Account {
    credentials: Credentials,
    profile: UserProfile,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut inner = self.inner.write().await;
        if inner
            .accounts
            .values()
            .any(|a| a.credentials.user.email == user.email)
        {
            return Err(AppError::UserExists);
        }

        let public = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
        };
        inner.accounts.insert(
            public.id,
            Account {
                credentials: Credentials {
                    user: public.clone(),
                    password_hash: user.password_hash,
                    salt: user.salt,
                },
                profile: UserProfile::default(),
            },
        );

        Ok(public)
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>> {
        let inner = self.inner.read().await;
        Ok(inner
            .accounts
            .values()
            .find(|a| a.credentials.user.email == email)
            .map(|a| a.credentials.clone()))
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        let inner = self.inner.read().await;
        Ok(inner.accounts.get(&user_id).map(|a| a.profile.clone()))
    }

    async fn update_details(&self, user_id: Uuid, profile: &UserProfile) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(match inner.accounts.get_mut(&user_id) {
            Some(account) => {
                account.profile.age = profile.age;
                account.profile.location = profile.location.clone();
                true
            }
            None => false,
        })
    }

    async fn refresh_cycle_stats(&self, user_id: Uuid, age: Option<i32>) -> Result<UserProfile> {
        let mut inner = self.inner.write().await;
        let records: Vec<CycleRecord> = inner
            .records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();

        let account = inner
            .accounts
            .get_mut(&user_id)
            .ok_or(AppError::NotFound("User"))?;
        account.profile.average_cycle_length = profile_average_cycle_length(&records);
        if let Some(age) = age {
            account.profile.age = age;
        }
        Ok(account.profile.clone())
    }

    async fn create_record(&self, user_id: Uuid, record: NewCycleRecord) -> Result<CycleRecord> {
        let record = record.into_record(Uuid::new_v4(), user_id, Utc::now());
        self.inner
            .write()
            .await
            .records
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<CycleRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<CycleRecord> = inner
            .records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut records);
        Ok(records)
    }

    async fn delete_by_id(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.records.get(&id).is_some_and(|r| r.user_id == user_id) {
            inner.records.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn delete_all_by_user(&self, user_id: Uuid) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.records.len();
        inner.records.retain(|_, r| r.user_id != user_id);
        Ok((before - inner.records.len()) as u64)
    }
}
