//! In-memory [`AccountStore`] for tests and demos.

use super::{Account, AccountChanges, AccountStore, CreateOutcome, NewAccount, UpdateOutcome};
use crate::otp::secret::OtpSecret;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Lock-per-operation account store. Mirrors the atomicity the Postgres
/// implementation gets from single-statement writes: every trait method is
/// one critical section.
#[derive(Clone, Default)]
pub struct MemoryAccountStore {
    inner: Arc<Mutex<Vec<Account>>>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored accounts, for assertions in tests.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Account> {
        self.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Account>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create_with_secret(
        &self,
        new_account: NewAccount,
        secret: &OtpSecret,
    ) -> Result<CreateOutcome> {
        let mut accounts = self.lock();
        if accounts
            .iter()
            .any(|account| account.email == new_account.email)
        {
            return Ok(CreateOutcome::Conflict);
        }
        let account = Account {
            id: Uuid::new_v4(),
            email: new_account.email,
            password_hash: new_account.password_hash,
            otp_secret: Some(secret.clone()),
            otp_required: true,
            created_at: Utc::now(),
        };
        accounts.push(account.clone());
        Ok(CreateOutcome::Created(account))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .lock()
            .iter()
            .find(|account| account.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.lock().iter().find(|account| account.id == id).cloned())
    }

    async fn update_fields(&self, id: Uuid, changes: AccountChanges) -> Result<UpdateOutcome> {
        let mut accounts = self.lock();
        if let Some(new_email) = &changes.email {
            if accounts
                .iter()
                .any(|account| account.id != id && &account.email == new_email)
            {
                return Ok(UpdateOutcome::Conflict);
            }
        }
        let Some(account) = accounts.iter_mut().find(|account| account.id == id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if let Some(email) = changes.email {
            account.email = email;
        }
        if let Some(password_hash) = changes.password_hash {
            account.password_hash = password_hash;
        }
        Ok(UpdateOutcome::Updated(account.clone()))
    }
}
