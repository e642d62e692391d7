//! Registration storage.
//!
//! The portal only talks to [`RegistrationStore`]; the in-memory
//! implementation backs tests and single-node deployments.

use crate::models::{NewRegistration, RegistrationRecord, RegistrationStatus};
use crate::ticket::format_ticket;
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The phone number already belongs to a registration
    #[error("Nomor telepon sudah terdaftar")]
    Duplicate { ticket: String },

    /// No registration with this ticket
    #[error("Registration not found: {0}")]
    NotFound(String),

    /// Backend failure
    #[error("Storage error: {0}")]
    Backend(String),
}

/// Outcome of an admin review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve { division: String },
    Reject { reason: String },
}

/// Registration store trait for different storage backends.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Store a new registration and assign its ticket.
    ///
    /// Fails with [`StoreError::Duplicate`] when the phone number is taken.
    async fn create(&self, registration: NewRegistration) -> StoreResult<RegistrationRecord>;

    /// Look up a registration by ticket.
    async fn find(&self, ticket: &str) -> StoreResult<Option<RegistrationRecord>>;

    /// Apply an admin decision.
    async fn review(
        &self,
        ticket: &str,
        decision: ReviewDecision,
    ) -> StoreResult<RegistrationRecord>;

    /// Remove a registration.
    async fn delete(&self, ticket: &str) -> StoreResult<()>;

    /// Number of stored registrations.
    async fn count(&self) -> StoreResult<usize>;
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, RegistrationRecord>,
    // phone -> ticket
    phones: HashMap<String, String>,
    sequence: u64,
}

/// In-memory registration store.
#[derive(Default)]
pub struct InMemoryRegistrationStore {
    inner: RwLock<Inner>,
}

impl InMemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn create(&self, registration: NewRegistration) -> StoreResult<RegistrationRecord> {
        let mut inner = self.inner.write();

        if !registration.phone.is_empty()
            && let Some(ticket) = inner.phones.get(&registration.phone)
        {
            debug!(ticket = %ticket, "Duplicate phone number");
            return Err(StoreError::Duplicate {
                ticket: ticket.clone(),
            });
        }

        let year = Utc::now().year();
        let ticket = loop {
            inner.sequence += 1;
            let candidate = format_ticket(year, inner.sequence);
            if !inner.records.contains_key(&candidate) {
                break candidate;
            }
        };

        let record = RegistrationRecord::from_new(ticket.clone(), registration);
        if !record.phone.is_empty() {
            inner.phones.insert(record.phone.clone(), ticket.clone());
        }
        inner.records.insert(ticket.clone(), record.clone());

        info!(ticket = %ticket, status = %record.status, "Registration stored");
        Ok(record)
    }

    async fn find(&self, ticket: &str) -> StoreResult<Option<RegistrationRecord>> {
        Ok(self.inner.read().records.get(ticket).cloned())
    }

    async fn review(
        &self,
        ticket: &str,
        decision: ReviewDecision,
    ) -> StoreResult<RegistrationRecord> {
        let mut inner = self.inner.write();
        let record = inner
            .records
            .get_mut(ticket)
            .ok_or_else(|| StoreError::NotFound(ticket.to_string()))?;

        match decision {
            ReviewDecision::Approve { division } => {
                record.status = RegistrationStatus::Approved;
                record.assigned_division = Some(division);
                record.rejection_reason = None;
            }
            ReviewDecision::Reject { reason } => {
                record.status = RegistrationStatus::Rejected;
                record.rejection_reason = Some(reason);
                record.assigned_division = None;
            }
        }
        record.updated_at = Utc::now();

        info!(ticket = %ticket, status = %record.status, "Registration reviewed");
        Ok(record.clone())
    }

    async fn delete(&self, ticket: &str) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let record = inner
            .records
            .remove(ticket)
            .ok_or_else(|| StoreError::NotFound(ticket.to_string()))?;
        inner.phones.remove(&record.phone);

        info!(ticket = %ticket, "Registration deleted");
        Ok(())
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.inner.read().records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::has_valid_checksum;
    use serde_json::{Map, Value, json};

    fn registration(phone: &str) -> NewRegistration {
        let mut fields = Map::new();
        fields.insert("nama_lengkap".into(), json!("Siti Aminah"));
        fields.insert("nomor_telepon".into(), Value::String(phone.into()));
        NewRegistration::new(fields, Vec::new())
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = InMemoryRegistrationStore::new();
        let record = store.create(registration("081234567890")).await.unwrap();

        assert!(has_valid_checksum(&record.ticket));
        assert_eq!(record.status, RegistrationStatus::Pending);

        let found = store.find(&record.ticket).await.unwrap().unwrap();
        assert_eq!(found.text("nama_lengkap"), Some("Siti Aminah"));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_phone() {
        let store = InMemoryRegistrationStore::new();
        let first = store.create(registration("081234567890")).await.unwrap();

        let err = store
            .create(registration("+62 812-3456-7890"))
            .await
            .unwrap_err();
        match err {
            StoreError::Duplicate { ticket } => assert_eq!(ticket, first.ticket),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_tickets_are_unique() {
        let store = InMemoryRegistrationStore::new();
        let a = store.create(registration("081111111111")).await.unwrap();
        let b = store.create(registration("082222222222")).await.unwrap();
        assert_ne!(a.ticket, b.ticket);
    }

    #[tokio::test]
    async fn test_review_and_delete() {
        let store = InMemoryRegistrationStore::new();
        let record = store.create(registration("081234567890")).await.unwrap();

        let approved = store
            .review(
                &record.ticket,
                ReviewDecision::Approve {
                    division: "Seni".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(approved.status, RegistrationStatus::Approved);
        assert_eq!(approved.assigned_division.as_deref(), Some("Seni"));

        let rejected = store
            .review(
                &record.ticket,
                ReviewDecision::Reject {
                    reason: "Kuota penuh".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, RegistrationStatus::Rejected);
        assert!(rejected.assigned_division.is_none());

        store.delete(&record.ticket).await.unwrap();
        assert!(store.find(&record.ticket).await.unwrap().is_none());
        assert!(matches!(
            store.delete(&record.ticket).await,
            Err(StoreError::NotFound(_))
        ));

        // phone is free again
        store.create(registration("081234567890")).await.unwrap();
    }
}
