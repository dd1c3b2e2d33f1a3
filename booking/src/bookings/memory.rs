//! In-memory booking store with failure injection.

use super::{BookingStore, BookingStoreError, StoredBooking};
use crate::ticket::{BookingStatus, Pnr, Ticket};
use crate::types::UserId;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Rows in a `Vec`, in insertion order
///
/// Each operation can be told to fail, to exercise the unsynced-ticket and
/// failed-cancel paths.
#[derive(Clone, Debug, Default)]
pub struct InMemoryBookingStore {
    rows: Arc<Mutex<Vec<StoredBooking>>>,
    fail_inserts: Arc<AtomicBool>,
    fail_updates: Arc<AtomicBool>,
    fail_lists: Arc<AtomicBool>,
}

impl InMemoryBookingStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make inserts fail until reset
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make status updates fail until reset
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Make listings fail until reset
    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    /// Number of stored rows
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    /// Whether nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }

    /// Status column for a PNR
    pub async fn status_of(&self, pnr: &Pnr) -> Option<BookingStatus> {
        self.rows
            .lock()
            .await
            .iter()
            .find(|row| &row.pnr == pnr)
            .map(|row| row.status)
    }

    /// Insert a row directly, bypassing failure injection
    pub async fn seed(&self, row: StoredBooking) {
        self.rows.lock().await.push(row);
    }
}

fn injected(flag: &AtomicBool, operation: &str) -> Result<(), BookingStoreError> {
    if flag.load(Ordering::SeqCst) {
        return Err(BookingStoreError::Unavailable(format!("injected {operation} failure")));
    }
    Ok(())
}

impl BookingStore for InMemoryBookingStore {
    fn insert(&self, user_id: &UserId, ticket: &Ticket) -> BoxFuture<'static, Result<(), BookingStoreError>> {
        let this = self.clone();
        let row = StoredBooking {
            user_id: user_id.clone(),
            pnr: ticket.pnr.clone(),
            status: ticket.status,
            ticket: ticket.clone(),
            created_at: ticket.booked_at,
        };

        Box::pin(async move {
            injected(&this.fail_inserts, "insert")?;
            this.rows.lock().await.push(row);
            Ok(())
        })
    }

    fn update_status(
        &self,
        pnr: &Pnr,
        status: BookingStatus,
    ) -> BoxFuture<'static, Result<(), BookingStoreError>> {
        let this = self.clone();
        let pnr = pnr.clone();

        Box::pin(async move {
            injected(&this.fail_updates, "update")?;
            let mut rows = this.rows.lock().await;
            let row = rows
                .iter_mut()
                .find(|row| row.pnr == pnr)
                .ok_or(BookingStoreError::NotFound(pnr))?;
            row.status = status;
            Ok(())
        })
    }

    fn list_for_user(&self, user_id: &UserId) -> BoxFuture<'static, Result<Vec<StoredBooking>, BookingStoreError>> {
        let this = self.clone();
        let user_id = user_id.clone();

        Box::pin(async move {
            injected(&this.fail_lists, "list")?;
            let mut rows: Vec<StoredBooking> = this
                .rows
                .lock()
                .await
                .iter()
                .rev()
                .filter(|row| row.user_id == user_id)
                .cloned()
                .collect();
            // Stable: equal timestamps keep latest-inserted first.
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        })
    }
}
