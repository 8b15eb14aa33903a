//! Membership Store
//!
//! Persistence contract for members and membership sales. The production
//! backend is PostgreSQL; tests and local development run on the in-memory
//! store.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::model::{MembershipSale, PaymentStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    /// No member row matches the supplied (first name, last name, email).
    #[error("no member matches the supplied name and email")]
    MemberNotFound,

    /// No sale row with this id.
    #[error("membership sale {0} not found")]
    SaleNotFound(i64),

    /// Failure inside a concrete backend: connectivity, SQL, corrupt rows.
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }
}

/// Store of members and their sales.
///
/// Reads and the initial sale insert run on their own connections;
/// [`begin`](Self::begin) opens the transaction the completion step uses so
/// its writes land atomically.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Resolve a member id from the exact (first name, last name, email)
    /// triple. The triple is relied upon to identify one member.
    async fn find_member(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<i64, StoreError>;

    /// Persist a new sale in `Pending` state and return the assigned id.
    async fn create_sale(&self, sale: &MembershipSale) -> Result<i64, StoreError>;

    async fn get_sale(&self, sale_id: i64) -> Result<MembershipSale, StoreError>;

    /// Open a transaction for the completion writes.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;
}

/// One open transaction. Dropping it without [`commit`](Self::commit)
/// rolls every staged write back.
///
/// Member updates return [`StoreError::MemberNotFound`] when the id matches
/// no row, so a completion against a vanished member aborts instead of
/// silently doing nothing.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Reload a sale inside the transaction, holding a row lock where the
    /// backend supports one. Concurrent completions for the same sale
    /// serialize here.
    async fn lock_sale(&mut self, sale_id: i64) -> Result<MembershipSale, StoreError>;

    /// Move the member's paid-up date to 31 December of the given year.
    async fn set_end_date(
        &mut self,
        member_id: i64,
        membership_year: i32,
    ) -> Result<(), StoreError>;

    async fn set_date_last_paid(
        &mut self,
        member_id: i64,
        paid_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn set_last_payment(
        &mut self,
        member_id: i64,
        amount: Decimal,
    ) -> Result<(), StoreError>;

    async fn set_donation_to_society(
        &mut self,
        member_id: i64,
        amount: Decimal,
    ) -> Result<(), StoreError>;

    async fn set_donation_to_museum(
        &mut self,
        member_id: i64,
        amount: Decimal,
    ) -> Result<(), StoreError>;

    async fn set_friend_tickbox(
        &mut self,
        member_id: i64,
        is_friend: bool,
    ) -> Result<(), StoreError>;

    async fn set_members_at_address(
        &mut self,
        member_id: i64,
        count: i32,
    ) -> Result<(), StoreError>;

    async fn set_friends_at_address(
        &mut self,
        member_id: i64,
        count: i32,
    ) -> Result<(), StoreError>;

    async fn update_sale(
        &mut self,
        sale_id: i64,
        status: PaymentStatus,
        session_id: &str,
    ) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
