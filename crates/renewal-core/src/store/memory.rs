//! In-memory store for tests and local development.
//!
//! A transaction takes the store lock for its whole lifetime and works on a
//! staged copy of the data, so commit is a single write-back and drop is a
//! rollback. Good enough for a test double; the real backend is PostgreSQL.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::{Member, MembershipSale, PaymentStatus, end_of_year};
use crate::store::{MembershipStore, StoreError, StoreTransaction};

#[derive(Clone, Default)]
struct Inner {
    members: HashMap<i64, Member>,
    sales: BTreeMap<i64, MembershipSale>,
    next_sale_id: i64,
}

impl Inner {
    fn member_mut(&mut self, member_id: i64) -> Result<&mut Member, StoreError> {
        self.members
            .get_mut(&member_id)
            .ok_or(StoreError::MemberNotFound)
    }
}

pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Seed a member, replacing any existing one with the same id.
    pub async fn add_member(&self, member: Member) {
        let mut inner = self.inner.lock().await;
        inner.members.insert(member.member_id, member);
    }

    /// Snapshot of one member, for assertions.
    pub async fn member(&self, member_id: i64) -> Option<Member> {
        let inner = self.inner.lock().await;
        inner.members.get(&member_id).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn find_member(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<i64, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .members
            .values()
            .find(|m| m.first_name == first_name && m.last_name == last_name && m.email == email)
            .map(|m| m.member_id)
            .ok_or(StoreError::MemberNotFound)
    }

    async fn create_sale(&self, sale: &MembershipSale) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_sale_id += 1;
        let sale_id = inner.next_sale_id;

        let mut stored = sale.clone();
        stored.sale_id = sale_id;
        stored.payment_status = PaymentStatus::Pending;
        inner.sales.insert(sale_id, stored);
        Ok(sale_id)
    }

    async fn get_sale(&self, sale_id: i64) -> Result<MembershipSale, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .sales
            .get(&sale_id)
            .cloned()
            .ok_or(StoreError::SaleNotFound(sale_id))
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let guard = Arc::clone(&self.inner).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, staged }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<Inner>,
    staged: Inner,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn lock_sale(&mut self, sale_id: i64) -> Result<MembershipSale, StoreError> {
        self.staged
            .sales
            .get(&sale_id)
            .cloned()
            .ok_or(StoreError::SaleNotFound(sale_id))
    }

    async fn set_end_date(
        &mut self,
        member_id: i64,
        membership_year: i32,
    ) -> Result<(), StoreError> {
        self.staged.member_mut(member_id)?.end_date = end_of_year(membership_year);
        Ok(())
    }

    async fn set_date_last_paid(
        &mut self,
        member_id: i64,
        paid_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.staged.member_mut(member_id)?.date_last_paid = Some(paid_at);
        Ok(())
    }

    async fn set_last_payment(
        &mut self,
        member_id: i64,
        amount: Decimal,
    ) -> Result<(), StoreError> {
        self.staged.member_mut(member_id)?.last_payment = amount;
        Ok(())
    }

    async fn set_donation_to_society(
        &mut self,
        member_id: i64,
        amount: Decimal,
    ) -> Result<(), StoreError> {
        self.staged.member_mut(member_id)?.donation_to_society = amount;
        Ok(())
    }

    async fn set_donation_to_museum(
        &mut self,
        member_id: i64,
        amount: Decimal,
    ) -> Result<(), StoreError> {
        self.staged.member_mut(member_id)?.donation_to_museum = amount;
        Ok(())
    }

    async fn set_friend_tickbox(
        &mut self,
        member_id: i64,
        is_friend: bool,
    ) -> Result<(), StoreError> {
        self.staged.member_mut(member_id)?.is_friend_of_museum = is_friend;
        Ok(())
    }

    async fn set_members_at_address(
        &mut self,
        member_id: i64,
        count: i32,
    ) -> Result<(), StoreError> {
        self.staged.member_mut(member_id)?.members_at_address = count;
        Ok(())
    }

    async fn set_friends_at_address(
        &mut self,
        member_id: i64,
        count: i32,
    ) -> Result<(), StoreError> {
        self.staged.member_mut(member_id)?.friends_at_address = count;
        Ok(())
    }

    async fn update_sale(
        &mut self,
        sale_id: i64,
        status: PaymentStatus,
        session_id: &str,
    ) -> Result<(), StoreError> {
        let sale = self
            .staged
            .sales
            .get_mut(&sale_id)
            .ok_or(StoreError::SaleNotFound(sale_id))?;
        sale.payment_status = status;
        sale.payment_session_id = session_id.to_string();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::FeeCatalog;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn fees() -> FeeCatalog {
        FeeCatalog {
            ordinary: dec!(24.00),
            associate: dec!(6.00),
            friend: dec!(5.00),
        }
    }

    fn pending_sale(full_member_id: i64) -> MembershipSale {
        MembershipSale::for_renewal(
            2025,
            fees(),
            full_member_id,
            false,
            None,
            Decimal::ZERO,
            Decimal::ZERO,
            "Stripe",
        )
    }

    #[tokio::test]
    async fn test_find_member_by_exact_triple() {
        let store = MemoryStore::new();
        store.add_member(Member::new(42, "a", "b", "a@b.com")).await;

        assert_eq!(store.find_member("a", "b", "a@b.com").await.unwrap(), 42);
        assert!(matches!(
            store.find_member("a", "b", "other@b.com").await,
            Err(StoreError::MemberNotFound)
        ));
    }

    #[tokio::test]
    async fn test_create_and_get_sale() {
        let store = MemoryStore::new();
        let first = store.create_sale(&pending_sale(42)).await.unwrap();
        let second = store.create_sale(&pending_sale(43)).await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);

        let sale = store.get_sale(first).await.unwrap();
        assert_eq!(sale.sale_id, first);
        assert_eq!(sale.full_member_id, 42);
        assert_eq!(sale.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_get_missing_sale() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_sale(9).await,
            Err(StoreError::SaleNotFound(9))
        ));
    }

    #[tokio::test]
    async fn test_commit_applies_staged_writes() {
        let store = MemoryStore::new();
        store.add_member(Member::new(42, "a", "b", "a@b.com")).await;
        let sale_id = store.create_sale(&pending_sale(42)).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.lock_sale(sale_id).await.unwrap();
        tx.set_end_date(42, 2025).await.unwrap();
        tx.set_last_payment(42, dec!(24.00)).await.unwrap();
        tx.update_sale(sale_id, PaymentStatus::Complete, "cs_test_1")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let member = store.member(42).await.unwrap();
        assert_eq!(
            member.end_date,
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
        assert_eq!(member.last_payment, dec!(24.00));

        let sale = store.get_sale(sale_id).await.unwrap();
        assert_eq!(sale.payment_status, PaymentStatus::Complete);
        assert_eq!(sale.payment_session_id, "cs_test_1");
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = MemoryStore::new();
        store.add_member(Member::new(42, "a", "b", "a@b.com")).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.set_last_payment(42, dec!(99.00)).await.unwrap();
            // No commit.
        }

        let member = store.member(42).await.unwrap();
        assert_eq!(member.last_payment, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_transaction_rejects_unknown_rows() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        assert!(matches!(
            tx.lock_sale(5).await,
            Err(StoreError::SaleNotFound(5))
        ));
        assert!(matches!(
            tx.set_friend_tickbox(8, true).await,
            Err(StoreError::MemberNotFound)
        ));
    }
}
