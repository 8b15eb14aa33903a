//! PostgreSQL Membership Store
//!
//! Implements the store contract over a `sqlx` pool. Reads and the initial
//! sale insert run on pool connections; completion writes run inside one
//! transaction that locks the sale row first, so a replayed callback
//! serializes behind the first and sees its result.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgQueryResult};
use sqlx::{PgPool, Postgres, Transaction};

use renewal_core::model::{MembershipSale, PaymentStatus, end_of_year};
use renewal_core::store::{MembershipStore, StoreError, StoreTransaction};

const SALE_COLUMNS: &str = "sale_id, membership_year, full_member_id, full_member_fee, \
     full_member_is_friend, full_member_friend_fee, associate_member_id, associate_member_fee, \
     associate_member_is_friend, associate_member_friend_fee, donation_to_society, \
     donation_to_museum, payment_service, payment_status, payment_session_id";

/// PostgreSQL-backed membership store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect, then run the embedded migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(StoreError::backend)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool; migrations are the caller's business.
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipStore for PgStore {
    async fn find_member(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<i64, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT member_id FROM members \
             WHERE first_name = $1 AND last_name = $2 AND email = $3",
        )
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.map(|(member_id,)| member_id)
            .ok_or(StoreError::MemberNotFound)
    }

    async fn create_sale(&self, sale: &MembershipSale) -> Result<i64, StoreError> {
        let (sale_id,): (i64,) = sqlx::query_as(
            "INSERT INTO membership_sales (membership_year, full_member_id, full_member_fee, \
             full_member_is_friend, full_member_friend_fee, associate_member_id, \
             associate_member_fee, associate_member_is_friend, associate_member_friend_fee, \
             donation_to_society, donation_to_museum, payment_service, payment_status, \
             payment_session_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING sale_id",
        )
        .bind(sale.membership_year)
        .bind(sale.full_member_id)
        .bind(sale.full_member_fee)
        .bind(sale.full_member_is_friend)
        .bind(sale.full_member_friend_fee)
        .bind(sale.associate_member_id)
        .bind(sale.associate_member_fee)
        .bind(sale.associate_member_is_friend)
        .bind(sale.associate_member_friend_fee)
        .bind(sale.donation_to_society)
        .bind(sale.donation_to_museum)
        .bind(&sale.payment_service)
        .bind(PaymentStatus::Pending.as_str())
        .bind("")
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(sale_id)
    }

    async fn get_sale(&self, sale_id: i64) -> Result<MembershipSale, StoreError> {
        let row: Option<SaleRow> = sqlx::query_as(&format!(
            "SELECT {SALE_COLUMNS} FROM membership_sales WHERE sale_id = $1"
        ))
        .bind(sale_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.ok_or(StoreError::SaleNotFound(sale_id))?.into_sale()
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let tx = self.pool.begin().await.map_err(StoreError::backend)?;
        Ok(Box::new(PgTransaction { tx }))
    }
}

/// One open transaction; dropped without commit means rolled back.
struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgTransaction {
    async fn update_member(
        &mut self,
        query: sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<(), StoreError> {
        let result = query
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::backend)?;
        member_row_updated(result)
    }
}

fn member_row_updated(result: PgQueryResult) -> Result<(), StoreError> {
    if result.rows_affected() == 0 {
        Err(StoreError::MemberNotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn lock_sale(&mut self, sale_id: i64) -> Result<MembershipSale, StoreError> {
        let row: Option<SaleRow> = sqlx::query_as(&format!(
            "SELECT {SALE_COLUMNS} FROM membership_sales WHERE sale_id = $1 FOR UPDATE"
        ))
        .bind(sale_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(StoreError::backend)?;

        row.ok_or(StoreError::SaleNotFound(sale_id))?.into_sale()
    }

    async fn set_end_date(
        &mut self,
        member_id: i64,
        membership_year: i32,
    ) -> Result<(), StoreError> {
        self.update_member(
            sqlx::query("UPDATE members SET end_date = $1 WHERE member_id = $2")
                .bind(end_of_year(membership_year))
                .bind(member_id),
        )
        .await
    }

    async fn set_date_last_paid(
        &mut self,
        member_id: i64,
        paid_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.update_member(
            sqlx::query("UPDATE members SET date_last_paid = $1 WHERE member_id = $2")
                .bind(paid_at)
                .bind(member_id),
        )
        .await
    }

    async fn set_last_payment(
        &mut self,
        member_id: i64,
        amount: Decimal,
    ) -> Result<(), StoreError> {
        self.update_member(
            sqlx::query("UPDATE members SET last_payment = $1 WHERE member_id = $2")
                .bind(amount)
                .bind(member_id),
        )
        .await
    }

    async fn set_donation_to_society(
        &mut self,
        member_id: i64,
        amount: Decimal,
    ) -> Result<(), StoreError> {
        self.update_member(
            sqlx::query("UPDATE members SET donation_to_society = $1 WHERE member_id = $2")
                .bind(amount)
                .bind(member_id),
        )
        .await
    }

    async fn set_donation_to_museum(
        &mut self,
        member_id: i64,
        amount: Decimal,
    ) -> Result<(), StoreError> {
        self.update_member(
            sqlx::query("UPDATE members SET donation_to_museum = $1 WHERE member_id = $2")
                .bind(amount)
                .bind(member_id),
        )
        .await
    }

    async fn set_friend_tickbox(
        &mut self,
        member_id: i64,
        is_friend: bool,
    ) -> Result<(), StoreError> {
        self.update_member(
            sqlx::query("UPDATE members SET is_friend_of_museum = $1 WHERE member_id = $2")
                .bind(is_friend)
                .bind(member_id),
        )
        .await
    }

    async fn set_members_at_address(
        &mut self,
        member_id: i64,
        count: i32,
    ) -> Result<(), StoreError> {
        self.update_member(
            sqlx::query("UPDATE members SET members_at_address = $1 WHERE member_id = $2")
                .bind(count)
                .bind(member_id),
        )
        .await
    }

    async fn set_friends_at_address(
        &mut self,
        member_id: i64,
        count: i32,
    ) -> Result<(), StoreError> {
        self.update_member(
            sqlx::query("UPDATE members SET friends_at_address = $1 WHERE member_id = $2")
                .bind(count)
                .bind(member_id),
        )
        .await
    }

    async fn update_sale(
        &mut self,
        sale_id: i64,
        status: PaymentStatus,
        session_id: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE membership_sales SET payment_status = $1, payment_session_id = $2 \
             WHERE sale_id = $3",
        )
        .bind(status.as_str())
        .bind(session_id)
        .bind(sale_id)
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            Err(StoreError::SaleNotFound(sale_id))
        } else {
            Ok(())
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(StoreError::backend)
    }
}

/// One row of `membership_sales`. The status column is TEXT; anything we
/// cannot parse back is backend corruption, not a sale.
#[derive(sqlx::FromRow)]
struct SaleRow {
    sale_id: i64,
    membership_year: i32,
    full_member_id: i64,
    full_member_fee: Decimal,
    full_member_is_friend: bool,
    full_member_friend_fee: Decimal,
    associate_member_id: i64,
    associate_member_fee: Decimal,
    associate_member_is_friend: bool,
    associate_member_friend_fee: Decimal,
    donation_to_society: Decimal,
    donation_to_museum: Decimal,
    payment_service: String,
    payment_status: String,
    payment_session_id: String,
}

impl SaleRow {
    fn into_sale(self) -> Result<MembershipSale, StoreError> {
        let payment_status = PaymentStatus::parse(&self.payment_status).ok_or_else(|| {
            StoreError::backend(format!(
                "sale {} has unknown payment status {:?}",
                self.sale_id, self.payment_status
            ))
        })?;

        Ok(MembershipSale {
            sale_id: self.sale_id,
            membership_year: self.membership_year,
            full_member_id: self.full_member_id,
            full_member_fee: self.full_member_fee,
            full_member_is_friend: self.full_member_is_friend,
            full_member_friend_fee: self.full_member_friend_fee,
            associate_member_id: self.associate_member_id,
            associate_member_fee: self.associate_member_fee,
            associate_member_is_friend: self.associate_member_is_friend,
            associate_member_friend_fee: self.associate_member_friend_fee,
            donation_to_society: self.donation_to_society,
            donation_to_museum: self.donation_to_museum,
            payment_service: self.payment_service,
            payment_status,
            payment_session_id: self.payment_session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(status: &str) -> SaleRow {
        SaleRow {
            sale_id: 7,
            membership_year: 2025,
            full_member_id: 42,
            full_member_fee: dec!(24.00),
            full_member_is_friend: true,
            full_member_friend_fee: dec!(5.00),
            associate_member_id: 0,
            associate_member_fee: Decimal::ZERO,
            associate_member_is_friend: false,
            associate_member_friend_fee: Decimal::ZERO,
            donation_to_society: dec!(1.50),
            donation_to_museum: dec!(2.50),
            payment_service: "Stripe".into(),
            payment_status: status.into(),
            payment_session_id: String::new(),
        }
    }

    #[test]
    fn test_sale_row_decodes_every_status() {
        for status in ["Pending", "Complete", "Cancelled"] {
            let sale = row(status).into_sale().unwrap();
            assert_eq!(sale.payment_status.as_str(), status);
            assert_eq!(sale.sale_id, 7);
            assert_eq!(sale.total_payment(), dec!(33.00));
        }
    }

    #[test]
    fn test_corrupt_status_is_a_backend_error() {
        let err = row("Paid").into_sale().unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(err.to_string().contains("unknown payment status"));
    }
}
