//! # renewal-core
//!
//! Domain model for membership renewals: members and sales, the fee
//! catalog, the itemized cost breakdown, two-phase form validation, and
//! the store contract with its in-memory implementation.
//!
//! The crate performs no I/O of its own beyond the store trait. PostgreSQL
//! lives in `renewal-store`, the payment gateway in `renewal-payments`,
//! and the HTTP surface in `renewal-server`.

pub mod breakdown;
pub mod fees;
pub mod form;
pub mod model;
pub mod store;

pub use breakdown::{CostBreakdown, LineItem, to_minor_units};
pub use fees::{FeeCatalog, FeeError};
pub use form::{FieldErrors, FormInput, RenewalForm, is_checked, normalize_checkbox};
pub use model::{Member, MembershipSale, PaymentStatus, end_of_year, membership_year};
pub use store::{MembershipStore, MemoryStore, StoreError, StoreTransaction};
