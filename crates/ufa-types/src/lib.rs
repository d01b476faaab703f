//! Foundation types for the Upfront Agreement (UFA) ledger.
//!
//! This crate provides the record shapes and small value types shared by
//! every other UFA crate. It performs no I/O.
//!
//! # Key Types
//!
//! - [`Agreement`]: an upfront agreement between a buyer and a seller
//! - [`LineItem`] / [`LineItemRef`]: independently stored pricing lines and
//!   the compact pointers an agreement keeps to them
//! - [`Invoice`]: one half of a customer/vendor invoice pair
//! - [`Fields`]: ordered, verbatim string-keyed field map backing each record
//! - [`SubmitterRole`]: who may create agreements
//! - [`keys`]: ledger key layout shared by the store and the engine

pub mod error;
pub mod fields;
pub mod keys;
pub mod number;
pub mod record;
pub mod role;

pub use error::TypeError;
pub use fields::{field, merge_fields, Fields};
pub use number::{format_amount, parse_number, try_parse_number, NUMBER_SENTINEL};
pub use record::{Agreement, Invoice, LineItem, LineItemRef};
pub use role::SubmitterRole;
pub use rust_decimal::Decimal;
