//! Core types, aggregation rules and the store trait for AulaClass.
//!
//! This crate is free of HTTP and database dependencies. The aggregation
//! modules (`rounding`, `grade`, `attendance`, `access`) are pure; `gradebook`
//! and `report` drive a [`store::SchoolStore`] but never touch SQL.

// Native `async fn` in traits; the store trait spells out `Send` futures itself.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod attendance;
pub mod audit;
pub mod error;
pub mod grade;
pub mod gradebook;
pub mod report;
pub mod rounding;
pub mod school;
pub mod staff;
pub mod store;

pub use error::{Error, Result};
