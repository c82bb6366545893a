//! Core types and traits for the snip URL shortener.
//!
//! This crate provides the shared vocabulary used by the allocator, the
//! storage backends and the HTTP gateway: the [`ShortKey`] identifier, the
//! [`Mapping`] record, the [`MappingStore`] persistence contract and the
//! caller-facing [`Allocator`] trait.

pub mod allocator;
pub mod error;
pub mod shortkey;
pub mod store;

pub use allocator::Allocator;
pub use error::{AllocationError, CoreError, StoreError};
pub use shortkey::ShortKey;
pub use store::{Mapping, MappingStore};
