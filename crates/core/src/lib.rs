//! `fabriq-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! aggregate/entity traits, the event contract, strongly-typed identifiers and
//! the shared domain error vocabulary.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use event::Event;
pub use id::{AggregateId, UserId};
