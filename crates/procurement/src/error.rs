//! Procurement error taxonomy.
//!
//! All variants are synchronous, non-retriable domain failures raised before
//! any field is written; callers decide how to surface them. The first three
//! are deliberately distinct so calling services can tell a lifecycle-ordering
//! problem from a cross-item invariant violation from a dangling reference.

use thiserror::Error;

use crate::item::{RfqItemId, RfqItemStatus};
use crate::request::PurchaseRequestStatus;

/// Result type for purchase request operations.
pub type ProcurementResult<T> = Result<T, ProcurementError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcurementError {
    /// Operation attempted while the header (or, for reply-path operations,
    /// the targeted item) is not in a state that permits it.
    #[error("{operation} is not allowed: request is {status}{}", .item_status.as_ref().map(|s| format!(", rfq item is {s}")).unwrap_or_default())]
    InvalidTransition {
        operation: &'static str,
        status: PurchaseRequestStatus,
        /// Present when the header status was valid but the item's own
        /// sub-state blocked the operation.
        item_status: Option<RfqItemStatus>,
    },

    /// `select_vendor` attempted while another item already holds the
    /// selection. The header status *was* valid, so this is not an
    /// [`InvalidTransition`](Self::InvalidTransition); the violated rule is
    /// the at-most-one-selected invariant.
    #[error("rfq item {selected} already holds the vendor selection (attempted to select {attempted})")]
    VendorAlreadySelected {
        selected: RfqItemId,
        attempted: RfqItemId,
    },

    /// Referenced item id does not exist in this request's collection.
    #[error("rfq item {item_id} not found")]
    ItemNotFound { item_id: RfqItemId },

    /// A creation-time input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Double creation of the same aggregate.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Command addressed to a not-yet-created aggregate.
    #[error("purchase request not found")]
    NotFound,
}

impl ProcurementError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
