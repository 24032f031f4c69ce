//! Procurement domain module: the Purchase Request / RFQ workflow.
//!
//! A purchase request tracks one internal purchasing need through solicitation
//! of vendor quotes, selection of exactly one winning vendor, order placement
//! and closure, with support for reverting a selection after the downstream
//! order is canceled. All rules live in the aggregate as deterministic domain
//! logic (no IO, no HTTP, no storage); persistence, order creation, PDF and
//! mail rendering are external collaborators.

pub mod error;
pub mod item;
pub mod request;

pub use error::{ProcurementError, ProcurementResult};
pub use item::{RfqItem, RfqItemId, RfqItemStatus};
pub use request::{
    AddRfqItem, CancelPurchaseRequest, ClosePurchaseRequest, CreatePurchaseRequest, MarkOrdered,
    MarkRfqNoResponse, ProjectRef, PurchaseRequest, PurchaseRequestCanceled,
    PurchaseRequestClosed, PurchaseRequestCommand, PurchaseRequestCreated, PurchaseRequestEvent,
    PurchaseRequestId, PurchaseRequestOrdered, PurchaseRequestStatus, RecordRfqReply, RejectRfq,
    RequestDetailsUpdated, RequestKind, RevertVendorSelection, RfqItemAdded,
    RfqMarkedNoResponse, RfqReplyRecorded, RfqRejected, RfqSent, SelectVendor, SendRfq,
    UpdateRequestDetails, VendorSelected, VendorSelectionReverted,
};
