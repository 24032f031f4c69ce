use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fabriq_core::{Aggregate, AggregateId, AggregateRoot, Event, UserId};
use fabriq_parties::{VendorId, VendorOfferingId};

use crate::error::{ProcurementError, ProcurementResult};
use crate::item::{RfqItem, RfqItemId, RfqItemStatus};

/// Purchase request identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseRequestId(pub AggregateId);

impl PurchaseRequestId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseRequestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Opaque reference to a project record. Never dereferenced by this crate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectRef(pub AggregateId);

/// Discriminator for the two request kinds sharing this workflow.
///
/// All lifecycle rules are kind-agnostic; the tag only drives downstream
/// concerns (numbering series, rendering) in the application layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Material,
    Service,
}

/// Purchase request header lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseRequestStatus {
    Draft,
    RfqSent,
    VendorSelected,
    Ordered,
    Closed,
    Canceled,
}

impl core::fmt::Display for PurchaseRequestStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            PurchaseRequestStatus::Draft => "draft",
            PurchaseRequestStatus::RfqSent => "rfq_sent",
            PurchaseRequestStatus::VendorSelected => "vendor_selected",
            PurchaseRequestStatus::Ordered => "ordered",
            PurchaseRequestStatus::Closed => "closed",
            PurchaseRequestStatus::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

/// Aggregate root: PurchaseRequest.
///
/// Owns the ordered collection of RFQ items (insertion order = solicitation
/// order) and enforces the header state machine plus the at-most-one-selected
/// invariant across items. Loaded, mutated by exactly one operation, and saved
/// as one consistency unit; optimistic concurrency between concurrent editors
/// is the persistence collaborator's job, keyed on `version()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRequest {
    id: PurchaseRequestId,
    /// Unique human-readable code assigned externally at creation; immutable.
    request_number: Option<String>,
    kind: RequestKind,
    requested_by: Option<UserId>,
    description: String,
    quantity: Decimal,
    uom: Option<String>,
    required_date: Option<NaiveDate>,
    project_ref: Option<ProjectRef>,
    status: PurchaseRequestStatus,
    rfq_items: Vec<RfqItem>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl PurchaseRequest {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PurchaseRequestId) -> Self {
        Self {
            id,
            request_number: None,
            kind: RequestKind::Material,
            requested_by: None,
            description: String::new(),
            quantity: Decimal::ZERO,
            uom: None,
            required_date: None,
            project_ref: None,
            status: PurchaseRequestStatus::Draft,
            rfq_items: Vec::new(),
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseRequestId {
        self.id
    }

    pub fn request_number(&self) -> Option<&str> {
        self.request_number.as_deref()
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn requested_by(&self) -> Option<UserId> {
        self.requested_by
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn uom(&self) -> Option<&str> {
        self.uom.as_deref()
    }

    pub fn required_date(&self) -> Option<NaiveDate> {
        self.required_date
    }

    pub fn project_ref(&self) -> Option<ProjectRef> {
        self.project_ref
    }

    pub fn status(&self) -> PurchaseRequestStatus {
        self.status
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// All RFQ items, in solicitation order.
    pub fn rfq_items(&self) -> &[RfqItem] {
        &self.rfq_items
    }

    pub fn rfq_item(&self, item_id: RfqItemId) -> Option<&RfqItem> {
        self.rfq_items.iter().find(|i| i.item_id() == item_id)
    }

    /// The item currently holding the vendor selection, if any.
    ///
    /// Downstream purchase order creation reads the winning quote through
    /// this accessor; at most one item can ever be in `Selected`.
    pub fn selected_rfq_item(&self) -> Option<&RfqItem> {
        self.rfq_items
            .iter()
            .find(|i| i.status() == RfqItemStatus::Selected)
    }

    /// Whether `SendRfq` would currently be accepted.
    pub fn can_send_rfq(&self) -> bool {
        self.created
            && matches!(
                self.status,
                PurchaseRequestStatus::Draft | PurchaseRequestStatus::RfqSent
            )
    }

    /// Whether `CancelPurchaseRequest` would currently be accepted.
    pub fn can_cancel(&self) -> bool {
        self.created
            && !matches!(
                self.status,
                PurchaseRequestStatus::Closed | PurchaseRequestStatus::Canceled
            )
    }

    /// Whether header details may still be edited (true only in `Draft`).
    pub fn can_update(&self) -> bool {
        self.created && self.status == PurchaseRequestStatus::Draft
    }

    fn rfq_item_mut(&mut self, item_id: RfqItemId) -> Option<&mut RfqItem> {
        self.rfq_items.iter_mut().find(|i| i.item_id() == item_id)
    }
}

impl AggregateRoot for PurchaseRequest {
    type Id = PurchaseRequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePurchaseRequest.
///
/// `request_number` is assigned by the persistence collaborator (unique per
/// company), never generated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseRequest {
    pub request_id: PurchaseRequestId,
    pub request_number: String,
    pub kind: RequestKind,
    pub requested_by: Option<UserId>,
    pub description: String,
    pub quantity: Decimal,
    pub uom: Option<String>,
    pub required_date: Option<NaiveDate>,
    pub project_ref: Option<ProjectRef>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateRequestDetails (only allowed in Draft). `None` fields are
/// left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequestDetails {
    pub request_id: PurchaseRequestId,
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub uom: Option<String>,
    pub required_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddRfqItem (only allowed in Draft or RfqSent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRfqItem {
    pub request_id: PurchaseRequestId,
    pub vendor_id: VendorId,
    pub vendor_offering_id: Option<VendorOfferingId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SendRfq. Idempotent from RfqSent (adding more vendors after the
/// first round and re-sending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRfq {
    pub request_id: PurchaseRequestId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordRfqReply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRfqReply {
    pub request_id: PurchaseRequestId,
    pub item_id: RfqItemId,
    pub quoted_price: Decimal,
    pub quoted_lead_time_days: Option<u32>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkRfqNoResponse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkRfqNoResponse {
    pub request_id: PurchaseRequestId,
    pub item_id: RfqItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SelectVendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectVendor {
    pub request_id: PurchaseRequestId,
    pub item_id: RfqItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectRfq.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectRfq {
    pub request_id: PurchaseRequestId,
    pub item_id: RfqItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RevertVendorSelection.
///
/// Issued when the purchase order built from the selection is canceled
/// upstream and procurement has to resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevertVendorSelection {
    pub request_id: PurchaseRequestId,
    pub item_id: RfqItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkOrdered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkOrdered {
    pub request_id: PurchaseRequestId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ClosePurchaseRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosePurchaseRequest {
    pub request_id: PurchaseRequestId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelPurchaseRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPurchaseRequest {
    pub request_id: PurchaseRequestId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseRequestCommand {
    CreatePurchaseRequest(CreatePurchaseRequest),
    UpdateRequestDetails(UpdateRequestDetails),
    AddRfqItem(AddRfqItem),
    SendRfq(SendRfq),
    RecordRfqReply(RecordRfqReply),
    MarkRfqNoResponse(MarkRfqNoResponse),
    SelectVendor(SelectVendor),
    RejectRfq(RejectRfq),
    RevertVendorSelection(RevertVendorSelection),
    MarkOrdered(MarkOrdered),
    ClosePurchaseRequest(ClosePurchaseRequest),
    CancelPurchaseRequest(CancelPurchaseRequest),
}

/// Event: PurchaseRequestCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequestCreated {
    pub request_id: PurchaseRequestId,
    pub request_number: String,
    pub kind: RequestKind,
    pub requested_by: Option<UserId>,
    pub description: String,
    pub quantity: Decimal,
    pub uom: Option<String>,
    pub required_date: Option<NaiveDate>,
    pub project_ref: Option<ProjectRef>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestDetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDetailsUpdated {
    pub request_id: PurchaseRequestId,
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub uom: Option<String>,
    pub required_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RfqItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqItemAdded {
    pub request_id: PurchaseRequestId,
    pub item_id: RfqItemId,
    pub vendor_id: VendorId,
    pub vendor_offering_id: Option<VendorOfferingId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RfqSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqSent {
    pub request_id: PurchaseRequestId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RfqReplyRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqReplyRecorded {
    pub request_id: PurchaseRequestId,
    pub item_id: RfqItemId,
    pub quoted_price: Decimal,
    pub quoted_lead_time_days: Option<u32>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RfqMarkedNoResponse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqMarkedNoResponse {
    pub request_id: PurchaseRequestId,
    pub item_id: RfqItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: VendorSelected.
///
/// One event carries both effects (item → Selected, header → VendorSelected)
/// so no observer of the aggregate ever sees one without the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorSelected {
    pub request_id: PurchaseRequestId,
    pub item_id: RfqItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RfqRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqRejected {
    pub request_id: PurchaseRequestId,
    pub item_id: RfqItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: VendorSelectionReverted.
///
/// Applying it deselects the target item if it still holds the selection,
/// restores every rejected sibling to `Replied`, and returns the header to
/// `RfqSent` — all in one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorSelectionReverted {
    pub request_id: PurchaseRequestId,
    pub item_id: RfqItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseRequestOrdered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequestOrdered {
    pub request_id: PurchaseRequestId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseRequestClosed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequestClosed {
    pub request_id: PurchaseRequestId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseRequestCanceled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequestCanceled {
    pub request_id: PurchaseRequestId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseRequestEvent {
    PurchaseRequestCreated(PurchaseRequestCreated),
    RequestDetailsUpdated(RequestDetailsUpdated),
    RfqItemAdded(RfqItemAdded),
    RfqSent(RfqSent),
    RfqReplyRecorded(RfqReplyRecorded),
    RfqMarkedNoResponse(RfqMarkedNoResponse),
    VendorSelected(VendorSelected),
    RfqRejected(RfqRejected),
    VendorSelectionReverted(VendorSelectionReverted),
    PurchaseRequestOrdered(PurchaseRequestOrdered),
    PurchaseRequestClosed(PurchaseRequestClosed),
    PurchaseRequestCanceled(PurchaseRequestCanceled),
}

impl Event for PurchaseRequestEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseRequestEvent::PurchaseRequestCreated(_) => "procurement.request.created",
            PurchaseRequestEvent::RequestDetailsUpdated(_) => "procurement.request.details_updated",
            PurchaseRequestEvent::RfqItemAdded(_) => "procurement.request.rfq_item_added",
            PurchaseRequestEvent::RfqSent(_) => "procurement.request.rfq_sent",
            PurchaseRequestEvent::RfqReplyRecorded(_) => "procurement.request.rfq_reply_recorded",
            PurchaseRequestEvent::RfqMarkedNoResponse(_) => "procurement.request.rfq_no_response",
            PurchaseRequestEvent::VendorSelected(_) => "procurement.request.vendor_selected",
            PurchaseRequestEvent::RfqRejected(_) => "procurement.request.rfq_rejected",
            PurchaseRequestEvent::VendorSelectionReverted(_) => {
                "procurement.request.vendor_selection_reverted"
            }
            PurchaseRequestEvent::PurchaseRequestOrdered(_) => "procurement.request.ordered",
            PurchaseRequestEvent::PurchaseRequestClosed(_) => "procurement.request.closed",
            PurchaseRequestEvent::PurchaseRequestCanceled(_) => "procurement.request.canceled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseRequestEvent::PurchaseRequestCreated(e) => e.occurred_at,
            PurchaseRequestEvent::RequestDetailsUpdated(e) => e.occurred_at,
            PurchaseRequestEvent::RfqItemAdded(e) => e.occurred_at,
            PurchaseRequestEvent::RfqSent(e) => e.occurred_at,
            PurchaseRequestEvent::RfqReplyRecorded(e) => e.occurred_at,
            PurchaseRequestEvent::RfqMarkedNoResponse(e) => e.occurred_at,
            PurchaseRequestEvent::VendorSelected(e) => e.occurred_at,
            PurchaseRequestEvent::RfqRejected(e) => e.occurred_at,
            PurchaseRequestEvent::VendorSelectionReverted(e) => e.occurred_at,
            PurchaseRequestEvent::PurchaseRequestOrdered(e) => e.occurred_at,
            PurchaseRequestEvent::PurchaseRequestClosed(e) => e.occurred_at,
            PurchaseRequestEvent::PurchaseRequestCanceled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseRequest {
    type Command = PurchaseRequestCommand;
    type Event = PurchaseRequestEvent;
    type Error = ProcurementError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseRequestEvent::PurchaseRequestCreated(e) => {
                self.id = e.request_id;
                self.request_number = Some(e.request_number.clone());
                self.kind = e.kind;
                self.requested_by = e.requested_by;
                self.description = e.description.clone();
                self.quantity = e.quantity;
                self.uom = e.uom.clone();
                self.required_date = e.required_date;
                self.project_ref = e.project_ref;
                self.status = PurchaseRequestStatus::Draft;
                self.rfq_items.clear();
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            PurchaseRequestEvent::RequestDetailsUpdated(e) => {
                if let Some(description) = &e.description {
                    self.description = description.clone();
                }
                if let Some(quantity) = e.quantity {
                    self.quantity = quantity;
                }
                if let Some(uom) = &e.uom {
                    self.uom = Some(uom.clone());
                }
                if let Some(required_date) = e.required_date {
                    self.required_date = Some(required_date);
                }
            }
            PurchaseRequestEvent::RfqItemAdded(e) => {
                self.rfq_items.push(RfqItem::new(
                    e.item_id,
                    e.vendor_id,
                    e.vendor_offering_id,
                    e.occurred_at,
                ));
            }
            PurchaseRequestEvent::RfqSent(_) => {
                self.status = PurchaseRequestStatus::RfqSent;
            }
            PurchaseRequestEvent::RfqReplyRecorded(e) => {
                if let Some(item) = self.rfq_item_mut(e.item_id) {
                    item.record_reply(
                        e.quoted_price,
                        e.quoted_lead_time_days,
                        e.notes.clone(),
                        e.occurred_at,
                    );
                }
            }
            PurchaseRequestEvent::RfqMarkedNoResponse(e) => {
                if let Some(item) = self.rfq_item_mut(e.item_id) {
                    item.mark_no_response();
                }
            }
            PurchaseRequestEvent::VendorSelected(e) => {
                if let Some(item) = self.rfq_item_mut(e.item_id) {
                    item.select();
                }
                self.status = PurchaseRequestStatus::VendorSelected;
            }
            PurchaseRequestEvent::RfqRejected(e) => {
                if let Some(item) = self.rfq_item_mut(e.item_id) {
                    item.reject();
                }
            }
            PurchaseRequestEvent::VendorSelectionReverted(e) => {
                // Skip the deselect when a prior revert already ran for this
                // item; that skip is what makes the operation idempotent.
                if let Some(item) = self.rfq_item_mut(e.item_id) {
                    if item.status() == RfqItemStatus::Selected {
                        item.deselect();
                    }
                }
                // Rejected siblings become eligible again; Sent/NoResponse
                // items are left untouched.
                for item in &mut self.rfq_items {
                    if item.status() == RfqItemStatus::Rejected {
                        item.unreject();
                    }
                }
                self.status = PurchaseRequestStatus::RfqSent;
            }
            PurchaseRequestEvent::PurchaseRequestOrdered(_) => {
                self.status = PurchaseRequestStatus::Ordered;
            }
            PurchaseRequestEvent::PurchaseRequestClosed(_) => {
                self.status = PurchaseRequestStatus::Closed;
            }
            PurchaseRequestEvent::PurchaseRequestCanceled(_) => {
                self.status = PurchaseRequestStatus::Canceled;
            }
        }

        self.updated_at = Some(event.occurred_at());
        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseRequestCommand::CreatePurchaseRequest(cmd) => self.handle_create(cmd),
            PurchaseRequestCommand::UpdateRequestDetails(cmd) => self.handle_update_details(cmd),
            PurchaseRequestCommand::AddRfqItem(cmd) => self.handle_add_rfq_item(cmd),
            PurchaseRequestCommand::SendRfq(cmd) => self.handle_send_rfq(cmd),
            PurchaseRequestCommand::RecordRfqReply(cmd) => self.handle_record_reply(cmd),
            PurchaseRequestCommand::MarkRfqNoResponse(cmd) => self.handle_mark_no_response(cmd),
            PurchaseRequestCommand::SelectVendor(cmd) => self.handle_select_vendor(cmd),
            PurchaseRequestCommand::RejectRfq(cmd) => self.handle_reject(cmd),
            PurchaseRequestCommand::RevertVendorSelection(cmd) => self.handle_revert(cmd),
            PurchaseRequestCommand::MarkOrdered(cmd) => self.handle_mark_ordered(cmd),
            PurchaseRequestCommand::ClosePurchaseRequest(cmd) => self.handle_close(cmd),
            PurchaseRequestCommand::CancelPurchaseRequest(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl PurchaseRequest {
    fn ensure_created(&self) -> ProcurementResult<()> {
        if !self.created {
            return Err(ProcurementError::NotFound);
        }
        Ok(())
    }

    fn ensure_request_id(&self, request_id: PurchaseRequestId) -> ProcurementResult<()> {
        if self.id != request_id {
            return Err(ProcurementError::conflict("request_id mismatch"));
        }
        Ok(())
    }

    /// Transition guard: every mutation is validated against the current
    /// header status before anything is written.
    fn ensure_status(
        &self,
        operation: &'static str,
        allowed: &[PurchaseRequestStatus],
    ) -> ProcurementResult<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(ProcurementError::InvalidTransition {
                operation,
                status: self.status,
                item_status: None,
            })
        }
    }

    fn resolve_item(
        &self,
        item_id: RfqItemId,
    ) -> ProcurementResult<&RfqItem> {
        self.rfq_item(item_id)
            .ok_or(ProcurementError::ItemNotFound { item_id })
    }

    fn ensure_item_status(
        &self,
        operation: &'static str,
        item: &RfqItem,
        expected: RfqItemStatus,
    ) -> ProcurementResult<()> {
        if item.status() == expected {
            Ok(())
        } else {
            Err(ProcurementError::InvalidTransition {
                operation,
                status: self.status,
                item_status: Some(item.status()),
            })
        }
    }

    fn handle_create(
        &self,
        cmd: &CreatePurchaseRequest,
    ) -> ProcurementResult<Vec<PurchaseRequestEvent>> {
        if self.created {
            return Err(ProcurementError::conflict("purchase request already exists"));
        }

        if cmd.request_number.trim().is_empty() {
            return Err(ProcurementError::validation("request number cannot be empty"));
        }

        if cmd.description.trim().is_empty() {
            return Err(ProcurementError::validation("description cannot be empty"));
        }

        if cmd.quantity <= Decimal::ZERO {
            return Err(ProcurementError::validation("quantity must be positive"));
        }

        Ok(vec![PurchaseRequestEvent::PurchaseRequestCreated(
            PurchaseRequestCreated {
                request_id: cmd.request_id,
                request_number: cmd.request_number.clone(),
                kind: cmd.kind,
                requested_by: cmd.requested_by,
                description: cmd.description.clone(),
                quantity: cmd.quantity,
                uom: cmd.uom.clone(),
                required_date: cmd.required_date,
                project_ref: cmd.project_ref,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_update_details(
        &self,
        cmd: &UpdateRequestDetails,
    ) -> ProcurementResult<Vec<PurchaseRequestEvent>> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;
        self.ensure_status("update_details", &[PurchaseRequestStatus::Draft])?;

        if let Some(description) = &cmd.description {
            if description.trim().is_empty() {
                return Err(ProcurementError::validation("description cannot be empty"));
            }
        }

        if let Some(quantity) = cmd.quantity {
            if quantity <= Decimal::ZERO {
                return Err(ProcurementError::validation("quantity must be positive"));
            }
        }

        Ok(vec![PurchaseRequestEvent::RequestDetailsUpdated(
            RequestDetailsUpdated {
                request_id: cmd.request_id,
                description: cmd.description.clone(),
                quantity: cmd.quantity,
                uom: cmd.uom.clone(),
                required_date: cmd.required_date,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_add_rfq_item(
        &self,
        cmd: &AddRfqItem,
    ) -> ProcurementResult<Vec<PurchaseRequestEvent>> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;
        // More vendors may be solicited after the first round went out.
        self.ensure_status(
            "add_rfq_item",
            &[PurchaseRequestStatus::Draft, PurchaseRequestStatus::RfqSent],
        )?;

        let next_item_id = RfqItemId((self.rfq_items.len() as u32) + 1);
        Ok(vec![PurchaseRequestEvent::RfqItemAdded(RfqItemAdded {
            request_id: cmd.request_id,
            item_id: next_item_id,
            vendor_id: cmd.vendor_id,
            vendor_offering_id: cmd.vendor_offering_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_send_rfq(&self, cmd: &SendRfq) -> ProcurementResult<Vec<PurchaseRequestEvent>> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;
        self.ensure_status(
            "send_rfq",
            &[PurchaseRequestStatus::Draft, PurchaseRequestStatus::RfqSent],
        )?;

        Ok(vec![PurchaseRequestEvent::RfqSent(RfqSent {
            request_id: cmd.request_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_reply(
        &self,
        cmd: &RecordRfqReply,
    ) -> ProcurementResult<Vec<PurchaseRequestEvent>> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;
        // Header gate first: replies are only recordable while the RFQ round
        // is open, regardless of the item's own sub-state.
        self.ensure_status("record_rfq_reply", &[PurchaseRequestStatus::RfqSent])?;

        let item = self.resolve_item(cmd.item_id)?;
        self.ensure_item_status("record_rfq_reply", item, RfqItemStatus::Sent)?;

        if cmd.quoted_price <= Decimal::ZERO {
            return Err(ProcurementError::validation("quoted price must be positive"));
        }

        Ok(vec![PurchaseRequestEvent::RfqReplyRecorded(
            RfqReplyRecorded {
                request_id: cmd.request_id,
                item_id: cmd.item_id,
                quoted_price: cmd.quoted_price,
                quoted_lead_time_days: cmd.quoted_lead_time_days,
                notes: cmd.notes.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_mark_no_response(
        &self,
        cmd: &MarkRfqNoResponse,
    ) -> ProcurementResult<Vec<PurchaseRequestEvent>> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;
        self.ensure_status("mark_rfq_no_response", &[PurchaseRequestStatus::RfqSent])?;

        let item = self.resolve_item(cmd.item_id)?;
        self.ensure_item_status("mark_rfq_no_response", item, RfqItemStatus::Sent)?;

        Ok(vec![PurchaseRequestEvent::RfqMarkedNoResponse(
            RfqMarkedNoResponse {
                request_id: cmd.request_id,
                item_id: cmd.item_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_select_vendor(
        &self,
        cmd: &SelectVendor,
    ) -> ProcurementResult<Vec<PurchaseRequestEvent>> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;
        self.ensure_status("select_vendor", &[PurchaseRequestStatus::RfqSent])?;

        // Cross-item invariant, checked before the target is even resolved.
        // The scan does not exempt the target, so re-selecting the currently
        // selected item reports the same violation.
        if let Some(selected) = self.selected_rfq_item() {
            return Err(ProcurementError::VendorAlreadySelected {
                selected: selected.item_id(),
                attempted: cmd.item_id,
            });
        }

        let item = self.resolve_item(cmd.item_id)?;
        self.ensure_item_status("select_vendor", item, RfqItemStatus::Replied)?;

        Ok(vec![PurchaseRequestEvent::VendorSelected(VendorSelected {
            request_id: cmd.request_id,
            item_id: cmd.item_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectRfq) -> ProcurementResult<Vec<PurchaseRequestEvent>> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;
        self.ensure_status("reject_rfq", &[PurchaseRequestStatus::RfqSent])?;

        let item = self.resolve_item(cmd.item_id)?;
        self.ensure_item_status("reject_rfq", item, RfqItemStatus::Replied)?;

        Ok(vec![PurchaseRequestEvent::RfqRejected(RfqRejected {
            request_id: cmd.request_id,
            item_id: cmd.item_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_revert(
        &self,
        cmd: &RevertVendorSelection,
    ) -> ProcurementResult<Vec<PurchaseRequestEvent>> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;
        self.ensure_status(
            "revert_vendor_selection",
            &[
                PurchaseRequestStatus::VendorSelected,
                PurchaseRequestStatus::Ordered,
            ],
        )?;

        // Only existence is checked here. The target may legitimately no
        // longer be Selected (a prior revert with a different target id left
        // it untouched); apply handles that case without error.
        self.resolve_item(cmd.item_id)?;

        Ok(vec![PurchaseRequestEvent::VendorSelectionReverted(
            VendorSelectionReverted {
                request_id: cmd.request_id,
                item_id: cmd.item_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_mark_ordered(
        &self,
        cmd: &MarkOrdered,
    ) -> ProcurementResult<Vec<PurchaseRequestEvent>> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;
        self.ensure_status("mark_ordered", &[PurchaseRequestStatus::VendorSelected])?;

        Ok(vec![PurchaseRequestEvent::PurchaseRequestOrdered(
            PurchaseRequestOrdered {
                request_id: cmd.request_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_close(
        &self,
        cmd: &ClosePurchaseRequest,
    ) -> ProcurementResult<Vec<PurchaseRequestEvent>> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;
        self.ensure_status("close", &[PurchaseRequestStatus::Ordered])?;

        Ok(vec![PurchaseRequestEvent::PurchaseRequestClosed(
            PurchaseRequestClosed {
                request_id: cmd.request_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_cancel(
        &self,
        cmd: &CancelPurchaseRequest,
    ) -> ProcurementResult<Vec<PurchaseRequestEvent>> {
        self.ensure_created()?;
        self.ensure_request_id(cmd.request_id)?;
        self.ensure_status(
            "cancel",
            &[
                PurchaseRequestStatus::Draft,
                PurchaseRequestStatus::RfqSent,
                PurchaseRequestStatus::VendorSelected,
                PurchaseRequestStatus::Ordered,
            ],
        )?;

        Ok(vec![PurchaseRequestEvent::PurchaseRequestCanceled(
            PurchaseRequestCanceled {
                request_id: cmd.request_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}
