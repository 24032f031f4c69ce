//! RFQ items: one vendor's solicitation record inside a purchase request.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fabriq_core::Entity;
use fabriq_parties::{VendorId, VendorOfferingId};

/// Identifier of an RFQ item, unique within its owning purchase request.
///
/// Assigned sequentially (1-based) when the item is added and stable for the
/// item's lifetime. Only meaningful together with the owning request's id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RfqItemId(pub u32);

impl core::fmt::Display for RfqItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Per-item quote lifecycle, independent of sibling items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RfqItemStatus {
    Sent,
    Replied,
    NoResponse,
    Selected,
    Rejected,
}

impl core::fmt::Display for RfqItemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            RfqItemStatus::Sent => "sent",
            RfqItemStatus::Replied => "replied",
            RfqItemStatus::NoResponse => "no_response",
            RfqItemStatus::Selected => "selected",
            RfqItemStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// One vendor's solicitation record.
///
/// Items are created only through the aggregate, never removed, only
/// transitioned. Fields are private so every mutation passes through the
/// aggregate's guard logic; external code reads via accessors and must not
/// hold long-lived references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqItem {
    item_id: RfqItemId,
    vendor_id: VendorId,
    vendor_offering_id: Option<VendorOfferingId>,
    status: RfqItemStatus,
    quoted_price: Option<Decimal>,
    quoted_lead_time_days: Option<u32>,
    notes: Option<String>,
    sent_at: DateTime<Utc>,
    replied_at: Option<DateTime<Utc>>,
}

impl RfqItem {
    pub(crate) fn new(
        item_id: RfqItemId,
        vendor_id: VendorId,
        vendor_offering_id: Option<VendorOfferingId>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id,
            vendor_id,
            vendor_offering_id,
            status: RfqItemStatus::Sent,
            quoted_price: None,
            quoted_lead_time_days: None,
            notes: None,
            sent_at,
            replied_at: None,
        }
    }

    pub fn item_id(&self) -> RfqItemId {
        self.item_id
    }

    pub fn vendor_id(&self) -> VendorId {
        self.vendor_id
    }

    pub fn vendor_offering_id(&self) -> Option<VendorOfferingId> {
        self.vendor_offering_id
    }

    pub fn status(&self) -> RfqItemStatus {
        self.status
    }

    /// Quoted price; populated only once a reply is recorded.
    pub fn quoted_price(&self) -> Option<Decimal> {
        self.quoted_price
    }

    /// Quoted lead time in days; populated only once a reply is recorded.
    pub fn quoted_lead_time_days(&self) -> Option<u32> {
        self.quoted_lead_time_days
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }

    pub fn replied_at(&self) -> Option<DateTime<Utc>> {
        self.replied_at
    }

    // State evolution below is only reachable from the aggregate's `apply`;
    // `handle` has already validated the transition.

    pub(crate) fn record_reply(
        &mut self,
        quoted_price: Decimal,
        quoted_lead_time_days: Option<u32>,
        notes: Option<String>,
        replied_at: DateTime<Utc>,
    ) {
        self.status = RfqItemStatus::Replied;
        self.quoted_price = Some(quoted_price);
        self.quoted_lead_time_days = quoted_lead_time_days;
        self.notes = notes;
        self.replied_at = Some(replied_at);
    }

    pub(crate) fn mark_no_response(&mut self) {
        self.status = RfqItemStatus::NoResponse;
    }

    pub(crate) fn select(&mut self) {
        self.status = RfqItemStatus::Selected;
    }

    pub(crate) fn deselect(&mut self) {
        self.status = RfqItemStatus::Replied;
    }

    pub(crate) fn reject(&mut self) {
        self.status = RfqItemStatus::Rejected;
    }

    pub(crate) fn unreject(&mut self) {
        self.status = RfqItemStatus::Replied;
    }
}

impl Entity for RfqItem {
    type Id = RfqItemId;

    fn id(&self) -> &Self::Id {
        &self.item_id
    }
}
