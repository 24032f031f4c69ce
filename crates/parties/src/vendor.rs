use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fabriq_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Entity, Event};

/// Vendor identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorId(pub AggregateId);

impl VendorId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for VendorId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Identifier of a priced offering, unique within its vendor's catalog.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorOfferingId(pub u32);

impl core::fmt::Display for VendorOfferingId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Vendor status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorStatus {
    Active,
    Suspended,
}

/// Contact information for a vendor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A priced offering in a vendor's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorOffering {
    offering_id: VendorOfferingId,
    description: String,
    unit_price: Decimal,
}

impl VendorOffering {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }
}

impl Entity for VendorOffering {
    type Id = VendorOfferingId;

    fn id(&self) -> &Self::Id {
        &self.offering_id
    }
}

/// Aggregate root: Vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vendor {
    id: VendorId,
    name: String,
    contact: ContactInfo,
    status: VendorStatus,
    offerings: Vec<VendorOffering>,
    version: u64,
    created: bool,
}

impl Vendor {
    /// Create an empty, not-yet-registered aggregate instance for rehydration.
    pub fn empty(id: VendorId) -> Self {
        Self {
            id,
            name: String::new(),
            contact: ContactInfo::default(),
            status: VendorStatus::Active,
            offerings: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> VendorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn status(&self) -> VendorStatus {
        self.status
    }

    pub fn offerings(&self) -> &[VendorOffering] {
        &self.offerings
    }

    pub fn offering(&self, offering_id: VendorOfferingId) -> Option<&VendorOffering> {
        self.offerings.iter().find(|o| o.offering_id == offering_id)
    }

    /// Invariant helper: suspended vendors cannot transact.
    pub fn can_transact(&self) -> bool {
        self.status == VendorStatus::Active
    }
}

impl AggregateRoot for Vendor {
    type Id = VendorId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterVendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterVendor {
    pub vendor_id: VendorId,
    pub name: String,
    pub contact: Option<ContactInfo>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SuspendVendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspendVendor {
    pub vendor_id: VendorId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReinstateVendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinstateVendor {
    pub vendor_id: VendorId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddOffering (only allowed while the vendor is active).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOffering {
    pub vendor_id: VendorId,
    pub description: String,
    pub unit_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VendorCommand {
    RegisterVendor(RegisterVendor),
    SuspendVendor(SuspendVendor),
    ReinstateVendor(ReinstateVendor),
    AddOffering(AddOffering),
}

/// Event: VendorRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorRegistered {
    pub vendor_id: VendorId,
    pub name: String,
    pub contact: ContactInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: VendorSuspended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorSuspended {
    pub vendor_id: VendorId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: VendorReinstated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorReinstated {
    pub vendor_id: VendorId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OfferingAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferingAdded {
    pub vendor_id: VendorId,
    pub offering_id: VendorOfferingId,
    pub description: String,
    pub unit_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VendorEvent {
    VendorRegistered(VendorRegistered),
    VendorSuspended(VendorSuspended),
    VendorReinstated(VendorReinstated),
    OfferingAdded(OfferingAdded),
}

impl Event for VendorEvent {
    fn event_type(&self) -> &'static str {
        match self {
            VendorEvent::VendorRegistered(_) => "parties.vendor.registered",
            VendorEvent::VendorSuspended(_) => "parties.vendor.suspended",
            VendorEvent::VendorReinstated(_) => "parties.vendor.reinstated",
            VendorEvent::OfferingAdded(_) => "parties.vendor.offering_added",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            VendorEvent::VendorRegistered(e) => e.occurred_at,
            VendorEvent::VendorSuspended(e) => e.occurred_at,
            VendorEvent::VendorReinstated(e) => e.occurred_at,
            VendorEvent::OfferingAdded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Vendor {
    type Command = VendorCommand;
    type Event = VendorEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            VendorEvent::VendorRegistered(e) => {
                self.id = e.vendor_id;
                self.name = e.name.clone();
                self.contact = e.contact.clone();
                self.status = VendorStatus::Active;
                self.offerings.clear();
                self.created = true;
            }
            VendorEvent::VendorSuspended(_) => {
                self.status = VendorStatus::Suspended;
            }
            VendorEvent::VendorReinstated(_) => {
                self.status = VendorStatus::Active;
            }
            VendorEvent::OfferingAdded(e) => {
                self.offerings.push(VendorOffering {
                    offering_id: e.offering_id,
                    description: e.description.clone(),
                    unit_price: e.unit_price,
                });
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            VendorCommand::RegisterVendor(cmd) => self.handle_register(cmd),
            VendorCommand::SuspendVendor(cmd) => self.handle_suspend(cmd),
            VendorCommand::ReinstateVendor(cmd) => self.handle_reinstate(cmd),
            VendorCommand::AddOffering(cmd) => self.handle_add_offering(cmd),
        }
    }
}

impl Vendor {
    fn ensure_vendor_id(&self, vendor_id: VendorId) -> Result<(), DomainError> {
        if self.id != vendor_id {
            return Err(DomainError::invariant("vendor_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterVendor) -> Result<Vec<VendorEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("vendor already registered"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("vendor name cannot be empty"));
        }

        Ok(vec![VendorEvent::VendorRegistered(VendorRegistered {
            vendor_id: cmd.vendor_id,
            name: cmd.name.clone(),
            contact: cmd.contact.clone().unwrap_or_default(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_suspend(&self, cmd: &SuspendVendor) -> Result<Vec<VendorEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_vendor_id(cmd.vendor_id)?;

        if self.status == VendorStatus::Suspended {
            return Err(DomainError::conflict("vendor is already suspended"));
        }

        Ok(vec![VendorEvent::VendorSuspended(VendorSuspended {
            vendor_id: cmd.vendor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reinstate(&self, cmd: &ReinstateVendor) -> Result<Vec<VendorEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_vendor_id(cmd.vendor_id)?;

        if self.status == VendorStatus::Active {
            return Err(DomainError::conflict("vendor is already active"));
        }

        Ok(vec![VendorEvent::VendorReinstated(VendorReinstated {
            vendor_id: cmd.vendor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_offering(&self, cmd: &AddOffering) -> Result<Vec<VendorEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_vendor_id(cmd.vendor_id)?;

        if !self.can_transact() {
            return Err(DomainError::invariant(
                "suspended vendors cannot extend their catalog",
            ));
        }

        if cmd.description.trim().is_empty() {
            return Err(DomainError::validation("offering description cannot be empty"));
        }

        if cmd.unit_price <= Decimal::ZERO {
            return Err(DomainError::validation("unit price must be positive"));
        }

        let next_offering_id = VendorOfferingId((self.offerings.len() as u32) + 1);
        Ok(vec![VendorEvent::OfferingAdded(OfferingAdded {
            vendor_id: cmd.vendor_id,
            offering_id: next_offering_id,
            description: cmd.description.clone(),
            unit_price: cmd.unit_price,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_vendor_id() -> VendorId {
        VendorId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn registered_vendor() -> Vendor {
        let mut vendor = Vendor::empty(test_vendor_id());
        let cmd = RegisterVendor {
            vendor_id: vendor.id_typed(),
            name: "Acme Machining".to_string(),
            contact: None,
            occurred_at: test_time(),
        };
        let events = vendor
            .handle(&VendorCommand::RegisterVendor(cmd))
            .unwrap();
        vendor.apply(&events[0]);
        vendor
    }

    #[test]
    fn register_vendor_starts_active() {
        let vendor = registered_vendor();
        assert_eq!(vendor.status(), VendorStatus::Active);
        assert!(vendor.can_transact());
        assert_eq!(vendor.offerings().len(), 0);
    }

    #[test]
    fn register_rejects_blank_name() {
        let vendor = Vendor::empty(test_vendor_id());
        let cmd = RegisterVendor {
            vendor_id: vendor.id_typed(),
            name: "   ".to_string(),
            contact: None,
            occurred_at: test_time(),
        };
        let err = vendor
            .handle(&VendorCommand::RegisterVendor(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn suspend_blocks_catalog_changes() {
        let mut vendor = registered_vendor();
        let suspend = SuspendVendor {
            vendor_id: vendor.id_typed(),
            occurred_at: test_time(),
        };
        let events = vendor
            .handle(&VendorCommand::SuspendVendor(suspend))
            .unwrap();
        vendor.apply(&events[0]);
        assert!(!vendor.can_transact());

        let add = AddOffering {
            vendor_id: vendor.id_typed(),
            description: "M8 hex bolts, box of 500".to_string(),
            unit_price: dec!(24.90),
            occurred_at: test_time(),
        };
        let err = vendor
            .handle(&VendorCommand::AddOffering(add))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn offerings_get_sequential_ids() {
        let mut vendor = registered_vendor();
        for description in ["Steel plate 3mm", "Steel plate 5mm"] {
            let add = AddOffering {
                vendor_id: vendor.id_typed(),
                description: description.to_string(),
                unit_price: dec!(112.50),
                occurred_at: test_time(),
            };
            let events = vendor.handle(&VendorCommand::AddOffering(add)).unwrap();
            vendor.apply(&events[0]);
        }

        assert_eq!(vendor.offerings().len(), 2);
        assert_eq!(vendor.offerings()[0].offering_id, VendorOfferingId(1));
        assert_eq!(vendor.offerings()[1].offering_id, VendorOfferingId(2));
        assert_eq!(
            vendor.offering(VendorOfferingId(2)).unwrap().description(),
            "Steel plate 5mm"
        );
    }

    #[test]
    fn reinstate_restores_transacting() {
        let mut vendor = registered_vendor();
        let suspend = SuspendVendor {
            vendor_id: vendor.id_typed(),
            occurred_at: test_time(),
        };
        let events = vendor
            .handle(&VendorCommand::SuspendVendor(suspend))
            .unwrap();
        vendor.apply(&events[0]);

        let reinstate = ReinstateVendor {
            vendor_id: vendor.id_typed(),
            occurred_at: test_time(),
        };
        let events = vendor
            .handle(&VendorCommand::ReinstateVendor(reinstate))
            .unwrap();
        vendor.apply(&events[0]);
        assert_eq!(vendor.status(), VendorStatus::Active);
    }
}
