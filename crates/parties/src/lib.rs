//! Vendor directory domain module.
//!
//! Vendors are the external companies RFQs are addressed to. This crate owns
//! the vendor lifecycle (register / suspend / reinstate) and each vendor's
//! catalog of priced offerings; procurement references both only by id.

pub mod vendor;

pub use vendor::{
    AddOffering, ContactInfo, OfferingAdded, RegisterVendor, ReinstateVendor, SuspendVendor,
    Vendor, VendorCommand, VendorEvent, VendorId, VendorOffering, VendorOfferingId,
    VendorRegistered, VendorReinstated, VendorStatus, VendorSuspended,
};
