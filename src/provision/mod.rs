//! Idempotent scene and capture source provisioning

mod inventory;
mod provisioner;
mod sources;

pub use inventory::{AnySourcePresent, InventoryChecker};
pub use provisioner::{ProvisionResult, Provisioner};
pub use sources::{CaptureKind, Platform, SourceCatalog};
