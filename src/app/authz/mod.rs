//! Three-gate authorization: subscription tier, global role, organization role.

pub mod evaluator;
pub mod registry;

pub use evaluator::{evaluate, Decision, Denial, Evaluator, Gates, RegistryGates, Requirement};
pub use registry::{Capability, Feature};
