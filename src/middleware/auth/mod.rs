pub mod permission;

pub use permission::{PermissionGate, require_permission};
