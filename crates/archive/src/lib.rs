//! Reading `.xcarchive` bundles.
//!
//! Produces the per-bundle signing requirements the resolver consumes:
//! bundle ids, required entitlement keys, and embedded profile identities
//! for the application and every nested app extension. Read-only.

pub mod entitlements;
pub mod reader;

pub use reader::MacosArchive;
