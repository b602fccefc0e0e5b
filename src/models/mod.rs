//! Package data model shared by every handler and output format.
//!
//! Handlers produce `PackageData` records per datafile. Assembly turns those
//! records into top-level `Package` and `Dependency` entries that carry
//! unique ids, so files can point back at the package they belong to.

pub mod dependency;
pub mod package;
pub mod package_data;
pub mod party;
pub mod purl;

pub use dependency::{DependentPackage, Dependency};
pub use package::Package;
pub use package_data::PackageData;
pub use party::{Party, PartyType};
