//! Shared parsing helpers used by the datafile handlers.

pub mod checksum;
pub mod license;
pub mod person;
pub mod rfc822;

pub use checksum::Checksums;
pub use license::{combine_expressions, normalize_license};
pub use person::parse_person;
