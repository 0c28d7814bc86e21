//! SPDX identifier lookup
//!
//! Resolves any identifier on the SPDX license list, deprecated ones
//! included, to its canonical id and full name. Used to expand override
//! entries and detector matches into a complete [`License`](super::License).

use super::License;

/// Look up a license by SPDX identifier (case-insensitive). Returns the
/// canonical id casing.
pub fn lookup(id: &str) -> Option<License> {
    let id = id.trim();
    let found = ::spdx::license_id(id).or_else(|| {
        ::spdx::identifiers::LICENSES
            .iter()
            .find(|entry| entry.0.eq_ignore_ascii_case(id))
            .and_then(|entry| ::spdx::license_id(entry.0))
    })?;
    Some(License::new(found.full_name, found.name))
}
