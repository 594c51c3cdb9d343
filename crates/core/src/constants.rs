/// License statuses
///
/// Each constant represents one of the supported license lifecycle states.

/// License is live and billed. The default for imported records.
pub const LICENSE_STATUS_ACTIVE: &str = "ACTIVE";

/// License exists but is not currently assigned or billed.
pub const LICENSE_STATUS_INACTIVE: &str = "INACTIVE";

/// License has passed its renewal date without being renewed.
pub const LICENSE_STATUS_EXPIRED: &str = "EXPIRED";

/// License has been ordered but not yet provisioned.
pub const LICENSE_STATUS_PENDING: &str = "PENDING";

/// All recognized license statuses, in display order.
pub const LICENSE_STATUSES: [&str; 4] = [
    LICENSE_STATUS_ACTIVE,
    LICENSE_STATUS_INACTIVE,
    LICENSE_STATUS_EXPIRED,
    LICENSE_STATUS_PENDING,
];

/// Currency assigned to imported records when the file carries none and the
/// operator picked no other default.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Checks whether a raw status value names a recognized license status.
/// Matching is case-insensitive; surrounding whitespace is ignored.
pub fn is_valid_license_status(value: &str) -> bool {
    let upper = value.trim().to_uppercase();
    LICENSE_STATUSES.contains(&upper.as_str())
}
