//! Well-known constants of the CLB core.

use clb_ids::UserId;

/// Sentinel user that a collection is shared with when it is public.
///
/// Collections whose `shared_with` set contains this user are readable by
/// everyone.
pub const PUBLIC_USER_ID: UserId = UserId::from_u128(0x00ac_ce55_0400_a110_1337_0000_0000_0000);

/// Default description for codelists created without one.
pub const DEFAULT_CODELIST_DESCRIPTION: &str = "Empty Description of Codelist";
