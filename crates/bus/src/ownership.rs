//! Session ownership check

use protocol::SessionId;

/// Whether a caller may unplug an entry owned by `owner`
///
/// Ordinary sessions only reach their own targets. The internal path reaches
/// every target.
pub fn may_unplug(owner: SessionId, caller: SessionId, internal: bool) -> bool {
    internal || owner == caller
}
