//! Context resolution: recover the waypoint index that owns an anchor.

use crate::model::{Document, LineKind};

/// How far before an anchor to look for the waypoint's index declaration.
pub const BACKWARD_WINDOW_LINES: usize = 30;

/// Find the waypoint index declared nearest before the anchor.
///
/// Walks the bounded window and keeps the last declaration seen, i.e. the
/// one physically closest to the anchor. A waypoint's trailer can follow
/// another waypoint's within the window, so taking the first match from the
/// top would mislabel the block.
///
/// Returns `None` when no declaration is in the window; the caller degrades
/// to a sentinel rather than aborting.
pub fn resolve_index(doc: &Document, anchor: usize) -> Option<u32> {
    let start = anchor.saturating_sub(BACKWARD_WINDOW_LINES);
    let mut closest = None;
    for kind in &doc.kinds()[start..anchor] {
        if let LineKind::IndexDecl(index) = kind {
            closest = Some(*index);
        }
    }
    closest
}
