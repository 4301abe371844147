//! Anchor scanning: find insertion points and check whether each is
//! already satisfied by an action block.

use crate::model::{Document, LineKind};

/// How far past an anchor to look for an existing action block.
///
/// The check stays local to the current waypoint's trailer: the same
/// marker repeats for every waypoint, so an unbounded scan would claim a
/// later waypoint's block as this one's.
pub const LOOKAHEAD_LINES: usize = 10;

/// An insertion anchor: a line position plus whether an action block
/// already follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub position: usize,
    pub satisfied: bool,
}

/// Scan the document for anchors, in document order.
pub fn scan(doc: &Document) -> Vec<Anchor> {
    doc.kinds()
        .iter()
        .enumerate()
        .filter(|(_, kind)| matches!(kind, LineKind::Anchor))
        .map(|(position, _)| Anchor {
            position,
            satisfied: has_following_block(doc, position),
        })
        .collect()
}

/// Look ahead through the bounded window for an action-group opening line,
/// stopping early at the waypoint's closing tag.
fn has_following_block(doc: &Document, anchor: usize) -> bool {
    let end = doc.len().min(anchor + 1 + LOOKAHEAD_LINES);
    for kind in &doc.kinds()[anchor + 1..end] {
        match kind {
            LineKind::GroupOpen => return true,
            LineKind::PlacemarkClose => return false,
            _ => {}
        }
    }
    false
}
