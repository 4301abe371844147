//! Document patching: weave a uniform action block after every waypoint
//! boundary that lacks one.
//!
//! A single linear pass copies every input line and splices a freshly built
//! block after each unsatisfied anchor. Identifier assignment therefore
//! follows document order, and untouched lines survive byte-for-byte.
//! Re-running on an already-patched document is a no-op: the scanner's
//! "already satisfied" check keeps the patcher away from anchors that have
//! a block, whatever that block's formatting.

mod block;
mod context;
mod scanner;

use log::warn;

use crate::config::ActionConfig;
use crate::model::Document;

pub use scanner::Anchor;

/// Errors that can occur while patching a document.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("incompatible document: no insertion anchors found")]
    NoAnchors,
}

pub type Result<T> = core::result::Result<T, PatchError>;

/// Waypoint index used when no declaration is found near an anchor.
const SENTINEL_INDEX: u32 = 0;

/// Allocates action-group identifiers for one patch run.
///
/// Seeded one past the highest identifier already in the document and
/// threaded through the pass; identifiers are never reused within a run.
#[derive(Debug)]
pub struct GroupIdAllocator {
    next: u64,
}

impl GroupIdAllocator {
    /// Seed from a document: 1 + max existing id, or 0 when none exist.
    pub fn seeded_from(doc: &Document) -> Self {
        Self {
            next: doc.max_group_id().map_or(0, |max| max + 1),
        }
    }

    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// The result of one patch run.
#[derive(Debug)]
pub struct PatchOutcome {
    pub document: Document,
    pub anchor_count: usize,
    pub insertion_count: usize,
}

/// Patch a document with the allocator seeded from its existing identifiers.
pub fn patch(doc: &Document, config: &ActionConfig) -> Result<PatchOutcome> {
    let mut allocator = GroupIdAllocator::seeded_from(doc);
    patch_with_allocator(doc, config, &mut allocator)
}

/// Patch a document, drawing identifiers from the given allocator.
pub fn patch_with_allocator(
    doc: &Document,
    config: &ActionConfig,
    allocator: &mut GroupIdAllocator,
) -> Result<PatchOutcome> {
    let anchors = scanner::scan(doc);
    if anchors.is_empty() {
        return Err(PatchError::NoAnchors);
    }

    let mut output: Vec<String> = Vec::with_capacity(doc.len());
    let mut pending = anchors.iter().copied().peekable();
    let mut insertion_count = 0;

    for (position, line) in doc.lines().iter().enumerate() {
        output.push(line.clone());

        let Some(anchor) = pending.next_if(|a| a.position == position) else {
            continue;
        };
        if anchor.satisfied {
            continue;
        }

        let index = context::resolve_index(doc, position).unwrap_or_else(|| {
            warn!("no waypoint index found near line {position}; labeling block {SENTINEL_INDEX}");
            SENTINEL_INDEX
        });
        output.extend(block::render(line, index, allocator.allocate(), config));
        insertion_count += 1;
    }

    Ok(PatchOutcome {
        document: Document::from_lines(output),
        anchor_count: anchors.len(),
        insertion_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHOTO_ONLY: ActionConfig = ActionConfig {
        hover_enabled: false,
        hover_seconds: 0.0,
    };

    /// A minimal waypoint trailer: index declaration, anchor, closing tag.
    fn waypoint(index: u32) -> String {
        format!(
            "    <Placemark>\n\
             \x20     <wpml:index>{index}</wpml:index>\n\
             \x20     <wpml:useStraightLine>0</wpml:useStraightLine>\n\
             \x20   </Placemark>"
        )
    }

    fn mission(waypoints: u32) -> Document {
        let body: Vec<String> = (0..waypoints).map(waypoint).collect();
        Document::parse(&format!("<kml>\n{}\n</kml>", body.join("\n")))
    }

    #[test]
    fn inserts_one_block_per_unsatisfied_anchor() {
        let doc = mission(3);
        let outcome = patch(&doc, &PHOTO_ONLY).unwrap();

        assert_eq!(outcome.anchor_count, 3);
        assert_eq!(outcome.insertion_count, 3);
        // 19 block lines per photo-only group.
        assert_eq!(outcome.document.len(), doc.len() + 3 * 19);
    }

    #[test]
    fn identifiers_are_sequential_in_document_order() {
        let outcome = patch(&mission(3), &PHOTO_ONLY).unwrap();
        let ids: Vec<u64> = outcome
            .document
            .kinds()
            .iter()
            .filter_map(|k| match k {
                crate::model::LineKind::GroupId(id) => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, [0, 1, 2]);
    }

    #[test]
    fn allocator_seeds_past_existing_identifiers() {
        let text = format!(
            "<kml>\n\
             <wpml:actionGroupId>3</wpml:actionGroupId>\n\
             {}\n\
             {}\n\
             {}\n\
             </kml>",
            waypoint(0),
            waypoint(1),
            waypoint(2),
        );
        let outcome = patch(&Document::parse(&text), &PHOTO_ONLY).unwrap();

        let ids: Vec<u64> = outcome
            .document
            .kinds()
            .iter()
            .filter_map(|k| match k {
                crate::model::LineKind::GroupId(id) => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, [3, 4, 5, 6]);
    }

    #[test]
    fn explicit_allocator_base_is_respected() {
        let mut allocator = GroupIdAllocator::starting_at(4);
        let outcome = patch_with_allocator(&mission(3), &PHOTO_ONLY, &mut allocator).unwrap();

        assert_eq!(outcome.insertion_count, 3);
        let ids: Vec<u64> = outcome
            .document
            .kinds()
            .iter()
            .filter_map(|k| match k {
                crate::model::LineKind::GroupId(id) => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, [4, 5, 6]);
    }

    #[test]
    fn patching_is_idempotent() {
        let once = patch(&mission(4), &PHOTO_ONLY).unwrap();
        let twice = patch(&once.document, &PHOTO_ONLY).unwrap();

        assert_eq!(twice.insertion_count, 0);
        assert_eq!(once.document.to_text(), twice.document.to_text());
    }

    #[test]
    fn partially_patched_document_gets_only_missing_blocks() {
        let once = patch(&mission(2), &PHOTO_ONLY).unwrap();
        let patched_text = once.document.to_text();

        // Append a third, unpatched waypoint inside the document.
        let extended = patched_text.replace("</kml>", &format!("{}\n</kml>", waypoint(2)));
        let outcome = patch(&Document::parse(&extended), &PHOTO_ONLY).unwrap();

        assert_eq!(outcome.anchor_count, 3);
        assert_eq!(outcome.insertion_count, 1);
        // Previously patched content is untouched.
        assert!(outcome.document.to_text().starts_with(
            patched_text.strip_suffix("</kml>").unwrap()
        ));
    }

    #[test]
    fn untouched_lines_keep_their_relative_order() {
        let doc = mission(3);
        let outcome = patch(&doc, &PHOTO_ONLY).unwrap();

        let mut original = doc.lines().iter();
        let mut current = original.next();
        for line in outcome.document.lines() {
            if Some(line) == current {
                current = original.next();
            }
        }
        assert_eq!(current, None, "an input line went missing or moved");
    }

    #[test]
    fn zero_anchors_is_an_incompatible_document() {
        let doc = Document::parse("<kml>\n<Placemark>\n</Placemark>\n</kml>");
        assert!(matches!(
            patch(&doc, &PHOTO_ONLY),
            Err(PatchError::NoAnchors)
        ));
    }

    #[test]
    fn fully_satisfied_document_succeeds_with_zero_insertions() {
        let once = patch(&mission(2), &PHOTO_ONLY).unwrap();
        let outcome = patch(&once.document, &PHOTO_ONLY).unwrap();

        assert_eq!(outcome.anchor_count, 2);
        assert_eq!(outcome.insertion_count, 0);
    }

    #[test]
    fn unresolved_index_degrades_to_sentinel() {
        // Anchor with no index declaration anywhere near it.
        let doc = Document::parse(
            "<kml>\n\
             <wpml:useStraightLine>0</wpml:useStraightLine>\n\
             </kml>",
        );
        let outcome = patch(&doc, &PHOTO_ONLY).unwrap();

        assert_eq!(outcome.insertion_count, 1);
        assert!(outcome
            .document
            .lines()
            .iter()
            .any(|l| l.contains("Waypoint: 0's Actions")));
    }
}
