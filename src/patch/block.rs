//! Action block rendering.
//!
//! Builds the exact line sequence for one inserted action group, matching
//! the indentation and namespace alias of the anchor line it follows.

use crate::config::ActionConfig;
use crate::model::element_value;

/// Indentation step between nesting levels, matching the documents the
/// flight controller emits.
const INDENT_STEP: &str = "  ";

/// Render a complete action block for one waypoint.
///
/// The hover action (when enabled) always precedes the photograph and takes
/// action id 0; the photograph takes id 1. A photo-only block uses id 0 for
/// its single action.
pub fn render(
    anchor_line: &str,
    waypoint_index: u32,
    group_id: u64,
    config: &ActionConfig,
) -> Vec<String> {
    let indent = leading_whitespace(anchor_line);
    let prefix = namespace_alias(anchor_line);
    let mut block = BlockWriter::new(indent, prefix);

    block.line(
        0,
        &format!("<!-- Action Group for Waypoint: {waypoint_index}'s Actions -->"),
    );
    block.open(0, "actionGroup");
    block.element(1, "actionGroupId", &group_id.to_string());
    block.element(1, "actionGroupStartIndex", &waypoint_index.to_string());
    block.element(1, "actionGroupEndIndex", &waypoint_index.to_string());
    block.element(1, "actionGroupMode", "sequence");
    block.open(1, "actionTrigger");
    block.element(2, "actionTriggerType", "reachPoint");
    block.close(1, "actionTrigger");

    let mut action_id = 0;
    if config.hover_enabled {
        block.open(1, "action");
        block.element(2, "actionId", &action_id.to_string());
        block.element(2, "actionActuatorFunc", "hover");
        block.open(2, "actionActuatorFuncParam");
        block.element(3, "hoverTime", &config.hover_seconds.to_string());
        block.close(2, "actionActuatorFuncParam");
        block.close(1, "action");
        action_id += 1;
    }

    block.open(1, "action");
    block.element(2, "actionId", &action_id.to_string());
    block.element(2, "actionActuatorFunc", "takePhoto");
    block.open(2, "actionActuatorFuncParam");
    block.element(3, "payloadPositionIndex", "0");
    block.empty(3, "fileSuffix");
    block.element(3, "useGlobalPayloadLensIndex", "0");
    block.close(2, "actionActuatorFuncParam");
    block.close(1, "action");

    block.close(0, "actionGroup");
    block.finish()
}

/// Line writer that applies the anchor's indentation and alias to every tag.
struct BlockWriter {
    indent: String,
    prefix: String,
    lines: Vec<String>,
}

impl BlockWriter {
    fn new(indent: &str, prefix: &str) -> Self {
        Self {
            indent: indent.to_string(),
            prefix: prefix.to_string(),
            lines: Vec::new(),
        }
    }

    fn line(&mut self, depth: usize, content: &str) {
        self.lines
            .push(format!("{}{}{content}", self.indent, INDENT_STEP.repeat(depth)));
    }

    fn open(&mut self, depth: usize, local: &str) {
        let prefix = self.prefix.clone();
        self.line(depth, &format!("<{prefix}:{local}>"));
    }

    fn close(&mut self, depth: usize, local: &str) {
        let prefix = self.prefix.clone();
        self.line(depth, &format!("</{prefix}:{local}>"));
    }

    fn element(&mut self, depth: usize, local: &str, value: &str) {
        let prefix = self.prefix.clone();
        self.line(depth, &format!("<{prefix}:{local}>{value}</{prefix}:{local}>"));
    }

    fn empty(&mut self, depth: usize, local: &str) {
        let prefix = self.prefix.clone();
        self.line(depth, &format!("<{prefix}:{local}/>"));
    }

    fn finish(self) -> Vec<String> {
        self.lines
    }
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// The namespace alias of the anchor element, so inserted tags blend in
/// even when the document uses something other than `wpml`.
fn namespace_alias(anchor_line: &str) -> &str {
    element_value(anchor_line, "useStraightLine")
        .and_then(|(prefix, _)| prefix)
        .unwrap_or("wpml")
}
