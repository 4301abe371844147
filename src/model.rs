//! Core data model: the mission document and its derived types.
//!
//! A `Document` is an immutable array of text lines plus a one-shot
//! classification of each line's kind. The patcher and estimator never
//! re-scan raw strings; they look up `LineKind`s by position, and every
//! line not touched by patching round-trips byte-for-byte.

use log::warn;
use serde::Serialize;

/// What a single document line means to the patcher.
///
/// Classified once when the document is built. Lines that carry no
/// structural meaning for patching are `Other` and pass through verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// A waypoint boundary eligible for insertion:
    /// a `useStraightLine` element with value `0`.
    Anchor,

    /// A waypoint index declaration, e.g. `<wpml:index>4</wpml:index>`.
    IndexDecl(u32),

    /// An action-group opening tag, any namespace alias.
    GroupOpen,

    /// An action-group identifier, e.g. `<wpml:actionGroupId>2</...>`.
    GroupId(u64),

    /// A waypoint (`Placemark`) opening tag.
    PlacemarkOpen,

    /// A waypoint (`Placemark`) closing tag.
    PlacemarkClose,

    /// Anything else: copied through untouched.
    Other,
}

/// One waypoint's position, used only by the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude_meters: f64,
}

/// Derived time/energy estimate for a mission. Reported, never persisted.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionEstimate {
    pub total_distance_meters: f64,
    pub flight_time_seconds: f64,
    pub action_time_seconds: f64,
    pub total_time_seconds: f64,
    pub battery_percent: f64,
}

/// The structured report handed back to the caller after a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionReport {
    pub waypoint_count: usize,
    pub insertion_count: usize,

    /// `None` when the mission has fewer than two usable waypoints.
    #[serde(flatten)]
    pub estimate: Option<MissionEstimate>,
}

/// A mission document: ordered lines plus their classification.
#[derive(Debug, Clone)]
pub struct Document {
    lines: Vec<String>,
    kinds: Vec<LineKind>,
}

impl Document {
    /// Build a document from raw text.
    ///
    /// Splits on `\n` only, so a `\r` at the end of a CRLF line stays part
    /// of the line content and `to_text` reproduces the input exactly.
    pub fn parse(text: &str) -> Self {
        Self::from_lines(text.split('\n').map(String::from).collect())
    }

    /// Build a document from an already-split line sequence.
    pub fn from_lines(lines: Vec<String>) -> Self {
        let kinds = lines.iter().map(|l| classify(l)).collect();
        Self { lines, kinds }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn kinds(&self) -> &[LineKind] {
        &self.kinds
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Reassemble the document text.
    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }

    /// Number of waypoint (`Placemark`) opening tags.
    pub fn placemark_count(&self) -> usize {
        self.kinds
            .iter()
            .filter(|k| matches!(k, LineKind::PlacemarkOpen))
            .count()
    }

    /// Highest action-group identifier already present, if any.
    pub fn max_group_id(&self) -> Option<u64> {
        self.kinds
            .iter()
            .filter_map(|k| match k {
                LineKind::GroupId(id) => Some(*id),
                _ => None,
            })
            .max()
    }

    /// Extract the ordered waypoint coordinates for estimation.
    ///
    /// A waypoint's `<coordinates>` element holds `lon,lat` or `lon,lat,alt`.
    /// When the altitude field is absent, the waypoint's `executeHeight`
    /// element (which follows the coordinates within the same placemark)
    /// supplies it; otherwise altitude is 0. Coordinates with fewer than two
    /// numeric fields drop the waypoint with a warning rather than failing.
    pub fn waypoints(&self) -> Vec<Waypoint> {
        let mut waypoints: Vec<Waypoint> = Vec::new();
        // Index of the last waypoint still waiting for an executeHeight.
        let mut awaiting_height: Option<usize> = None;

        let mut i = 0;
        while i < self.lines.len() {
            if let Some((text, next)) = self.coordinate_text_at(i) {
                match parse_coordinates(&text) {
                    Some((longitude, latitude, altitude)) => {
                        waypoints.push(Waypoint {
                            longitude,
                            latitude,
                            altitude_meters: altitude.unwrap_or(0.0),
                        });
                        awaiting_height = if altitude.is_none() {
                            Some(waypoints.len() - 1)
                        } else {
                            None
                        };
                    }
                    None => {
                        warn!("dropping waypoint with malformed coordinates: {text:?}");
                    }
                }
                i = next;
                continue;
            }

            if let Some((_, value)) = element_value(&self.lines[i], "executeHeight") {
                if let Some(at) = awaiting_height {
                    if let Ok(height) = value.trim().parse::<f64>() {
                        waypoints[at].altitude_meters = height;
                    }
                    awaiting_height = None;
                }
            } else if matches!(self.kinds[i], LineKind::PlacemarkClose) {
                awaiting_height = None;
            }

            i += 1;
        }

        waypoints
    }

    /// Read the text content of a `<coordinates>` element starting at line
    /// `i`, handling both single-line elements and an opening tag with the
    /// value on a following line. Returns the content and the line index
    /// just past the element.
    fn coordinate_text_at(&self, i: usize) -> Option<(String, usize)> {
        let line = &self.lines[i];
        if let Some((_, value)) = element_value(line, "coordinates") {
            return Some((value.to_string(), i + 1));
        }

        if open_tag(line).is_some_and(|(_, local)| local == "coordinates") {
            let mut value = String::new();
            for (j, candidate) in self.lines.iter().enumerate().skip(i + 1) {
                if close_tag(candidate) == Some("coordinates") {
                    return Some((value, j + 1));
                }
                if value.is_empty() {
                    value = candidate.trim().to_string();
                }
            }
        }

        None
    }
}

/// Classify one line. The whole (trimmed) line must be the element in
/// question — patching never matches markers embedded in longer lines.
fn classify(line: &str) -> LineKind {
    if let Some((_, value)) = element_value(line, "useStraightLine") {
        if value == "0" {
            return LineKind::Anchor;
        }
        return LineKind::Other;
    }

    if let Some((_, value)) = element_value(line, "index") {
        if let Ok(index) = value.trim().parse() {
            return LineKind::IndexDecl(index);
        }
        return LineKind::Other;
    }

    if let Some((_, value)) = element_value(line, "actionGroupId") {
        if let Ok(id) = value.trim().parse() {
            return LineKind::GroupId(id);
        }
        return LineKind::Other;
    }

    if let Some((_, local)) = open_tag(line) {
        return match local {
            "actionGroup" => LineKind::GroupOpen,
            "Placemark" => LineKind::PlacemarkOpen,
            _ => LineKind::Other,
        };
    }

    if close_tag(line) == Some("Placemark") {
        return LineKind::PlacemarkClose;
    }

    LineKind::Other
}

/// Split `<prefix:local>value</prefix:local>` into prefix and value.
/// The prefix is optional; the trimmed line must be exactly one element.
pub(crate) fn element_value<'a>(line: &'a str, local: &str) -> Option<(Option<&'a str>, &'a str)> {
    let rest = line.trim().strip_prefix('<')?;
    let open_end = rest.find('>')?;
    let name = &rest[..open_end];
    let prefix = match name.split_once(':') {
        Some((p, l)) if l == local => Some(p),
        None if name == local => None,
        _ => return None,
    };
    let body = &rest[open_end + 1..];
    let value = body.strip_suffix('>')?.strip_suffix(name)?.strip_suffix("</")?;
    Some((prefix, value))
}

/// Parse a bare opening tag `<prefix:local>`, returning prefix and local name.
fn open_tag(line: &str) -> Option<(Option<&str>, &str)> {
    let name = line.trim().strip_prefix('<')?.strip_suffix('>')?;
    if name.is_empty() || name.contains(['<', '>', '/', ' ']) {
        return None;
    }
    match name.split_once(':') {
        Some((prefix, local)) => Some((Some(prefix), local)),
        None => Some((None, name)),
    }
}

/// Parse a bare closing tag `</prefix:local>`, returning the local name.
fn close_tag(line: &str) -> Option<&str> {
    let name = line.trim().strip_prefix("</")?.strip_suffix('>')?;
    if name.is_empty() || name.contains(['<', '>', '/', ' ']) {
        return None;
    }
    match name.split_once(':') {
        Some((_, local)) => Some(local),
        None => Some(name),
    }
}

/// Parse `lon,lat[,alt]`. Fewer than two numeric fields is malformed.
fn parse_coordinates(text: &str) -> Option<(f64, f64, Option<f64>)> {
    let mut fields = text.split(',').map(str::trim);
    let longitude = fields.next()?.parse().ok()?;
    let latitude = fields.next()?.parse().ok()?;
    let altitude = fields.next().and_then(|f| f.parse().ok());
    Some((longitude, latitude, altitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Classification ──

    #[test]
    fn classifies_anchor_line() {
        let doc = Document::parse("      <wpml:useStraightLine>0</wpml:useStraightLine>");
        assert_eq!(doc.kinds()[0], LineKind::Anchor);
    }

    #[test]
    fn straight_line_enabled_is_not_an_anchor() {
        let doc = Document::parse("      <wpml:useStraightLine>1</wpml:useStraightLine>");
        assert_eq!(doc.kinds()[0], LineKind::Other);
    }

    #[test]
    fn classifies_anchor_with_alternate_alias() {
        let doc = Document::parse("  <ns1:useStraightLine>0</ns1:useStraightLine>");
        assert_eq!(doc.kinds()[0], LineKind::Anchor);
    }

    #[test]
    fn marker_embedded_in_longer_line_is_not_an_anchor() {
        let doc = Document::parse("<a/><wpml:useStraightLine>0</wpml:useStraightLine>");
        assert_eq!(doc.kinds()[0], LineKind::Other);
    }

    #[test]
    fn classifies_index_and_group_lines() {
        let doc = Document::parse(
            "<wpml:index>7</wpml:index>\n\
             <wpml:actionGroup>\n\
             <wpml:actionGroupId>12</wpml:actionGroupId>\n\
             <Placemark>\n\
             </Placemark>",
        );
        assert_eq!(doc.kinds()[0], LineKind::IndexDecl(7));
        assert_eq!(doc.kinds()[1], LineKind::GroupOpen);
        assert_eq!(doc.kinds()[2], LineKind::GroupId(12));
        assert_eq!(doc.kinds()[3], LineKind::PlacemarkOpen);
        assert_eq!(doc.kinds()[4], LineKind::PlacemarkClose);
    }

    #[test]
    fn classifies_namespaced_placemark_tags() {
        let doc = Document::parse("<ns0:Placemark>\n</ns0:Placemark>");
        assert_eq!(doc.kinds()[0], LineKind::PlacemarkOpen);
        assert_eq!(doc.kinds()[1], LineKind::PlacemarkClose);
    }

    // ── Round-trip ──

    #[test]
    fn to_text_round_trips_exactly() {
        let text = "<kml>\r\n  <Placemark>\n\n  </Placemark>\n</kml>\n";
        assert_eq!(Document::parse(text).to_text(), text);
    }

    // ── Derived lookups ──

    #[test]
    fn max_group_id_none_when_absent() {
        let doc = Document::parse("<Placemark>\n</Placemark>");
        assert_eq!(doc.max_group_id(), None);
    }

    #[test]
    fn max_group_id_takes_highest() {
        let doc = Document::parse(
            "<wpml:actionGroupId>3</wpml:actionGroupId>\n\
             <wpml:actionGroupId>11</wpml:actionGroupId>\n\
             <wpml:actionGroupId>5</wpml:actionGroupId>",
        );
        assert_eq!(doc.max_group_id(), Some(11));
    }

    #[test]
    fn placemark_count_counts_open_tags() {
        let doc = Document::parse("<Placemark>\n</Placemark>\n<Placemark>\n</Placemark>");
        assert_eq!(doc.placemark_count(), 2);
    }

    // ── Waypoint extraction ──

    #[test]
    fn extracts_single_line_coordinates() {
        let doc = Document::parse("<coordinates>-77.03,38.89,120.5</coordinates>");
        let wps = doc.waypoints();
        assert_eq!(wps.len(), 1);
        assert_eq!(wps[0].longitude, -77.03);
        assert_eq!(wps[0].latitude, 38.89);
        assert_eq!(wps[0].altitude_meters, 120.5);
    }

    #[test]
    fn extracts_multiline_coordinates_with_execute_height() {
        let doc = Document::parse(
            "<Placemark>\n\
             <Point>\n\
             <coordinates>\n\
               -77.03,38.89\n\
             </coordinates>\n\
             </Point>\n\
             <wpml:executeHeight>55</wpml:executeHeight>\n\
             </Placemark>",
        );
        let wps = doc.waypoints();
        assert_eq!(wps.len(), 1);
        assert_eq!(wps[0].altitude_meters, 55.0);
    }

    #[test]
    fn execute_height_does_not_leak_across_placemarks() {
        let doc = Document::parse(
            "<Placemark>\n\
             <coordinates>-77.03,38.89</coordinates>\n\
             </Placemark>\n\
             <Placemark>\n\
             <wpml:executeHeight>99</wpml:executeHeight>\n\
             </Placemark>",
        );
        let wps = doc.waypoints();
        assert_eq!(wps.len(), 1);
        assert_eq!(wps[0].altitude_meters, 0.0);
    }

    #[test]
    fn malformed_coordinates_drop_the_waypoint() {
        let doc = Document::parse(
            "<coordinates>-77.03</coordinates>\n\
             <coordinates>not,numbers</coordinates>\n\
             <coordinates>-77.04,38.90</coordinates>",
        );
        let wps = doc.waypoints();
        assert_eq!(wps.len(), 1);
        assert_eq!(wps[0].latitude, 38.90);
    }

    #[test]
    fn missing_altitude_defaults_to_zero() {
        let doc = Document::parse("<coordinates>-77.03,38.89</coordinates>");
        assert_eq!(doc.waypoints()[0].altitude_meters, 0.0);
    }
}
