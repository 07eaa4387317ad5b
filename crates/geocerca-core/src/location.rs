//! Assignment and notification payloads handed to the caller.

use serde::{Deserialize, Serialize};

use crate::Coordinate;

/// Hierarchy ids attached to a property in progress.
///
/// Partial assignments (no sector yet) are valid intermediate states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyAssignment {
    pub country_id: Option<i64>,
    pub province_id: Option<i64>,
    pub sector_id: Option<i64>,
}

impl HierarchyAssignment {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.country_id.is_some() && self.province_id.is_some() && self.sector_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    SmartSector,
    Neighborhood,
    Area,
}

impl std::fmt::Display for TagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagKind::SmartSector => write!(f, "smart_sector"),
            TagKind::Neighborhood => write!(f, "neighborhood"),
            TagKind::Area => write!(f, "area"),
        }
    }
}

/// Informational label derived during resolution. Never part of the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroLocationTag {
    pub name: String,
    pub kind: TagKind,
    /// In `[0, 1]`.
    pub confidence: f64,
}

/// How a committed assignment was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentSource {
    /// Consensus winner matched a known sector.
    Auto,
    /// The operator mapped the detected name onto an existing sector.
    Alias,
    /// The operator registered the detected name as a new sector.
    NewLocation,
}

/// Payload of the caller's `on_location_update` callback.
///
/// Emitted once per committed assignment, never for debounce or in-flight
/// states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub assignment: HierarchyAssignment,
    pub coordinate: Coordinate,
    pub exact_address: Option<String>,
    pub micro_location_tags: Vec<MicroLocationTag>,
    pub source: AssignmentSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_without_sector_is_partial() {
        let partial = HierarchyAssignment {
            country_id: Some(1),
            province_id: Some(101),
            sector_id: None,
        };
        assert!(!partial.is_complete());
        assert!(!HierarchyAssignment::default().is_complete());

        let full = HierarchyAssignment {
            sector_id: Some(9),
            ..partial
        };
        assert!(full.is_complete());
    }

    #[test]
    fn source_and_tag_kind_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&AssignmentSource::NewLocation).unwrap(),
            r#""new_location""#
        );
        assert_eq!(TagKind::SmartSector.to_string(), "smart_sector");
    }
}
