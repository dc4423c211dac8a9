//! Pose target tables: declarative per-bone target orientations.
//!
//! Built-in tables live in `poses/*.json` and are validated and embedded at
//! build time (see `build.rs`).

use crate::bone::BoneId;
use glam::Quat;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

pub use crate::bone::{EulerAngles, RotationOrder};

include!(concat!(env!("OUT_DIR"), "/pose_ids.rs"));

#[derive(Debug, Error)]
pub enum PoseLoadError {
    #[error("pose table '{name}': JSON parse error: {source}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON format of a pose table file
#[derive(Debug, Deserialize)]
struct PoseTableJson {
    #[serde(default)]
    order: RotationOrder,
    bones: BTreeMap<String, EulerAngles>,
}

/// Named mapping from canonical bone to an optional target orientation.
///
/// Static configuration data, never mutated at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseTargetTable {
    pub name: String,
    pub order: RotationOrder,
    targets: [Option<EulerAngles>; BoneId::COUNT],
}

impl PoseTargetTable {
    /// Empty table (every bone holds still)
    pub fn new(name: impl Into<String>, order: RotationOrder) -> Self {
        Self {
            name: name.into(),
            order,
            targets: [None; BoneId::COUNT],
        }
    }

    /// Return a new table with a target set for the bone
    pub fn with_target(mut self, bone: BoneId, angles: EulerAngles) -> Self {
        self.targets[bone.index()] = Some(angles);
        self
    }

    /// Parse a table from JSON. Unknown bone names are skipped with a warning.
    pub fn from_json(name: &str, json: &str) -> Result<Self, PoseLoadError> {
        let parsed: PoseTableJson =
            serde_json::from_str(json).map_err(|source| PoseLoadError::Json {
                name: name.to_string(),
                source,
            })?;

        let mut table = Self::new(name, parsed.order);
        for (raw, angles) in parsed.bones {
            match BoneId::from_name(&raw) {
                Some(bone) => table = table.with_target(bone, angles),
                None => log::warn!("Pose table '{}': unknown bone '{}' skipped", name, raw),
            }
        }
        Ok(table)
    }

    /// Target orientation for a bone, in the table's declared rotation order
    pub fn target(&self, bone: BoneId) -> Option<Quat> {
        self.targets[bone.index()].map(|angles| angles.to_quat(self.order))
    }

    /// Bones that have a target
    pub fn bones(&self) -> impl Iterator<Item = BoneId> + '_ {
        BoneId::ALL
            .into_iter()
            .filter(move |b| self.targets[b.index()].is_some())
    }
}

/// Pose library - loaded once, read-only during the fight
///
/// Stores every built-in pose table by enum ID.
/// This avoids hash map lookups entirely.
#[derive(Debug, Clone)]
pub struct PoseLibrary {
    // Indexed by PoseId
    tables: Vec<PoseTargetTable>,
}

impl PoseLibrary {
    /// Parse every embedded pose table
    pub fn builtin() -> Result<Self, PoseLoadError> {
        let tables = PoseId::ALL
            .iter()
            .map(|id| PoseTargetTable::from_json(id.file_stem(), id.source()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tables })
    }

    /// Get a table by ID
    #[inline]
    pub fn get(&self, id: PoseId) -> &PoseTargetTable {
        &self.tables[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bone::same_orientation;

    #[test]
    fn test_builtin_tables_parse() {
        let library = PoseLibrary::builtin().unwrap();
        for id in PoseId::ALL {
            let table = library.get(id);
            assert_eq!(table.name, id.file_stem());
            assert!(table.bones().count() > 0, "{} has no targets", table.name);
        }
    }

    #[test]
    fn test_fight_stance_is_generated() {
        assert_eq!(PoseId::FightStance.file_stem(), "fight_stance");
        assert_eq!(PoseId::PunchApexLeft.file_stem(), "punch_apex_left");
    }

    #[test]
    fn test_unknown_bones_are_skipped() {
        let json = r#"{
            "order": "ZYX",
            "bones": {
                "mixamorig:Head": { "x": 0, "y": 30, "z": 0 },
                "Tail": { "x": 10 }
            }
        }"#;

        let table = PoseTargetTable::from_json("test", json).unwrap();
        assert_eq!(table.order, RotationOrder::ZYX);
        assert_eq!(table.bones().collect::<Vec<_>>(), vec![BoneId::Head]);
        assert!(same_orientation(
            table.target(BoneId::Head).unwrap(),
            Quat::from_rotation_y(30f32.to_radians())
        ));
        assert!(table.target(BoneId::Hips).is_none());
    }

    #[test]
    fn test_parse_error_names_table() {
        let err = PoseTargetTable::from_json("broken", "{").unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
