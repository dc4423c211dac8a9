//! Build script for pose target table validation
//!
//! This script runs at compile time, validates every pose table in `poses/`
//! and generates the `PoseId` enum that embeds them into the binary.

// Include the shared canonical bone names
#[path = "src/bone/names.rs"]
mod names;

use heck::ToUpperCamelCase;
use names::{canonical_bone_name, ROTATION_ORDERS};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Largest absolute angle accepted in a pose table (degrees)
const MAX_ANGLE: f32 = 360.0;

#[derive(Debug, Deserialize)]
struct Angles {
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    z: f32,
}

#[derive(Debug, Deserialize)]
struct PoseFile {
    order: String,
    bones: BTreeMap<String, Angles>,
}

/// Validate a single pose table file
fn validate_pose_file(path: &Path) -> Result<usize, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    let pose: PoseFile = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;

    let mut errors = Vec::new();

    if !ROTATION_ORDERS.contains(&pose.order.as_str()) {
        errors.push(format!(
            "  unknown rotation order '{}' (expected one of {})",
            pose.order,
            ROTATION_ORDERS.join(", ")
        ));
    }

    for (bone, angles) in &pose.bones {
        if canonical_bone_name(bone).is_none() {
            errors.push(format!("  '{}' is not a canonical bone name", bone));
        }
        for (axis, value) in [("x", angles.x), ("y", angles.y), ("z", angles.z)] {
            if !value.is_finite() || value.abs() > MAX_ANGLE {
                errors.push(format!(
                    "  {}.{} = {} is outside ±{}°",
                    bone, axis, value, MAX_ANGLE
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(pose.bones.len())
    } else {
        Err(format!(
            "Pose table {} is invalid:\n{}",
            path.display(),
            errors.join("\n")
        ))
    }
}

/// Generate the `PoseId` enum source for the given (sorted) pose files
fn generate_pose_ids(poses: &[(String, PathBuf)]) -> String {
    let mut out = String::new();
    let count = poses.len();

    let _ = writeln!(out, "// @generated by build.rs from poses/*.json");
    let _ = writeln!(out);
    let _ = writeln!(out, "/// Built-in pose target tables");
    let _ = writeln!(out, "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]");
    let _ = writeln!(out, "pub enum PoseId {{");
    for (stem, _) in poses {
        let _ = writeln!(out, "    {},", stem.to_upper_camel_case());
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "impl PoseId {{");
    let _ = writeln!(out, "    pub const COUNT: usize = {};", count);
    let _ = writeln!(out);
    let _ = writeln!(out, "    pub const ALL: [PoseId; Self::COUNT] = [");
    for (stem, _) in poses {
        let _ = writeln!(out, "        PoseId::{},", stem.to_upper_camel_case());
    }
    let _ = writeln!(out, "    ];");
    let _ = writeln!(out);
    let _ = writeln!(out, "    #[inline]");
    let _ = writeln!(out, "    pub const fn index(self) -> usize {{");
    let _ = writeln!(out, "        self as usize");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out);
    let _ = writeln!(out, "    /// File name (without extension) under `poses/`");
    let _ = writeln!(out, "    pub const fn file_stem(self) -> &'static str {{");
    let _ = writeln!(out, "        match self {{");
    for (stem, _) in poses {
        let _ = writeln!(
            out,
            "            PoseId::{} => {:?},",
            stem.to_upper_camel_case(),
            stem
        );
    }
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out);
    let _ = writeln!(out, "    /// Embedded JSON source of the table");
    let _ = writeln!(out, "    pub const fn source(self) -> &'static str {{");
    let _ = writeln!(out, "        match self {{");
    for (stem, path) in poses {
        let _ = writeln!(
            out,
            "            PoseId::{} => include_str!({:?}),",
            stem.to_upper_camel_case(),
            path.display().to_string()
        );
    }
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");

    out
}

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let pose_dir = manifest_dir.join("poses");

    // Rerun if shared names or the pose directory change
    println!("cargo:rerun-if-changed=src/bone/names.rs");
    println!("cargo:rerun-if-changed={}", pose_dir.display());

    let mut poses = Vec::new();
    if let Ok(entries) = fs::read_dir(&pose_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    poses.push((stem.to_string(), path.clone()));
                }
            }
        }
    }
    // Deterministic variant order
    poses.sort();

    if poses.is_empty() {
        panic!("No pose tables found in {}", pose_dir.display());
    }

    let mut has_errors = false;
    for (_, path) in &poses {
        // Tell cargo to rerun if this file changes
        println!("cargo:rerun-if-changed={}", path.display());

        if let Err(e) = validate_pose_file(path) {
            println!("cargo:warning=VALIDATION ERROR: {}", e);
            has_errors = true;
        }
    }

    if has_errors {
        panic!("Pose table validation failed! Fix the pose files listed above.");
    }

    let generated = generate_pose_ids(&poses);
    let dest = out_dir.join("pose_ids.rs");
    if let Err(e) = fs::write(&dest, generated) {
        panic!("Failed to write {}: {}", dest.display(), e);
    }
}
