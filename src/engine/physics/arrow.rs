use std::{fs, path::Path};

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::engine::{FieldConfig, FieldError, FieldResult};

/// An oriented point that pulls nearby queries toward its direction.
///
/// `direction` is not required to be unit length. The weighted mean scales
/// and sums it as-is, so longer arrows dominate their neighbourhood.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ArrowRecord")]
pub struct Arrow {
    pub position: Vec3,
    pub direction: Vec3,
}

impl Arrow {
    pub fn new(position: Vec3, direction: Vec3) -> Self {
        Self { position, direction }
    }

    /// Arrow pointing along the "down" axis of an oriented object
    pub fn from_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            direction: rotation * Vec3::NEG_Y,
        }
    }
}

/// On-disk arrow: either an explicit direction or an orientation
#[derive(Debug, Deserialize)]
struct ArrowRecord {
    position: Vec3,
    #[serde(default)]
    direction: Option<Vec3>,
    #[serde(default)]
    rotation: Option<Quat>,
}

impl TryFrom<ArrowRecord> for Arrow {
    type Error = FieldError;

    fn try_from(record: ArrowRecord) -> Result<Self, Self::Error> {
        match (record.direction, record.rotation) {
            (Some(direction), None) => Ok(Arrow::new(record.position, direction)),
            (None, Some(rotation)) => Ok(Arrow::from_rotation(record.position, rotation.normalize())),
            (Some(_), Some(_)) => Err(FieldError::InvalidConfig {
                reason: format!("arrow at {} has both direction and rotation", record.position),
            }),
            (None, None) => Err(FieldError::InvalidConfig {
                reason: format!("arrow at {} needs a direction or a rotation", record.position),
            }),
        }
    }
}

/// Arrows plus the settings used to resolve them, as authored in a scene file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldScene {
    #[serde(default)]
    pub config: FieldConfig,
    pub arrows: Vec<Arrow>,
}

impl FieldScene {
    pub fn new(config: FieldConfig, arrows: Vec<Arrow>) -> Self {
        Self { config, arrows }
    }

    pub fn from_json_str(text: &str) -> FieldResult<Self> {
        let scene: FieldScene = serde_json::from_str(text)?;
        scene.config.validate()?;
        Ok(scene)
    }

    pub fn load(path: impl AsRef<Path>) -> FieldResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let scene = Self::from_json_str(&text)?;
        tracing::info!(
            path = %path.as_ref().display(),
            arrows = scene.arrows.len(),
            "loaded field scene"
        );
        Ok(scene)
    }

    pub fn to_json_string(&self) -> FieldResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
