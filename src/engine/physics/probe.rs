use glam::Vec3;

use crate::engine::GravityField;

/// One sampled point of the field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSample {
    pub position: Vec3,
    /// Unit direction of the field here, zero where it cancels out
    pub direction: Vec3,
}

impl FieldSample {
    /// Per-axis colour for drawing this sample
    pub fn tint(&self) -> Vec3 {
        self.direction.abs()
    }
}

/// Regular grid of field samples around a viewer, for debug overlays
#[derive(Debug, Clone)]
pub struct FieldProbe {
    pub origin_offset: Vec3,
    pub dims: [usize; 3],
    pub spacing: f32,
}

impl Default for FieldProbe {
    fn default() -> Self {
        Self {
            origin_offset: Vec3::new(-8.0, -5.0, 10.0),
            dims: [16, 10, 20],
            spacing: 1.0,
        }
    }
}

impl FieldProbe {
    pub fn new(origin_offset: Vec3, dims: [usize; 3], spacing: f32) -> Self {
        Self { origin_offset, dims, spacing }
    }

    pub fn sample_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Grid positions, anchored at `center` truncated to whole units
    pub fn positions(&self, center: Vec3) -> Vec<Vec3> {
        let origin = center.trunc() + self.origin_offset;
        let [nx, ny, nz] = self.dims;

        let mut positions = Vec::with_capacity(self.sample_count());
        for x in 0..nx {
            for y in 0..ny {
                for z in 0..nz {
                    positions.push(origin + Vec3::new(x as f32, y as f32, z as f32) * self.spacing);
                }
            }
        }
        positions
    }

    pub fn sample(&self, field: &GravityField, center: Vec3) -> Vec<FieldSample> {
        self.positions(center)
            .into_iter()
            .map(|position| FieldSample {
                position,
                direction: field.gravity(position, false).normalize_or_zero(),
            })
            .collect()
    }
}
