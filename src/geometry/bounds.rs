use super::vector::{Vec3, add, length, scale, sub};

/// Axis-aligned bounding box in model units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create bounds from a set of points
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let mut min = [f64::MAX; 3];
        let mut max = [f64::MIN; 3];

        for p in points {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }

        Some(Self { min, max })
    }

    /// Expand bounds to include another set of points
    pub fn expand(&mut self, points: &[Vec3]) {
        for p in points {
            for axis in 0..3 {
                self.min[axis] = self.min[axis].min(p[axis]);
                self.max[axis] = self.max[axis].max(p[axis]);
            }
        }
    }

    /// Width, height and depth of the box
    pub fn dimensions(&self) -> Vec3 {
        sub(self.max, self.min)
    }

    /// Length of the box diagonal.
    ///
    /// This is the "extent" every size-dependent heuristic works from.
    pub fn diagonal(&self) -> f64 {
        length(self.dimensions())
    }

    pub fn center(&self) -> Vec3 {
        scale(add(self.min, self.max), 0.5)
    }

    /// Largest of the three dimensions
    pub fn max_dimension(&self) -> f64 {
        let d = self.dimensions();
        d[0].max(d[1]).max(d[2])
    }
}
