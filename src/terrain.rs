//! Terrain surfaces that collidable points are tested against.

use crate::fph;
use nalgebra::{UnitVector3, Vector3};
use std::fmt;

/// A terrain surface queried by horizontal world coordinates.
pub trait Terrain: fmt::Debug {
    /// Returns the terrain height at the given horizontal coordinates.
    fn height_at(&self, x: fph, y: fph) -> fph;

    /// Returns the terrain surface normal at the given horizontal
    /// coordinates.
    fn normal_at(&self, x: fph, y: fph) -> UnitVector3<fph>;
}

/// A horizontal plane at constant height with a vertical normal.
#[derive(Clone, Debug)]
pub struct FlatTerrain {
    height: fph,
}

/// An inclined plane with an arbitrary normal, passing through the given
/// height on the vertical axis.
#[derive(Clone, Debug)]
pub struct PlaneTerrain {
    normal: UnitVector3<fph>,
    height: fph,
}

impl FlatTerrain {
    /// Creates a flat terrain at the given height.
    pub fn new(height: fph) -> Self {
        Self { height }
    }
}

impl Default for FlatTerrain {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Terrain for FlatTerrain {
    fn height_at(&self, _x: fph, _y: fph) -> fph {
        self.height
    }

    fn normal_at(&self, _x: fph, _y: fph) -> UnitVector3<fph> {
        Vector3::z_axis()
    }
}

impl PlaneTerrain {
    /// Creates a plane with the given (not necessarily normalized) normal,
    /// passing through `(0, 0, height)`.
    pub fn new(normal: Vector3<fph>, height: fph) -> Self {
        Self {
            normal: UnitVector3::new_normalize(normal),
            height,
        }
    }
}

impl Terrain for PlaneTerrain {
    fn height_at(&self, x: fph, y: fph) -> fph {
        // Solve n . (p - [0, 0, height]) = 0 for the z-coordinate of p. A
        // horizontal normal has no height solution; degrade to the reference
        // height instead of dividing by zero.
        if self.normal.z.abs() < fph::EPSILON {
            return self.height;
        }
        self.height - (self.normal.x * x + self.normal.y * y) / self.normal.z
    }

    fn normal_at(&self, _x: fph, _y: fph) -> UnitVector3<fph> {
        self.normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn flat_terrain_has_constant_height_and_vertical_normal() {
        let terrain = FlatTerrain::new(1.5);
        assert_abs_diff_eq!(terrain.height_at(0.0, 0.0), 1.5);
        assert_abs_diff_eq!(terrain.height_at(-3.0, 7.0), 1.5);
        assert_abs_diff_eq!(
            terrain.normal_at(2.0, -2.0).into_inner(),
            Vector3::new(0.0, 0.0, 1.0)
        );
    }

    #[test]
    fn default_flat_terrain_is_at_zero_height() {
        assert_abs_diff_eq!(FlatTerrain::default().height_at(1.0, 1.0), 0.0);
    }

    #[test]
    fn plane_terrain_points_satisfy_the_plane_equation() {
        let terrain = PlaneTerrain::new(Vector3::new(0.2, -0.1, 1.0), 0.5);
        for (x, y) in [(0.0, 0.0), (1.0, 2.0), (-4.0, 0.3)] {
            let point = Vector3::new(x, y, terrain.height_at(x, y));
            let offset = point - Vector3::new(0.0, 0.0, 0.5);
            assert_relative_eq!(
                terrain.normal_at(x, y).dot(&offset),
                0.0,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn vertical_plane_degrades_to_reference_height() {
        let terrain = PlaneTerrain::new(Vector3::new(1.0, 0.0, 0.0), 0.25);
        assert_abs_diff_eq!(terrain.height_at(10.0, -10.0), 0.25);
    }
}
