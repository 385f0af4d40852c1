//! Detection of collidable points penetrating the terrain.

use crate::{fph, terrain::Terrain};
use nalgebra::{Point3, Vector3};
use tinyvec::TinyVec;

/// A point fixed to a link of the articulated body, monitored for contact
/// against the terrain.
///
/// The gap vector holds the vertical gap to the terrain projected onto the
/// vertical structure of the surface normal; its z-component is the signed
/// penetration depth, negative when the point interpenetrates the terrain.
#[derive(Clone, Copy, Debug)]
pub struct CollidablePoint {
    /// World position of the point.
    pub position: Point3<fph>,
    /// World velocity of the point.
    pub velocity: Vector3<fph>,
    /// Index of the link the point is attached to.
    pub parent_link: usize,
    /// Projected gap vector to the terrain surface.
    pub gap: Vector3<fph>,
}

/// Inline-capacity buffer of collidable points, sized by contact index.
pub type CollidablePointBuffer = TinyVec<[CollidablePoint; 8]>;

impl CollidablePoint {
    /// Signed distance to the terrain along the projected gap; negative when
    /// penetrating.
    pub fn penetration_depth(&self) -> fph {
        self.gap.z
    }

    /// Whether the point currently penetrates the terrain.
    pub fn is_active(&self) -> bool {
        self.gap.z < 0.0
    }

    /// Multiplicative activation factor: 1 for active points, 0 otherwise.
    pub fn activation(&self) -> fph {
        if self.is_active() { 1.0 } else { 0.0 }
    }
}

impl Default for CollidablePoint {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            velocity: Vector3::zeros(),
            parent_link: 0,
            gap: Vector3::zeros(),
        }
    }
}

/// Projects each collidable point against the terrain.
///
/// Every point is handled independently: the terrain height and normal are
/// looked up at the point's horizontal coordinates, the vertical gap
/// `[0, 0, z - height]` is formed and projected onto the normal, and the
/// result is stored as the point's gap vector. Note that this captures only
/// the vertical component of the true signed distance along the normal,
/// which is accurate for near-flat terrain.
pub fn detect_contacts<T: Terrain + ?Sized>(
    terrain: &T,
    positions: &[Point3<fph>],
    velocities: &[Vector3<fph>],
    parent_links: &[usize],
) -> CollidablePointBuffer {
    debug_assert_eq!(positions.len(), velocities.len());
    debug_assert_eq!(positions.len(), parent_links.len());

    let mut points = CollidablePointBuffer::new();

    for ((&position, &velocity), &parent_link) in
        positions.iter().zip(velocities).zip(parent_links)
    {
        let normal = terrain.normal_at(position.x, position.y);
        let vertical_gap = Vector3::new(
            0.0,
            0.0,
            position.z - terrain.height_at(position.x, position.y),
        );
        let gap = Vector3::new(0.0, 0.0, vertical_gap.dot(&normal));

        points.push(CollidablePoint {
            position,
            velocity,
            parent_link,
            gap,
        });
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{FlatTerrain, PlaneTerrain};
    use approx::assert_abs_diff_eq;

    #[test]
    fn point_above_flat_terrain_is_inactive() {
        let points = detect_contacts(
            &FlatTerrain::default(),
            &[Point3::new(0.0, 0.0, 0.01)],
            &[Vector3::zeros()],
            &[0],
        );
        assert_eq!(points.len(), 1);
        assert!(!points[0].is_active());
        assert_abs_diff_eq!(points[0].penetration_depth(), 0.01);
        assert_abs_diff_eq!(points[0].activation(), 0.0);
    }

    #[test]
    fn point_below_flat_terrain_is_active() {
        let points = detect_contacts(
            &FlatTerrain::default(),
            &[Point3::new(1.0, -2.0, -1e-3)],
            &[Vector3::zeros()],
            &[3],
        );
        assert!(points[0].is_active());
        assert_abs_diff_eq!(points[0].penetration_depth(), -1e-3);
        assert_eq!(points[0].parent_link, 3);
    }

    #[test]
    fn gap_is_vertical_gap_scaled_by_normal_z() {
        let terrain = PlaneTerrain::new(Vector3::new(0.0, 1.0, 1.0), 0.0);
        let position = Point3::new(0.0, 0.0, -0.1);
        let points = detect_contacts(&terrain, &[position], &[Vector3::zeros()], &[0]);

        let normal_z = terrain.normal_at(0.0, 0.0).z;
        let expected = (position.z - terrain.height_at(0.0, 0.0)) * normal_z;
        assert_abs_diff_eq!(points[0].penetration_depth(), expected, epsilon = 1e-12);
        assert_abs_diff_eq!(points[0].gap.x, 0.0);
        assert_abs_diff_eq!(points[0].gap.y, 0.0);
    }

    #[test]
    fn point_exactly_on_the_surface_is_inactive() {
        let points = detect_contacts(
            &FlatTerrain::default(),
            &[Point3::new(0.0, 0.0, 0.0)],
            &[Vector3::zeros()],
            &[0],
        );
        assert!(!points[0].is_active());
    }
}
