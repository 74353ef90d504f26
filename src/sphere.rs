//! Procedural sphere field: UV-sphere tessellation, non-overlapping
//! placement by rejection sampling, and the per-frame spin shared by every
//! instance.

use glam::{Mat4, Vec3};
use log::debug;
use rand::Rng;

/// Floats per vertex: position (3), texcoord (2), normal (3).
pub const VERTEX_STRIDE: usize = 8;

/// Interleaved vertex and index arrays for one generated mesh.
///
/// The arrays are plain owned `Vec`s released in bulk when the geometry is
/// dropped; nothing shares or reference-counts them.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereGeometry {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl SphereGeometry {
    /// Tessellates a UV sphere with `quality` rings of `quality` points.
    ///
    /// Ring `i`, sector `j` is placed at `theta = j*pi/(quality-1)` down the
    /// vertical and `phi = i*2*pi/(quality-1)` around it; the normal is the
    /// unit position direction and the texcoord runs `i` across and `j` down
    /// (flipped so v = 0 sits at the bottom). Indices wrap both axes with a
    /// modulo so the mesh closes over the 0/2pi and 0/pi seams; the seam
    /// vertices themselves stay duplicated because the UV layout needs the
    /// seam anyway.
    pub fn generate(quality: usize, radius: f32) -> Self {
        let step = std::f32::consts::PI / (quality as f32 - 1.0);
        let mut vertices = Vec::with_capacity(quality * quality * VERTEX_STRIDE);

        let mut phi = 0.0_f32;
        for i in 0..quality {
            let mut theta = 0.0_f32;
            for j in 0..quality {
                let x = phi.cos() * theta.sin();
                let y = theta.cos();
                let z = phi.sin() * theta.sin();

                vertices.extend_from_slice(&[x * radius, y * radius, z * radius]);
                vertices.extend_from_slice(&[
                    i as f32 / (quality as f32 - 1.0),
                    1.0 - j as f32 / (quality as f32 - 1.0),
                ]);
                vertices.extend_from_slice(&[x, y, z]);

                theta += step;
            }
            phi += 2.0 * step;
        }

        let mut indices = Vec::with_capacity(quality * quality * 6);
        for i in 0..quality {
            for j in 0..quality {
                let ring = (i * quality) as u32;
                let next_ring = (((i + 1) % quality) * quality) as u32;
                let sector = j as u32;
                let next_sector = ((j + 1) % quality) as u32;

                indices.extend_from_slice(&[
                    next_ring + next_sector,
                    ring + sector,
                    next_ring + sector,
                ]);
                indices.extend_from_slice(&[
                    ring + next_sector,
                    ring + sector,
                    next_ring + next_sector,
                ]);
            }
        }

        Self { vertices, indices }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

/// Axis-aligned cubic volume the field scatters instances into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for FieldBounds {
    fn default() -> Self {
        Self {
            min: Vec3::splat(-10.0),
            max: Vec3::splat(10.0),
        }
    }
}

/// Rejection-samples up to `count` positions inside `bounds` such that no
/// two accepted positions are closer than `2 * radius`.
///
/// Each slot retries up to [`SphereField::MAX_PLACEMENT_TRIES`] candidates;
/// a slot whose budget runs out while still overlapping is skipped, so the
/// result may hold fewer than `count` positions. That shortfall is a
/// tolerated outcome, logged but never surfaced as an error.
pub fn scatter_positions(
    count: usize,
    radius: f32,
    bounds: &FieldBounds,
    rng: &mut impl Rng,
) -> Vec<Vec3> {
    let mut positions: Vec<Vec3> = Vec::with_capacity(count);

    for slot in 0..count {
        let mut placed = false;
        for _ in 0..SphereField::MAX_PLACEMENT_TRIES {
            let candidate = Vec3::new(
                rng.gen_range(bounds.min.x..=bounds.max.x),
                rng.gen_range(bounds.min.y..=bounds.max.y),
                rng.gen_range(bounds.min.z..=bounds.max.z),
            );
            if !overlaps(candidate, &positions, radius) {
                positions.push(candidate);
                placed = true;
                break;
            }
        }
        if !placed {
            debug!("placement budget exhausted for sphere slot {slot}; skipping");
        }
    }

    positions
}

fn overlaps(candidate: Vec3, placed: &[Vec3], radius: f32) -> bool {
    placed
        .iter()
        .any(|existing| candidate.distance(*existing) < 2.0 * radius)
}

/// The sphere field: one shared mesh redrawn at every accepted position,
/// plus a single reflective instance at the origin.
#[derive(Debug)]
pub struct SphereField {
    pub geometry: SphereGeometry,
    pub positions: Vec<Vec3>,
    pub radius: f32,
    rotation_degrees: f32,
}

impl SphereField {
    /// Ring/sector count of the shared mesh.
    pub const QUALITY: usize = 20;
    /// Instances requested from the placement pass.
    pub const INSTANCE_COUNT: usize = 100;
    /// Per-instance radius, also the placement separation basis.
    pub const RADIUS: f32 = 0.4;
    /// Shared spin rate in degrees per second.
    pub const SPIN_DEGREES_PER_SECOND: f32 = 80.0;
    /// Candidate budget per placement slot.
    pub const MAX_PLACEMENT_TRIES: usize = 100;

    pub fn new(rng: &mut impl Rng) -> Self {
        let geometry = SphereGeometry::generate(Self::QUALITY, Self::RADIUS);
        let positions = scatter_positions(
            Self::INSTANCE_COUNT,
            Self::RADIUS,
            &FieldBounds::default(),
            rng,
        );
        if positions.len() < Self::INSTANCE_COUNT {
            debug!(
                "placed {} of {} spheres before the retry budget ran out",
                positions.len(),
                Self::INSTANCE_COUNT
            );
        }
        Self {
            geometry,
            positions,
            radius: Self::RADIUS,
            rotation_degrees: 0.0,
        }
    }

    /// Advances the rotation shared by all instances.
    pub fn update(&mut self, delta_time: f32) {
        self.rotation_degrees += Self::SPIN_DEGREES_PER_SECOND * delta_time;
    }

    pub fn rotation_degrees(&self) -> f32 {
        self.rotation_degrees
    }

    /// Model matrix for one opaque instance: translate to its position, then
    /// spin about the vertical axis by the shared angle.
    pub fn instance_model(&self, position: Vec3) -> Mat4 {
        Mat4::from_translation(position) * Mat4::from_rotation_y(self.rotation_degrees.to_radians())
    }

    pub fn instance_models(&self) -> Vec<Mat4> {
        self.positions
            .iter()
            .map(|position| self.instance_model(*position))
            .collect()
    }

    /// The reflective instance sits at the origin and does not spin.
    pub fn reflective_model(&self) -> Mat4 {
        Mat4::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generation_produces_quality_squared_vertices() {
        let mesh = SphereGeometry::generate(4, 1.0);
        assert_eq!(mesh.vertex_count(), 16);
        assert_eq!(mesh.vertices.len(), 16 * VERTEX_STRIDE);
        assert_eq!(mesh.index_count(), 96);
        assert_eq!(mesh.indices.iter().max(), Some(&15));
    }

    #[test]
    fn generation_scales_with_quality() {
        let mesh = SphereGeometry::generate(SphereField::QUALITY, SphereField::RADIUS);
        let q = SphereField::QUALITY;
        assert_eq!(mesh.vertex_count(), q * q);
        assert_eq!(mesh.index_count(), 6 * q * q);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < q * q));
    }

    #[test]
    fn normals_are_unit_and_radial() {
        let radius = 2.5;
        let mesh = SphereGeometry::generate(8, radius);
        for vertex in mesh.vertices.chunks_exact(VERTEX_STRIDE) {
            let position = Vec3::new(vertex[0], vertex[1], vertex[2]);
            let normal = Vec3::new(vertex[5], vertex[6], vertex[7]);
            assert!((normal.length() - 1.0).abs() < 1e-4);
            assert!((position - normal * radius).length() < 1e-4);
        }
    }

    #[test]
    fn texcoords_stay_in_unit_square() {
        let mesh = SphereGeometry::generate(6, 1.0);
        for vertex in mesh.vertices.chunks_exact(VERTEX_STRIDE) {
            assert!((0.0..=1.0).contains(&vertex[3]));
            assert!((0.0..=1.0).contains(&vertex[4]));
        }
    }

    #[test]
    fn accepted_positions_never_overlap() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let radius = 0.4;
        let positions = scatter_positions(100, radius, &FieldBounds::default(), &mut rng);

        assert!(positions.len() <= 100);
        for (a, p) in positions.iter().enumerate() {
            for q in positions.iter().skip(a + 1) {
                assert!(
                    p.distance(*q) >= 2.0 * radius,
                    "spheres at {p} and {q} overlap"
                );
            }
        }
    }

    #[test]
    fn scatter_tolerates_an_unsatisfiable_request() {
        // A box too small for ten non-overlapping unit spheres: the budget
        // runs dry and the field simply comes up short.
        let mut rng = StdRng::seed_from_u64(7);
        let bounds = FieldBounds {
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
        };
        let positions = scatter_positions(10, 1.0, &bounds, &mut rng);
        assert!(!positions.is_empty());
        assert!(positions.len() < 10);
    }

    #[test]
    fn instances_share_one_rotation_angle() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut field = SphereField::new(&mut rng);
        field.update(0.5);
        assert!((field.rotation_degrees() - 40.0).abs() < 1e-4);

        let position = Vec3::new(1.0, 2.0, 3.0);
        let model = field.instance_model(position);
        let expected =
            Mat4::from_translation(position) * Mat4::from_rotation_y(40.0_f32.to_radians());
        assert!(model.abs_diff_eq(expected, 1e-5));
    }
}
