//! Cubemap skybox: a large cube that tracks the camera's rotation but not
//! its translation, so the background always recenters on the viewer.

use std::path::{Path, PathBuf};

use glam::{Mat3, Mat4, Vec3};

use crate::camera::Camera;

/// Cubemap face file names in the fixed upload order
/// +X, -X, +Y, -Y, +Z, -Z.
pub const FACE_FILES: [&str; 6] = [
    "right.jpg",
    "left.jpg",
    "up.jpg",
    "down.jpg",
    "back.jpg",
    "front.jpg",
];

/// Edge length applied to the unit cube so the box encloses the scene.
pub const SKYBOX_SCALE: f32 = 2000.0;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 4000.0;

/// Inward-facing unit cube, four vertices per face.
pub const CUBE_VERTICES: [f32; 72] = [
    // front
    -0.5, 0.5, 0.5, //
    -0.5, -0.5, 0.5, //
    0.5, -0.5, 0.5, //
    0.5, 0.5, 0.5, //
    // back
    0.5, 0.5, -0.5, //
    0.5, -0.5, -0.5, //
    -0.5, -0.5, -0.5, //
    -0.5, 0.5, -0.5, //
    // right
    0.5, 0.5, 0.5, //
    0.5, -0.5, 0.5, //
    0.5, -0.5, -0.5, //
    0.5, 0.5, -0.5, //
    // left
    -0.5, 0.5, -0.5, //
    -0.5, -0.5, -0.5, //
    -0.5, -0.5, 0.5, //
    -0.5, 0.5, 0.5, //
    // top
    -0.5, 0.5, -0.5, //
    -0.5, 0.5, 0.5, //
    0.5, 0.5, 0.5, //
    0.5, 0.5, -0.5, //
    // bottom
    -0.5, -0.5, 0.5, //
    -0.5, -0.5, -0.5, //
    0.5, -0.5, -0.5, //
    0.5, -0.5, 0.5, //
];

/// Two inward-wound triangles per cube face.
pub const CUBE_INDICES: [u32; 36] = [
    2, 1, 0, 3, 2, 0, // front
    6, 5, 4, 7, 6, 4, // back
    10, 9, 8, 11, 10, 8, // right
    14, 13, 12, 15, 14, 12, // left
    18, 17, 16, 19, 18, 16, // top
    22, 21, 20, 23, 22, 20, // bottom
];

/// Skybox transform state. The cached matrix is fully recomputed on every
/// update; nothing else persists between frames.
#[derive(Debug)]
pub struct Skybox {
    pvm: Mat4,
}

impl Skybox {
    pub fn new() -> Self {
        Self {
            pvm: Mat4::IDENTITY,
        }
    }

    /// Recomputes the projection-view-model matrix from the current camera.
    /// The view matrix is reduced to its rotation block so camera movement
    /// never translates the box.
    pub fn update(&mut self, camera: &Camera) {
        let projection =
            Mat4::perspective_rh(camera.fov.to_radians(), camera.aspect(), NEAR_PLANE, FAR_PLANE);
        let rotation_only = Mat4::from_mat3(Mat3::from_mat4(camera.view_matrix()));
        self.pvm = projection * rotation_only * Mat4::from_scale(Vec3::splat(SKYBOX_SCALE));
    }

    pub fn pvm(&self) -> Mat4 {
        self.pvm
    }
}

impl Default for Skybox {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves the six face image paths under `<assets>/textures/cubemap/`.
pub fn face_paths(assets_dir: &Path) -> [PathBuf; 6] {
    FACE_FILES.map(|name| assets_dir.join("textures").join("cubemap").join(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_geometry_is_well_formed() {
        assert_eq!(CUBE_VERTICES.len(), 24 * 3);
        assert_eq!(CUBE_INDICES.len(), 36);
        assert!(CUBE_INDICES.iter().all(|&i| i < 24));
    }

    #[test]
    fn update_strips_camera_translation() {
        let mut near = Camera::new(800, 800, Vec3::ZERO);
        let mut far = Camera::new(800, 800, Vec3::new(50.0, -3.0, 12.0));

        let mut skybox_near = Skybox::new();
        let mut skybox_far = Skybox::new();
        skybox_near.update(&near);
        skybox_far.update(&far);
        assert!(skybox_near.pvm().abs_diff_eq(skybox_far.pvm(), 1e-5));

        // A rotation difference does change the matrix.
        near.apply_mouse_movement(250.0, 40.0);
        far.apply_mouse_movement(0.0, 0.0);
        skybox_near.update(&near);
        skybox_far.update(&far);
        assert!(!skybox_near.pvm().abs_diff_eq(skybox_far.pvm(), 1e-5));
    }

    #[test]
    fn face_order_matches_cubemap_layers() {
        let paths = face_paths(Path::new("assets"));
        assert!(paths[0].ends_with("textures/cubemap/right.jpg"));
        assert!(paths[1].ends_with("textures/cubemap/left.jpg"));
        assert!(paths[5].ends_with("textures/cubemap/front.jpg"));
    }
}
