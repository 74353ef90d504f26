//! Core modules for the sphere-field scene renderer.
//!
//! The crate exposes the scene components — camera, light rig, procedural
//! sphere field, skybox — independently of the GPU layer, so they stay
//! testable headless.  The wgpu renderer and the winit frame loop consume
//! them but never own their state.

pub mod assets;
pub mod camera;
pub mod input;
pub mod lights;
pub mod render;
pub mod skybox;
pub mod sphere;

pub use assets::{AssetError, ImageData};
pub use camera::{Camera, CursorZone};
pub use input::{InputState, KeyCode, MouseButton, NamedKey, ToggleLatch};
pub use lights::{
    Attenuation, DirectionalLight, LightCategory, LightRig, LightsUniform, PointLight, RimLight,
    SpotLight,
};
pub use render::{FrameState, MarkerInstance, Renderer};
pub use skybox::Skybox;
pub use sphere::{FieldBounds, SphereField, SphereGeometry};
