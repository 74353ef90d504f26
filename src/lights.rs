//! Multi-light rig: point, directional, spot, and rim categories with
//! edge-triggered enable toggles, packed into one GPU uniform per frame.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::input::{InputState, KeyCode, ToggleLatch};

/// Maximum number of point lights the lighting shader is sized for.
pub const MAX_POINT_LIGHTS: usize = 4;
/// Maximum number of spotlights the lighting shader is sized for.
pub const MAX_SPOT_LIGHTS: usize = 4;

/// Coefficients of the inverse-distance falloff model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub exponent: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub attenuation: Attenuation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

/// Spotlight cone cutoffs are stored as cosines of the half-angles so the
/// shader compares against a single dot product without inverse trig.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    pub position: Vec3,
    pub direction: Vec3,
    pub cut_off: f32,
    pub outer_cut_off: f32,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl SpotLight {
    /// Builds a spotlight from cone half-angles in degrees (inner < outer).
    pub fn with_cone_degrees(
        position: Vec3,
        direction: Vec3,
        inner_degrees: f32,
        outer_degrees: f32,
        ambient: Vec3,
        diffuse: Vec3,
        specular: Vec3,
    ) -> Self {
        Self {
            position,
            direction,
            cut_off: inner_degrees.to_radians().cos(),
            outer_cut_off: outer_degrees.to_radians().cos(),
            ambient,
            diffuse,
            specular,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RimLight {
    pub color: Vec3,
    pub strength: f32,
    pub power: f32,
}

/// Light categories the rig can enable and disable independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightCategory {
    Point,
    Directional,
    Spot,
    Rim,
}

impl LightCategory {
    pub const ALL: [LightCategory; 4] = [
        LightCategory::Point,
        LightCategory::Directional,
        LightCategory::Spot,
        LightCategory::Rim,
    ];

    fn index(self) -> usize {
        match self {
            LightCategory::Point => 0,
            LightCategory::Directional => 1,
            LightCategory::Spot => 2,
            LightCategory::Rim => 3,
        }
    }
}

/// Keys 1/2/3 toggle the point/directional/spot categories.
const TOGGLE_BINDINGS: [(KeyCode, LightCategory); 3] = [
    (KeyCode::Digit(1), LightCategory::Point),
    (KeyCode::Digit(2), LightCategory::Directional),
    (KeyCode::Digit(3), LightCategory::Spot),
];

/// Owns the scene's light collections and their enable state.
///
/// The rig holds no GPU resources: each frame it packs a [`LightsUniform`]
/// and the renderer writes it into whichever lighting pipeline is active.
/// Every category starts enabled.
#[derive(Debug)]
pub struct LightRig {
    pub point_lights: Vec<PointLight>,
    pub directional: DirectionalLight,
    pub spot_lights: Vec<SpotLight>,
    pub rim: RimLight,
    enabled: [bool; 4],
    latches: [ToggleLatch; 3],
}

impl LightRig {
    pub fn new(
        point_lights: Vec<PointLight>,
        directional: DirectionalLight,
        spot_lights: Vec<SpotLight>,
        rim: RimLight,
    ) -> Self {
        Self {
            point_lights,
            directional,
            spot_lights,
            rim,
            enabled: [true; 4],
            latches: [ToggleLatch::new(); 3],
        }
    }

    pub fn is_enabled(&self, category: LightCategory) -> bool {
        self.enabled[category.index()]
    }

    pub fn set_enabled(&mut self, category: LightCategory, enabled: bool) {
        self.enabled[category.index()] = enabled;
    }

    pub fn toggle(&mut self, category: LightCategory) {
        let slot = &mut self.enabled[category.index()];
        *slot = !*slot;
    }

    /// Applies the 1/2/3 toggle keys. Each key flips its category once per
    /// press: holding the key does not re-toggle, and the latch re-arms on
    /// release.
    pub fn handle_keys(&mut self, input: &InputState) {
        for (latch, (key, category)) in self.latches.iter_mut().zip(TOGGLE_BINDINGS) {
            if latch.rising_edge(input.is_key_down(key)) {
                let slot = &mut self.enabled[category.index()];
                *slot = !*slot;
            }
        }
    }

    /// Packs the rig into the shader-side uniform layout.
    ///
    /// Enabled categories serialize in full. Disabled categories keep their
    /// positions, directions, and counts but have ambient/diffuse/specular
    /// zeroed, so the category stops contributing illumination without
    /// perturbing the array-length bookkeeping the shader relies on.
    pub fn to_uniform(&self) -> LightsUniform {
        let mut uniform = LightsUniform::zeroed();

        let point_count = self.point_lights.len().min(MAX_POINT_LIGHTS);
        for (slot, light) in uniform.point.iter_mut().zip(&self.point_lights) {
            *slot = PointLightUniform {
                position: vec4(light.position, 1.0),
                color: vec4(light.color, 1.0),
                ambient: vec4(light.ambient, 0.0),
                diffuse: vec4(light.diffuse, 0.0),
                specular: vec4(light.specular, 0.0),
                attenuation: [
                    light.attenuation.constant,
                    light.attenuation.linear,
                    light.attenuation.exponent,
                    0.0,
                ],
            };
        }

        uniform.directional = DirectionalLightUniform {
            direction: vec4(self.directional.direction, 0.0),
            ambient: vec4(self.directional.ambient, 0.0),
            diffuse: vec4(self.directional.diffuse, 0.0),
            specular: vec4(self.directional.specular, 0.0),
        };

        let spot_count = self.spot_lights.len().min(MAX_SPOT_LIGHTS);
        for (slot, light) in uniform.spot.iter_mut().zip(&self.spot_lights) {
            *slot = SpotLightUniform {
                position: vec4(light.position, 1.0),
                direction: vec4(light.direction, 0.0),
                ambient: vec4(light.ambient, 0.0),
                diffuse: vec4(light.diffuse, 0.0),
                specular: vec4(light.specular, 0.0),
                cone: [light.cut_off, light.outer_cut_off, 0.0, 0.0],
            };
        }

        uniform.rim_color = vec4(self.rim.color, self.rim.strength);
        uniform.rim_params = [self.rim.power, 0.0, 0.0, 0.0];
        uniform.counts = [
            point_count as u32,
            spot_count as u32,
            self.is_enabled(LightCategory::Rim) as u32,
            0,
        ];

        for category in LightCategory::ALL {
            if !self.is_enabled(category) {
                uniform.disable_category(category);
            }
        }
        uniform
    }
}

impl Default for LightRig {
    /// The stock rig: two point lights (red above, blue below), one
    /// directional light, and one narrow spotlight facing the viewer axis.
    fn default() -> Self {
        let point_lights = vec![
            PointLight {
                position: Vec3::new(0.0, 10.0, 0.0),
                color: Vec3::new(1.0, 0.0, 0.0),
                ambient: Vec3::splat(0.02),
                diffuse: Vec3::splat(0.5),
                specular: Vec3::splat(1.0),
                attenuation: Attenuation {
                    constant: 2.0,
                    linear: 0.09,
                    exponent: 0.032,
                },
            },
            PointLight {
                position: Vec3::new(0.0, -10.0, 0.0),
                color: Vec3::new(0.0, 0.0, 1.0),
                ambient: Vec3::splat(0.2),
                diffuse: Vec3::splat(0.5),
                specular: Vec3::splat(1.0),
                attenuation: Attenuation {
                    constant: 2.0,
                    linear: 0.09,
                    exponent: 0.037,
                },
            },
        ];
        let directional = DirectionalLight {
            direction: Vec3::new(2.0, 1.0, 0.0),
            ambient: Vec3::splat(0.1),
            diffuse: Vec3::splat(0.5),
            specular: Vec3::new(1.0, 1.0, 0.5),
        };
        let spot_lights = vec![SpotLight::with_cone_degrees(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::new(0.0, 0.0, -5.0),
            5.0,
            18.0,
            Vec3::splat(0.1),
            Vec3::splat(1.0),
            Vec3::splat(1.0),
        )];
        let rim = RimLight {
            color: Vec3::new(0.0, 0.0, 1.0),
            strength: 0.6,
            power: 4.0,
        };
        Self::new(point_lights, directional, spot_lights, rim)
    }
}

fn vec4(v: Vec3, w: f32) -> [f32; 4] {
    [v.x, v.y, v.z, w]
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLightUniform {
    pub position: [f32; 4],
    pub color: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub attenuation: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DirectionalLightUniform {
    pub direction: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpotLightUniform {
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub cone: [f32; 4],
}

/// Complete lighting state as laid out in the shader's uniform block.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightsUniform {
    pub point: [PointLightUniform; MAX_POINT_LIGHTS],
    pub directional: DirectionalLightUniform,
    pub spot: [SpotLightUniform; MAX_SPOT_LIGHTS],
    /// Rim color in xyz, rim strength in w.
    pub rim_color: [f32; 4],
    /// Rim falloff power in x.
    pub rim_params: [f32; 4],
    /// Point count, spot count, rim-enabled flag.
    pub counts: [u32; 4],
}

impl LightsUniform {
    /// Zeroes a category's ambient/diffuse/specular terms in place while
    /// leaving positions, directions, and counts untouched.
    fn disable_category(&mut self, category: LightCategory) {
        const ZERO: [f32; 4] = [0.0; 4];
        match category {
            LightCategory::Point => {
                for light in &mut self.point {
                    light.ambient = ZERO;
                    light.diffuse = ZERO;
                    light.specular = ZERO;
                }
            }
            LightCategory::Directional => {
                self.directional.ambient = ZERO;
                self.directional.diffuse = ZERO;
                self.directional.specular = ZERO;
            }
            LightCategory::Spot => {
                for light in &mut self.spot {
                    light.ambient = ZERO;
                    light.diffuse = ZERO;
                    light.specular = ZERO;
                }
            }
            LightCategory::Rim => {
                self.counts[2] = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_starts_enabled() {
        let rig = LightRig::default();
        for category in LightCategory::ALL {
            assert!(rig.is_enabled(category), "{category:?} should start on");
        }
    }

    #[test]
    fn holding_a_toggle_key_flips_the_category_once() {
        let mut rig = LightRig::default();
        let input = InputState::new();

        input.set_key_down(KeyCode::Digit(1));
        rig.handle_keys(&input);
        assert!(!rig.is_enabled(LightCategory::Point));

        // Still held across several polls: no further toggling.
        rig.handle_keys(&input);
        rig.handle_keys(&input);
        assert!(!rig.is_enabled(LightCategory::Point));
    }

    #[test]
    fn press_release_press_toggles_twice() {
        let mut rig = LightRig::default();
        let input = InputState::new();

        input.set_key_down(KeyCode::Digit(3));
        rig.handle_keys(&input);
        input.set_key_up(KeyCode::Digit(3));
        rig.handle_keys(&input);
        input.set_key_down(KeyCode::Digit(3));
        rig.handle_keys(&input);

        // Net effect of on -> off -> on is the initial state.
        assert!(rig.is_enabled(LightCategory::Spot));
    }

    #[test]
    fn toggle_keys_are_independent_per_category() {
        let mut rig = LightRig::default();
        let input = InputState::new();

        input.set_key_down(KeyCode::Digit(2));
        rig.handle_keys(&input);
        assert!(rig.is_enabled(LightCategory::Point));
        assert!(!rig.is_enabled(LightCategory::Directional));
        assert!(rig.is_enabled(LightCategory::Spot));
    }

    #[test]
    fn spotlight_cutoffs_are_cosines_of_half_angles() {
        let rig = LightRig::default();
        let spot = &rig.spot_lights[0];
        assert!((spot.cut_off - 5.0_f32.to_radians().cos()).abs() < 1e-6);
        assert!((spot.outer_cut_off - 18.0_f32.to_radians().cos()).abs() < 1e-6);
        // Inner cone narrower than outer: its cosine is the larger one.
        assert!(spot.cut_off > spot.outer_cut_off);
    }

    #[test]
    fn disabling_a_category_zeroes_only_its_color_terms() {
        let mut rig = LightRig::default();
        let enabled = rig.to_uniform();

        rig.set_enabled(LightCategory::Point, false);
        rig.set_enabled(LightCategory::Spot, false);
        let disabled = rig.to_uniform();

        for i in 0..rig.point_lights.len() {
            assert_eq!(disabled.point[i].ambient, [0.0; 4]);
            assert_eq!(disabled.point[i].diffuse, [0.0; 4]);
            assert_eq!(disabled.point[i].specular, [0.0; 4]);
            assert_eq!(disabled.point[i].position, enabled.point[i].position);
        }
        for i in 0..rig.spot_lights.len() {
            assert_eq!(disabled.spot[i].ambient, [0.0; 4]);
            assert_eq!(disabled.spot[i].diffuse, [0.0; 4]);
            assert_eq!(disabled.spot[i].specular, [0.0; 4]);
            assert_eq!(disabled.spot[i].position, enabled.spot[i].position);
            assert_eq!(disabled.spot[i].direction, enabled.spot[i].direction);
            assert_eq!(disabled.spot[i].cone, enabled.spot[i].cone);
        }
        // The directional light was left enabled and is untouched.
        assert_eq!(disabled.directional, enabled.directional);
        // Counts are not perturbed by the disables.
        assert_eq!(disabled.counts[0], enabled.counts[0]);
        assert_eq!(disabled.counts[1], enabled.counts[1]);
    }

    #[test]
    fn rim_disable_clears_the_enable_flag_only() {
        let mut rig = LightRig::default();
        rig.set_enabled(LightCategory::Rim, false);
        let uniform = rig.to_uniform();
        assert_eq!(uniform.counts[2], 0);
        // Color and falloff stay resident for when the flag comes back.
        assert_eq!(uniform.rim_color[3], rig.rim.strength);
        assert_eq!(uniform.rim_params[0], rig.rim.power);
    }

    #[test]
    fn uniform_respects_shader_array_capacity() {
        let mut rig = LightRig::default();
        let template = rig.point_lights[0].clone();
        rig.point_lights = vec![template; MAX_POINT_LIGHTS + 3];
        let uniform = rig.to_uniform();
        assert_eq!(uniform.counts[0], MAX_POINT_LIGHTS as u32);
    }
}
