use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glam::{Vec2, Vec3};
use log::info;
use pollster::block_on;
use rand::Rng;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode as WinitKey, PhysicalKey};
use winit::window::{CursorIcon, Window, WindowId};

use sphere_field::{
    Camera, CursorZone, FrameState, InputState, KeyCode, LightCategory, LightRig, MarkerInstance,
    MouseButton, NamedKey, Renderer, Skybox, SphereField, ToggleLatch,
};

const WINDOW_WIDTH: u32 = 800;
const WINDOW_HEIGHT: u32 = 800;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 1000.0;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;

    let mut rng = rand::thread_rng();
    let scene = SceneState::new(&mut rng);
    print_scene_summary(&scene);

    if options.headless {
        return Ok(());
    }
    run_interactive(options, scene)
}

fn run_interactive(options: CliOptions, scene: SceneState) -> Result<()> {
    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            eprintln!(
                "failed to initialize event loop: {err}. Running headless \
                 (set DISPLAY or install display libs to enable rendering)."
            );
            return Ok(());
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(options.assets_dir, scene);
    event_loop.run_app(&mut app).context("event loop failed")?;

    if let Some(err) = app.last_error {
        return Err(err);
    }
    Ok(())
}

/// Everything the frame loop mutates: camera, light rig, sphere field,
/// skybox transform, and the wireframe flag.
struct SceneState {
    camera: Camera,
    lights: LightRig,
    field: SphereField,
    skybox: Skybox,
    wireframe: bool,
}

impl SceneState {
    fn new(rng: &mut impl Rng) -> Self {
        Self {
            camera: Camera::new(WINDOW_WIDTH, WINDOW_HEIGHT, Vec3::new(0.0, 0.0, 5.0)),
            lights: LightRig::default(),
            field: SphereField::new(rng),
            skybox: Skybox::new(),
            wireframe: false,
        }
    }
}

fn print_scene_summary(scene: &SceneState) {
    println!(
        "Generated sphere mesh: {} vertices, {} indices",
        scene.field.geometry.vertex_count(),
        scene.field.geometry.index_count()
    );
    println!(
        "Placed {} of {} spheres (radius {:.2})",
        scene.field.positions.len(),
        SphereField::INSTANCE_COUNT,
        scene.field.radius
    );
    println!(
        "Lights: {} point, 1 directional, {} spot, rim {}",
        scene.lights.point_lights.len(),
        scene.lights.spot_lights.len(),
        if scene.lights.is_enabled(LightCategory::Rim) {
            "enabled"
        } else {
            "disabled"
        }
    );
}

struct App {
    assets_dir: PathBuf,
    scene: SceneState,
    input: InputState,
    renderer: Option<Renderer>,
    last_frame: Option<Instant>,
    wireframe_latch: ToggleLatch,
    last_error: Option<anyhow::Error>,
}

impl App {
    fn new(assets_dir: PathBuf, scene: SceneState) -> Self {
        Self {
            assets_dir,
            scene,
            input: InputState::new(),
            renderer: None,
            last_frame: None,
            wireframe_latch: ToggleLatch::new(),
            last_error: None,
        }
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) {
        let attributes = Window::default_attributes()
            .with_title("Sphere Field")
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH as f64, WINDOW_HEIGHT as f64));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.last_error = Some(anyhow!("failed to create window: {err}"));
                event_loop.exit();
                return;
            }
        };

        match block_on(Renderer::new(
            Arc::clone(&window),
            &self.assets_dir,
            &self.scene.field.geometry,
        )) {
            Ok(renderer) => {
                let size = window.inner_size();
                self.scene.camera.set_viewport(size.width, size.height);
                self.renderer = Some(renderer);
                self.last_frame = Some(Instant::now());
            }
            Err(err) => {
                self.last_error = Some(err);
                event_loop.exit();
            }
        }
    }

    /// One frame, in the fixed order: poll-derived camera update, toggles,
    /// field and skybox updates, then a single encoded pass and present.
    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let now = Instant::now();
        let delta_time = self
            .last_frame
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_frame = Some(now);

        self.scene.camera.update(&self.input, delta_time);
        if self
            .wireframe_latch
            .rising_edge(self.input.is_key_down(KeyCode::Character('L')))
        {
            if renderer.wireframe_supported() {
                self.scene.wireframe = !self.scene.wireframe;
            } else {
                info!("wireframe toggle ignored: line polygon mode unsupported");
            }
        }
        self.scene.lights.handle_keys(&self.input);
        self.scene.field.update(delta_time);
        self.scene.skybox.update(&self.scene.camera);

        update_cursor(renderer.window(), &self.scene.camera, &self.input);

        let camera = &self.scene.camera;
        let view_proj = camera.projection_matrix(NEAR_PLANE, FAR_PLANE) * camera.view_matrix();
        let markers = if self.scene.lights.is_enabled(LightCategory::Point) {
            self.scene
                .lights
                .point_lights
                .iter()
                .map(|light| MarkerInstance {
                    position: light.position,
                    color: light.color,
                })
                .collect()
        } else {
            Vec::new()
        };

        let frame = FrameState {
            view_proj,
            camera_position: camera.position,
            lights: self.scene.lights.to_uniform(),
            skybox_pvm: self.scene.skybox.pvm(),
            instance_models: self.scene.field.instance_models(),
            reflective_model: self.scene.field.reflective_model(),
            markers,
            wireframe: self.scene.wireframe,
        };

        match renderer.render(&frame) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = renderer.window().inner_size();
                renderer.resize(size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.last_error = Some(anyhow!("GPU is out of memory"));
                event_loop.exit();
            }
            Err(wgpu::SurfaceError::Timeout) => {
                info!("surface timeout; retrying next frame");
            }
            Err(err) => {
                self.last_error = Some(anyhow!("surface error: {err}"));
                event_loop.exit();
            }
        }
    }

    fn handle_mouse_button(&self, state: ElementState, button: WinitMouseButton) {
        let index = match button {
            WinitMouseButton::Left => 0,
            WinitMouseButton::Right => 1,
            WinitMouseButton::Middle => 2,
            WinitMouseButton::Back => 3,
            WinitMouseButton::Forward => 4,
            WinitMouseButton::Other(value) => value as u8,
        };
        let button = MouseButton::new(index);
        match state {
            ElementState::Pressed => self.input.set_mouse_button_down(button),
            ElementState::Released => self.input.set_mouse_button_up(button),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_none() {
            self.init_window(event_loop);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self
            .renderer
            .as_ref()
            .is_some_and(|renderer| renderer.window_id() != window_id)
        {
            return;
        }
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size);
                }
                self.scene.camera.set_viewport(size.width, size.height);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let Some(key) = map_keycode(code) else {
                    return;
                };
                match event.state {
                    ElementState::Pressed => self.input.set_key_down(key),
                    ElementState::Released => self.input.set_key_up(key),
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.handle_mouse_button(state, button);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .set_mouse_position(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / 40.0,
                };
                self.input.add_scroll(steps);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = &self.renderer {
            renderer.window().request_redraw();
        }
    }
}

/// Hide the cursor while the look drag is active; otherwise swap the glyph
/// depending on whether the cursor sits inside the viewport. Cosmetic only.
fn update_cursor(window: &Window, camera: &Camera, input: &InputState) {
    let looking = input.is_mouse_button_down(MouseButton::LEFT);
    window.set_cursor_visible(!looking);
    if !looking {
        let icon = match camera.cursor_zone(input.mouse_position()) {
            CursorZone::Inside => CursorIcon::Pointer,
            CursorZone::Outside => CursorIcon::Default,
        };
        window.set_cursor(icon);
    }
}

fn map_keycode(code: WinitKey) -> Option<KeyCode> {
    Some(match code {
        WinitKey::KeyA => KeyCode::Character('A'),
        WinitKey::KeyB => KeyCode::Character('B'),
        WinitKey::KeyC => KeyCode::Character('C'),
        WinitKey::KeyD => KeyCode::Character('D'),
        WinitKey::KeyE => KeyCode::Character('E'),
        WinitKey::KeyF => KeyCode::Character('F'),
        WinitKey::KeyG => KeyCode::Character('G'),
        WinitKey::KeyH => KeyCode::Character('H'),
        WinitKey::KeyI => KeyCode::Character('I'),
        WinitKey::KeyJ => KeyCode::Character('J'),
        WinitKey::KeyK => KeyCode::Character('K'),
        WinitKey::KeyL => KeyCode::Character('L'),
        WinitKey::KeyM => KeyCode::Character('M'),
        WinitKey::KeyN => KeyCode::Character('N'),
        WinitKey::KeyO => KeyCode::Character('O'),
        WinitKey::KeyP => KeyCode::Character('P'),
        WinitKey::KeyQ => KeyCode::Character('Q'),
        WinitKey::KeyR => KeyCode::Character('R'),
        WinitKey::KeyS => KeyCode::Character('S'),
        WinitKey::KeyT => KeyCode::Character('T'),
        WinitKey::KeyU => KeyCode::Character('U'),
        WinitKey::KeyV => KeyCode::Character('V'),
        WinitKey::KeyW => KeyCode::Character('W'),
        WinitKey::KeyX => KeyCode::Character('X'),
        WinitKey::KeyY => KeyCode::Character('Y'),
        WinitKey::KeyZ => KeyCode::Character('Z'),
        WinitKey::Digit0 => KeyCode::Digit(0),
        WinitKey::Digit1 => KeyCode::Digit(1),
        WinitKey::Digit2 => KeyCode::Digit(2),
        WinitKey::Digit3 => KeyCode::Digit(3),
        WinitKey::Digit4 => KeyCode::Digit(4),
        WinitKey::Digit5 => KeyCode::Digit(5),
        WinitKey::Digit6 => KeyCode::Digit(6),
        WinitKey::Digit7 => KeyCode::Digit(7),
        WinitKey::Digit8 => KeyCode::Digit(8),
        WinitKey::Digit9 => KeyCode::Digit(9),
        WinitKey::ShiftLeft => KeyCode::Named(NamedKey::LeftShift),
        WinitKey::ShiftRight => KeyCode::Named(NamedKey::RightShift),
        _ => return None,
    })
}

struct CliOptions {
    assets_dir: PathBuf,
    headless: bool,
}

impl CliOptions {
    const USAGE: &'static str = "Usage: sphere-field [--assets <dir>] [--headless]";

    fn parse() -> Result<Self> {
        let mut assets_dir = PathBuf::from("assets");
        let mut headless = false;
        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--headless" => headless = true,
                "--assets" => {
                    let dir = args
                        .next()
                        .ok_or_else(|| anyhow!("--assets needs a directory. {}", Self::USAGE))?;
                    assets_dir = PathBuf::from(dir);
                }
                other => {
                    return Err(anyhow!("Unknown argument: {other}. {}", Self::USAGE));
                }
            }
        }
        Ok(Self {
            assets_dir,
            headless,
        })
    }
}
