use ash::vk;
use std::path::PathBuf;
use std::time::Duration;

// Constants
pub const WINDOW_TITLE: &str = "Hello, Vulkan!";
pub const WINDOW_WIDTH: u32 = 800;
pub const WINDOW_HEIGHT: u32 = 600;

/// Number of frames the CPU may record ahead of the GPU.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Upper bound on any single fence wait or image acquire. Several orders of magnitude
/// above a normal frame, so it only trips on a hung device.
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug)]
pub struct ValidationInfo {
    pub is_enabled: bool,
    pub required_validation_layers: [&'static str; 1],
}

pub const VALIDATION: ValidationInfo = ValidationInfo {
    is_enabled: cfg!(debug_assertions),
    required_validation_layers: ["VK_LAYER_KHRONOS_validation"],
};

#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub frames_in_flight: usize,
    pub validation: ValidationInfo,
    pub preferred_surface_format: vk::SurfaceFormatKHR,
    pub preferred_present_mode: vk::PresentModeKHR,
    pub clear_color: [f32; 4],
    pub rotation_degrees_per_second: f32,
    pub frame_timeout: Duration,
    pub texture_path: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            frames_in_flight: MAX_FRAMES_IN_FLIGHT,
            validation: VALIDATION,
            preferred_surface_format: vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            preferred_present_mode: vk::PresentModeKHR::MAILBOX,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            rotation_degrees_per_second: 90.0,
            frame_timeout: FRAME_TIMEOUT,
            texture_path: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/textures/texture.png")),
        }
    }
}

/// Configuration plus the mutable toggles the frame loop consumes.
#[derive(Debug)]
pub struct Session {
    pub config: RenderConfig,
    resize_requested: bool,
}

impl Session {
    pub fn new(config: RenderConfig) -> Self {
        Session {
            config,
            resize_requested: false,
        }
    }

    pub fn request_resize(&mut self) {
        self.resize_requested = true;
    }

    pub fn resize_requested(&self) -> bool {
        self.resize_requested
    }

    /// Reads and clears the resize flag.
    pub fn take_resize_request(&mut self) -> bool {
        std::mem::take(&mut self.resize_requested)
    }
}
