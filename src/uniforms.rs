use ash::vk;
use glam::{Mat4, Vec3};
use std::time::{Duration, Instant};

/// Layout shared with `shader.vert` binding 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UniformBufferObject {
    pub model: Mat4,
    pub view: Mat4,
    pub proj: Mat4,
}

/// Monotonic time since the renderer started.
pub trait FrameClock {
    fn elapsed(&self) -> Duration;
}

/// Samples `Instant::now()` once at construction.
#[derive(Clone, Copy, Debug)]
pub struct StartClock(Instant);

impl StartClock {
    pub fn start() -> Self {
        StartClock(Instant::now())
    }
}

impl FrameClock for StartClock {
    fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

/// Spins the quad around Z at a fixed angular rate, driven by wall-clock time.
#[derive(Clone, Copy, Debug)]
pub struct Animation {
    pub degrees_per_second: f32,
}

impl Animation {
    pub fn new(degrees_per_second: f32) -> Self {
        Animation { degrees_per_second }
    }

    /// In [0, 360).
    pub fn rotation_degrees(&self, elapsed: Duration) -> f32 {
        // f64 keeps long sessions from losing precision before the wrap
        (elapsed.as_secs_f64() * self.degrees_per_second as f64).rem_euclid(360.0) as f32
    }

    pub fn ubo(&self, elapsed: Duration, extent: vk::Extent2D) -> UniformBufferObject {
        let model = Mat4::from_rotation_z(self.rotation_degrees(elapsed).to_radians());
        let view = Mat4::look_at_rh(Vec3::new(2.0, 2.0, 2.0), Vec3::ZERO, Vec3::Z);
        let aspect = extent.width as f32 / extent.height.max(1) as f32;
        let mut proj = Mat4::perspective_rh(45.0f32.to_radians(), aspect, 0.1, 10.0);
        // Vulkan clip space has Y pointing down
        proj.y_axis.y *= -1.0;

        UniformBufferObject { model, view, proj }
    }
}
