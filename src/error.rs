use ash::vk;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    #[error("Failed to create pipeline: {0}")]
    PipelineCreation(vk::Result),

    #[error("Allocator error: {0}")]
    Allocation(#[from] gpu_allocator::AllocationError),

    #[error("GPU allocator lock poisoned")]
    AllocatorPoisoned,

    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("Window error: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Shader error: {0}")]
    Shader(String),

    #[error("Validation layers requested but not available: {0:?}")]
    MissingValidationLayers(Vec<String>),

    #[error("Required extensions are not available: {0:?}")]
    MissingExtensions(Vec<String>),

    #[error("No GPU supports the required queues, extensions and surface")]
    NoSuitableDevice,

    #[error("Surface reports no compatible formats")]
    NoSurfaceFormats,

    #[error("Surface reports no present modes")]
    NoPresentModes,

    #[error("Device lost")]
    DeviceLost,

    #[error("Frame slot {slot} did not complete within {timeout:?}, the GPU appears hung")]
    FrameTimeout { slot: usize, timeout: Duration },
}

impl Error {
    /// Classifies a raw result from a per-frame wait, so a hung or lost device is
    /// reported distinctly from other driver failures.
    pub fn from_frame_wait(result: vk::Result, slot: usize, timeout: Duration) -> Self {
        match result {
            vk::Result::TIMEOUT | vk::Result::NOT_READY => Error::FrameTimeout { slot, timeout },
            vk::Result::ERROR_DEVICE_LOST => Error::DeviceLost,
            other => Error::Vulkan(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
