mod buffer;
mod command_buffer;
mod command_pool;
mod debug_messenger;
mod descriptors;
mod device;
mod fence;
mod framebuffer;
mod image;
mod instance;
mod pipeline;
mod queue;
mod render_pass;
mod sampler;
mod semaphore;
mod shader;
mod surface;
mod swapchain;
mod traits;

// Re-export everything
pub use self::instance::*;
pub use buffer::*;
pub use command_buffer::*;
pub use command_pool::*;
pub use debug_messenger::*;
pub use descriptors::*;
pub use device::*;
pub use fence::*;
pub use framebuffer::*;
pub use image::*;
pub use pipeline::*;
pub use queue::*;
pub use render_pass::*;
pub use sampler::*;
pub use semaphore::*;
pub use shader::*;
pub use surface::*;
pub use swapchain::*;
pub use traits::*;

/// One allocator shared by every buffer and image; each keeps a clone so it outlives them.
pub type SharedAllocator = std::sync::Arc<std::sync::Mutex<gpu_allocator::vulkan::Allocator>>;
