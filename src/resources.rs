use crate::config::RenderConfig;
use crate::error::Result;
use crate::geometry::{Vertex, QUAD_INDICES, QUAD_VERTICES};
use crate::{lv, utility};
use ash::vk;
use gpu_allocator::MemoryLocation;
use std::path::Path;
use std::sync::Arc;

pub const UNIFORM_BINDING: u32 = 0;
pub const TEXTURE_BINDING: u32 = 1;

/// Decoded RGBA8 texels.
pub struct TexturePixels {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Black and white squares, `cell` texels wide.
pub fn checkerboard(size: u32, cell: u32) -> TexturePixels {
    let cell = cell.max(1);
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let value = if ((x / cell) + (y / cell)) % 2 == 0 { 255 } else { 32 };
            rgba.extend_from_slice(&[value, value, value, 255]);
        }
    }
    TexturePixels {
        width: size,
        height: size,
        rgba,
    }
}

/// Decodes the texture at `path`, or falls back to a checkerboard when the file is absent.
pub fn load_texture_pixels(path: &Path) -> Result<TexturePixels> {
    if !path.exists() {
        log::warn!(
            "Texture {} not found, using a generated checkerboard",
            path.display()
        );
        return Ok(checkerboard(256, 32));
    }
    let decoded = image::open(path)?.to_rgba8();
    log::info!(
        "Loaded texture {} ({}x{})",
        path.display(),
        decoded.width(),
        decoded.height()
    );
    Ok(TexturePixels {
        width: decoded.width(),
        height: decoded.height(),
        rgba: decoded.into_raw(),
    })
}

/// Static GPU objects built once at startup and only read by the frame loop.
pub struct ResourceRegistry {
    pub vertex_buffer: lv::AllocatedBuffer,
    pub index_buffer: lv::AllocatedBuffer,
    pub index_count: u32,
    pub texture: lv::AllocatedImage,
    pub sampler: lv::Sampler,
    descriptor_allocator: lv::DescriptorAllocator,
    pub descriptor_layout: lv::DescriptorSetLayout,

    device: Arc<lv::Device>,
}

impl ResourceRegistry {
    pub fn new(
        config: &RenderConfig,
        command_pool: &lv::CommandPool,
        device: Arc<lv::Device>,
        allocator: lv::SharedAllocator,
    ) -> Result<Self> {
        let uploader = Uploader {
            device: &device,
            allocator: &allocator,
            command_pool,
        };

        let vertex_buffer = uploader.upload_buffer(
            &QUAD_VERTICES,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            "Vertex buffer",
        )?;
        let index_buffer = uploader.upload_buffer(
            &QUAD_INDICES,
            vk::BufferUsageFlags::INDEX_BUFFER,
            "Index buffer",
        )?;
        let pixels = load_texture_pixels(&config.texture_path)?;
        let texture = uploader.upload_texture(&pixels)?;
        let sampler = lv::Sampler::new_linear_repeat(device.clone())?;

        let descriptor_layout = lv::DescriptorLayoutBuilder::new()
            .add_binding(
                UNIFORM_BINDING,
                vk::DescriptorType::UNIFORM_BUFFER,
                vk::ShaderStageFlags::VERTEX,
            )
            .add_binding(
                TEXTURE_BINDING,
                vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                vk::ShaderStageFlags::FRAGMENT,
            )
            .build(device.clone())?;
        // Exactly one set per frame in flight, each with one descriptor of each type
        let descriptor_allocator = lv::DescriptorAllocator::new(
            device.clone(),
            config.frames_in_flight as u32,
            &[
                lv::PoolSizeRatio {
                    descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                    ratio: 1.0,
                },
                lv::PoolSizeRatio {
                    descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    ratio: 1.0,
                },
            ],
        )?;

        log::info!(
            "Uploaded static resources: {} vertices, {} indices, {}x{} texture",
            QUAD_VERTICES.len(),
            QUAD_INDICES.len(),
            pixels.width,
            pixels.height
        );
        Ok(ResourceRegistry {
            vertex_buffer,
            index_buffer,
            index_count: QUAD_INDICES.len() as u32,
            texture,
            sampler,
            descriptor_allocator,
            descriptor_layout,
            device,
        })
    }

    /// Allocates one slot's set and writes both bindings. Never rewritten afterwards.
    pub fn allocate_frame_set(&mut self, uniform_buffer: &lv::AllocatedBuffer) -> Result<vk::DescriptorSet> {
        let set = self.descriptor_allocator.allocate(&self.descriptor_layout)?;
        lv::DescriptorWriter::new()
            .write_buffer(
                UNIFORM_BINDING,
                vk::DescriptorType::UNIFORM_BUFFER,
                uniform_buffer,
            )
            .write_image(
                TEXTURE_BINDING,
                vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                &self.texture,
                self.sampler.get_handle(),
            )
            .update_set(&self.device, set);
        Ok(set)
    }

    pub fn index_type(&self) -> vk::IndexType {
        vk::IndexType::UINT16
    }
}

/// Staging-buffer uploads through one-shot command buffers.
struct Uploader<'a> {
    device: &'a Arc<lv::Device>,
    allocator: &'a lv::SharedAllocator,
    command_pool: &'a lv::CommandPool,
}

impl Uploader<'_> {
    fn staging_buffer(&self, bytes: &[u8], name: &str) -> Result<lv::AllocatedBuffer> {
        let mut staging = lv::AllocatedBuffer::new(
            self.device.clone(),
            self.allocator.clone(),
            bytes.len() as vk::DeviceSize,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            name,
        )?;
        staging.write(bytes)?;
        Ok(staging)
    }

    fn upload_buffer<T: bytemuck::Pod>(
        &self,
        data: &[T],
        usage: vk::BufferUsageFlags,
        name: &str,
    ) -> Result<lv::AllocatedBuffer> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let staging = self.staging_buffer(bytes, "Staging buffer")?;
        let buffer = lv::AllocatedBuffer::new(
            self.device.clone(),
            self.allocator.clone(),
            bytes.len() as vk::DeviceSize,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
            name,
        )?;
        utility::immediate_submit(
            self.device,
            &self.device.graphics_queue,
            self.command_pool,
            |cmd| {
                utility::copy_buffer(
                    &self.device.handle,
                    cmd,
                    staging.get_handle(),
                    buffer.get_handle(),
                    staging.size(),
                )
            },
        )?;
        Ok(buffer)
    }

    fn upload_texture(&self, pixels: &TexturePixels) -> Result<lv::AllocatedImage> {
        let staging = self.staging_buffer(&pixels.rgba, "Texture staging buffer")?;
        let texture = lv::AllocatedImage::new_2d(
            vk::Format::R8G8B8A8_SRGB,
            pixels.width,
            pixels.height,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
            self.device.clone(),
            self.allocator.clone(),
        )?;
        let device = &self.device.handle;
        let image = texture.get_handle();
        utility::immediate_submit(
            self.device,
            &self.device.graphics_queue,
            self.command_pool,
            |cmd| {
                utility::transition_image(
                    device,
                    cmd,
                    image,
                    vk::ImageLayout::UNDEFINED,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                );
                utility::copy_buffer_to_image(
                    device,
                    cmd,
                    staging.get_handle(),
                    image,
                    texture.extent(),
                );
                utility::transition_image(
                    device,
                    cmd,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                );
            },
        )?;
        Ok(texture)
    }
}
