use crate::error::{Error, Result};
use crate::{lv, utility};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use std::sync::Arc;

/// Device-local image with its memory and a view over the whole resource.
pub struct AllocatedImage {
    handle: vk::Image,
    view: vk::ImageView,
    allocation: Allocation,
    extent: vk::Extent3D,

    device: Arc<lv::Device>,
    allocator: lv::SharedAllocator,
}

impl AllocatedImage {
    pub fn new(
        image_ci: vk::ImageCreateInfo,
        image_aspect_flags: vk::ImageAspectFlags,
        device: Arc<lv::Device>,
        allocator: lv::SharedAllocator,
    ) -> Result<Self> {
        let handle = unsafe { device.handle.create_image(&image_ci, None)? };
        let requirements = unsafe { device.handle.get_image_memory_requirements(handle) };

        let allocated = allocator
            .lock()
            .map_err(|_| Error::AllocatorPoisoned)
            .and_then(|mut allocator| {
                Ok(allocator.allocate(&AllocationCreateDesc {
                    name: "Image",
                    requirements,
                    location: gpu_allocator::MemoryLocation::GpuOnly,
                    linear: image_ci.tiling == vk::ImageTiling::LINEAR,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })?)
            });
        let allocation = match allocated {
            Ok(allocation) => allocation,
            Err(err) => {
                unsafe { device.handle.destroy_image(handle, None) };
                return Err(err);
            }
        };

        let mut image = AllocatedImage {
            handle,
            view: vk::ImageView::null(),
            allocation,
            extent: image_ci.extent,
            device,
            allocator,
        };
        unsafe {
            image.device.handle.bind_image_memory(
                image.handle,
                image.allocation.memory(),
                image.allocation.offset(),
            )?
        };

        let view_ci =
            utility::init::image_view_create_info(image_ci.format, handle, image_aspect_flags);
        image.view = unsafe { image.device.handle.create_image_view(&view_ci, None)? };
        Ok(image)
    }

    /// Single-mip 2D image, optimal tiling, exclusive to one queue family.
    pub fn new_2d(
        format: vk::Format,
        width: u32,
        height: u32,
        usage: vk::ImageUsageFlags,
        device: Arc<lv::Device>,
        allocator: lv::SharedAllocator,
    ) -> Result<Self> {
        let image_ci = vk::ImageCreateInfo {
            s_type: vk::StructureType::IMAGE_CREATE_INFO,
            image_type: vk::ImageType::TYPE_2D,
            format,
            extent: vk::Extent3D {
                width,
                height,
                depth: 1,
            },
            mip_levels: 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
            tiling: vk::ImageTiling::OPTIMAL,
            usage,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            ..Default::default()
        };
        AllocatedImage::new(image_ci, vk::ImageAspectFlags::COLOR, device, allocator)
    }

    pub fn get_handle(&self) -> vk::Image {
        self.handle
    }

    pub fn extent(&self) -> vk::Extent3D {
        self.extent
    }
}

impl lv::Resource for AllocatedImage {
    fn descriptor_info(&self) -> lv::DescriptorInfo {
        lv::DescriptorInfo::Image(vk::DescriptorImageInfo {
            sampler: vk::Sampler::null(),
            image_view: self.view,
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        })
    }
}

impl Drop for AllocatedImage {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.device.handle.destroy_image_view(self.view, None);
            }
            self.device.handle.destroy_image(self.handle, None);
        }
        let allocation = std::mem::take(&mut self.allocation);
        match self.allocator.lock() {
            Ok(mut allocator) => {
                if let Err(err) = allocator.free(allocation) {
                    log::error!("Failed to free image memory: {}", err);
                }
            }
            Err(_) => log::error!("Allocator poisoned, leaking image memory"),
        }
    }
}
