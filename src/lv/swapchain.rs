use crate::error::{Error, Result};
use crate::lv;
use crate::utility;
use ash::vk;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct SwapchainSupportDetails {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// The preferred format/colour-space pair if offered, otherwise the first one listed.
    pub fn choose_format(&self, preferred: vk::SurfaceFormatKHR) -> Result<vk::SurfaceFormatKHR> {
        self.formats
            .iter()
            .find(|available| {
                available.format == preferred.format && available.color_space == preferred.color_space
            })
            .or_else(|| self.formats.first())
            .copied()
            .ok_or(Error::NoSurfaceFormats)
    }

    /// The preferred mode if offered, otherwise FIFO which every surface must support.
    pub fn choose_presentation_mode(
        &self,
        preferred: vk::PresentModeKHR,
    ) -> Result<vk::PresentModeKHR> {
        if self.present_modes.is_empty() {
            return Err(Error::NoPresentModes);
        }
        if self.present_modes.contains(&preferred) {
            Ok(preferred)
        } else {
            Ok(vk::PresentModeKHR::FIFO)
        }
    }

    /// Uses the surface's current extent unless it is the "window decides" sentinel,
    /// in which case the framebuffer's pixel size is clamped into the surface limits.
    pub fn choose_extent(&self, framebuffer_size: vk::Extent2D) -> vk::Extent2D {
        let capabilities = &self.capabilities;
        if capabilities.current_extent.width != u32::MAX {
            return capabilities.current_extent;
        }

        vk::Extent2D {
            width: framebuffer_size.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: framebuffer_size.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }

    /// One more than the minimum, clamped when the surface states a maximum (0 = unbounded).
    pub fn choose_image_count(&self) -> u32 {
        let capabilities = &self.capabilities;
        let desired = capabilities.min_image_count + 1;
        if capabilities.max_image_count > 0 {
            desired.min(capabilities.max_image_count)
        } else {
            desired
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SwapchainPreferred {
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
}

/// The presentable images plus everything created per image: views and framebuffers.
/// The whole set is built and torn down together. A replacement is created with the
/// retiring chain as `old_swapchain`, after which the old set is dropped in one piece.
pub struct Swapchain {
    pub handle: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub framebuffers: Vec<lv::Framebuffer>,
    pub extent: vk::Extent2D,
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    loader: ash::extensions::khr::Swapchain,

    // Reference-counting
    device: Arc<lv::Device>,
}

impl Swapchain {
    pub fn new(
        loader: ash::extensions::khr::Swapchain,
        device: Arc<lv::Device>,
        surface: &lv::Surface,
        support: &SwapchainSupportDetails,
        preferred: SwapchainPreferred,
        framebuffer_size: vk::Extent2D,
        old_swapchain: vk::SwapchainKHR,
    ) -> Result<Swapchain> {
        let surface_format = support.choose_format(preferred.surface_format)?;
        let present_mode = support.choose_presentation_mode(preferred.present_mode)?;
        let extent = support.choose_extent(framebuffer_size);
        let image_count = support.choose_image_count();

        let family_queues = device.physical_device.queue_families;
        let family_indices = family_queues.unique();
        let concurrent = family_indices.len() > 1;
        let swapchain_ci = vk::SwapchainCreateInfoKHR {
            s_type: vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR,
            surface: surface.handle,
            min_image_count: image_count,
            image_format: surface_format.format,
            image_color_space: surface_format.color_space,
            image_extent: extent,
            image_array_layers: 1,
            image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            image_sharing_mode: if concurrent {
                vk::SharingMode::CONCURRENT
            } else {
                vk::SharingMode::EXCLUSIVE
            },
            queue_family_index_count: if concurrent {
                family_indices.len() as u32
            } else {
                0
            },
            p_queue_family_indices: if concurrent {
                family_indices.as_ptr()
            } else {
                std::ptr::null()
            },
            pre_transform: support.capabilities.current_transform,
            composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
            present_mode,
            clipped: vk::TRUE,
            old_swapchain,
            ..Default::default()
        };
        let handle = unsafe { loader.create_swapchain(&swapchain_ci, None)? };

        let mut swapchain = Swapchain {
            handle,
            images: Vec::new(),
            image_views: Vec::new(),
            framebuffers: Vec::new(),
            extent,
            surface_format,
            present_mode,
            loader,
            device,
        };

        // Retrieve swapchain images and views; a failure part way leaves `swapchain`
        // holding what was created so far and Drop releases it
        swapchain.images = unsafe { swapchain.loader.get_swapchain_images(handle)? };
        for &image in swapchain.images.iter() {
            let view_ci = utility::init::image_view_create_info(
                surface_format.format,
                image,
                vk::ImageAspectFlags::COLOR,
            );
            let view = unsafe { swapchain.device.handle.create_image_view(&view_ci, None)? };
            swapchain.image_views.push(view);
        }

        log::info!(
            "Created swap chain: {} images, {:?}/{:?}, {:?}, {}x{}",
            swapchain.images.len(),
            surface_format.format,
            surface_format.color_space,
            present_mode,
            extent.width,
            extent.height
        );
        Ok(swapchain)
    }

    pub fn create_framebuffers(&mut self, render_pass: &lv::RenderPass) -> Result<()> {
        self.framebuffers.clear();
        for &view in self.image_views.iter() {
            let framebuffer =
                lv::Framebuffer::new(self.device.clone(), render_pass, &[view], self.extent)?;
            self.framebuffers.push(framebuffer);
        }
        Ok(())
    }

    pub fn framebuffer(&self, image_index: u32) -> vk::Framebuffer {
        self.framebuffers[image_index as usize].get_handle()
    }

    /// Raw acquire; `Ok((index, true))` means suboptimal.
    pub fn acquire_next_image(
        &self,
        timeout: u64,
        semaphore: vk::Semaphore,
    ) -> std::result::Result<(u32, bool), vk::Result> {
        unsafe {
            self.loader
                .acquire_next_image(self.handle, timeout, semaphore, vk::Fence::null())
        }
    }

    /// Raw present; `Ok(true)` means suboptimal.
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> std::result::Result<bool, vk::Result> {
        let wait_semaphores = [wait_semaphore];
        let swapchains = [self.handle];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR {
            s_type: vk::StructureType::PRESENT_INFO_KHR,
            wait_semaphore_count: wait_semaphores.len() as u32,
            p_wait_semaphores: wait_semaphores.as_ptr(),
            swapchain_count: swapchains.len() as u32,
            p_swapchains: swapchains.as_ptr(),
            p_image_indices: image_indices.as_ptr(),
            ..Default::default()
        };
        unsafe { self.loader.queue_present(queue, &present_info) }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.framebuffers.clear();
        unsafe {
            for view in self.image_views.drain(..) {
                self.device.handle.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.handle, None);
        };
    }
}
