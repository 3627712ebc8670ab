use crate::config::RenderConfig;
use crate::error::{Error, Result};
use crate::frame::FrameSyncSet;
use crate::geometry::Vertex;
use crate::lv;
use crate::recorder::{self, DrawIntent, VkCommandSink};
use crate::resources::ResourceRegistry;
use crate::scheduler::{AcquireOutcome, FrameBackend, PresentOutcome};
use crate::uniforms::UniformBufferObject;
use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The Vulkan side of the frame loop. Fields drop top to bottom, which is also
/// reverse creation order.
pub struct VulkanRenderer {
    frames: FrameSyncSet,
    registry: ResourceRegistry,
    pipeline: lv::Pipeline,
    swapchain: lv::Swapchain,
    render_pass: lv::RenderPass,
    _command_pool: lv::CommandPool,
    allocator: lv::SharedAllocator,
    swapchain_loader: ash::extensions::khr::Swapchain,
    device: Arc<lv::Device>,
    surface: Arc<lv::Surface>,
    _debug_messenger: Option<lv::DebugMessenger>,
    _instance: Arc<lv::Instance>,

    preferred: lv::SwapchainPreferred,
    clear_color: [f32; 4],
    frame_timeout: Duration,
}

fn timeout_nanos(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX)
}

impl VulkanRenderer {
    pub fn new(window: &winit::window::Window, config: &RenderConfig) -> Result<Self> {
        let display_handle = window.raw_display_handle();
        let window_handle = window.raw_window_handle();

        let mut instance_extensions = ash_window::enumerate_required_extensions(display_handle)?.to_vec();
        if config.validation.is_enabled {
            instance_extensions.push(ash::extensions::ext::DebugUtils::name().as_ptr());
        }
        let instance = Arc::new(lv::Instance::new(&instance_extensions, config.validation)?);
        let debug_messenger = lv::DebugMessenger::new(instance.clone())?;
        let surface = lv::Surface::new(instance.clone(), display_handle, window_handle)?;

        let device_extensions = lv::Device::required_extensions();
        let physical_device = lv::PhysicalDevice::pick(instance.clone(), &surface, &device_extensions)?;
        let device = lv::Device::new(physical_device, &device_extensions, instance.clone())?;

        let allocator: lv::SharedAllocator = Arc::new(Mutex::new(Allocator::new(&AllocatorCreateDesc {
            instance: instance.instance.clone(),
            device: device.handle.clone(),
            physical_device: device.physical_device.handle,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })?));

        let preferred = lv::SwapchainPreferred {
            surface_format: config.preferred_surface_format,
            present_mode: config.preferred_present_mode,
        };
        let swapchain_loader = ash::extensions::khr::Swapchain::new(&instance.instance, &device.handle);
        let support = device.physical_device.get_swapchain_support(&surface)?;
        let size = window.inner_size();
        let mut swapchain = lv::Swapchain::new(
            swapchain_loader.clone(),
            device.clone(),
            &surface,
            &support,
            preferred,
            vk::Extent2D {
                width: size.width,
                height: size.height,
            },
            vk::SwapchainKHR::null(),
        )?;
        let render_pass = lv::RenderPass::new(device.clone(), swapchain.surface_format.format)?;
        swapchain.create_framebuffers(&render_pass)?;

        let command_pool = lv::CommandPool::new(
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            &device.graphics_queue,
            device.clone(),
        )?;
        let mut registry =
            ResourceRegistry::new(config, &command_pool, device.clone(), allocator.clone())?;
        let pipeline = VulkanRenderer::create_pipeline(&device, &render_pass, &registry)?;
        let frames = FrameSyncSet::new(
            config.frames_in_flight,
            &command_pool,
            &mut registry,
            device.clone(),
            allocator.clone(),
        )?;

        Ok(VulkanRenderer {
            frames,
            registry,
            pipeline,
            swapchain,
            render_pass,
            _command_pool: command_pool,
            allocator,
            swapchain_loader,
            device,
            surface,
            _debug_messenger: debug_messenger,
            _instance: instance,
            preferred,
            clear_color: config.clear_color,
            frame_timeout: config.frame_timeout,
        })
    }

    fn create_pipeline(
        device: &Arc<lv::Device>,
        render_pass: &lv::RenderPass,
        registry: &ResourceRegistry,
    ) -> Result<lv::Pipeline> {
        let vertex_shader = lv::Shader::new(
            &lv::shader_path("shader.vert"),
            vk::ShaderStageFlags::VERTEX,
            device.clone(),
        )?;
        let fragment_shader = lv::Shader::new(
            &lv::shader_path("shader.frag"),
            vk::ShaderStageFlags::FRAGMENT,
            device.clone(),
        )?;

        // Modules can go as soon as the pipeline exists
        lv::PipelineBuilder::new()
            .add_shader(&vertex_shader)
            .add_shader(&fragment_shader)
            .set_vertex_input(&Vertex::binding_descriptions(), &Vertex::attribute_descriptions())
            .set_viewport_counts(1, 1)
            .set_dynamic_states(&[vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR])
            .set_descriptor_set_layouts(&[registry.descriptor_layout.get_handle()])
            .build(device.clone(), render_pass)
    }
}

impl FrameBackend for VulkanRenderer {
    fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    fn swapchain_extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }

    fn wait_for_slot(&mut self, slot: usize) -> Result<()> {
        self.frames.wait(slot, self.frame_timeout)
    }

    fn acquire_next_image(&mut self, slot: usize) -> Result<AcquireOutcome> {
        let acquired = self.swapchain.acquire_next_image(
            timeout_nanos(self.frame_timeout),
            self.frames.acquire_semaphore(slot),
        );
        match acquired {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Ready {
                image_index,
                suboptimal,
            }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(err) => Err(Error::from_frame_wait(err, slot, self.frame_timeout)),
        }
    }

    fn reset_slot(&mut self, slot: usize) -> Result<()> {
        self.frames.reset(slot, &self.device)
    }

    fn record_commands(&mut self, slot: usize, image_index: u32) -> Result<()> {
        let frame = self.frames.slot(slot);
        let intent = DrawIntent {
            render_pass: self.render_pass.get_handle(),
            framebuffer: self.swapchain.framebuffer(image_index),
            extent: self.swapchain.extent,
            pipeline: self.pipeline.get_handle(),
            pipeline_layout: self.pipeline.get_layout(),
            vertex_buffer: self.registry.vertex_buffer.get_handle(),
            index_buffer: self.registry.index_buffer.get_handle(),
            index_type: self.registry.index_type(),
            index_count: self.registry.index_count,
            descriptor_set: frame.descriptor_set,
            clear_color: self.clear_color,
        };
        let mut sink = VkCommandSink {
            device: &self.device.handle,
            command_buffer: frame.command_buffer.get_handle(),
        };
        recorder::record_draw(&mut sink, &intent)
    }

    fn write_uniforms(&mut self, slot: usize, ubo: &UniformBufferObject) -> Result<()> {
        self.frames
            .slot_mut(slot)
            .uniform_buffer
            .write(std::slice::from_ref(ubo))
    }

    fn submit(&mut self, slot: usize) -> Result<()> {
        let frame = self.frames.slot(slot);
        let wait_semaphores = [frame.image_available.get_handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [frame.command_buffer.get_handle()];
        let signal_semaphores = [frame.render_finished.get_handle()];
        let submit_info = vk::SubmitInfo {
            s_type: vk::StructureType::SUBMIT_INFO,
            wait_semaphore_count: wait_semaphores.len() as u32,
            p_wait_semaphores: wait_semaphores.as_ptr(),
            p_wait_dst_stage_mask: wait_stages.as_ptr(),
            command_buffer_count: command_buffers.len() as u32,
            p_command_buffers: command_buffers.as_ptr(),
            signal_semaphore_count: signal_semaphores.len() as u32,
            p_signal_semaphores: signal_semaphores.as_ptr(),
            ..Default::default()
        };
        let submitted = unsafe {
            self.device.handle.queue_submit(
                self.device.graphics_queue.handle,
                &[submit_info],
                frame.in_flight.get_handle(),
            )
        };
        submitted.map_err(|err| Error::from_frame_wait(err, slot, self.frame_timeout))
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome> {
        let presented = self.swapchain.present(
            self.device.present_queue.handle,
            image_index,
            self.frames.render_semaphore(slot),
        );
        match presented {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(err) => Err(Error::from_frame_wait(err, slot, self.frame_timeout)),
        }
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.device.wait_idle()
    }

    fn rebuild_swapchain(&mut self, framebuffer_size: vk::Extent2D) -> Result<()> {
        let support = self
            .device
            .physical_device
            .get_swapchain_support(&self.surface)?;
        let mut swapchain = lv::Swapchain::new(
            self.swapchain_loader.clone(),
            self.device.clone(),
            &self.surface,
            &support,
            self.preferred,
            framebuffer_size,
            self.swapchain.handle,
        )?;
        if swapchain.surface_format.format != self.swapchain.surface_format.format {
            log::warn!(
                "Surface format changed from {:?} to {:?}; the render pass was built for the old one",
                self.swapchain.surface_format.format,
                swapchain.surface_format.format
            );
        }
        swapchain.create_framebuffers(&self.render_pass)?;
        // Dropping the retired chain destroys its framebuffers, views and handle
        self.swapchain = swapchain;
        Ok(())
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        // Nothing may be destroyed while the GPU still uses it
        if let Err(err) = self.device.wait_idle() {
            log::error!("Failed to wait for device idle during teardown: {}", err);
        }
        log::debug!(
            "Destroying renderer ({} allocator handles outstanding)",
            Arc::strong_count(&self.allocator)
        );
    }
}
