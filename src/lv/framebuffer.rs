use crate::error::Result;
use crate::lv;
use ash::vk;
use std::sync::Arc;

pub struct Framebuffer {
    handle: vk::Framebuffer,

    // Reference-counting
    device: Arc<lv::Device>,
}

impl Framebuffer {
    pub fn new(
        device: Arc<lv::Device>,
        render_pass: &lv::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let framebuffer_ci = vk::FramebufferCreateInfo {
            s_type: vk::StructureType::FRAMEBUFFER_CREATE_INFO,
            render_pass: render_pass.get_handle(),
            attachment_count: attachments.len() as u32,
            p_attachments: attachments.as_ptr(),
            width: extent.width,
            height: extent.height,
            layers: 1,
            ..Default::default()
        };
        let handle = unsafe { device.handle.create_framebuffer(&framebuffer_ci, None)? };

        Ok(Framebuffer { handle, device })
    }

    pub fn get_handle(&self) -> vk::Framebuffer {
        self.handle
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.handle.destroy_framebuffer(self.handle, None);
        }
    }
}
