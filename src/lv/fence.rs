use crate::error::Result;
use crate::lv;
use ash::vk;
use std::sync::Arc;

pub struct Fence {
    device: Arc<lv::Device>,
    handle: vk::Fence,
}

impl Fence {
    pub fn new(device: Arc<lv::Device>, flags: Option<vk::FenceCreateFlags>) -> Result<Self> {
        let fence_ci = vk::FenceCreateInfo {
            s_type: vk::StructureType::FENCE_CREATE_INFO,
            flags: flags.unwrap_or_default(),
            ..Default::default()
        };

        let handle = unsafe { device.handle.create_fence(&fence_ci, None)? };

        Ok(Fence { device, handle })
    }

    /// Blocks until signaled; the raw result is handed back so callers can classify timeouts.
    pub fn wait(&self, timeout_ns: u64) -> std::result::Result<(), vk::Result> {
        unsafe { self.device.handle.wait_for_fences(&[self.handle], true, timeout_ns) }
    }

    pub fn reset(&self) -> Result<()> {
        unsafe { self.device.handle.reset_fences(&[self.handle])? };
        Ok(())
    }

    pub fn get_handle(&self) -> vk::Fence {
        self.handle
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle.destroy_fence(self.handle, None);
        };
    }
}
