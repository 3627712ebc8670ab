use crate::error::Result;
use crate::lv;
use ash::vk;

/// Freed together with its pool, so there is no Drop here.
pub struct CommandBuffer {
    handle: vk::CommandBuffer,
}

impl CommandBuffer {
    pub fn new(
        command_pool: &lv::CommandPool,
        level: vk::CommandBufferLevel,
        device: &lv::Device,
    ) -> Result<Self> {
        let command_buffer_ai = vk::CommandBufferAllocateInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
            command_pool: command_pool.get_handle(),
            level,
            command_buffer_count: 1,
            ..Default::default()
        };
        let handle = unsafe { device.handle.allocate_command_buffers(&command_buffer_ai)? }
            .pop()
            .ok_or(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY)?;
        Ok(CommandBuffer { handle })
    }

    pub fn reset(&self, device: &lv::Device) -> Result<()> {
        unsafe {
            device
                .handle
                .reset_command_buffer(self.handle, vk::CommandBufferResetFlags::empty())?
        };
        Ok(())
    }

    pub fn get_handle(&self) -> vk::CommandBuffer {
        self.handle
    }
}
