use crate::error::{Error, Result};
use crate::lv;
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

pub struct AllocatedBuffer {
    handle: vk::Buffer,
    allocation: Allocation,
    size: vk::DeviceSize,

    device: Arc<lv::Device>,
    allocator: lv::SharedAllocator,
}

impl AllocatedBuffer {
    pub fn new(
        device: Arc<lv::Device>,
        allocator: lv::SharedAllocator,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        name: &str,
    ) -> Result<Self> {
        let buffer_ci = vk::BufferCreateInfo {
            s_type: vk::StructureType::BUFFER_CREATE_INFO,
            size,
            usage,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            ..Default::default()
        };
        let handle = unsafe { device.handle.create_buffer(&buffer_ci, None)? };
        let requirements = unsafe { device.handle.get_buffer_memory_requirements(handle) };

        let allocated = allocator
            .lock()
            .map_err(|_| Error::AllocatorPoisoned)
            .and_then(|mut allocator| {
                Ok(allocator.allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })?)
            });
        let allocation = match allocated {
            Ok(allocation) => allocation,
            Err(err) => {
                unsafe { device.handle.destroy_buffer(handle, None) };
                return Err(err);
            }
        };

        // From here on Drop owns both the handle and the allocation
        let buffer = AllocatedBuffer {
            handle,
            allocation,
            size,
            device,
            allocator,
        };
        unsafe {
            buffer.device.handle.bind_buffer_memory(
                buffer.handle,
                buffer.allocation.memory(),
                buffer.allocation.offset(),
            )?
        };
        log::trace!("Allocated buffer {} ({} bytes, {:?})", name, size, location);
        Ok(buffer)
    }

    /// Copies `data` to the start of a host-visible buffer.
    pub fn write<T: bytemuck::Pod>(&mut self, data: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        assert!(
            bytes.len() as vk::DeviceSize <= self.size,
            "write of {} bytes overflows a {} byte buffer",
            bytes.len(),
            self.size
        );
        let mapped = self
            .allocation
            .mapped_slice_mut()
            .ok_or(vk::Result::ERROR_MEMORY_MAP_FAILED)?;
        mapped[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    pub fn get_handle(&self) -> vk::Buffer {
        self.handle
    }
}

impl lv::Resource for AllocatedBuffer {
    fn descriptor_info(&self) -> lv::DescriptorInfo {
        lv::DescriptorInfo::Buffer(vk::DescriptorBufferInfo {
            buffer: self.handle,
            offset: 0,
            range: self.size,
        })
    }
}

impl Drop for AllocatedBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.handle.destroy_buffer(self.handle, None);
        }
        let allocation = std::mem::take(&mut self.allocation);
        match self.allocator.lock() {
            Ok(mut allocator) => {
                if let Err(err) = allocator.free(allocation) {
                    log::error!("Failed to free buffer memory: {}", err);
                }
            }
            Err(_) => log::error!("Allocator poisoned, leaking buffer memory"),
        }
    }
}
