use crate::error::{Error, Result};
use crate::lv;
use crate::resources::ResourceRegistry;
use crate::uniforms::UniformBufferObject;
use ash::vk;
use gpu_allocator::MemoryLocation;
use std::sync::Arc;
use std::time::Duration;

/// Everything one frame in flight owns.
pub struct FrameSlot {
    pub command_buffer: lv::CommandBuffer,
    /// Signaled when the GPU is done with this slot's last submission
    pub in_flight: lv::Fence,
    /// Signaled when the acquired swap chain image may be written
    pub image_available: lv::Semaphore,
    /// Signaled when rendering finished, waited on by present
    pub render_finished: lv::Semaphore,
    pub uniform_buffer: lv::AllocatedBuffer,
    pub descriptor_set: vk::DescriptorSet,
}

/// Tracks which slots have had their fence waited since the last reset.
#[derive(Debug)]
struct SlotLedger {
    awaited: Vec<bool>,
}

impl SlotLedger {
    fn new(count: usize) -> Self {
        SlotLedger {
            awaited: vec![false; count],
        }
    }

    fn mark_waited(&mut self, slot: usize) {
        self.awaited[slot] = true;
    }

    fn take_for_reset(&mut self, slot: usize) {
        assert!(
            self.awaited[slot],
            "frame slot {} reset while its previous submission may still be executing",
            slot
        );
        self.awaited[slot] = false;
    }
}

/// Fixed ring of frame slots. Fences start signaled so the first wait on each slot
/// returns immediately.
pub struct FrameSyncSet {
    slots: Vec<FrameSlot>,
    ledger: SlotLedger,
}

impl FrameSyncSet {
    pub fn new(
        count: usize,
        command_pool: &lv::CommandPool,
        registry: &mut ResourceRegistry,
        device: Arc<lv::Device>,
        allocator: lv::SharedAllocator,
    ) -> Result<Self> {
        assert!(count > 0, "at least one frame must be in flight");
        let mut slots = Vec::with_capacity(count);
        for index in 0..count {
            let uniform_buffer = lv::AllocatedBuffer::new(
                device.clone(),
                allocator.clone(),
                std::mem::size_of::<UniformBufferObject>() as vk::DeviceSize,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                MemoryLocation::CpuToGpu,
                &format!("Uniform buffer {}", index),
            )?;
            let descriptor_set = registry.allocate_frame_set(&uniform_buffer)?;
            slots.push(FrameSlot {
                command_buffer: lv::CommandBuffer::new(
                    command_pool,
                    vk::CommandBufferLevel::PRIMARY,
                    &device,
                )?,
                in_flight: lv::Fence::new(device.clone(), Some(vk::FenceCreateFlags::SIGNALED))?,
                image_available: lv::Semaphore::new(device.clone())?,
                render_finished: lv::Semaphore::new(device.clone())?,
                uniform_buffer,
                descriptor_set,
            });
        }
        log::debug!("Created {} frame slots", count);

        Ok(FrameSyncSet {
            slots,
            ledger: SlotLedger::new(count),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, slot: usize) -> &FrameSlot {
        &self.slots[slot]
    }

    pub fn slot_mut(&mut self, slot: usize) -> &mut FrameSlot {
        &mut self.slots[slot]
    }

    /// Blocks until the GPU has finished this slot's previous submission.
    pub fn wait(&mut self, slot: usize, timeout: Duration) -> Result<()> {
        let timeout_ns = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        self.slots[slot]
            .in_flight
            .wait(timeout_ns)
            .map_err(|err| Error::from_frame_wait(err, slot, timeout))?;
        self.ledger.mark_waited(slot);
        Ok(())
    }

    /// Unsignals the fence and clears the command buffer. Only valid after `wait`.
    pub fn reset(&mut self, slot: usize, device: &lv::Device) -> Result<()> {
        self.ledger.take_for_reset(slot);
        let frame = &self.slots[slot];
        frame.in_flight.reset()?;
        frame.command_buffer.reset(device)
    }

    pub fn acquire_semaphore(&self, slot: usize) -> vk::Semaphore {
        self.slots[slot].image_available.get_handle()
    }

    pub fn render_semaphore(&self, slot: usize) -> vk::Semaphore {
        self.slots[slot].render_finished.get_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_after_wait_is_allowed_once() {
        let mut ledger = SlotLedger::new(2);
        ledger.mark_waited(1);
        ledger.take_for_reset(1);
        assert!(!ledger.awaited[1]);
        assert!(!ledger.awaited[0]);
    }

    #[test]
    fn repeated_waits_without_reset() {
        // An out-of-date acquire waits but never resets
        let mut ledger = SlotLedger::new(2);
        ledger.mark_waited(0);
        ledger.mark_waited(0);
        ledger.take_for_reset(0);
    }

    #[test]
    #[should_panic(expected = "may still be executing")]
    fn reset_without_wait_panics() {
        let mut ledger = SlotLedger::new(2);
        ledger.take_for_reset(0);
    }

    #[test]
    #[should_panic(expected = "may still be executing")]
    fn second_reset_needs_another_wait() {
        let mut ledger = SlotLedger::new(1);
        ledger.mark_waited(0);
        ledger.take_for_reset(0);
        ledger.take_for_reset(0);
    }
}
