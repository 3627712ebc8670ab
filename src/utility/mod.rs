use crate::error::Result;
use crate::lv;
use ash::vk;

pub mod init;
pub mod tools;

/// Stage and access masks for the two layout changes a sampled texture goes through.
pub fn transition_masks(
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> (
    vk::AccessFlags,
    vk::AccessFlags,
    vk::PipelineStageFlags,
    vk::PipelineStageFlags,
) {
    match (old_layout, new_layout) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => (
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        // Anything else gets a full barrier
        _ => (
            vk::AccessFlags::MEMORY_WRITE,
            vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::PipelineStageFlags::ALL_COMMANDS,
        ),
    }
}

pub fn transition_image(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) {
    let (src_access_mask, dst_access_mask, src_stage, dst_stage) =
        transition_masks(old_layout, new_layout);
    let image_barrier = vk::ImageMemoryBarrier {
        s_type: vk::StructureType::IMAGE_MEMORY_BARRIER,
        src_access_mask,
        dst_access_mask,
        old_layout,
        new_layout,
        src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        image,
        subresource_range: init::image_subresource_range(vk::ImageAspectFlags::COLOR),
        ..Default::default()
    };
    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[image_barrier],
        );
    }
}

pub fn copy_buffer(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    src: vk::Buffer,
    dst: vk::Buffer,
    size: vk::DeviceSize,
) {
    let region = vk::BufferCopy {
        src_offset: 0,
        dst_offset: 0,
        size,
    };
    unsafe { device.cmd_copy_buffer(command_buffer, src, dst, &[region]) };
}

/// Copies tightly packed texels into mip 0 of an image in TRANSFER_DST layout.
pub fn copy_buffer_to_image(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    src: vk::Buffer,
    image: vk::Image,
    extent: vk::Extent3D,
) {
    let region = vk::BufferImageCopy {
        buffer_offset: 0,
        buffer_row_length: 0,
        buffer_image_height: 0,
        image_subresource: vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        },
        image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
        image_extent: extent,
    };
    unsafe {
        device.cmd_copy_buffer_to_image(
            command_buffer,
            src,
            image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region],
        )
    };
}

/// Records `function` into a throwaway command buffer, submits it and waits for the GPU.
/// Used only during setup, so blocking on the fence is fine.
pub fn immediate_submit<F>(
    device: &lv::Device,
    queue: &lv::Queue,
    command_pool: &lv::CommandPool,
    function: F,
) -> Result<()>
where
    F: FnOnce(vk::CommandBuffer),
{
    let command_buffer =
        lv::CommandBuffer::new(command_pool, vk::CommandBufferLevel::PRIMARY, device)?;
    let cmd = command_buffer.get_handle();

    let submitted = (|| -> Result<()> {
        let begin_info = init::command_buffer_begin_info(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { device.handle.begin_command_buffer(cmd, &begin_info)? };
        function(cmd);
        unsafe { device.handle.end_command_buffer(cmd)? };

        let fence_ci = vk::FenceCreateInfo {
            s_type: vk::StructureType::FENCE_CREATE_INFO,
            ..Default::default()
        };
        let fence = unsafe { device.handle.create_fence(&fence_ci, None)? };
        let command_buffers = [cmd];
        let submit_info = vk::SubmitInfo {
            s_type: vk::StructureType::SUBMIT_INFO,
            command_buffer_count: command_buffers.len() as u32,
            p_command_buffers: command_buffers.as_ptr(),
            ..Default::default()
        };
        let waited = unsafe {
            device
                .handle
                .queue_submit(queue.handle, &[submit_info], fence)
                .and_then(|_| device.handle.wait_for_fences(&[fence], true, u64::MAX))
        };
        unsafe { device.handle.destroy_fence(fence, None) };
        waited?;
        Ok(())
    })();

    unsafe {
        device
            .handle
            .free_command_buffers(command_pool.get_handle(), &[cmd])
    };
    submitted
}
