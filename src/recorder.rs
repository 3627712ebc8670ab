use crate::error::Result;
use crate::utility;
use ash::vk;

/// Everything one frame's draw needs. Handles are borrowed, never owned.
#[derive(Clone, Copy, Debug)]
pub struct DrawIntent {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
    pub pipeline: vk::Pipeline,
    pub pipeline_layout: vk::PipelineLayout,
    pub vertex_buffer: vk::Buffer,
    pub index_buffer: vk::Buffer,
    pub index_type: vk::IndexType,
    pub index_count: u32,
    pub descriptor_set: vk::DescriptorSet,
    pub clear_color: [f32; 4],
}

/// Destination for recorded commands.
pub trait CommandSink {
    fn begin(&mut self) -> Result<()>;
    fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_color: [f32; 4],
    );
    fn bind_pipeline(&mut self, pipeline: vk::Pipeline);
    fn bind_vertex_buffers(&mut self, buffers: &[vk::Buffer], offsets: &[vk::DeviceSize]);
    fn bind_index_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType);
    fn set_viewport(&mut self, viewport: vk::Viewport);
    fn set_scissor(&mut self, scissor: vk::Rect2D);
    fn bind_descriptor_set(&mut self, layout: vk::PipelineLayout, set: vk::DescriptorSet);
    fn draw_indexed(&mut self, index_count: u32);
    fn end_render_pass(&mut self);
    fn end(&mut self) -> Result<()>;
}

pub fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

pub fn full_rect(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }
}

/// Emits the whole frame into `sink`. Safe to call again on a reset buffer with a
/// different framebuffer.
pub fn record_draw(sink: &mut impl CommandSink, intent: &DrawIntent) -> Result<()> {
    let area = full_rect(intent.extent);

    sink.begin()?;
    sink.begin_render_pass(intent.render_pass, intent.framebuffer, area, intent.clear_color);
    sink.bind_pipeline(intent.pipeline);
    sink.bind_vertex_buffers(&[intent.vertex_buffer], &[0]);
    sink.bind_index_buffer(intent.index_buffer, 0, intent.index_type);
    sink.set_viewport(full_viewport(intent.extent));
    sink.set_scissor(area);
    sink.bind_descriptor_set(intent.pipeline_layout, intent.descriptor_set);
    sink.draw_indexed(intent.index_count);
    sink.end_render_pass();
    sink.end()
}

/// Writes straight into a Vulkan command buffer.
pub struct VkCommandSink<'a> {
    pub device: &'a ash::Device,
    pub command_buffer: vk::CommandBuffer,
}

impl CommandSink for VkCommandSink<'_> {
    fn begin(&mut self) -> Result<()> {
        let begin_info = utility::init::command_buffer_begin_info(vk::CommandBufferUsageFlags::empty());
        unsafe {
            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)?
        };
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_color: [f32; 4],
    ) {
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: clear_color,
            },
        }];
        let render_pass_bi = vk::RenderPassBeginInfo {
            s_type: vk::StructureType::RENDER_PASS_BEGIN_INFO,
            render_pass,
            framebuffer,
            render_area,
            clear_value_count: clear_values.len() as u32,
            p_clear_values: clear_values.as_ptr(),
            ..Default::default()
        };
        unsafe {
            self.device.cmd_begin_render_pass(
                self.command_buffer,
                &render_pass_bi,
                vk::SubpassContents::INLINE,
            )
        };
    }

    fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        unsafe {
            self.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline,
            )
        };
    }

    fn bind_vertex_buffers(&mut self, buffers: &[vk::Buffer], offsets: &[vk::DeviceSize]) {
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(self.command_buffer, 0, buffers, offsets)
        };
    }

    fn bind_index_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) {
        unsafe {
            self.device
                .cmd_bind_index_buffer(self.command_buffer, buffer, offset, index_type)
        };
    }

    fn set_viewport(&mut self, viewport: vk::Viewport) {
        unsafe { self.device.cmd_set_viewport(self.command_buffer, 0, &[viewport]) };
    }

    fn set_scissor(&mut self, scissor: vk::Rect2D) {
        unsafe { self.device.cmd_set_scissor(self.command_buffer, 0, &[scissor]) };
    }

    fn bind_descriptor_set(&mut self, layout: vk::PipelineLayout, set: vk::DescriptorSet) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                0,
                &[set],
                &[],
            )
        };
    }

    fn draw_indexed(&mut self, index_count: u32) {
        unsafe {
            self.device
                .cmd_draw_indexed(self.command_buffer, index_count, 1, 0, 0, 0)
        };
    }

    fn end_render_pass(&mut self) {
        unsafe { self.device.cmd_end_render_pass(self.command_buffer) };
    }

    fn end(&mut self) -> Result<()> {
        unsafe { self.device.end_command_buffer(self.command_buffer)? };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[derive(Debug, Clone, PartialEq)]
    enum Command {
        Begin,
        BeginRenderPass { framebuffer: u64, area: (i32, i32, u32, u32), clear: [f32; 4] },
        BindPipeline,
        BindVertexBuffers { count: usize, offsets: Vec<u64> },
        BindIndexBuffer { offset: u64, index_type: vk::IndexType },
        SetViewport { rect: (f32, f32, f32, f32), depth: (f32, f32) },
        SetScissor { area: (i32, i32, u32, u32) },
        BindDescriptorSet { set: u64 },
        DrawIndexed { index_count: u32 },
        EndRenderPass,
        End,
    }

    #[derive(Default)]
    struct RecordingSink {
        commands: Vec<Command>,
    }

    fn rect_tuple(rect: vk::Rect2D) -> (i32, i32, u32, u32) {
        (rect.offset.x, rect.offset.y, rect.extent.width, rect.extent.height)
    }

    impl CommandSink for RecordingSink {
        fn begin(&mut self) -> Result<()> {
            self.commands.push(Command::Begin);
            Ok(())
        }
        fn begin_render_pass(
            &mut self,
            _render_pass: vk::RenderPass,
            framebuffer: vk::Framebuffer,
            render_area: vk::Rect2D,
            clear_color: [f32; 4],
        ) {
            self.commands.push(Command::BeginRenderPass {
                framebuffer: framebuffer.as_raw(),
                area: rect_tuple(render_area),
                clear: clear_color,
            });
        }
        fn bind_pipeline(&mut self, _pipeline: vk::Pipeline) {
            self.commands.push(Command::BindPipeline);
        }
        fn bind_vertex_buffers(&mut self, buffers: &[vk::Buffer], offsets: &[vk::DeviceSize]) {
            self.commands.push(Command::BindVertexBuffers {
                count: buffers.len(),
                offsets: offsets.to_vec(),
            });
        }
        fn bind_index_buffer(&mut self, _buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) {
            self.commands
                .push(Command::BindIndexBuffer { offset, index_type });
        }
        fn set_viewport(&mut self, viewport: vk::Viewport) {
            self.commands.push(Command::SetViewport {
                rect: (viewport.x, viewport.y, viewport.width, viewport.height),
                depth: (viewport.min_depth, viewport.max_depth),
            });
        }
        fn set_scissor(&mut self, scissor: vk::Rect2D) {
            self.commands.push(Command::SetScissor {
                area: rect_tuple(scissor),
            });
        }
        fn bind_descriptor_set(&mut self, _layout: vk::PipelineLayout, set: vk::DescriptorSet) {
            self.commands
                .push(Command::BindDescriptorSet { set: set.as_raw() });
        }
        fn draw_indexed(&mut self, index_count: u32) {
            self.commands.push(Command::DrawIndexed { index_count });
        }
        fn end_render_pass(&mut self) {
            self.commands.push(Command::EndRenderPass);
        }
        fn end(&mut self) -> Result<()> {
            self.commands.push(Command::End);
            Ok(())
        }
    }

    fn intent(framebuffer: u64, extent: vk::Extent2D) -> DrawIntent {
        DrawIntent {
            render_pass: vk::RenderPass::from_raw(1),
            framebuffer: vk::Framebuffer::from_raw(framebuffer),
            extent,
            pipeline: vk::Pipeline::from_raw(2),
            pipeline_layout: vk::PipelineLayout::from_raw(3),
            vertex_buffer: vk::Buffer::from_raw(4),
            index_buffer: vk::Buffer::from_raw(5),
            index_type: vk::IndexType::UINT16,
            index_count: 6,
            descriptor_set: vk::DescriptorSet::from_raw(7),
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    #[test]
    fn records_the_frame_in_order() {
        let extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let mut sink = RecordingSink::default();
        record_draw(&mut sink, &intent(10, extent)).unwrap();

        assert_eq!(
            sink.commands,
            vec![
                Command::Begin,
                Command::BeginRenderPass {
                    framebuffer: 10,
                    area: (0, 0, 800, 600),
                    clear: [0.0, 0.0, 0.0, 1.0],
                },
                Command::BindPipeline,
                Command::BindVertexBuffers {
                    count: 1,
                    offsets: vec![0],
                },
                Command::BindIndexBuffer {
                    offset: 0,
                    index_type: vk::IndexType::UINT16,
                },
                Command::SetViewport {
                    rect: (0.0, 0.0, 800.0, 600.0),
                    depth: (0.0, 1.0),
                },
                Command::SetScissor {
                    area: (0, 0, 800, 600),
                },
                Command::BindDescriptorSet { set: 7 },
                Command::DrawIndexed { index_count: 6 },
                Command::EndRenderPass,
                Command::End,
            ]
        );
    }

    #[test]
    fn rerecording_targets_the_new_image() {
        let mut first = RecordingSink::default();
        let mut second = RecordingSink::default();
        let extent = vk::Extent2D {
            width: 1024,
            height: 768,
        };
        record_draw(&mut first, &intent(10, extent)).unwrap();
        record_draw(&mut second, &intent(11, extent)).unwrap();

        assert_eq!(first.commands.len(), second.commands.len());
        let differing: Vec<_> = first
            .commands
            .iter()
            .zip(second.commands.iter())
            .filter(|(a, b)| a != b)
            .collect();
        assert_eq!(differing.len(), 1);
        assert!(matches!(
            differing[0].1,
            Command::BeginRenderPass { framebuffer: 11, .. }
        ));
    }
}
