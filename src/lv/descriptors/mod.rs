use crate::error::Result;
use crate::lv;
use ash::vk;
use std::sync::Arc;

/// What a resource contributes to a descriptor write.
#[derive(Clone, Copy, Debug)]
pub enum DescriptorInfo {
    Buffer(vk::DescriptorBufferInfo),
    Image(vk::DescriptorImageInfo),
}

pub struct DescriptorLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorLayoutBuilder {
    pub fn new() -> DescriptorLayoutBuilder {
        DescriptorLayoutBuilder {
            bindings: Vec::new(),
        }
    }

    pub fn add_binding(
        mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        stage_flags: vk::ShaderStageFlags,
    ) -> Self {
        self.bindings.push(vk::DescriptorSetLayoutBinding {
            binding,
            descriptor_count: 1,
            descriptor_type,
            stage_flags,
            ..Default::default()
        });
        self
    }

    pub fn build(&self, device: Arc<lv::Device>) -> Result<DescriptorSetLayout> {
        let layout_ci = vk::DescriptorSetLayoutCreateInfo {
            s_type: vk::StructureType::DESCRIPTOR_SET_LAYOUT_CREATE_INFO,
            p_bindings: self.bindings.as_ptr(),
            binding_count: self.bindings.len() as u32,
            flags: vk::DescriptorSetLayoutCreateFlags::empty(),
            ..Default::default()
        };
        let handle = unsafe { device.handle.create_descriptor_set_layout(&layout_ci, None)? };
        Ok(DescriptorSetLayout { handle, device })
    }
}

pub struct DescriptorSetLayout {
    handle: vk::DescriptorSetLayout,
    device: Arc<lv::Device>,
}

impl DescriptorSetLayout {
    pub fn get_handle(&self) -> vk::DescriptorSetLayout {
        self.handle
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle
                .destroy_descriptor_set_layout(self.handle, None)
        }
    }
}

#[derive(Default, Copy, Clone, Debug)]
pub struct PoolSizeRatio {
    pub descriptor_type: vk::DescriptorType,
    pub ratio: f32,
}

/// Descriptor counts for a pool holding `max_sets` sets. Never rounds below one per type.
pub fn pool_sizes(max_sets: u32, pool_ratios: &[PoolSizeRatio]) -> Vec<vk::DescriptorPoolSize> {
    pool_ratios
        .iter()
        .map(|ratio| vk::DescriptorPoolSize {
            ty: ratio.descriptor_type,
            descriptor_count: ((ratio.ratio * max_sets as f32).ceil() as u32).max(1),
        })
        .collect()
}

/// A fixed-capacity pool; sets come out of it once and are freed with it.
pub struct DescriptorAllocator {
    pool: vk::DescriptorPool,
    max_sets: u32,
    allocated: u32,

    device: Arc<lv::Device>,
}

impl DescriptorAllocator {
    pub fn new(device: Arc<lv::Device>, max_sets: u32, pool_ratios: &[PoolSizeRatio]) -> Result<Self> {
        let pool_sizes = pool_sizes(max_sets, pool_ratios);
        let pool_ci = vk::DescriptorPoolCreateInfo {
            s_type: vk::StructureType::DESCRIPTOR_POOL_CREATE_INFO,
            flags: vk::DescriptorPoolCreateFlags::empty(),
            max_sets,
            pool_size_count: pool_sizes.len() as u32,
            p_pool_sizes: pool_sizes.as_ptr(),
            ..Default::default()
        };
        let pool = unsafe { device.handle.create_descriptor_pool(&pool_ci, None)? };
        Ok(DescriptorAllocator {
            pool,
            max_sets,
            allocated: 0,
            device,
        })
    }

    pub fn allocate(&mut self, layout: &DescriptorSetLayout) -> Result<vk::DescriptorSet> {
        assert!(
            self.allocated < self.max_sets,
            "descriptor pool exhausted ({} sets)",
            self.max_sets
        );
        let set_layouts = [layout.get_handle()];
        let allocation_info = vk::DescriptorSetAllocateInfo {
            s_type: vk::StructureType::DESCRIPTOR_SET_ALLOCATE_INFO,
            descriptor_pool: self.pool,
            descriptor_set_count: set_layouts.len() as u32,
            p_set_layouts: set_layouts.as_ptr(),
            ..Default::default()
        };
        let set = unsafe { self.device.handle.allocate_descriptor_sets(&allocation_info)? }
            .pop()
            .ok_or(vk::Result::ERROR_OUT_OF_POOL_MEMORY)?;
        self.allocated += 1;
        Ok(set)
    }
}

impl Drop for DescriptorAllocator {
    fn drop(&mut self) {
        unsafe { self.device.handle.destroy_descriptor_pool(self.pool, None) }
    }
}

/// Gathers writes for one set; the info structs are only pointed at inside `update_set`.
#[derive(Default)]
pub struct DescriptorWriter {
    writes: Vec<(u32, vk::DescriptorType, DescriptorInfo)>,
}

impl DescriptorWriter {
    pub fn new() -> Self {
        DescriptorWriter::default()
    }

    pub fn write_buffer(
        mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        resource: &impl lv::Resource,
    ) -> Self {
        self.writes
            .push((binding, descriptor_type, resource.descriptor_info()));
        self
    }

    /// Like `write_buffer`, but an image descriptor can also carry a sampler.
    pub fn write_image(
        mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        resource: &impl lv::Resource,
        sampler: vk::Sampler,
    ) -> Self {
        let info = match resource.descriptor_info() {
            DescriptorInfo::Image(image_info) => DescriptorInfo::Image(vk::DescriptorImageInfo {
                sampler,
                ..image_info
            }),
            other => other,
        };
        self.writes.push((binding, descriptor_type, info));
        self
    }

    pub fn update_set(&self, device: &lv::Device, set: vk::DescriptorSet) {
        let writes: Vec<vk::WriteDescriptorSet> = self
            .writes
            .iter()
            .map(|(binding, descriptor_type, info)| {
                let mut write = vk::WriteDescriptorSet {
                    s_type: vk::StructureType::WRITE_DESCRIPTOR_SET,
                    dst_set: set,
                    dst_binding: *binding,
                    dst_array_element: 0,
                    descriptor_count: 1,
                    descriptor_type: *descriptor_type,
                    ..Default::default()
                };
                match info {
                    DescriptorInfo::Buffer(buffer_info) => write.p_buffer_info = buffer_info,
                    DescriptorInfo::Image(image_info) => write.p_image_info = image_info,
                }
                write
            })
            .collect();
        unsafe { device.handle.update_descriptor_sets(&writes, &[]) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_is_sized_per_set() {
        let sizes = pool_sizes(
            2,
            &[
                PoolSizeRatio {
                    descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                    ratio: 1.0,
                },
                PoolSizeRatio {
                    descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    ratio: 1.0,
                },
            ],
        );
        assert_eq!(sizes.len(), 2);
        assert!(sizes.iter().all(|size| size.descriptor_count == 2));
        assert_eq!(sizes[0].ty, vk::DescriptorType::UNIFORM_BUFFER);
    }

    #[test]
    fn fractional_ratio_rounds_up() {
        let sizes = pool_sizes(
            3,
            &[PoolSizeRatio {
                descriptor_type: vk::DescriptorType::STORAGE_IMAGE,
                ratio: 0.1,
            }],
        );
        assert_eq!(sizes[0].descriptor_count, 1);
    }

    #[test]
    fn image_writes_take_the_sampler() {
        struct View;
        impl lv::Resource for View {
            fn descriptor_info(&self) -> DescriptorInfo {
                DescriptorInfo::Image(vk::DescriptorImageInfo {
                    image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    ..Default::default()
                })
            }
        }
        let writer = DescriptorWriter::new().write_image(
            1,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            &View,
            vk::Sampler::null(),
        );
        assert_eq!(writer.writes.len(), 1);
        let (binding, ty, info) = writer.writes[0];
        assert_eq!(binding, 1);
        assert_eq!(ty, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        match info {
            DescriptorInfo::Image(image_info) => {
                assert_eq!(image_info.image_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            }
            DescriptorInfo::Buffer(_) => panic!("expected an image descriptor"),
        }
    }
}
