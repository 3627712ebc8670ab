use crate::error::Result;
use crate::lv;
use ash::vk;
use std::sync::Arc;

pub struct Sampler {
    handle: vk::Sampler,
    device: Arc<lv::Device>,
}

impl Sampler {
    /// Linear filtering, repeat addressing, anisotropy at the device limit.
    pub fn new_linear_repeat(device: Arc<lv::Device>) -> Result<Self> {
        let max_anisotropy = device
            .physical_device
            .properties
            .limits
            .max_sampler_anisotropy;
        let sampler_ci = vk::SamplerCreateInfo {
            s_type: vk::StructureType::SAMPLER_CREATE_INFO,
            mag_filter: vk::Filter::LINEAR,
            min_filter: vk::Filter::LINEAR,
            address_mode_u: vk::SamplerAddressMode::REPEAT,
            address_mode_v: vk::SamplerAddressMode::REPEAT,
            address_mode_w: vk::SamplerAddressMode::REPEAT,
            anisotropy_enable: vk::TRUE,
            max_anisotropy,
            border_color: vk::BorderColor::INT_OPAQUE_BLACK,
            unnormalized_coordinates: vk::FALSE,
            compare_enable: vk::FALSE,
            compare_op: vk::CompareOp::ALWAYS,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
            mip_lod_bias: 0.0,
            min_lod: 0.0,
            max_lod: 0.0,
            ..Default::default()
        };
        let handle = unsafe { device.handle.create_sampler(&sampler_ci, None)? };
        Ok(Sampler { handle, device })
    }

    pub fn get_handle(&self) -> vk::Sampler {
        self.handle
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe { self.device.handle.destroy_sampler(self.handle, None) }
    }
}
