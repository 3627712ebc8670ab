use crate::error::{Error, Result};
use crate::lv;
use crate::lv::SwapchainSupportDetails;
use crate::utility::tools::{cstr_to_string, missing_names, vk_to_string};
use ash::vk;
use std::ffi::{c_char, CString};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Distinct families, graphics first. A queue is created for each.
    pub fn unique(&self) -> Vec<u32> {
        let mut families: Vec<u32> = self
            .graphics_family
            .into_iter()
            .chain(self.present_family)
            .collect();
        families.dedup();
        families
    }
}

pub struct PhysicalDevice {
    pub handle: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub features: vk::PhysicalDeviceFeatures,
    pub queue_families: QueueFamilyIndices,

    // Reference-counting
    instance: Arc<lv::Instance>,
}

impl PhysicalDevice {
    pub fn new(vk_device: vk::PhysicalDevice, instance: Arc<lv::Instance>) -> PhysicalDevice {
        let properties = unsafe { instance.instance.get_physical_device_properties(vk_device) };
        let features = unsafe { instance.instance.get_physical_device_features(vk_device) };

        PhysicalDevice {
            handle: vk_device,
            instance,
            properties,
            features,
            queue_families: QueueFamilyIndices::default(),
        }
    }

    pub fn name(&self) -> String {
        vk_to_string(&self.properties.device_name)
    }

    pub fn find_queue_families(&mut self, surface: &lv::Surface) -> Result<()> {
        let queue_family_properties = unsafe {
            self.instance
                .instance
                .get_physical_device_queue_family_properties(self.handle)
        };
        let mut families = QueueFamilyIndices::default();
        for (index, queue_family) in queue_family_properties.iter().enumerate() {
            let index = index as u32;
            if families.graphics_family.is_none()
                && queue_family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            {
                families.graphics_family = Some(index);
            }
            let can_present = unsafe {
                surface
                    .loader
                    .get_physical_device_surface_support(self.handle, index, surface.handle)?
            };
            // A family doing both is preferred so the swap chain can stay exclusive
            if can_present
                && (families.present_family.is_none() || families.graphics_family == Some(index))
            {
                families.present_family = Some(index);
            }
        }
        self.queue_families = families;
        Ok(())
    }

    pub fn missing_extensions(&self, extensions: &[String]) -> Result<Vec<String>> {
        let available: Vec<String> = unsafe {
            self.instance
                .instance
                .enumerate_device_extension_properties(self.handle)?
        }
        .iter()
        .map(|extension| vk_to_string(&extension.extension_name))
        .collect();

        Ok(missing_names(extensions, &available))
    }

    pub fn get_swapchain_support(&self, surface: &lv::Surface) -> Result<SwapchainSupportDetails> {
        unsafe {
            Ok(SwapchainSupportDetails {
                capabilities: surface
                    .loader
                    .get_physical_device_surface_capabilities(self.handle, surface.handle)?,
                formats: surface
                    .loader
                    .get_physical_device_surface_formats(self.handle, surface.handle)?,
                present_modes: surface
                    .loader
                    .get_physical_device_surface_present_modes(self.handle, surface.handle)?,
            })
        }
    }

    fn is_suitable(&mut self, surface: &lv::Surface, required_extensions: &[String]) -> Result<bool> {
        self.find_queue_families(surface)?;
        if !self.queue_families.is_complete() {
            log::debug!("{}: missing graphics or present queue", self.name());
            return Ok(false);
        }
        let missing = self.missing_extensions(required_extensions)?;
        if !missing.is_empty() {
            log::debug!("{}: missing extensions {:?}", self.name(), missing);
            return Ok(false);
        }
        let support = self.get_swapchain_support(surface)?;
        if support.formats.is_empty() || support.present_modes.is_empty() {
            log::debug!("{}: surface has no formats or present modes", self.name());
            return Ok(false);
        }
        Ok(self.features.sampler_anisotropy == vk::TRUE)
    }

    /// First suitable device, with discrete GPUs taking priority.
    pub fn pick(
        instance: Arc<lv::Instance>,
        surface: &lv::Surface,
        required_extensions: &[String],
    ) -> Result<Arc<PhysicalDevice>> {
        let handles = unsafe { instance.instance.enumerate_physical_devices()? };
        let mut chosen: Option<PhysicalDevice> = None;
        for handle in handles {
            let mut candidate = PhysicalDevice::new(handle, instance.clone());
            if !candidate.is_suitable(surface, required_extensions)? {
                continue;
            }
            let is_discrete =
                candidate.properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU;
            if chosen.is_none() || is_discrete {
                chosen = Some(candidate);
                if is_discrete {
                    break;
                }
            }
        }

        let chosen = chosen.ok_or(Error::NoSuitableDevice)?;
        log::info!(
            "Selected GPU: {} ({:?})",
            chosen.name(),
            chosen.properties.device_type
        );
        Ok(Arc::new(chosen))
    }
}

pub struct Device {
    pub handle: ash::Device,
    pub graphics_queue: lv::Queue,
    pub present_queue: lv::Queue,
    pub physical_device: Arc<PhysicalDevice>,

    // Reference-count
    pub instance: Arc<lv::Instance>,
}

impl Device {
    pub fn required_extensions() -> Vec<String> {
        vec![cstr_to_string(ash::extensions::khr::Swapchain::name())]
    }

    pub fn new(
        physical_device: Arc<PhysicalDevice>,
        required_extensions: &[String],
        instance: Arc<lv::Instance>,
    ) -> Result<Arc<Device>> {
        let queue_families = physical_device.queue_families;
        let (Some(graphics_family), Some(present_family)) =
            (queue_families.graphics_family, queue_families.present_family)
        else {
            return Err(Error::NoSuitableDevice);
        };

        let priorities = [1.0f32];
        let queue_cis: Vec<vk::DeviceQueueCreateInfo> = queue_families
            .unique()
            .into_iter()
            .map(|queue_family_index| vk::DeviceQueueCreateInfo {
                s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
                queue_family_index,
                queue_count: 1,
                p_queue_priorities: priorities.as_ptr(),
                ..Default::default()
            })
            .collect();

        let cstring_ext_names: Vec<CString> = required_extensions
            .iter()
            .filter_map(|s| CString::new(s.as_str()).ok())
            .collect();
        let c_str_ptrs: Vec<*const c_char> = cstring_ext_names.iter().map(|s| s.as_ptr()).collect();

        let physical_device_features = vk::PhysicalDeviceFeatures {
            sampler_anisotropy: vk::TRUE,
            ..Default::default()
        };
        let device_ci = vk::DeviceCreateInfo {
            s_type: vk::StructureType::DEVICE_CREATE_INFO,
            p_queue_create_infos: queue_cis.as_ptr(),
            queue_create_info_count: queue_cis.len() as u32,
            p_enabled_features: &physical_device_features,
            enabled_extension_count: c_str_ptrs.len() as u32,
            pp_enabled_extension_names: c_str_ptrs.as_ptr(),
            ..Default::default()
        };
        let device = unsafe {
            instance
                .instance
                .create_device(physical_device.handle, &device_ci, None)?
        };

        Ok(Arc::new(Device {
            graphics_queue: lv::Queue::new(graphics_family, &device),
            present_queue: lv::Queue::new(present_family, &device),
            handle: device,
            physical_device,
            instance,
        }))
    }

    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.handle.device_wait_idle()? };
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe { self.handle.destroy_device(None) };
    }
}
