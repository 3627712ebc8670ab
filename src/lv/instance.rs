use crate::config::{ValidationInfo, WINDOW_TITLE};
use crate::error::{Error, Result};
use crate::lv;
use crate::utility;
use ash::vk;
use std::ffi::{c_char, c_void, CStr, CString};
use std::ptr;

pub struct Instance {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub validation: ValidationInfo,
}

impl Instance {
    pub fn new(required_extensions: &[*const c_char], validation: ValidationInfo) -> Result<Self> {
        let entry = ash::Entry::linked();
        let layer_names: Vec<String> = validation
            .required_validation_layers
            .iter()
            .map(|layer| layer.to_string())
            .collect();
        if validation.is_enabled {
            let missing = Instance::missing_validation_layers(&entry, &layer_names)?;
            if !missing.is_empty() {
                return Err(Error::MissingValidationLayers(missing));
            }
        }
        Instance::check_required_extensions(&entry, required_extensions)?;

        let app_name = CString::new(WINDOW_TITLE).unwrap_or_default();
        let engine_name = CString::new("No Engine").unwrap_or_default();
        let app_info = vk::ApplicationInfo {
            s_type: vk::StructureType::APPLICATION_INFO,
            p_next: ptr::null(),
            p_application_name: app_name.as_ptr(),
            application_version: vk::make_api_version(0, 1, 0, 0),
            p_engine_name: engine_name.as_ptr(),
            engine_version: vk::make_api_version(0, 1, 0, 0),
            api_version: vk::API_VERSION_1_0,
        };

        let layer_cstrings: Vec<CString> = layer_names
            .iter()
            .filter_map(|name| CString::new(name.as_str()).ok())
            .collect();
        let enabled_layer_names: Vec<*const c_char> =
            layer_cstrings.iter().map(|name| name.as_ptr()).collect();

        // Chained so instance creation and destruction are covered by the messenger too
        let debug_ci = lv::DebugMessenger::create_info();

        let create_info = vk::InstanceCreateInfo {
            s_type: vk::StructureType::INSTANCE_CREATE_INFO,
            p_next: if validation.is_enabled {
                &debug_ci as *const vk::DebugUtilsMessengerCreateInfoEXT as *const c_void
            } else {
                ptr::null()
            },
            flags: vk::InstanceCreateFlags::empty(),
            p_application_info: &app_info,
            enabled_layer_count: if validation.is_enabled {
                enabled_layer_names.len()
            } else {
                0
            } as u32,
            pp_enabled_layer_names: if validation.is_enabled {
                enabled_layer_names.as_ptr()
            } else {
                ptr::null()
            },
            pp_enabled_extension_names: required_extensions.as_ptr(),
            enabled_extension_count: required_extensions.len() as u32,
        };

        let instance: ash::Instance = unsafe { entry.create_instance(&create_info, None)? };
        log::info!(
            "Created Vulkan instance (validation {})",
            if validation.is_enabled { "on" } else { "off" }
        );

        Ok(Self {
            entry,
            instance,
            validation,
        })
    }

    pub fn missing_validation_layers(
        entry: &ash::Entry,
        required_layers: &[String],
    ) -> Result<Vec<String>> {
        let layer_properties = entry.enumerate_instance_layer_properties()?;
        let available: Vec<String> = layer_properties
            .iter()
            .map(|layer| utility::tools::vk_to_string(&layer.layer_name))
            .collect();

        let missing = required_layers
            .iter()
            .filter(|required| {
                let found = available.contains(required);
                log::debug!("Validation layer {}: {}", required, if found { "found" } else { "missing" });
                !found
            })
            .cloned()
            .collect();
        Ok(missing)
    }

    fn check_required_extensions(entry: &ash::Entry, required: &[*const c_char]) -> Result<()> {
        let available: Vec<String> = entry
            .enumerate_instance_extension_properties(None)?
            .iter()
            .map(|extension| utility::tools::vk_to_string(&extension.extension_name))
            .collect();
        log::debug!("Available instance extensions:");
        for name in available.iter() {
            log::debug!("\t{}", name);
        }

        let required: Vec<String> = required
            .iter()
            .map(|&ext| unsafe { CStr::from_ptr(ext) }.to_string_lossy().into_owned())
            .collect();
        let missing = utility::tools::missing_names(&required, &available);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingExtensions(missing))
        }
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            self.instance.destroy_instance(None);
        }
    }
}
