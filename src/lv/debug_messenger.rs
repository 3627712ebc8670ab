use crate::error::Result;
use crate::lv;
use ash::vk;
use std::ffi::{c_void, CStr};
use std::ptr;
use std::sync::Arc;

unsafe extern "system" fn vulkan_debug_utils_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    let types = match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "[General]",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "[Performance]",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "[Validation]",
        _ => "[Unknown]",
    };
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message).to_string_lossy();
    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => log::error!("{} {}", types, message),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => log::warn!("{} {}", types, message),
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => log::info!("{} {}", types, message),
        _ => log::trace!("{} {}", types, message),
    }

    vk::FALSE
}

pub struct DebugMessenger {
    loader: ash::extensions::ext::DebugUtils,
    handle: vk::DebugUtilsMessengerEXT,

    // Reference-counting
    _instance: Arc<lv::Instance>,
}

impl DebugMessenger {
    pub fn create_info() -> vk::DebugUtilsMessengerCreateInfoEXT {
        vk::DebugUtilsMessengerCreateInfoEXT {
            s_type: vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
            p_next: ptr::null(),
            flags: vk::DebugUtilsMessengerCreateFlagsEXT::empty(),
            message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            pfn_user_callback: Some(vulkan_debug_utils_callback),
            p_user_data: ptr::null_mut(),
        }
    }

    /// Returns `None` when validation is disabled for this instance.
    pub fn new(instance: Arc<lv::Instance>) -> Result<Option<DebugMessenger>> {
        if !instance.validation.is_enabled {
            return Ok(None);
        }

        let loader = ash::extensions::ext::DebugUtils::new(&instance.entry, &instance.instance);
        let create_info = DebugMessenger::create_info();
        let handle = unsafe { loader.create_debug_utils_messenger(&create_info, None)? };

        Ok(Some(DebugMessenger {
            loader,
            handle,
            _instance: instance,
        }))
    }
}

impl Drop for DebugMessenger {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_debug_utils_messenger(self.handle, None);
        };
    }
}
