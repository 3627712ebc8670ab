use std::ffi::{c_char, CStr};

/// Converts a fixed-size, nul-terminated Vulkan name array into an owned string.
pub fn vk_to_string(raw: &[c_char]) -> String {
    let bytes: Vec<u8> = raw
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Names in `required` that do not appear in `available`, in the order they were required.
pub fn missing_names(required: &[String], available: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|name| !available.contains(name))
        .cloned()
        .collect()
}

pub fn cstr_to_string(name: &CStr) -> String {
    name.to_string_lossy().into_owned()
}
