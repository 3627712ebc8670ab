use crate::error::{Error, Result};
use crate::lv;
use ash::vk;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Compiled SPIR-V lives in the build script's output directory; a hand-compiled
/// `shaders/<name>.spv` is used when the build-time compiler is disabled.
pub fn shader_path(file_name: &str) -> PathBuf {
    let built = Path::new(env!("OUT_DIR")).join(format!("{}.spv", file_name));
    if built.exists() {
        built
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("shaders")
            .join(format!("{}.spv", file_name))
    }
}

fn read_shader_code(shader_path: &Path) -> Result<Vec<u32>> {
    let mut spv_file = std::fs::File::open(shader_path).map_err(|err| {
        Error::Shader(format!("failed to open {}: {}", shader_path.display(), err))
    })?;
    ash::util::read_spv(&mut spv_file)
        .map_err(|err| Error::Shader(format!("invalid SPIR-V in {}: {}", shader_path.display(), err)))
}

pub struct Shader {
    pub handle: vk::ShaderModule,
    pub stage: vk::ShaderStageFlags,
    device: Arc<lv::Device>,
}

impl Shader {
    pub fn new(path: &Path, stage: vk::ShaderStageFlags, device: Arc<lv::Device>) -> Result<Shader> {
        let shader_code = read_shader_code(path)?;
        let shader_ci = vk::ShaderModuleCreateInfo {
            s_type: vk::StructureType::SHADER_MODULE_CREATE_INFO,
            code_size: shader_code.len() * std::mem::size_of::<u32>(),
            p_code: shader_code.as_ptr(),
            ..Default::default()
        };
        let handle = unsafe { device.handle.create_shader_module(&shader_ci, None)? };
        log::debug!("Loaded {:?} shader from {}", stage, path.display());
        Ok(Shader {
            handle,
            stage,
            device,
        })
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device.handle.destroy_shader_module(self.handle, None);
        }
    }
}
