#[cfg(feature = "shaderc")]
extern crate shaderc;

#[allow(unused_imports)]
use std::fs;
#[allow(unused_imports)]
use std::path::{Path, PathBuf};

#[cfg(feature = "shaderc")]
use shaderc::{CompileOptions, EnvVersion, TargetEnv};

#[cfg(feature = "shaderc")]
fn compile_shader(
    compiler: &shaderc::Compiler,
    path: &Path,
    kind: shaderc::ShaderKind,
    output: &Path,
) {
    let mut options = CompileOptions::new().expect("Failed to create shaderc options");
    options.set_target_env(TargetEnv::Vulkan, EnvVersion::Vulkan1_0 as u32);
    if std::env::var("PROFILE").as_deref() == Ok("release") {
        options.set_optimization_level(shaderc::OptimizationLevel::Performance);
    }

    let source = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("Failed to read shader {}: {}", path.display(), err));
    let binary = compiler
        .compile_into_spirv(
            &source,
            kind,
            &path.to_string_lossy(),
            "main",
            Some(&options),
        )
        .unwrap_or_else(|err| panic!("Failed to compile {}: {}", path.display(), err));
    if binary.get_num_warnings() > 0 {
        println!(
            "cargo:warning={}: {}",
            path.display(),
            binary.get_warning_messages()
        );
    }
    fs::write(output, binary.as_binary_u8())
        .unwrap_or_else(|err| panic!("Failed to write {}: {}", output.display(), err));
}

fn main() {
    println!("cargo:rerun-if-changed=shaders");

    #[cfg(feature = "shaderc")]
    {
        let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR is not set"));
        let compiler = shaderc::Compiler::new().expect("Failed to create shaderc compiler");

        let entries = fs::read_dir("./shaders").expect("Missing ./shaders directory");
        for entry in entries {
            let path = entry.expect("Unreadable shader directory entry").path();
            if !path.is_file() {
                continue;
            }
            let Some(extension) = path.extension().and_then(|s| s.to_str()) else {
                continue;
            };
            // Stages are told apart by extension, everything else (.spv, includes) is skipped
            let shader_kind = match extension {
                "vert" => shaderc::ShaderKind::Vertex,
                "frag" => shaderc::ShaderKind::Fragment,
                _ => continue,
            };

            println!("cargo:rerun-if-changed={}", path.display());
            let file_name = path
                .file_name()
                .and_then(|s| s.to_str())
                .expect("Shader file name is not valid UTF-8");
            let output = out_dir.join(format!("{}.spv", file_name));
            compile_shader(&compiler, &path, shader_kind, &output);
        }
    }
}
