// build.rs
// Compiles the GLSL shaders under resources/shaders to SPIR-V with glslc

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const SHADER_EXTENSIONS: [&str; 2] = ["vert", "frag"];

fn needs_compile(source: &Path, output: &Path) -> bool {
    match (
        std::fs::metadata(source).and_then(|m| m.modified()),
        std::fs::metadata(output).and_then(|m| m.modified()),
    ) {
        (Ok(src), Ok(dst)) => src > dst,
        _ => true,
    }
}

fn compile_shaders(shader_dir: &Path, target_dir: &Path, glslc: &Path) -> usize {
    let entries = match std::fs::read_dir(shader_dir) {
        Ok(entries) => entries,
        Err(_) => {
            eprintln!("info: No shader directory found at: {:?}", shader_dir);
            return 0;
        }
    };

    let mut compiled = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !SHADER_EXTENSIONS.contains(&ext) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        // default.vert -> default_vert.spv so both stages of a name can coexist
        let out_file = target_dir.join(format!("{}_{}.spv", stem, ext));
        if !needs_compile(&path, &out_file) {
            eprintln!("info: Shader {:?} is up to date", path.file_name().unwrap_or_default());
            continue;
        }

        let status = Command::new(glslc).arg(&path).arg("-o").arg(&out_file).status();
        match status {
            Ok(s) if s.success() => {
                eprintln!("info: Compiled {:?} -> {:?}", path, out_file);
                compiled += 1;
            }
            Ok(s) => panic!("glslc failed for {:?} with exit code {}", path, s.code().unwrap_or(-1)),
            Err(e) => panic!("Failed to run glslc for {:?}: {}", path, e),
        }
    }
    compiled
}

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string()));
    let workspace_root = manifest_dir.parent().map(Path::to_path_buf).unwrap_or(manifest_dir);
    let shader_dir = workspace_root.join("resources/shaders");

    println!("cargo:rerun-if-changed={}", shader_dir.display());
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");
    println!("cargo:rerun-if-env-changed=SKIP_SHADERS");

    if env::var("SKIP_SHADERS").is_ok() {
        eprintln!("info: Skipping shader compilation (SKIP_SHADERS set)");
        return;
    }

    let Ok(vulkan_sdk) = env::var("VULKAN_SDK") else {
        eprintln!("warning: VULKAN_SDK not set, shader compilation skipped");
        eprintln!("hint: Install Vulkan SDK and set VULKAN_SDK environment variable");
        return;
    };

    let glslc = if cfg!(target_os = "windows") {
        PathBuf::from(&vulkan_sdk).join("Bin").join("glslc.exe")
    } else {
        PathBuf::from(&vulkan_sdk).join("bin").join("glslc")
    };
    if !glslc.exists() {
        eprintln!("warning: glslc not found at {:?}, shader compilation skipped", glslc);
        return;
    }

    let target_dir = workspace_root.join("target/shaders");
    if let Err(e) = std::fs::create_dir_all(&target_dir) {
        eprintln!("warning: Failed to create {:?}: {}", target_dir, e);
        return;
    }

    let compiled = compile_shaders(&shader_dir, &target_dir, &glslc);
    if compiled > 0 {
        eprintln!("info: Successfully compiled {} shader(s)", compiled);
    } else {
        eprintln!("info: All shaders are up to date");
    }
}
