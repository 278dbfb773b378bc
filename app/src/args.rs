//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;
use yosemite_graphics::backend::vulkan::BackendConfig;
use yosemite_graphics::scheduler::DrawPathKind;

/// Draw path selection for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DrawPathArg {
    /// Meshlets when the device supports mesh shaders, indexed otherwise.
    #[default]
    Auto,
    /// Non-indexed draw of the expanded triangle list.
    Vertex,
    /// Indexed draw of the deduplicated mesh.
    Indexed,
    /// Task and mesh shader dispatch over meshlets.
    Clusters,
}

impl From<DrawPathArg> for Option<DrawPathKind> {
    fn from(arg: DrawPathArg) -> Self {
        match arg {
            DrawPathArg::Auto => None,
            DrawPathArg::Vertex => Some(DrawPathKind::Vertex),
            DrawPathArg::Indexed => Some(DrawPathKind::Indexed),
            DrawPathArg::Clusters => Some(DrawPathKind::Clusters),
        }
    }
}

/// Yosemite mesh viewer arguments.
///
/// # Examples
///
/// ```bash
/// # Render with the best draw path the device supports
/// ./yosemite assets/bunny.obj
///
/// # Force the indexed path and quit after 100 frames
/// ./yosemite assets/bunny.obj --draw-path indexed --max-frames 100
/// ```
#[derive(Parser, Debug, Clone)]
#[command(
    name = "yosemite",
    about = "Render an OBJ mesh with Vulkan",
    long_about = "Loads a Wavefront OBJ mesh, clusters it into meshlets and renders it \
        in a window.\n\n\
        On devices with VK_EXT_mesh_shader the meshlet path is used by default; \
        otherwise the mesh is drawn with an indexed draw call.",
    version
)]
pub struct Args {
    /// Path to the OBJ mesh to render.
    pub mesh: PathBuf,

    /// Initial window width in pixels.
    #[arg(long, default_value = "1280")]
    pub width: u32,

    /// Initial window height in pixels.
    #[arg(long, default_value = "720")]
    pub height: u32,

    /// How the mesh is drawn.
    #[arg(long, default_value = "auto", value_enum)]
    pub draw_path: DrawPathArg,

    /// Directory holding the compiled `.spv` shaders.
    #[arg(long, default_value = "shaders")]
    pub shader_dir: PathBuf,

    /// Exit after presenting N frames.
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Disable vertical sync (may cause tearing).
    #[arg(long)]
    pub no_vsync: bool,

    /// Enable Vulkan validation layers.
    #[arg(long, conflicts_with = "no_validation")]
    pub validation: bool,

    /// Disable Vulkan validation layers.
    #[arg(long, conflicts_with = "validation")]
    pub no_validation: bool,
}

impl Args {
    /// Draw path preference, `None` for automatic selection.
    pub fn draw_path(&self) -> Option<DrawPathKind> {
        self.draw_path.into()
    }

    /// `--validation` forces on, `--no-validation` forces off, otherwise on
    /// in debug builds.
    pub fn validation_enabled(&self) -> bool {
        self.validation || (!self.no_validation && cfg!(debug_assertions))
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            validation: self.validation_enabled(),
            vsync: !self.no_vsync,
        }
    }
}
