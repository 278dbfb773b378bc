//! Application wiring: mesh, device, upload, pipeline, frame loop.

use anyhow::Context;
use yosemite_core::mesh::{Mesh, load_mesh};
use yosemite_graphics::backend::vulkan::{DrawPipeline, VulkanBackend};
use yosemite_graphics::resources::GpuMesh;
use yosemite_graphics::scheduler::{
    DrawPathKind, DrawPipelineHandles, FrameScheduler, FrameStats, Windowing, create_draw_path,
    select_draw_path,
};
use yosemite_graphics::swapchain::SurfaceDriver;

use crate::args::Args;
use crate::window::AppWindow;

const WINDOW_TITLE: &str = "Yosemite";

/// Renders one mesh in one window until it is closed.
pub struct App {
    args: Args,
}

impl App {
    pub fn new(args: Args) -> Self {
        Self { args }
    }

    /// Initialize logging and every subsystem, then render.
    pub fn run(args: Args) -> anyhow::Result<FrameStats> {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

        yosemite_core::init();
        yosemite_graphics::init();
        crate::init();

        Self::new(args).render()
    }

    /// Load the mesh and draw it. GPU objects are released in reverse
    /// creation order on every exit path once the backend exists.
    pub fn render(&self) -> anyhow::Result<FrameStats> {
        let mesh = load_mesh(&self.args.mesh)
            .with_context(|| format!("Failed to load mesh {}", self.args.mesh.display()))?;

        let mut window = AppWindow::new(WINDOW_TITLE, self.args.width, self.args.height)?;
        let backend = VulkanBackend::new(&window, &self.args.backend_config())
            .context("Failed to initialize Vulkan")?;

        let kind = select_draw_path(self.args.draw_path(), backend.capabilities())?;
        log::info!("Using {:?} draw path", kind);

        let gpu_mesh = GpuMesh::upload(backend.allocator(), &backend.upload_context(), &mesh, kind)
            .context("Failed to upload mesh")?;

        let result = self.draw_mesh(&backend, &mut window, &mesh, &gpu_mesh, kind);

        if let Err(e) = backend.wait_idle() {
            log::error!("Failed to wait for device before teardown: {}", e);
        }
        gpu_mesh.destroy(backend.allocator());

        result
    }

    fn draw_mesh(
        &self,
        backend: &VulkanBackend,
        window: &mut AppWindow,
        mesh: &Mesh,
        gpu_mesh: &GpuMesh,
        kind: DrawPathKind,
    ) -> anyhow::Result<FrameStats> {
        let pipeline = DrawPipeline::new(
            backend.device(),
            kind,
            &self.args.shader_dir,
            backend.color_format(),
        )?;

        let result = self.run_scheduler(backend, window, pipeline.handles(), gpu_mesh, kind);

        if let Err(e) = backend.wait_idle() {
            log::error!("Failed to wait for device before destroying pipeline: {}", e);
        }
        pipeline.destroy(backend.device());

        if let Ok(stats) = &result {
            log::info!(
                "Rendered {} triangles for {} frames",
                mesh.triangle_count(),
                stats.frames
            );
        }
        result
    }

    fn run_scheduler(
        &self,
        backend: &VulkanBackend,
        window: &mut AppWindow,
        handles: DrawPipelineHandles,
        gpu_mesh: &GpuMesh,
        kind: DrawPathKind,
    ) -> anyhow::Result<FrameStats> {
        let draw = create_draw_path(kind, handles, gpu_mesh)?;
        let mut scheduler = FrameScheduler::new(backend, window.framebuffer_extent(), draw)
            .context("Failed to create the swapchain")?;

        let stats = scheduler.run(backend, window, self.args.max_frames);
        let destroyed = scheduler.destroy(backend);

        let stats = stats.context("Frame loop failed")?;
        destroyed?;
        Ok(stats)
    }
}
