//! Frame scheduling.
//!
//! Each frame runs strictly in sequence:
//!
//! | Step | Action |
//! |------|--------|
//! | Wait | block on window events while the framebuffer has no area |
//! | Reconcile | rebuild the image set if the surface changed |
//! | Acquire | acquire the next image, signaling the acquire semaphore |
//! | Record | transition, render with the draw path, transition to present |
//! | Submit | wait on acquire at color output, signal the submit semaphore |
//! | Present | present waiting on the submit semaphore |
//! | Sync | full device wait |
//!
//! The device wait at the end of every frame means only one frame is ever in
//! flight, so one [`FrameSync`] pair is reused for every frame.
//!
//! # Module Contents
//!
//! - [`FrameScheduler`] - runs the per-frame protocol
//! - [`FrameDriver`] - driver calls the scheduler needs
//! - [`Windowing`] - window events and framebuffer size
//! - [`CommandRecorder`] - the commands a frame records
//! - [`DrawPath`] - the draw strategy chosen at startup
//!
//! # Example
//!
//! ```ignore
//! let draw = create_draw_path(kind, pipeline.handles(), &gpu_mesh)?;
//! let mut scheduler = FrameScheduler::new(&backend, window.framebuffer_extent(), draw)?;
//! let stats = scheduler.run(&backend, &mut window, None)?;
//! scheduler.destroy(&backend)?;
//! ```

mod draw;
mod recorder;
mod sync;

pub use draw::{
    ClusterDraw, DrawPath, DrawPathKind, DrawPipelineHandles, IndexedDraw, VertexDraw,
    create_draw_path, select_draw_path,
};
pub use recorder::{CommandRecorder, LayoutTransition};
pub use sync::FrameSync;

use ash::vk;

use crate::error::{GraphicsError, GraphicsResult};
use crate::swapchain::{Reconcile, SurfaceDriver, SurfaceManager};

/// Result of acquiring a swapchain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired and the semaphore will be signaled.
    Ready { index: u32, suboptimal: bool },
    /// The swapchain no longer matches the surface. Nothing was acquired.
    OutOfDate,
}

/// Result of presenting a swapchain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented { suboptimal: bool },
    OutOfDate,
}

/// Driver operations used by [`FrameScheduler`].
pub trait FrameDriver: SurfaceDriver {
    fn create_semaphore(&self) -> GraphicsResult<vk::Semaphore>;

    fn destroy_semaphore(&self, semaphore: vk::Semaphore);

    /// Acquire the next image with no timeout.
    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
    ) -> GraphicsResult<AcquireOutcome>;

    /// Reset the frame command buffer and record into it.
    fn record(&self, commands: &mut dyn FnMut(&mut dyn CommandRecorder)) -> GraphicsResult<()>;

    /// Submit the recorded command buffer.
    ///
    /// Waits on `wait` at the color attachment output stage and signals
    /// `signal` on completion.
    fn submit(&self, wait: vk::Semaphore, signal: vk::Semaphore) -> GraphicsResult<()>;

    fn present(
        &self,
        swapchain: vk::SwapchainKHR,
        index: u32,
        wait: vk::Semaphore,
    ) -> GraphicsResult<PresentOutcome>;
}

/// The window as seen by the frame loop.
pub trait Windowing {
    /// Process pending events without blocking.
    fn poll_events(&mut self);

    /// Block until at least one event arrives, then process it.
    fn wait_events(&mut self);

    fn close_requested(&self) -> bool;

    /// Current framebuffer size in pixels. Zero while minimized.
    fn framebuffer_extent(&self) -> vk::Extent2D;
}

/// What a call to [`FrameScheduler::frame`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame was presented.
    Rendered,
    /// No image could be acquired this time.
    Skipped,
    /// The window asked to close while waiting.
    Closed,
}

/// Counters reported when the frame loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub frames: u64,
    pub recreations: u64,
}

/// Drives acquire, record, submit and present for one window.
pub struct FrameScheduler {
    sync: FrameSync,
    surface: SurfaceManager,
    draw: Box<dyn DrawPath>,
    clear_color: [f32; 4],
    frames: u64,
}

impl FrameScheduler {
    /// Create the semaphore pair and the first image set.
    pub fn new<D: FrameDriver + ?Sized>(
        driver: &D,
        framebuffer: vk::Extent2D,
        draw: Box<dyn DrawPath>,
    ) -> GraphicsResult<Self> {
        let sync = FrameSync::new(driver)?;
        let surface = match SurfaceManager::new(driver, framebuffer) {
            Ok(surface) => surface,
            Err(e) => {
                sync.destroy(driver);
                return Err(e);
            }
        };

        Ok(Self {
            sync,
            surface,
            draw,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            frames: 0,
        })
    }

    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn sync(&self) -> FrameSync {
        self.sync
    }

    pub fn surface(&self) -> &SurfaceManager {
        &self.surface
    }

    pub fn draw_path(&self) -> DrawPathKind {
        self.draw.kind()
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            frames: self.frames,
            recreations: self.surface.recreations(),
        }
    }

    /// Run one frame of the protocol.
    ///
    /// Driver errors are returned as-is. An out-of-date swapchain is not an
    /// error: the image set is rebuilt on the next frame.
    pub fn frame<D, W>(&mut self, driver: &D, window: &mut W) -> GraphicsResult<FrameOutcome>
    where
        D: FrameDriver + ?Sized,
        W: Windowing + ?Sized,
    {
        let Some(framebuffer) = wait_for_presentable_extent(window) else {
            return Ok(FrameOutcome::Closed);
        };

        if self.surface.reconcile(driver, framebuffer)? == Reconcile::Minimized {
            return Ok(FrameOutcome::Skipped);
        }
        let Some(swapchain) = self.surface.current().map(|set| set.swapchain()) else {
            return Ok(FrameOutcome::Skipped);
        };

        let index = match driver.acquire_next_image(swapchain, self.sync.acquire)? {
            AcquireOutcome::Ready { index, suboptimal } => {
                if suboptimal {
                    self.surface.invalidate();
                }
                index
            }
            AcquireOutcome::OutOfDate => {
                log::debug!("Swapchain out of date on acquire");
                self.surface.invalidate();
                return Ok(FrameOutcome::Skipped);
            }
        };

        let set = self
            .surface
            .current()
            .ok_or_else(|| GraphicsError::InvalidParameter("no swapchain image set".to_string()))?;
        let (image, view) = set.image(index)?;
        let extent = set.extent();

        let draw = &*self.draw;
        let clear_color = self.clear_color;
        driver.record(&mut |recorder: &mut dyn CommandRecorder| {
            recorder.transition_image(image, LayoutTransition::ToRenderTarget);
            recorder.begin_rendering(view, extent, clear_color);
            recorder.set_viewport(extent);
            draw.record(recorder);
            recorder.end_rendering();
            recorder.transition_image(image, LayoutTransition::ToPresent);
        })?;

        driver.submit(self.sync.acquire, self.sync.submit)?;

        match driver.present(swapchain, index, self.sync.submit)? {
            PresentOutcome::Presented { suboptimal: false } => {}
            PresentOutcome::Presented { suboptimal: true } | PresentOutcome::OutOfDate => {
                log::debug!("Swapchain out of date on present");
                self.surface.invalidate();
            }
        }

        driver.wait_idle()?;

        self.frames += 1;
        log::trace!("Frame {} presented image {}", self.frames, index);
        Ok(FrameOutcome::Rendered)
    }

    /// Render until the window closes or `max_frames` frames were presented.
    pub fn run<D, W>(
        &mut self,
        driver: &D,
        window: &mut W,
        max_frames: Option<u64>,
    ) -> GraphicsResult<FrameStats>
    where
        D: FrameDriver + ?Sized,
        W: Windowing + ?Sized,
    {
        log::info!("Entering frame loop with {:?} draw path", self.draw.kind());

        while max_frames.is_none_or(|max| self.frames < max) {
            window.poll_events();
            if window.close_requested() {
                break;
            }
            if self.frame(driver, window)? == FrameOutcome::Closed {
                break;
            }
        }

        let stats = self.stats();
        log::info!(
            "Frame loop finished: {} frames, {} swapchain recreations",
            stats.frames,
            stats.recreations
        );
        Ok(stats)
    }

    /// Wait for the device, then destroy the image set and semaphores.
    pub fn destroy<D: FrameDriver + ?Sized>(self, driver: &D) -> GraphicsResult<()> {
        driver.wait_idle()?;
        self.surface.destroy(driver);
        self.sync.destroy(driver);
        Ok(())
    }
}

/// Block on window events until the framebuffer has area.
///
/// Returns `None` if the window asks to close first.
fn wait_for_presentable_extent<W: Windowing + ?Sized>(window: &mut W) -> Option<vk::Extent2D> {
    loop {
        if window.close_requested() {
            return None;
        }
        let extent = window.framebuffer_extent();
        if extent.width != 0 && extent.height != 0 {
            return Some(extent);
        }
        window.wait_events();
    }
}
