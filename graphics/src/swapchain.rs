//! Presentable image set management.
//!
//! This module keeps the swapchain matched to the window surface.
//!
//! # Overview
//!
//! - [`SurfaceDriver`] - the driver calls the surface state machine needs
//! - [`SurfaceImageSet`] - one swapchain with its images and views
//! - [`SurfaceManager`] - rebuilds the image set when the surface changes
//!
//! # Example
//!
//! ```ignore
//! let mut surface = SurfaceManager::new(&backend, window.framebuffer_extent())?;
//!
//! // Every frame, before acquiring:
//! match surface.reconcile(&backend, window.framebuffer_extent())? {
//!     Reconcile::Minimized => return Ok(FrameOutcome::Skipped),
//!     _ => {}
//! }
//! ```

use ash::vk;

use crate::error::{GraphicsError, GraphicsResult};

/// Upper bound on presentable images per swapchain.
pub const MAX_SURFACE_IMAGES: usize = 8;

/// A freshly created swapchain and the images it owns.
#[derive(Debug, Clone)]
pub struct SwapchainImages {
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

/// Driver operations used by [`SurfaceManager`].
pub trait SurfaceDriver {
    /// The extent a new swapchain should use.
    ///
    /// `framebuffer` is the window size, used when the platform lets the
    /// swapchain decide.
    fn surface_extent(&self, framebuffer: vk::Extent2D) -> GraphicsResult<vk::Extent2D>;

    /// Create a swapchain, passing `old` as the recreation hint.
    fn create_swapchain(
        &self,
        extent: vk::Extent2D,
        old: vk::SwapchainKHR,
    ) -> GraphicsResult<SwapchainImages>;

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);

    fn create_image_view(&self, image: vk::Image, format: vk::Format)
    -> GraphicsResult<vk::ImageView>;

    fn destroy_image_view(&self, view: vk::ImageView);

    /// Block until the device has finished all submitted work.
    fn wait_idle(&self) -> GraphicsResult<()>;
}

/// A swapchain together with one view per image.
///
/// Image sets are never modified: a surface change builds a new set and the
/// old one is destroyed.
#[derive(Debug)]
pub struct SurfaceImageSet {
    generation: u64,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
}

impl SurfaceImageSet {
    fn build<D: SurfaceDriver + ?Sized>(
        driver: &D,
        generation: u64,
        extent: vk::Extent2D,
        old: vk::SwapchainKHR,
    ) -> GraphicsResult<Self> {
        let created = driver.create_swapchain(extent, old)?;

        if created.images.len() > MAX_SURFACE_IMAGES {
            driver.destroy_swapchain(created.swapchain);
            return Err(GraphicsError::CapacityExceeded {
                what: "swapchain images",
                requested: created.images.len(),
                capacity: MAX_SURFACE_IMAGES,
            });
        }

        let mut views = Vec::with_capacity(created.images.len());
        for &image in &created.images {
            match driver.create_image_view(image, created.format) {
                Ok(view) => views.push(view),
                Err(e) => {
                    for view in views {
                        driver.destroy_image_view(view);
                    }
                    driver.destroy_swapchain(created.swapchain);
                    return Err(e);
                }
            }
        }

        Ok(Self {
            generation,
            swapchain: created.swapchain,
            images: created.images,
            views,
            format: created.format,
            extent: created.extent,
        })
    }

    fn destroy<D: SurfaceDriver + ?Sized>(self, driver: &D) {
        for view in self.views {
            driver.destroy_image_view(view);
        }
        driver.destroy_swapchain(self.swapchain);
    }

    /// Incremented every time the set is rebuilt.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn swapchain(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// The image and view at the index returned by acquire.
    pub fn image(&self, index: u32) -> GraphicsResult<(vk::Image, vk::ImageView)> {
        let i = index as usize;
        match (self.images.get(i), self.views.get(i)) {
            (Some(&image), Some(&view)) => Ok((image, view)),
            _ => Err(GraphicsError::InvalidParameter(format!(
                "image index {} out of range for {} swapchain images",
                index,
                self.images.len()
            ))),
        }
    }
}

/// Result of [`SurfaceManager::reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// The current set still matches the surface.
    Unchanged,
    /// The surface has no area. Nothing may be acquired.
    Minimized,
    /// The first image set was created.
    Created,
    /// The image set was replaced.
    Recreated,
}

/// Owns the presentable image set bound to the window surface.
#[derive(Debug, Default)]
pub struct SurfaceManager {
    current: Option<SurfaceImageSet>,
    next_generation: u64,
    recreations: u64,
    stale: bool,
}

impl SurfaceManager {
    /// Create the manager and, if the surface has area, its first image set.
    pub fn new<D: SurfaceDriver + ?Sized>(
        driver: &D,
        framebuffer: vk::Extent2D,
    ) -> GraphicsResult<Self> {
        let mut manager = Self::default();
        manager.reconcile(driver, framebuffer)?;
        Ok(manager)
    }

    /// Bring the image set in line with the surface's current extent.
    ///
    /// A replacement set is built with the old swapchain as hint. The old set
    /// is destroyed only after a full device wait that follows the creation.
    pub fn reconcile<D: SurfaceDriver + ?Sized>(
        &mut self,
        driver: &D,
        framebuffer: vk::Extent2D,
    ) -> GraphicsResult<Reconcile> {
        let extent = driver.surface_extent(framebuffer)?;
        if extent.width == 0 || extent.height == 0 {
            return Ok(Reconcile::Minimized);
        }

        let old_swapchain = match &self.current {
            Some(set) if set.extent == extent && !self.stale => return Ok(Reconcile::Unchanged),
            Some(set) => set.swapchain,
            None => vk::SwapchainKHR::null(),
        };

        let set = SurfaceImageSet::build(driver, self.next_generation, extent, old_swapchain)?;
        self.next_generation += 1;
        self.stale = false;

        log::info!(
            "Swapchain generation {}: {}x{}, {} images, {:?}",
            set.generation,
            set.extent.width,
            set.extent.height,
            set.len(),
            set.format
        );

        match self.current.replace(set) {
            Some(old) => {
                driver.wait_idle()?;
                old.destroy(driver);
                self.recreations += 1;
                Ok(Reconcile::Recreated)
            }
            None => Ok(Reconcile::Created),
        }
    }

    /// Mark the set as needing a rebuild on the next reconcile.
    ///
    /// Called when acquire or present reports the swapchain out of date.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    pub fn current(&self) -> Option<&SurfaceImageSet> {
        self.current.as_ref()
    }

    /// Number of times the set was replaced after the first creation.
    pub fn recreations(&self) -> u64 {
        self.recreations
    }

    /// Destroy the current set. The device must be idle.
    pub fn destroy<D: SurfaceDriver + ?Sized>(mut self, driver: &D) {
        if let Some(set) = self.current.take() {
            set.destroy(driver);
        }
    }
}
