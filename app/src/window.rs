//! winit window driven by `pump_app_events`.
//!
//! The frame loop owns control flow, so events are pumped on demand instead
//! of handing the loop to `run_app`.

use std::time::Duration;

use ash::vk;
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};
use yosemite_graphics::scheduler::Windowing;

/// Upper bound on pumps spent waiting for the platform to resume the app.
const MAX_STARTUP_PUMPS: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("Failed to create event loop: {0}")]
    EventLoop(#[from] EventLoopError),
    #[error("Failed to create window: {0}")]
    Creation(#[from] OsError),
    #[error("Window was not created after {0} event pumps")]
    NotResumed(u32),
}

/// Event handler state. Holds the window once the platform resumes.
struct WindowState {
    attributes: WindowAttributes,
    window: Option<Window>,
    creation_error: Option<OsError>,
    close_requested: bool,
}

impl WindowState {
    fn framebuffer_extent(&self) -> vk::Extent2D {
        match &self.window {
            Some(window) => extent_from_size(window.inner_size()),
            None => vk::Extent2D::default(),
        }
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
        if self.window.is_some() {
            return;
        }

        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => {
                let size = window.inner_size();
                log::info!("Window created ({}x{} physical)", size.width, size.height);
                self.window = Some(window);
            }
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                self.creation_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                log::info!("Window close requested");
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                log::debug!("Window resized to {}x{}", size.width, size.height);
            }
            _ => {}
        }
    }
}

/// A single window plus the event loop that feeds it.
pub struct AppWindow {
    event_loop: EventLoop<()>,
    state: WindowState,
}

impl AppWindow {
    /// Create the event loop and pump it until the window exists.
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self, WindowError> {
        let event_loop = EventLoop::new()?;
        let attributes = Window::default_attributes()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height));

        let mut window = Self {
            event_loop,
            state: WindowState {
                attributes,
                window: None,
                creation_error: None,
                close_requested: false,
            },
        };

        for _ in 0..MAX_STARTUP_PUMPS {
            window.pump(Some(Duration::ZERO));
            if let Some(e) = window.state.creation_error.take() {
                return Err(e.into());
            }
            if window.state.window.is_some() {
                return Ok(window);
            }
        }
        Err(WindowError::NotResumed(MAX_STARTUP_PUMPS))
    }

    pub fn window(&self) -> Option<&Window> {
        self.state.window.as_ref()
    }

    fn pump(&mut self, timeout: Option<Duration>) {
        if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(timeout, &mut self.state) {
            log::debug!("Event loop exited with code {}", code);
            self.state.close_requested = true;
        }
    }
}

impl Windowing for AppWindow {
    fn poll_events(&mut self) {
        self.pump(Some(Duration::ZERO));
    }

    fn wait_events(&mut self) {
        self.pump(None);
    }

    fn close_requested(&self) -> bool {
        self.state.close_requested
    }

    fn framebuffer_extent(&self) -> vk::Extent2D {
        self.state.framebuffer_extent()
    }
}

impl HasWindowHandle for AppWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.window()
            .ok_or(HandleError::Unavailable)?
            .window_handle()
    }
}

impl HasDisplayHandle for AppWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.event_loop.display_handle()
    }
}

fn extent_from_size(size: PhysicalSize<u32>) -> vk::Extent2D {
    vk::Extent2D {
        width: size.width,
        height: size.height,
    }
}
