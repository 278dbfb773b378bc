//! Recording driver and window for tests without a GPU.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use ash::vk::{self, Handle};

use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::{Buffer, GpuMesh};
use crate::scheduler::{
    AcquireOutcome, CommandRecorder, DrawPathKind, FrameDriver, LayoutTransition, PresentOutcome,
    Windowing,
};
use crate::swapchain::{SurfaceDriver, SwapchainImages};

pub fn extent(width: u32, height: u32) -> vk::Extent2D {
    vk::Extent2D { width, height }
}

/// A driver call, in the order it was made.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SurfaceExtent,
    CreateSwapchain {
        extent: vk::Extent2D,
        old: vk::SwapchainKHR,
    },
    DestroySwapchain(vk::SwapchainKHR),
    CreateImageView(vk::Image),
    DestroyImageView(vk::ImageView),
    WaitIdle,
    CreateSemaphore(vk::Semaphore),
    DestroySemaphore(vk::Semaphore),
    Acquire {
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
    },
    Record(Vec<RecordedCommand>),
    Submit {
        wait: vk::Semaphore,
        signal: vk::Semaphore,
    },
    Present {
        swapchain: vk::SwapchainKHR,
        index: u32,
        wait: vk::Semaphore,
    },
}

/// A command recorded into the frame command buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    Transition(vk::Image, LayoutTransition),
    BeginRendering {
        view: vk::ImageView,
        extent: vk::Extent2D,
        clear_color: [f32; 4],
    },
    SetViewport(vk::Extent2D),
    BindPipeline(vk::Pipeline),
    PushStorageBuffers(Vec<vk::Buffer>),
    BindIndexBuffer(vk::Buffer),
    Draw(u32),
    DrawIndexed(u32),
    DrawMeshTasks(u32),
    EndRendering,
}

#[derive(Debug, Default)]
pub struct RecordingCommands {
    pub commands: Vec<RecordedCommand>,
}

impl CommandRecorder for RecordingCommands {
    fn transition_image(&mut self, image: vk::Image, transition: LayoutTransition) {
        self.commands
            .push(RecordedCommand::Transition(image, transition));
    }

    fn begin_rendering(&mut self, view: vk::ImageView, extent: vk::Extent2D, clear_color: [f32; 4]) {
        self.commands.push(RecordedCommand::BeginRendering {
            view,
            extent,
            clear_color,
        });
    }

    fn set_viewport(&mut self, extent: vk::Extent2D) {
        self.commands.push(RecordedCommand::SetViewport(extent));
    }

    fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        self.commands.push(RecordedCommand::BindPipeline(pipeline));
    }

    fn push_storage_buffers(&mut self, _layout: vk::PipelineLayout, buffers: &[vk::Buffer]) {
        self.commands
            .push(RecordedCommand::PushStorageBuffers(buffers.to_vec()));
    }

    fn bind_index_buffer(&mut self, buffer: vk::Buffer) {
        self.commands.push(RecordedCommand::BindIndexBuffer(buffer));
    }

    fn draw(&mut self, vertex_count: u32) {
        self.commands.push(RecordedCommand::Draw(vertex_count));
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.commands.push(RecordedCommand::DrawIndexed(index_count));
    }

    fn draw_mesh_tasks(&mut self, group_count: u32) {
        self.commands.push(RecordedCommand::DrawMeshTasks(group_count));
    }

    fn end_rendering(&mut self) {
        self.commands.push(RecordedCommand::EndRendering);
    }
}

/// Records every driver call and hands out fake handles.
///
/// The surface extent is either fixed or follows the framebuffer extent the
/// caller passes in.
pub struct MockDriver {
    calls: RefCell<Vec<Call>>,
    surface_extent: Cell<Option<vk::Extent2D>>,
    image_count: Cell<usize>,
    next_handle: Cell<u64>,
    acquires: Cell<u32>,
    acquire_results: RefCell<VecDeque<AcquireOutcome>>,
    present_results: RefCell<VecDeque<PresentOutcome>>,
    submit_error: Cell<Option<vk::Result>>,
}

impl MockDriver {
    pub fn new(surface_extent: vk::Extent2D) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            surface_extent: Cell::new(Some(surface_extent)),
            image_count: Cell::new(3),
            next_handle: Cell::new(0x1000),
            acquires: Cell::new(0),
            acquire_results: RefCell::new(VecDeque::new()),
            present_results: RefCell::new(VecDeque::new()),
            submit_error: Cell::new(None),
        }
    }

    pub fn following_window() -> Self {
        let driver = Self::new(extent(0, 0));
        driver.surface_extent.set(None);
        driver
    }

    pub fn set_surface_extent(&self, extent: vk::Extent2D) {
        self.surface_extent.set(Some(extent));
    }

    pub fn set_image_count(&self, count: usize) {
        self.image_count.set(count);
    }

    /// Queue a result for the next acquire instead of a ready image.
    pub fn push_acquire(&self, outcome: AcquireOutcome) {
        self.acquire_results.borrow_mut().push_back(outcome);
    }

    pub fn push_present(&self, outcome: PresentOutcome) {
        self.present_results.borrow_mut().push_back(outcome);
    }

    pub fn fail_submit(&self, result: vk::Result) {
        self.submit_error.set(Some(result));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    /// Command lists of every recorded frame.
    pub fn recorded(&self) -> Vec<Vec<RecordedCommand>> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Record(commands) => Some(commands.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    fn push(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn handle<H: Handle>(&self) -> H {
        let raw = self.next_handle.get();
        self.next_handle.set(raw + 1);
        H::from_raw(raw)
    }
}

impl SurfaceDriver for MockDriver {
    fn surface_extent(&self, framebuffer: vk::Extent2D) -> GraphicsResult<vk::Extent2D> {
        self.push(Call::SurfaceExtent);
        Ok(self.surface_extent.get().unwrap_or(framebuffer))
    }

    fn create_swapchain(
        &self,
        extent: vk::Extent2D,
        old: vk::SwapchainKHR,
    ) -> GraphicsResult<SwapchainImages> {
        self.push(Call::CreateSwapchain { extent, old });
        Ok(SwapchainImages {
            swapchain: self.handle(),
            images: (0..self.image_count.get()).map(|_| self.handle()).collect(),
            format: vk::Format::B8G8R8A8_SRGB,
            extent,
        })
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        self.push(Call::DestroySwapchain(swapchain));
    }

    fn create_image_view(
        &self,
        image: vk::Image,
        _format: vk::Format,
    ) -> GraphicsResult<vk::ImageView> {
        self.push(Call::CreateImageView(image));
        Ok(self.handle())
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.push(Call::DestroyImageView(view));
    }

    fn wait_idle(&self) -> GraphicsResult<()> {
        self.push(Call::WaitIdle);
        Ok(())
    }
}

impl FrameDriver for MockDriver {
    fn create_semaphore(&self) -> GraphicsResult<vk::Semaphore> {
        let semaphore = self.handle();
        self.push(Call::CreateSemaphore(semaphore));
        Ok(semaphore)
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.push(Call::DestroySemaphore(semaphore));
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
    ) -> GraphicsResult<AcquireOutcome> {
        self.push(Call::Acquire { swapchain, signal });
        if let Some(outcome) = self.acquire_results.borrow_mut().pop_front() {
            return Ok(outcome);
        }
        let n = self.acquires.get();
        self.acquires.set(n + 1);
        Ok(AcquireOutcome::Ready {
            index: n % self.image_count.get().max(1) as u32,
            suboptimal: false,
        })
    }

    fn record(&self, commands: &mut dyn FnMut(&mut dyn CommandRecorder)) -> GraphicsResult<()> {
        let mut recorder = RecordingCommands::default();
        commands(&mut recorder);
        self.push(Call::Record(recorder.commands));
        Ok(())
    }

    fn submit(&self, wait: vk::Semaphore, signal: vk::Semaphore) -> GraphicsResult<()> {
        self.push(Call::Submit { wait, signal });
        match self.submit_error.get() {
            Some(result) => Err(GraphicsError::Driver {
                operation: "vkQueueSubmit",
                result,
            }),
            None => Ok(()),
        }
    }

    fn present(
        &self,
        swapchain: vk::SwapchainKHR,
        index: u32,
        wait: vk::Semaphore,
    ) -> GraphicsResult<PresentOutcome> {
        self.push(Call::Present {
            swapchain,
            index,
            wait,
        });
        Ok(self
            .present_results
            .borrow_mut()
            .pop_front()
            .unwrap_or(PresentOutcome::Presented { suboptimal: false }))
    }
}

/// A window whose size changes only when the test says so.
///
/// Each `wait_events` applies the next queued extent. Once the queue is empty
/// a wait closes the window, so a blocked loop always terminates.
#[derive(Debug)]
pub struct MockWindow {
    pub extent: vk::Extent2D,
    pub on_wait: VecDeque<vk::Extent2D>,
    pub close_after_polls: Option<usize>,
    pub closed: bool,
    pub polls: usize,
    pub waits: usize,
}

impl MockWindow {
    pub fn new(extent: vk::Extent2D) -> Self {
        Self {
            extent,
            on_wait: VecDeque::new(),
            close_after_polls: None,
            closed: false,
            polls: 0,
            waits: 0,
        }
    }
}

impl Windowing for MockWindow {
    fn poll_events(&mut self) {
        self.polls += 1;
        if self.close_after_polls.is_some_and(|n| self.polls >= n) {
            self.closed = true;
        }
    }

    fn wait_events(&mut self) {
        self.waits += 1;
        match self.on_wait.pop_front() {
            Some(extent) => self.extent = extent,
            None => self.closed = true,
        }
    }

    fn close_requested(&self) -> bool {
        self.closed
    }

    fn framebuffer_extent(&self) -> vk::Extent2D {
        self.extent
    }
}

pub fn fake_buffer(raw: u64, size: vk::DeviceSize) -> Buffer {
    Buffer {
        handle: vk::Buffer::from_raw(raw),
        memory: vk::DeviceMemory::null(),
        size,
        mapped: None,
    }
}

/// GPU mesh with the buffers `kind` would have uploaded.
pub fn fake_gpu_mesh(
    kind: DrawPathKind,
    vertex_count: u32,
    index_count: u32,
    meshlet_count: u32,
) -> GpuMesh {
    GpuMesh {
        vertices: fake_buffer(0x90, u64::from(vertex_count) * 32),
        indices: (kind == DrawPathKind::Indexed)
            .then(|| fake_buffer(0x91, u64::from(index_count) * 4)),
        meshlets: (kind == DrawPathKind::Clusters)
            .then(|| fake_buffer(0x92, u64::from(meshlet_count) * 656)),
        vertex_count,
        index_count,
        meshlet_count,
    }
}
