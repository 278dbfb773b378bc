//! GPU synchronization primitives.
//!
//! The frame loop drains the device at the end of every frame, so a single
//! pair of binary semaphores is enough and is reused for every frame.

use ash::vk;

use super::FrameDriver;
use crate::error::GraphicsResult;

/// The semaphore pair ordering acquire, submit and present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSync {
    /// Signaled by acquire, waited on by the submission.
    pub acquire: vk::Semaphore,
    /// Signaled by the submission, waited on by present.
    pub submit: vk::Semaphore,
}

impl FrameSync {
    pub fn new<D: FrameDriver + ?Sized>(driver: &D) -> GraphicsResult<Self> {
        let acquire = driver.create_semaphore()?;
        let submit = match driver.create_semaphore() {
            Ok(semaphore) => semaphore,
            Err(e) => {
                driver.destroy_semaphore(acquire);
                return Err(e);
            }
        };
        Ok(Self { acquire, submit })
    }

    /// Destroy both semaphores. The device must be idle.
    pub fn destroy<D: FrameDriver + ?Sized>(self, driver: &D) {
        driver.destroy_semaphore(self.acquire);
        driver.destroy_semaphore(self.submit);
    }
}
