// Backend module - Vulkan abstraction layer
//
// Design: Thin wrapper around ash; every handle released through a ReleaseStack

pub mod context;
pub mod debug;
pub mod device;
pub mod instance;
pub mod release;
pub mod surface;

pub use context::{ContextSettings, VulkanContext};
pub use device::SelectionPolicy;
