// Construction errors
//
// Every failure aborts initialization; there is no per-kind recovery.
// The kinds stay distinct so logs and tests can tell them apart.

use ash::vk;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Failed to load Vulkan library. Is Vulkan installed? ({0})")]
    LoaderUnavailable(String),

    #[error("Validation layers requested but not supported: {}", .missing.join(", "))]
    ValidationLayersUnsupported { missing: Vec<String> },

    #[error("Failed to enumerate Vulkan objects: {0}")]
    Enumeration(vk::Result),

    #[error("Display server not supported for Vulkan surfaces: {0}")]
    UnsupportedDisplay(String),

    #[error("Failed to create Vulkan instance: {0}")]
    InstanceCreation(vk::Result),

    #[error("Failed to create debug messenger: {0}")]
    DebugMessengerCreation(vk::Result),

    #[error("No Vulkan-capable GPU found")]
    NoGpu,

    #[error("No GPU fulfils the requirements (shaderInt64 + graphics queue)")]
    NoSuitableGpu,

    #[error("Failed to create logical device: {0}")]
    LogicalDeviceCreation(vk::Result),
}

pub type BootstrapResult<T> = std::result::Result<T, BootstrapError>;
