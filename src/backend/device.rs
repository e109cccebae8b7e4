// GPU selection and logical device
//
// Responsibilities:
// - Queue family discovery (first graphics-capable family)
// - Physical device selection (shaderInt64 + graphics queue)
// - Logical device + graphics queue creation

use ash::prelude::VkResult;
use ash::vk;
use std::ffi::CStr;

use super::instance::VALIDATION_LAYERS;
use crate::error::{BootstrapError, BootstrapResult};

/// Needed by drivers that only partially conform (e.g. MoltenVK)
pub const PORTABILITY_SUBSET_EXTENSION: &CStr = c"VK_KHR_portability_subset";

/// Queue families the bootstrapper needs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some()
    }
}

/// Lowest-index family with the graphics bit set
pub fn find_queue_families(families: &[vk::QueueFamilyProperties]) -> QueueFamilyIndices {
    let graphics_family = families
        .iter()
        .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .and_then(|index| u32::try_from(index).ok());

    QueueFamilyIndices { graphics_family }
}

/// Which suitable device wins when several qualify
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Keep scanning; the last suitable device in enumeration order wins
    #[default]
    LastSuitable,
    /// Stop at the first suitable device
    FirstSuitable,
}

/// Read-only queries selection needs from the instance
pub trait DeviceQuery {
    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>>;
    fn features(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures;
    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties>;
    fn device_name(&self, device: vk::PhysicalDevice) -> String;
    fn api_version(&self, device: vk::PhysicalDevice) -> u32;
}

impl DeviceQuery for ash::Instance {
    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        unsafe { self.enumerate_physical_devices() }
    }

    fn features(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures {
        unsafe { self.get_physical_device_features(device) }
    }

    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        unsafe { self.get_physical_device_queue_family_properties(device) }
    }

    fn device_name(&self, device: vk::PhysicalDevice) -> String {
        let properties = unsafe { self.get_physical_device_properties(device) };
        unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    fn api_version(&self, device: vk::PhysicalDevice) -> u32 {
        unsafe { self.get_physical_device_properties(device) }.api_version
    }
}

/// "major.minor.patch" of a packed Vulkan version
pub fn format_api_version(version: u32) -> String {
    format!(
        "{}.{}.{}",
        vk::api_version_major(version),
        vk::api_version_minor(version),
        vk::api_version_patch(version)
    )
}

/// A chosen GPU. Not owned: the driver releases it with the instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectedDevice {
    pub physical_device: vk::PhysicalDevice,
    pub graphics_family: u32,
}

/// Graphics queue family of a device, if it is suitable at all
fn suitable_graphics_family(query: &impl DeviceQuery, device: vk::PhysicalDevice) -> Option<u32> {
    let indices = find_queue_families(&query.queue_families(device));
    if query.features(device).shader_int64 == vk::TRUE && indices.is_complete() {
        indices.graphics_family
    } else {
        None
    }
}

pub fn pick_physical_device(
    query: &impl DeviceQuery,
    policy: SelectionPolicy,
) -> BootstrapResult<SelectedDevice> {
    let devices = query
        .physical_devices()
        .map_err(BootstrapError::Enumeration)?;

    log::info!("Physical devices count: {}", devices.len());
    if devices.is_empty() {
        return Err(BootstrapError::NoGpu);
    }

    let mut selected = None;
    for device in devices {
        let Some(graphics_family) = suitable_graphics_family(query, device) else {
            log::debug!("Skipping unsuitable GPU: {}", query.device_name(device));
            continue;
        };

        selected = Some(SelectedDevice {
            physical_device: device,
            graphics_family,
        });

        if policy == SelectionPolicy::FirstSuitable {
            break;
        }
    }

    let selected = selected.ok_or(BootstrapError::NoSuitableGpu)?;
    log::info!(
        "Selected GPU: {} (graphics family {})",
        query.device_name(selected.physical_device),
        selected.graphics_family
    );
    log::info!(
        "API Version: {}",
        format_api_version(query.api_version(selected.physical_device))
    );
    Ok(selected)
}

/// Device extensions to enable, given what the device advertises
pub fn device_extensions(available: &[String]) -> Vec<&'static CStr> {
    let advertises_subset = available
        .iter()
        .any(|name| name.as_bytes() == PORTABILITY_SUBSET_EXTENSION.to_bytes());

    if advertises_subset {
        vec![PORTABILITY_SUBSET_EXTENSION]
    } else {
        Vec::new()
    }
}

/// Create the logical device and fetch queue 0 of the graphics family
pub fn create_logical_device(
    instance: &ash::Instance,
    selected: SelectedDevice,
    enable_validation: bool,
) -> BootstrapResult<(ash::Device, vk::Queue)> {
    let queue_priorities = [1.0];
    let queue_create_info = vk::DeviceQueueCreateInfo::builder()
        .queue_family_index(selected.graphics_family)
        .queue_priorities(&queue_priorities)
        .build();

    let available = unsafe {
        instance.enumerate_device_extension_properties(selected.physical_device)
    }
    .map_err(BootstrapError::Enumeration)?;
    let extensions = device_extensions(&super::instance::extension_names(&available));
    log::debug!("Enabling device extensions: {:?}", extensions);
    let extension_ptrs: Vec<_> = extensions.iter().map(|name| name.as_ptr()).collect();

    // Device layers are deprecated but older loaders still read them
    let layer_ptrs: Vec<_> = if enable_validation {
        VALIDATION_LAYERS.iter().map(|name| name.as_ptr()).collect()
    } else {
        Vec::new()
    };

    let features = vk::PhysicalDeviceFeatures::default();

    let create_info = vk::DeviceCreateInfo::builder()
        .queue_create_infos(std::slice::from_ref(&queue_create_info))
        .enabled_extension_names(&extension_ptrs)
        .enabled_layer_names(&layer_ptrs)
        .enabled_features(&features);

    let device = unsafe { instance.create_device(selected.physical_device, &create_info, None) }
        .map_err(BootstrapError::LogicalDeviceCreation)?;

    let graphics_queue = unsafe { device.get_device_queue(selected.graphics_family, 0) };

    Ok((device, graphics_queue))
}
