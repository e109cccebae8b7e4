// Vulkan context - everything the bootstrapper acquires from the API
//
// Construction order: instance -> debug messenger -> physical device
// (selection only) -> logical device -> queue. Release goes through a
// ReleaseStack, so teardown is the exact reverse and a failed step
// releases whatever came before it.

use ash::prelude::VkResult;
use ash::{vk, Entry};
use std::ffi::CStr;

use super::debug::DebugUtilsTable;
use super::device::{self, DeviceQuery, SelectedDevice, SelectionPolicy};
use super::instance;
use super::release::ReleaseStack;
use crate::error::{BootstrapError, BootstrapResult};

pub const INSTANCE: &str = "instance";
pub const DEBUG_MESSENGER: &str = "debug messenger";
pub const LOGICAL_DEVICE: &str = "logical device";

/// Handles the context owns, in the order `new` acquires them
pub fn acquisition_order(enable_validation: bool) -> Vec<&'static str> {
    [INSTANCE, DEBUG_MESSENGER, LOGICAL_DEVICE]
        .into_iter()
        .filter(|name| enable_validation || *name != DEBUG_MESSENGER)
        .collect()
}

/// Order in which dropping the context releases them
pub fn teardown_order(enable_validation: bool) -> Vec<&'static str> {
    let mut order = acquisition_order(enable_validation);
    order.reverse();
    order
}

/// Inputs that decide how the context is built
#[derive(Clone, Debug)]
pub struct ContextSettings<'a> {
    pub app_name: &'a str,
    pub surface_extensions: Vec<&'static CStr>,
    pub enable_validation: bool,
    pub selection: SelectionPolicy,
}

/// Vulkan handles with automatic cleanup
pub struct VulkanContext {
    // Declared first so it unwinds before the entry (loader) is dropped
    releases: ReleaseStack,

    pub instance: ash::Instance,
    pub debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    pub selected: SelectedDevice,
    pub device: ash::Device,
    pub graphics_queue: vk::Queue,
    _entry: Entry,
}

impl VulkanContext {
    pub fn new(settings: &ContextSettings<'_>) -> BootstrapResult<Self> {
        log::info!("Creating Vulkan context: {}", settings.app_name);

        // Step 1: Load Vulkan library
        let entry = unsafe { Entry::load() }
            .map_err(|e| BootstrapError::LoaderUnavailable(e.to_string()))?;

        let mut releases = ReleaseStack::new();

        // Step 2: Create instance
        let instance = instance::create_instance(
            &entry,
            settings.app_name,
            &settings.surface_extensions,
            settings.enable_validation,
        )?;
        {
            let instance = instance.clone();
            releases.push(INSTANCE, move || unsafe { instance.destroy_instance(None) });
        }

        // Step 3: Setup debug messenger if validation enabled
        let debug_messenger = if settings.enable_validation {
            let table = DebugUtilsTable::resolve(&entry, &instance);
            let messenger = table.create_messenger()?;
            releases.push(DEBUG_MESSENGER, move || unsafe {
                table.destroy_messenger(messenger)
            });
            Some(messenger)
        } else {
            None
        };

        // Step 4: Pick physical device (GPU)
        let selected = device::pick_physical_device(&instance, settings.selection)?;

        // Step 5: Create logical device and fetch its graphics queue
        let (device, graphics_queue) =
            device::create_logical_device(&instance, selected, settings.enable_validation)?;
        {
            let device = device.clone();
            releases.push(LOGICAL_DEVICE, move || unsafe { device.destroy_device(None) });
        }

        debug_assert_eq!(
            releases.names(),
            acquisition_order(settings.enable_validation)
        );
        log::info!("Vulkan context ready ({} handles owned)", releases.names().len());

        Ok(Self {
            releases,
            instance,
            debug_messenger,
            selected,
            device,
            graphics_queue,
            _entry: entry,
        })
    }

    /// Name of the selected GPU
    pub fn device_name(&self) -> String {
        self.instance.device_name(self.selected.physical_device)
    }

    /// Wait for device to be idle (e.g., before cleanup)
    pub fn wait_idle(&self) -> VkResult<()> {
        unsafe { self.device.device_wait_idle() }
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan context...");

        if let Err(e) = self.wait_idle() {
            log::warn!("Device did not go idle before teardown: {}", e);
        }

        // Cleanup in reverse order
        self.releases.unwind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn lifecycle_order_with_validation() {
        assert_eq!(
            acquisition_order(true),
            vec!["instance", "debug messenger", "logical device"]
        );
        assert_eq!(
            teardown_order(true),
            vec!["logical device", "debug messenger", "instance"]
        );
    }

    #[test]
    fn no_messenger_without_validation() {
        assert_eq!(acquisition_order(false), vec!["instance", "logical device"]);
        assert_eq!(teardown_order(false), vec!["logical device", "instance"]);
    }

    #[test]
    fn stack_filled_in_acquisition_order_releases_in_teardown_order() {
        for enable_validation in [true, false] {
            let released = Rc::new(RefCell::new(Vec::new()));
            let mut releases = ReleaseStack::new();
            for name in acquisition_order(enable_validation) {
                let released = released.clone();
                releases.push(name, move || released.borrow_mut().push(name));
            }
            assert_eq!(releases.names(), acquisition_order(enable_validation));

            drop(releases);
            assert_eq!(*released.borrow(), teardown_order(enable_validation));
        }
    }
}
