// Debug messenger - validation layer output
//
// VK_EXT_debug_utils is an optional extension, so its entry points are looked
// up on the instance once and kept as a small function table.

use ash::extensions::ext::DebugUtils;
use ash::{vk, Entry, Instance};
use std::ffi::CStr;

use crate::error::{BootstrapError, BootstrapResult};

/// Log target for everything the validation layers report
pub const VALIDATION_LOG_TARGET: &str = "vulkan::validation";

/// Outcome of a dynamic entry point lookup
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtensionFn {
    Loaded,
    Missing,
}

impl ExtensionFn {
    fn lookup(entry: &Entry, instance: vk::Instance, name: &CStr) -> Self {
        match unsafe { entry.get_instance_proc_addr(instance, name.as_ptr()) } {
            Some(_) => ExtensionFn::Loaded,
            None => ExtensionFn::Missing,
        }
    }
}

/// Debug utils entry points, resolved once after instance creation
#[derive(Clone)]
pub struct DebugUtilsTable {
    loader: DebugUtils,
    pub create: ExtensionFn,
    pub destroy: ExtensionFn,
}

impl DebugUtilsTable {
    pub fn resolve(entry: &Entry, instance: &Instance) -> Self {
        let handle = instance.handle();
        let create = ExtensionFn::lookup(entry, handle, c"vkCreateDebugUtilsMessengerEXT");
        let destroy = ExtensionFn::lookup(entry, handle, c"vkDestroyDebugUtilsMessengerEXT");
        log::debug!("Debug utils entry points: create={:?} destroy={:?}", create, destroy);

        Self {
            loader: DebugUtils::new(entry, instance),
            create,
            destroy,
        }
    }

    /// Register the validation callback on the instance
    pub fn create_messenger(&self) -> BootstrapResult<vk::DebugUtilsMessengerEXT> {
        if self.create == ExtensionFn::Missing {
            return Err(BootstrapError::DebugMessengerCreation(
                vk::Result::ERROR_EXTENSION_NOT_PRESENT,
            ));
        }

        let create_info = messenger_create_info();
        unsafe { self.loader.create_debug_utils_messenger(&create_info, None) }
            .map_err(BootstrapError::DebugMessengerCreation)
    }

    /// Destroy a messenger; a missing entry point makes this a no-op
    ///
    /// # Safety
    /// The messenger must come from `create_messenger` on this table and the
    /// instance must still be alive.
    pub unsafe fn destroy_messenger(&self, messenger: vk::DebugUtilsMessengerEXT) {
        match self.destroy {
            ExtensionFn::Loaded => self.loader.destroy_debug_utils_messenger(messenger, None),
            ExtensionFn::Missing => {
                log::warn!("vkDestroyDebugUtilsMessengerEXT not available, skipping");
            }
        }
    }
}

/// Severities and message types the messenger listens to. Also chained into
/// instance creation so the instance's own lifetime is covered.
pub fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
        )
        .pfn_user_callback(Some(debug_callback))
        .build()
}

fn log_level_for(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> log::Level {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::Level::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::Level::Warn
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        log::Level::Info
    } else {
        log::Level::Debug
    }
}

// Debug callback for validation layers. Never aborts the triggering call.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }

    let message = CStr::from_ptr((*p_callback_data).p_message);
    log::log!(
        target: VALIDATION_LOG_TARGET,
        log_level_for(message_severity),
        "validation layer [{:?}]: {}",
        message_type,
        message.to_string_lossy()
    );

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_info_listens_to_error_warning_verbose() {
        let info = messenger_create_info();
        assert_eq!(
            info.message_severity,
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        );
        assert!(!info
            .message_severity
            .contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO));
        assert_eq!(
            info.message_type,
            vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
        );
        assert!(info.pfn_user_callback.is_some());
        assert!(info.p_user_data.is_null());
    }

    #[test]
    fn severity_maps_to_log_level() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;
        assert_eq!(log_level_for(S::ERROR), log::Level::Error);
        assert_eq!(log_level_for(S::WARNING), log::Level::Warn);
        assert_eq!(log_level_for(S::VERBOSE), log::Level::Debug);
    }

    #[test]
    fn callback_always_continues() {
        let message = c"vkCreateDevice: test message";
        let data = vk::DebugUtilsMessengerCallbackDataEXT {
            p_message: message.as_ptr(),
            ..Default::default()
        };

        let verdict = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                std::ptr::null_mut(),
            )
        };
        assert_eq!(verdict, vk::FALSE);

        let verdict = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
                std::ptr::null(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(verdict, vk::FALSE);
    }
}
