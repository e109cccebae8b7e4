// Vulkan instance - API context and diagnostics
//
// Responsibilities:
// - Validation layer support check
// - Required extension list (surface + portability + debug utils)
// - Instance creation with the debug messenger chained in

use ash::extensions::ext::DebugUtils;
use ash::{vk, Entry};
use std::ffi::{CStr, CString};

use super::debug;
use crate::error::{BootstrapError, BootstrapResult};

/// Layers requested when diagnostics are enabled
pub const VALIDATION_LAYERS: &[&CStr] = &[c"VK_LAYER_KHRONOS_validation"];

/// Portability extensions (MoltenVK and other non-conformant drivers)
pub const PORTABILITY_EXTENSIONS: &[&CStr] = &[
    c"VK_KHR_portability_enumeration",
    c"VK_KHR_get_physical_device_properties2",
];

/// Names of a fixed-size Vulkan string array, lossily decoded
fn c_name(raw: &[std::ffi::c_char]) -> String {
    unsafe { CStr::from_ptr(raw.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

pub fn layer_names(layers: &[vk::LayerProperties]) -> Vec<String> {
    layers.iter().map(|layer| c_name(&layer.layer_name)).collect()
}

pub fn extension_names(extensions: &[vk::ExtensionProperties]) -> Vec<String> {
    extensions
        .iter()
        .map(|extension| c_name(&extension.extension_name))
        .collect()
}

/// Requested layers that are not among the available ones.
/// An empty result means every requested layer is supported.
pub fn missing_layers<'a>(requested: &[&'a CStr], available: &[String]) -> Vec<&'a CStr> {
    requested
        .iter()
        .copied()
        .filter(|wanted| {
            !available
                .iter()
                .any(|name| name.as_bytes() == wanted.to_bytes())
        })
        .collect()
}

/// Enumerate the instance layers, log them and check the requested ones
pub fn check_validation_layer_support(entry: &Entry, requested: &[&CStr]) -> BootstrapResult<()> {
    let layers = entry
        .enumerate_instance_layer_properties()
        .map_err(BootstrapError::Enumeration)?;
    let available = layer_names(&layers);

    log::info!("Supported layers:");
    for name in &available {
        log::info!("\t{}", name);
    }

    let missing = missing_layers(requested, &available);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(BootstrapError::ValidationLayersUnsupported {
            missing: missing
                .iter()
                .map(|name| name.to_string_lossy().into_owned())
                .collect(),
        })
    }
}

/// Diagnostic listing of every instance extension; never gates creation
pub fn log_supported_extensions(entry: &Entry) {
    match entry.enumerate_instance_extension_properties(None) {
        Ok(extensions) => {
            log::info!("Supported extensions:");
            for name in extension_names(&extensions) {
                log::info!("\t{}", name);
            }
        }
        Err(e) => log::warn!("Failed to enumerate instance extensions: {}", e),
    }
}

/// Surface extensions first, then portability, then debug utils last
pub fn required_extensions(
    surface_extensions: &[&'static CStr],
    enable_validation: bool,
) -> Vec<&'static CStr> {
    let mut extensions: Vec<&'static CStr> = surface_extensions.to_vec();
    extensions.extend_from_slice(PORTABILITY_EXTENSIONS);

    if enable_validation {
        extensions.push(DebugUtils::name());
    }

    extensions
}

/// Create the instance. With validation on, a messenger create-info is
/// chained in so messages from vkCreateInstance itself are reported.
pub fn create_instance(
    entry: &Entry,
    app_name: &str,
    surface_extensions: &[&'static CStr],
    enable_validation: bool,
) -> BootstrapResult<ash::Instance> {
    if enable_validation {
        check_validation_layer_support(entry, VALIDATION_LAYERS)?;
    }

    // Interior NULs would truncate the name; drop them instead
    let app_name_cstr = CString::new(app_name.replace('\0', "")).unwrap_or_default();
    let engine_name = c"No Engine";

    let app_info = vk::ApplicationInfo::builder()
        .application_name(&app_name_cstr)
        .application_version(vk::make_api_version(0, 1, 0, 0))
        .engine_name(engine_name)
        .engine_version(vk::make_api_version(0, 1, 0, 0))
        .api_version(vk::API_VERSION_1_0);

    log_supported_extensions(entry);

    let extensions = required_extensions(surface_extensions, enable_validation);
    log::debug!("Enabling instance extensions: {:?}", extensions);
    let extension_ptrs: Vec<_> = extensions.iter().map(|name| name.as_ptr()).collect();

    let layer_ptrs: Vec<_> = if enable_validation {
        VALIDATION_LAYERS.iter().map(|name| name.as_ptr()).collect()
    } else {
        Vec::new()
    };

    let mut debug_info = debug::messenger_create_info();

    let mut create_info = vk::InstanceCreateInfo::builder()
        .application_info(&app_info)
        .flags(vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR)
        .enabled_extension_names(&extension_ptrs)
        .enabled_layer_names(&layer_ptrs);

    if enable_validation {
        create_info = create_info.push_next(&mut debug_info);
    }

    unsafe { entry.create_instance(&create_info, None) }.map_err(BootstrapError::InstanceCreation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn requested_layer_found_among_available() {
        let available = names(&["A", "X", "B"]);
        assert!(missing_layers(&[c"X"], &available).is_empty());
    }

    #[test]
    fn requested_layer_absent() {
        let available = names(&["A", "B"]);
        assert_eq!(missing_layers(&[c"X"], &available), vec![c"X"]);
    }

    #[test]
    fn every_requested_layer_must_be_present() {
        let available = names(&["A", "X", "B"]);
        assert_eq!(missing_layers(&[c"X", c"Y"], &available), vec![c"Y"]);
        assert!(missing_layers(&[c"A", c"B"], &available).is_empty());
    }

    #[test]
    fn layer_match_is_exact() {
        let available = names(&["VK_LAYER_KHRONOS_validation_extra"]);
        assert_eq!(missing_layers(VALIDATION_LAYERS, &available).len(), 1);
    }

    #[test]
    fn layer_names_decode_fixed_arrays() {
        let mut layer = vk::LayerProperties::default();
        for (dst, src) in layer.layer_name.iter_mut().zip(b"VK_LAYER_KHRONOS_validation") {
            *dst = *src as std::ffi::c_char;
        }
        assert_eq!(layer_names(&[layer]), names(&["VK_LAYER_KHRONOS_validation"]));
    }

    #[test]
    fn extensions_without_validation() {
        let surface = [c"VK_KHR_surface", c"VK_KHR_xcb_surface"];
        let extensions = required_extensions(&surface, false);

        assert_eq!(
            extensions,
            vec![
                c"VK_KHR_surface",
                c"VK_KHR_xcb_surface",
                c"VK_KHR_portability_enumeration",
                c"VK_KHR_get_physical_device_properties2",
            ]
        );
        assert!(!extensions.contains(&c"VK_EXT_debug_utils"));
    }

    #[test]
    fn extensions_with_validation_append_debug_utils_last() {
        let surface = [c"VK_KHR_surface", c"VK_KHR_xcb_surface"];
        let extensions = required_extensions(&surface, true);

        assert_eq!(extensions.len(), 5);
        assert_eq!(extensions.last(), Some(&c"VK_EXT_debug_utils"));
        assert_eq!(&extensions[..4], &required_extensions(&surface, false)[..]);
    }
}
