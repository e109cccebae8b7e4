// Platform windowing extensions
//
// No surface is created here; the instance only needs to know which
// surface extensions the window's display server requires.

use ash::extensions::{ext, khr};
use raw_window_handle::RawDisplayHandle;
use std::ffi::CStr;

use crate::error::{BootstrapError, BootstrapResult};

/// Instance extensions required to present to windows of this display
pub fn required_surface_extensions(
    display: RawDisplayHandle,
) -> BootstrapResult<Vec<&'static CStr>> {
    let platform = match display {
        RawDisplayHandle::Windows(_) => khr::Win32Surface::name(),
        RawDisplayHandle::Wayland(_) => khr::WaylandSurface::name(),
        RawDisplayHandle::Xlib(_) => khr::XlibSurface::name(),
        RawDisplayHandle::Xcb(_) => khr::XcbSurface::name(),
        RawDisplayHandle::Android(_) => khr::AndroidSurface::name(),
        RawDisplayHandle::AppKit(_) | RawDisplayHandle::UiKit(_) => ext::MetalSurface::name(),
        other => {
            return Err(BootstrapError::UnsupportedDisplay(format!("{:?}", other)));
        }
    };

    Ok(vec![khr::Surface::name(), platform])
}

#[cfg(test)]
mod tests {
    use super::*;
    use raw_window_handle::{WaylandDisplayHandle, WebDisplayHandle, WindowsDisplayHandle};
    use std::ptr::NonNull;

    #[test]
    fn windows_needs_win32_surface() {
        let display = RawDisplayHandle::Windows(WindowsDisplayHandle::new());
        let names = required_surface_extensions(display).unwrap();
        assert_eq!(names, vec![c"VK_KHR_surface", c"VK_KHR_win32_surface"]);
    }

    #[test]
    fn wayland_needs_wayland_surface() {
        let mut dummy = 0u8;
        let ptr = NonNull::from(&mut dummy).cast();
        let display = RawDisplayHandle::Wayland(WaylandDisplayHandle::new(ptr));
        let names = required_surface_extensions(display).unwrap();
        assert_eq!(names, vec![c"VK_KHR_surface", c"VK_KHR_wayland_surface"]);
    }

    #[test]
    fn web_is_not_supported() {
        let display = RawDisplayHandle::Web(WebDisplayHandle::new());
        assert!(matches!(
            required_surface_extensions(display),
            Err(BootstrapError::UnsupportedDisplay(_))
        ));
    }
}
