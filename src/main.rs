// =============================================================================
// VULKAN BOOTSTRAP - Window + Vulkan context, nothing rendered yet
// =============================================================================
//
// Opens a fixed-size window and brings up the Vulkan context behind it
// (instance, validation, GPU selection, logical device and graphics queue),
// then polls events until the window is closed.
//
// LIFECYCLE:
// ┌─────────────────────────────────────────────────────────────────┐
// │  Event loop                                                     │
// │    └── Window (800x600, not resizable)                          │
// │          └── Instance (+ debug messenger when validating)       │
// │                └── Physical device (selected, not owned)        │
// │                      └── Logical device + graphics queue        │
// └─────────────────────────────────────────────────────────────────┘
//
// Teardown runs bottom-up: device, messenger, instance, window, event loop.
//
// =============================================================================

mod backend;
mod config;
mod error;

use anyhow::{Context, Result};
use backend::{ContextSettings, VulkanContext};
use config::Config;
use raw_window_handle::HasDisplayHandle;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes, WindowId},
};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    // Load configuration from config.toml
    let (config, config_error) = Config::load();

    // Initialize logging
    init_logging(&config);
    if let Some(e) = config_error {
        log::warn!("Failed to load config.toml: {:#}. Using defaults.", e);
    }
    log::info!("Starting Vulkan bootstrap");
    log::info!(
        "Window: {}x{} (fixed size)",
        config.window.width,
        config.window.height
    );

    let event_loop = EventLoop::new().context("Failed to initialize windowing")?;
    // Busy poll: never block waiting for events
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    // Errors raised inside the event loop surface here
    if let Some(e) = app.error.take() {
        return Err(e);
    }

    log::info!("Exited cleanly");
    Ok(())
}

/// Initialize logging. Validation layer output is never filtered out.
fn init_logging(config: &Config) {
    use env_logger::Builder;
    use log::LevelFilter;

    let mut builder = Builder::new();
    builder.filter_level(config.log_level());
    builder.parse_default_env();
    builder.filter_module(backend::debug::VALIDATION_LOG_TARGET, LevelFilter::Trace);
    builder.init();
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Owns the window and the Vulkan context.
///
/// The context is always released before the window; see `shutdown`.
struct App {
    config: Config,
    window: Option<Window>,
    context: Option<VulkanContext>,
    /// First initialization error, reported by `main`
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            window: None,
            context: None,
            error: None,
        }
    }

    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Create the window, then the Vulkan context for it.
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        // ─────────────────────────────────────────────────────────────────────
        // STEP 1: Window (fixed size, no resizing)
        // ─────────────────────────────────────────────────────────────────────
        let window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ))
            .with_resizable(false);

        let window = event_loop
            .create_window(window_attributes)
            .context("Failed to create window")?;

        let display = window
            .display_handle()
            .context("Failed to get display handle")?
            .as_raw();

        self.window = Some(window);

        // ─────────────────────────────────────────────────────────────────────
        // STEP 2: Vulkan context
        // ─────────────────────────────────────────────────────────────────────
        let enable_validation = self.config.validation_enabled();
        log::info!(
            "Validation layers: {}",
            if enable_validation { "enabled" } else { "disabled" }
        );

        let settings = ContextSettings {
            app_name: &self.config.window.title,
            surface_extensions: backend::surface::required_surface_extensions(display)?,
            enable_validation,
            selection: self.config.selection_policy(),
        };

        let context = VulkanContext::new(&settings).context("Failed to initialize Vulkan")?;
        log::info!(
            "Graphics queue ready on {}: {:?} (family {}, validation messenger: {})",
            context.device_name(),
            context.graphics_queue,
            context.selected.graphics_family,
            context.debug_messenger.is_some()
        );
        self.context = Some(context);

        Ok(())
    }

    // =========================================================================
    // CLEANUP
    // =========================================================================

    /// Release the Vulkan context, then the window. Safe to call twice.
    fn shutdown(&mut self) {
        if let Some(context) = self.context.take() {
            drop(context);
        }

        if self.window.take().is_some() {
            log::debug!("Releasing window");
        }
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.error.is_some() {
            return;
        }

        if let Err(e) = self.init(event_loop) {
            log::error!("{:#}", e);
            self.error = Some(e);
            // Release whatever was acquired before the failure
            self.shutdown();
            event_loop.exit();
        }
    }

    /// Only the close request matters; everything else is polled and dropped.
    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CloseRequested = event {
            log::info!("Close requested, shutting down...");
            event_loop.exit();
        }
    }

    /// Called once the loop stops; the event loop itself goes away after this.
    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        log::info!("Cleaning up...");
        self.shutdown();
        log::info!("Cleanup complete");
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}
