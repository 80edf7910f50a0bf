//! Platform capabilities the controller drives but does not implement

/// Screen dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

impl ScreenSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Display, haptics and screen metrics provided by the host
///
/// Display calls are fire-and-forget: the controller never waits on them
/// and never inspects a result.
pub trait Platform {
    /// Make the device look switched off
    fn hide_display(&mut self, brightness: f32, hide_status_bar: bool);

    /// Bring the normal UI back
    fn restore_display(&mut self);

    /// Play a vibration pattern (alternating wait/vibrate, milliseconds)
    fn vibrate(&mut self, pattern_ms: &[u64]);

    fn screen_size(&self) -> ScreenSize;
}

/// Host without a real display that reports every call through the logger
#[derive(Debug, Clone)]
pub struct LogPlatform {
    screen: ScreenSize,
}

impl LogPlatform {
    pub fn new(screen: ScreenSize) -> Self {
        Self { screen }
    }
}

impl Default for LogPlatform {
    fn default() -> Self {
        Self::new(ScreenSize::new(1080.0, 2340.0))
    }
}

impl Platform for LogPlatform {
    fn hide_display(&mut self, brightness: f32, hide_status_bar: bool) {
        log::info!(
            "DISPLAY HIDDEN (brightness {:.2}, status bar {})",
            brightness,
            if hide_status_bar { "hidden" } else { "visible" }
        );
    }

    fn restore_display(&mut self) {
        log::info!("DISPLAY RESTORED");
    }

    fn vibrate(&mut self, pattern_ms: &[u64]) {
        log::info!("Vibrate {:?}", pattern_ms);
    }

    fn screen_size(&self) -> ScreenSize {
        self.screen
    }
}
