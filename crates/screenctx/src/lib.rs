//! Best-effort screen context for completion prompts.
//!
//! Gathers the active window title and an OCR pass over the current screen
//! by shelling out to common desktop tools (`xdotool`, `scrot`,
//! `tesseract`). Everything here is strictly best-effort: a missing tool or
//! a failed capture degrades to empty strings, never an error — completion
//! requests must proceed with whatever context is available.
#![warn(missing_docs)]

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Context snapshot handed to the completion prompt builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenContext {
    /// Title of the window currently receiving keystrokes; empty if unknown.
    pub window_title: String,
    /// Text extracted from a screenshot of the full screen; empty if OCR is
    /// unavailable.
    pub ocr_text: String,
}

/// Source of [`ScreenContext`] snapshots. Infallible by contract; partial
/// failure is represented as empty fields.
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Capture the current context.
    async fn get_context(&self) -> ScreenContext;
}

/// X11 desktop implementation shelling out to external tools.
#[derive(Default)]
pub struct DesktopContext;

impl DesktopContext {
    /// Create a desktop context source.
    pub fn new() -> Self {
        Self
    }

    async fn window_title() -> String {
        let out = Command::new("xdotool")
            .args(["getactivewindow", "getwindowname"])
            .output()
            .await;
        match out {
            Ok(o) if o.status.success() => String::from_utf8_lossy(&o.stdout).trim().to_string(),
            Ok(o) => {
                debug!(status = %o.status, "window_title_lookup_failed");
                String::new()
            }
            Err(e) => {
                debug!(error = %e, "xdotool_unavailable");
                String::new()
            }
        }
    }

    async fn ocr_text() -> String {
        let shot = std::env::temp_dir().join(format!("ghosttype-{}.png", std::process::id()));
        let text = Self::capture_and_ocr(&shot).await;
        // The screenshot contains whatever was on screen; don't leave it
        // around.
        let _ = tokio::fs::remove_file(&shot).await;
        text
    }

    async fn capture_and_ocr(shot: &Path) -> String {
        let grab = Command::new("scrot")
            .arg("--overwrite")
            .arg(shot)
            .output()
            .await;
        match grab {
            Ok(o) if o.status.success() => {}
            Ok(o) => {
                debug!(status = %o.status, "screenshot_failed");
                return String::new();
            }
            Err(e) => {
                debug!(error = %e, "scrot_unavailable");
                return String::new();
            }
        }

        let ocr = Command::new("tesseract")
            .arg(shot)
            .arg("stdout")
            .output()
            .await;
        match ocr {
            Ok(o) if o.status.success() => String::from_utf8_lossy(&o.stdout).into_owned(),
            Ok(o) => {
                debug!(status = %o.status, "ocr_failed");
                String::new()
            }
            Err(e) => {
                debug!(error = %e, "tesseract_unavailable");
                String::new()
            }
        }
    }
}

#[async_trait]
impl ContextSource for DesktopContext {
    async fn get_context(&self) -> ScreenContext {
        // Title and OCR fail independently; one missing does not abort the
        // other.
        let (window_title, ocr_text) = tokio::join!(Self::window_title(), Self::ocr_text());
        ScreenContext {
            window_title,
            ocr_text,
        }
    }
}

/// Fixed context source for tests.
pub struct StaticContext(pub ScreenContext);

#[async_trait]
impl ContextSource for StaticContext {
    async fn get_context(&self) -> ScreenContext {
        self.0.clone()
    }
}
