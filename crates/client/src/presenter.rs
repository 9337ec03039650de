//! UI feedback seam: loading indicator, notices and navigation.

/// Host UI facility. Calls are fire-and-forget.
pub trait Presenter: Send + Sync {
    fn show_loading(&self, text: &str);

    fn hide_loading(&self);

    /// Short user-visible notice.
    fn toast(&self, message: &str);

    fn navigate_to(&self, path: &str);
}

/// Presenter for headless runs; everything goes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn show_loading(&self, text: &str) {
        tracing::info!(text, "loading shown");
    }

    fn hide_loading(&self) {
        tracing::info!("loading hidden");
    }

    fn toast(&self, message: &str) {
        tracing::warn!(message, "notice");
    }

    fn navigate_to(&self, path: &str) {
        tracing::info!(path, "navigate");
    }
}
