//! Webview page layer: markup bootstrap, progress widget, event bridge.
//!
//! The page contract is small. `#app` is replaced with a fixed fragment,
//! one `#progress-bar` element is created under `#progress`, and a single
//! standing subscription on the `"percent"` channel drives the bar width.
//! The `#input` span and `#log` textarea exist for an external writer and
//! are never written here.

pub mod bridge;
pub mod progress;
pub mod surface;

pub use bridge::{EventChannel, EventHandler, SubscriptionId, TauriChannel};
pub use progress::{ProgressSurface, ProgressWidget};
pub use surface::WebviewSurface;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tauri::webview::PageLoadEvent;
use tauri::{Manager, Webview};
use tracing::info;

/// Label of the single application window.
pub const MAIN_WEBVIEW_LABEL: &str = "main";

/// Decides whether a finished page load should run [`bootstrap`].
///
/// The percent subscription is registered on the app handle and outlives
/// the page, while `on_page_load` fires again on every reload. Only the
/// first finished load of the main webview may bootstrap; anything else
/// would stack a second subscription and widget onto the same events.
pub fn should_bootstrap(label: &str, event: PageLoadEvent, done: &AtomicBool) -> bool {
    matches!(event, PageLoadEvent::Finished)
        && label == MAIN_WEBVIEW_LABEL
        && !done.swap(true, Ordering::SeqCst)
}

/// One-time page bootstrap, run when the main webview finishes loading.
///
/// Installs the markup, mounts the progress widget and registers the
/// `"percent"` subscription. The widget lives inside the subscription
/// handler for the rest of the page lifetime; there is no teardown path.
pub async fn bootstrap(webview: Webview) {
    let handle = webview.app_handle().clone();
    let surface = WebviewSurface::new(webview);
    surface.install_markup();

    let widget = Arc::new(Mutex::new(ProgressWidget::mount(surface)));
    let channel = TauriChannel::new(handle);
    let subscription = bridge::attach(&channel, widget).await;
    info!("page ready, percent subscription {:?}", subscription);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_first_finished_main_load_bootstraps() {
        let done = AtomicBool::new(false);

        assert!(should_bootstrap(
            MAIN_WEBVIEW_LABEL,
            PageLoadEvent::Finished,
            &done
        ));
        // A reload fires another finished load on the same process
        assert!(!should_bootstrap(
            MAIN_WEBVIEW_LABEL,
            PageLoadEvent::Finished,
            &done
        ));
    }

    #[test]
    fn non_matching_loads_do_not_burn_the_flag() {
        let done = AtomicBool::new(false);

        assert!(!should_bootstrap(
            MAIN_WEBVIEW_LABEL,
            PageLoadEvent::Started,
            &done
        ));
        assert!(!should_bootstrap("settings", PageLoadEvent::Finished, &done));
        assert!(should_bootstrap(
            MAIN_WEBVIEW_LABEL,
            PageLoadEvent::Finished,
            &done
        ));
    }
}
