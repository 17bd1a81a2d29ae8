//! Real page rendering: script evaluation inside the Tauri webview.
//!
//! All DOM work is phrased as small scripts. The script builders are plain
//! functions over values, kept apart from evaluation so tests can assert on
//! the exact text without a webview.

use tauri::Webview;
use tracing::warn;

use crate::ui::progress::ProgressSurface;

/// Id of the application root the markup fragment replaces.
pub const APP_ROOT_ID: &str = "app";
/// Id of the progress container inside the fragment.
pub const PROGRESS_CONTAINER_ID: &str = "progress";
/// Id of the bar element the widget creates.
pub const PROGRESS_BAR_ID: &str = "progress-bar";

/// Fixed fragment written into the application root at bootstrap.
/// `#input` and `#log` are reserved for an external writer and stay empty.
const APP_MARKUP: &str = r#"<div>
    <span id="input"></span>
    <div id="progress"></div>
    <label>Log:</label>
    <textarea id="log" rows="5" readonly></textarea>
  </div>"#;

fn install_markup_script() -> String {
    format!(
        "document.querySelector('#{APP_ROOT_ID}').innerHTML = {};",
        serde_json::Value::from(APP_MARKUP)
    )
}

fn mount_bar_script() -> String {
    format!(
        "(() => {{ const bar = document.createElement('div'); bar.id = '{PROGRESS_BAR_ID}'; \
         document.querySelector('#{PROGRESS_CONTAINER_ID}').appendChild(bar); }})();"
    )
}

fn bar_width_script(percent: f64) -> String {
    format!("document.getElementById('{PROGRESS_BAR_ID}').style.width = '{percent}%';")
}

/// Renders through the real webview. Evaluation failures are logged and
/// swallowed; the page path has no error surface of its own.
pub struct WebviewSurface {
    webview: Webview,
}

impl WebviewSurface {
    pub fn new(webview: Webview) -> Self {
        Self { webview }
    }

    /// Replaces the application root content with the fixed fragment.
    pub fn install_markup(&self) {
        self.eval(&install_markup_script());
    }

    fn eval(&self, script: &str) {
        if let Err(e) = self.webview.eval(script) {
            warn!("webview eval failed: {e}");
        }
    }
}

impl ProgressSurface for WebviewSurface {
    fn mount_bar(&self) {
        self.eval(&mount_bar_script());
    }

    fn set_bar_width(&self, percent: f64) {
        self.eval(&bar_width_script(percent));
    }
}
