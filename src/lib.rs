//! unpakr - desktop companion around 7-Zip extraction jobs
//!
//! The Rust side owns everything: it runs the archiver, relays its progress
//! over the `"percent"` event channel and drives the webview page that
//! renders the bar. One instance serves all jobs; later invocations forward
//! their arguments over a local socket and exit.

pub mod events;
pub mod infrastructure;
pub mod ui;

use anyhow::anyhow;
use tauri::Manager;
use tauri_plugin_cli::CliExt;
use tracing::{error, info, warn};

use crate::infrastructure::config::{AppConfig, ConfigManager};
use crate::infrastructure::extractor::{self, ExtractionRequest};
use crate::infrastructure::{ipc, logging};

type SetupResult = Result<(), Box<dyn std::error::Error>>;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let config = load_or_default_config();
    if let Err(e) = logging::init(&config.logging) {
        eprintln!("failed to initialize logging: {e}");
    }

    let bootstrapped = std::sync::atomic::AtomicBool::new(false);
    tauri::Builder::default()
        .plugin(tauri_plugin_cli::init())
        .plugin(tauri_plugin_dialog::init())
        .manage(config)
        .on_page_load(move |webview, payload| {
            if ui::should_bootstrap(webview.label(), payload.event(), &bootstrapped) {
                let webview = webview.clone();
                tauri::async_runtime::spawn(async move {
                    ui::bootstrap(webview).await;
                });
            }
        })
        .setup(|app| {
            let request = cli_request(app);
            match request {
                Some(request) => match ipc::forward_to_primary(&request) {
                    Ok(()) => {
                        info!("forwarded job to the running instance");
                        notify_and_close(app.handle().clone());
                        Ok(())
                    }
                    // Nobody serves the socket, so this process is first.
                    Err(_) => start_primary(app, Some(request)),
                },
                None => {
                    if ipc::primary_exists() {
                        Err(anyhow!(
                            "another instance is already running and no job was given"
                        )
                        .into())
                    } else {
                        start_primary(app, None)
                    }
                }
            }
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

/// Configuration comes up before logging, so failures here can only go to
/// stderr. Every failure path falls back to defaults.
fn load_or_default_config() -> AppConfig {
    let loaded = ConfigManager::new().map(|manager| {
        tauri::async_runtime::block_on(async move { manager.initialize_on_first_run().await })
    });
    match loaded {
        Ok(Ok(config)) => config,
        Ok(Err(e)) | Err(e) => {
            eprintln!("falling back to default configuration: {e}");
            AppConfig::default()
        }
    }
}

/// Job described by this invocation's command line, if any.
fn cli_request(app: &tauri::App) -> Option<ExtractionRequest> {
    let matches = match app.cli().matches() {
        Ok(matches) => matches,
        Err(e) => {
            warn!("could not read CLI arguments: {e}");
            return None;
        }
    };
    ExtractionRequest::from_cli_values(
        matches.args.get("input").map(|arg| &arg.value),
        matches.args.get("output").map(|arg| &arg.value),
        matches.args.get("filter").map(|arg| &arg.value),
    )
}

/// Becomes the primary instance: shows the window, serves the instance
/// socket and starts the job given on this command line, if any.
fn start_primary(app: &tauri::App, request: Option<ExtractionRequest>) -> SetupResult {
    if let Some(window) = app.get_webview_window(ui::MAIN_WEBVIEW_LABEL) {
        window.show()?;
    }

    let handle = app.handle().clone();
    tauri::async_runtime::spawn(async move {
        ipc::serve(handle).await;
    });

    if let Some(request) = request {
        extractor::spawn_job(app.handle().clone(), request);
    }
    Ok(())
}

/// Tells the user the job went to the running instance, then closes this
/// process's window so it exits.
fn notify_and_close(handle: tauri::AppHandle) {
    tauri::async_runtime::spawn(async move {
        let notice = "passed the job to the running unpakr instance";
        info!("{notice}");
        #[cfg(not(debug_assertions))]
        {
            use tauri_plugin_dialog::DialogExt;
            handle.dialog().message(notice).title("unpakr").blocking_show();
        }
        if let Some(window) = handle.get_webview_window(ui::MAIN_WEBVIEW_LABEL) {
            if let Err(e) = window.close() {
                error!("failed to close forwarding window: {e}");
            }
        }
    });
}
