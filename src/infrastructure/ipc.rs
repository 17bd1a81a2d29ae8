//! Single-instance plumbing over a namespaced local socket.
//!
//! The first process to bind the socket is the primary instance and serves
//! it for the whole application lifetime. Every later process forwards its
//! job as one `input\0output\0filter\n` line and exits. Jobs received over
//! the socket run strictly one after another.

use std::io::Write;
use std::time::Duration;

use interprocess::local_socket::{
    GenericNamespaced, ListenerOptions, Name, Stream, prelude::*, tokio::prelude::*,
};
use tauri::AppHandle;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::infrastructure::extractor::{self, ExtractionRequest};

/// Namespaced socket id shared by all instances.
const SOCKET_NAME: &str = "dev.unpakr.ipc";

fn socket_name() -> std::io::Result<Name<'static>> {
    SOCKET_NAME.to_ns_name::<GenericNamespaced>()
}

/// True when a primary instance already serves the socket.
pub fn primary_exists() -> bool {
    socket_name().and_then(Stream::connect).is_ok()
}

/// Hands one job to the running primary instance. Fails when there is no
/// primary, which makes the caller the primary.
pub fn forward_to_primary(request: &ExtractionRequest) -> std::io::Result<()> {
    let mut conn = Stream::connect(socket_name()?)?;
    conn.write_all(encode_request(request).as_bytes())
}

/// One `\0`-joined line per job.
pub fn encode_request(request: &ExtractionRequest) -> String {
    format!(
        "{}\0{}\0{}\n",
        request.input, request.output, request.filter
    )
}

/// Inverse of [`encode_request`]; `None` for anything but three fields.
pub fn decode_request(line: &str) -> Option<ExtractionRequest> {
    let parts: Vec<&str> = line
        .strip_suffix('\n')
        .unwrap_or(line)
        .split('\0')
        .collect();
    if parts.len() != 3 {
        return None;
    }
    Some(ExtractionRequest {
        input: parts[0].to_owned(),
        output: parts[1].to_owned(),
        filter: parts[2].to_owned(),
    })
}

/// Accept loop of the primary instance. Runs until the application exits.
pub async fn serve(app: AppHandle) {
    let listener =
        match socket_name().and_then(|name| ListenerOptions::new().name(name).create_tokio()) {
            Ok(listener) => listener,
            Err(e) => {
                error!("could not bind instance socket {SOCKET_NAME}: {e}");
                return;
            }
        };
    info!("serving forwarded jobs on {SOCKET_NAME}");

    loop {
        let stream = match listener.accept().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("instance socket accept failed: {e}");
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let mut reader = BufReader::new(stream);
        let mut buffer = String::with_capacity(512);
        match reader.read_line(&mut buffer).await {
            Ok(0) => debug!("forwarding connection closed without a job"),
            Ok(_) => match decode_request(&buffer) {
                Some(request) => {
                    info!("received forwarded job: {:?}", request);
                    if let Err(e) = extractor::run(&app, &request).await {
                        error!("extraction failed: {e}");
                    }
                }
                None => warn!("dropping malformed job line ({} bytes)", buffer.len()),
            },
            Err(e) => warn!("failed to read forwarded job: {e}"),
        }
    }
}
