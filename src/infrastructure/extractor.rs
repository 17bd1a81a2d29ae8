//! 7-Zip extraction jobs and their progress feed.
//!
//! Jobs spawn the configured binary with `-bsp1` so the progress indicator
//! lands on stdout. 7-Zip redraws that indicator in place, so stdout is
//! consumed in `\r`-delimited chunks; every `NN%` sighting is forwarded
//! verbatim on the `"percent"` channel as a text payload.

use std::borrow::Cow;
use std::process::Stdio;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tauri::{AppHandle, Emitter, Manager};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::events::PERCENT_EVENT;
use crate::infrastructure::config::AppConfig;

static PERCENT_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)%").unwrap());

/// One extraction job: archive, destination, optional member filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub input: String,
    pub output: String,
    pub filter: String,
}

impl ExtractionRequest {
    /// Builds a job from CLI argument values. `None` unless both `input`
    /// and `output` are present as text; `filter` defaults to empty.
    pub fn from_cli_values(
        input: Option<&Value>,
        output: Option<&Value>,
        filter: Option<&Value>,
    ) -> Option<Self> {
        let input = input.and_then(Value::as_str)?;
        let output = output.and_then(Value::as_str)?;
        let filter = filter.and_then(Value::as_str).unwrap_or_default();
        Some(Self {
            input: input.to_owned(),
            output: output.to_owned(),
            filter: filter.to_owned(),
        })
    }
}

/// Failures around the child process. Progress parsing itself has no
/// failure mode; a line without a percent indicator is simply not progress.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to spawn archiver '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("archiver stdout was not captured")]
    MissingStdout,
    #[error("failed to read archiver output: {0}")]
    Read(#[from] std::io::Error),
}

/// Detached job runner for fire-and-forget call sites.
pub fn spawn_job(app: AppHandle, request: ExtractionRequest) {
    tauri::async_runtime::spawn(async move {
        if let Err(e) = run(&app, &request).await {
            error!("extraction failed: {e}");
        }
    });
}

/// Runs one job to completion, emitting a `"percent"` event for every
/// progress line the child prints.
pub async fn run(app: &AppHandle, request: &ExtractionRequest) -> Result<(), ExtractError> {
    let binary = app.state::<AppConfig>().archiver.binary.clone();
    info!(
        "extracting {:?} -> {:?} (filter {:?})",
        request.input, request.output, request.filter
    );

    let mut command = Command::new(&binary);
    command
        .arg("x")
        .arg(&request.input)
        .arg(format!("-o{}", request.output))
        .arg("-aou") // auto rename colliding files
        .arg("-bsp1") // progress indicator on stdout
        .stdout(Stdio::piped());
    if !request.filter.is_empty() {
        command.arg(&request.filter);
    }

    let mut child = command.spawn().map_err(|source| ExtractError::Spawn {
        binary: binary.clone(),
        source,
    })?;
    let stdout = child.stdout.take().ok_or(ExtractError::MissingStdout)?;

    let mut reader = BufReader::new(stdout);
    let mut buf: Vec<u8> = Vec::new();
    loop {
        buf.clear();
        let num_bytes = reader.read_until(b'\r', &mut buf).await?;
        if num_bytes == 0 {
            break;
        }
        let chunk = decode_console(&buf);
        let line = chunk.trim_start_matches('\n').trim_end_matches('\r');
        if let Some(percent) = percent_of_line(line) {
            emit_percent(app, percent);
        }
        // TODO: "Everything is Ok" should lead to a final 100% emission
        debug!("7z: {line}");
    }

    match child.wait().await {
        Ok(status) if status.success() => info!("extraction finished"),
        Ok(status) => warn!("archiver exited with {status}"),
        Err(e) => warn!("failed to collect archiver exit status: {e}"),
    }
    Ok(())
}

/// Extracts the percent digits from a progress chunk, if present.
pub fn percent_of_line(line: &str) -> Option<&str> {
    PERCENT_LINE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Text payload on purpose: the page bridge only accepts textual values.
fn emit_percent(app: &AppHandle, percent: &str) {
    match app.emit(PERCENT_EVENT, percent) {
        Ok(()) => debug!("progress {percent}%"),
        Err(e) => warn!("failed to emit progress event: {e}"),
    }
}

/// 7-Zip writes console output in the OEM code page on Windows.
#[cfg(windows)]
fn decode_console(buf: &[u8]) -> Cow<'_, str> {
    use encoding_rs::Encoding;

    static CONSOLE_ENCODING: Lazy<&'static Encoding> = Lazy::new(|| {
        #[allow(unsafe_code)]
        let oem_code_page = unsafe { windows::Win32::Globalization::GetOEMCP() };
        u16::try_from(oem_code_page)
            .ok()
            .and_then(codepage::to_encoding)
            .unwrap_or(encoding_rs::UTF_8)
    });

    let (decoded, _, _) = CONSOLE_ENCODING.decode(buf);
    decoded
}

#[cfg(not(windows))]
fn decode_console(buf: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("  5% extracting data.bin", Some("5"))]
    #[case(" 23%", Some("23"))]
    #[case("100% 1234 - archive.7z", Some("100"))]
    #[case("0%", Some("0"))]
    #[case("Everything is Ok", None)]
    #[case("7-Zip 23.01 (x64)", None)]
    #[case("% stray", None)]
    #[case("", None)]
    fn percent_lines(#[case] line: &str, #[case] expected: Option<&str>) {
        assert_eq!(percent_of_line(line), expected);
    }

    #[test]
    fn cli_values_build_a_request() {
        let request = ExtractionRequest::from_cli_values(
            Some(&json!("in.7z")),
            Some(&json!("out")),
            Some(&json!("*.txt")),
        )
        .unwrap();
        assert_eq!(
            request,
            ExtractionRequest {
                input: "in.7z".to_owned(),
                output: "out".to_owned(),
                filter: "*.txt".to_owned(),
            }
        );
    }

    #[test]
    fn cli_filter_defaults_to_empty() {
        let request =
            ExtractionRequest::from_cli_values(Some(&json!("in.7z")), Some(&json!("out")), None)
                .unwrap();
        assert_eq!(request.filter, "");
    }

    #[test]
    fn cli_request_requires_textual_input_and_output() {
        assert!(ExtractionRequest::from_cli_values(None, Some(&json!("out")), None).is_none());
        assert!(ExtractionRequest::from_cli_values(Some(&json!("in.7z")), None, None).is_none());
        assert!(
            ExtractionRequest::from_cli_values(Some(&json!(true)), Some(&json!("out")), None)
                .is_none()
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn console_chunks_decode_lossily() {
        assert_eq!(decode_console(b"ok 42%"), "ok 42%");
        assert_eq!(decode_console(&[0x66, 0xFF, 0x6F]), "f\u{FFFD}o");
    }
}
