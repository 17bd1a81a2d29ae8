//! Event channel names shared between the extraction host and the page bridge.

/// Progress channel. Payloads are the bare percent digits as text; the page
/// bridge drops anything that is not a string.
pub const PERCENT_EVENT: &str = "percent";
