//! Inbound event plumbing for the page.
//!
//! The page consumes exactly one channel, `"percent"`. Registration goes
//! through [`EventChannel`] so tests can drive the page from an in-process
//! fake; the production channel wraps the Tauri event system.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tauri::{AppHandle, Listener};

use crate::events::PERCENT_EVENT;
use crate::ui::progress::{ProgressSurface, ProgressWidget};

/// Callback invoked once per inbound event with the deserialized payload.
pub type EventHandler = Box<dyn Fn(Value) + Send + 'static>;

/// Identifier of a standing subscription. There is no unsubscribe path;
/// registrations live until the page is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(pub u32);

/// Subscription capability of the surrounding event transport.
#[async_trait]
pub trait EventChannel {
    /// Registers `handler` for `channel`; resolves once the registration
    /// is in place.
    async fn subscribe(&self, channel: &str, handler: EventHandler) -> SubscriptionId;
}

/// Production channel: the Tauri application event system.
pub struct TauriChannel {
    handle: AppHandle,
}

impl TauriChannel {
    pub fn new(handle: AppHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl EventChannel for TauriChannel {
    async fn subscribe(&self, channel: &str, handler: EventHandler) -> SubscriptionId {
        let id = self.handle.listen(channel, move |event| {
            // Emitted payloads always arrive as JSON text. Anything that
            // does not deserialize carries no value the handler could see.
            if let Ok(value) = serde_json::from_str::<Value>(event.payload()) {
                handler(value);
            }
        });
        SubscriptionId(id)
    }
}

/// Wires a mounted widget to the `"percent"` channel.
///
/// Textual payloads are parsed with [`parse_int`] and forwarded to the
/// widget; every other payload shape is dropped. The parse result is not
/// validated, so text without digits forwards NaN.
pub async fn attach<C, S>(channel: &C, widget: Arc<Mutex<ProgressWidget<S>>>) -> SubscriptionId
where
    C: EventChannel,
    S: ProgressSurface + Send + 'static,
{
    channel
        .subscribe(
            PERCENT_EVENT,
            Box::new(move |payload| {
                if let Value::String(text) = payload {
                    if let Ok(mut widget) = widget.lock() {
                        widget.set_progress(parse_int(&text));
                    }
                }
            }),
        )
        .await
}

/// Lenient base-10 integer parse: leading whitespace and an optional sign
/// are skipped, `0x`/`0X` switches to base 16, the longest run of leading
/// digits wins and trailing text is ignored. Input without any digit
/// parses to NaN.
pub fn parse_int(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (radix, digits) = match rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        Some(hex) => (16u32, hex),
        None => (10u32, rest),
    };

    let mut value = 0.0_f64;
    let mut seen_digit = false;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(digit) => {
                value = value * f64::from(radix) + f64::from(digit);
                seen_digit = true;
            }
            None => break,
        }
    }
    if !seen_digit {
        return f64::NAN;
    }
    if negative { -value } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("42", 42.0)]
    #[case(" 42", 42.0)]
    #[case("42abc", 42.0)]
    #[case("-5", -5.0)]
    #[case("+8", 8.0)]
    #[case("150", 150.0)]
    #[case("08", 8.0)]
    #[case("12.9", 12.0)]
    #[case("0x10", 16.0)]
    #[case("0X1f", 31.0)]
    #[case("-0x10", -16.0)]
    fn reads_leading_digits(#[case] text: &str, #[case] expected: f64) {
        assert_eq!(parse_int(text), expected);
    }

    #[rstest]
    #[case("abc")]
    #[case("")]
    #[case("   ")]
    #[case("+")]
    #[case("0x")]
    #[case("%42")]
    fn no_digits_parse_to_nan(#[case] text: &str) {
        assert!(parse_int(text).is_nan());
    }

    proptest! {
        #[test]
        fn parse_never_panics(text in ".*") {
            let _ = parse_int(&text);
        }

        #[test]
        fn agrees_with_standard_parse_on_plain_digits(value in 0u32..=1_000_000u32) {
            prop_assert_eq!(parse_int(&value.to_string()), f64::from(value));
        }
    }
}
