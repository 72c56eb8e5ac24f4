//! Notifier adapters.
//!
//! - `HttpRelayNotifier` - POSTs each message to the front-end's relay endpoint
//! - `LogNotifier` - writes messages to the log (no relay configured)
//! - `RecordingNotifier` - keeps messages in memory for assertions

mod http_relay;
mod log_notifier;
mod recording;

pub use http_relay::{HttpRelayNotifier, RelayMessage};
pub use log_notifier::LogNotifier;
pub use recording::RecordingNotifier;
