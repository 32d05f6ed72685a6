pub mod notifier;
pub mod observer;
pub mod snapshot;

pub use notifier::CompletionNotifier;
pub use observer::RunObserver;
pub use snapshot::{format_bytes, RunSnapshot};
