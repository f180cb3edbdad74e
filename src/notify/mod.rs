pub mod notifier;

pub use notifier::{DesktopNotifier, Notifier, NotifyError, phase_message, subscriber};
