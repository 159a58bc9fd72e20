use tracing::warn;

/// Blocking, user-visible notices raised by the store.
pub trait Notifier: Send + Sync {
    fn alert(&self, title: &str, message: &str);
}

/// Prints alerts to stderr for terminal front ends.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn alert(&self, title: &str, message: &str) {
        eprintln!("{}: {}", title, message);
    }
}

/// Sends alerts to the log only; for headless embedding.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert(&self, title: &str, message: &str) {
        warn!(title, "{}", message);
    }
}
