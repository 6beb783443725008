pub mod registry;
pub mod dispatch;
pub mod scanner;
pub mod scheduler;

pub use registry::{ReminderRegistry, MAX_LEAD_MINUTES};
pub use dispatch::ReminderDispatcher;
pub use scanner::{reminder_due, sent_marker_key, ReminderScanner, SENT_MARKER_TTL_SECONDS};
pub use scheduler::ReminderScheduler;
