/// Transient notification module - Gateway

mod timer;

pub use timer::{NoticeKind, NoticePhase, NotificationTimer, TransientNotification};
