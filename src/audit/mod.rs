// Audit reporting: where detections are announced.
//
// AuditSink is the seam; WebhookAuditSink posts Discord embeds and
// LogAuditSink writes to the tracing log. Delivery failures are the
// caller's to log; they never change a decision.

pub mod log;
pub mod traits;
pub mod webhook;

pub use self::log::LogAuditSink;
pub use traits::{ActionTaken, AuditSink, DetectionReport};
pub use webhook::WebhookAuditSink;
