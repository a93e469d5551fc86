//! Service layer: the request lifecycle, technician verification and the
//! clients for Redis, the AI API and the email API.

pub mod ai_client;
pub mod cache;
pub mod lifecycle;
pub mod mailer;
pub mod notifications;
pub mod verification;

pub use ai_client::AiClient;
pub use cache::RedisCache;
pub use lifecycle::ServiceRequestManager;
pub use mailer::{EmailClient, LogOnlySender, NotificationSender};
pub use verification::TechnicianVerifier;
