//! Integration with Clerk, the identity provider: session token
//! verification and signed webhook deliveries.
mod event;
mod session;
mod signature;

pub use event::{EventError, WebhookEvent};
pub use session::{SessionClaims, SessionVerifier};
pub use signature::{WebhookError, WebhookVerifier};
