// tollgate-transport: the messaging seam between tollgate-core and the
// outside world. Core talks to the `Transport` trait; `BotClient` is the
// production implementation over the HTTP Bot API.

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::BotClient;
pub use error::Error;
pub use transport::Transport;
pub use types::{
    AdminPrompt, ChatInfo, ChatKind, Credential, EscalationAction, MemberRole, Membership,
};
