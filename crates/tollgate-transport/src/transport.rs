// ── The transport seam ──
//
// tollgate-core consumes exactly this surface and nothing else from the
// messaging side. Keeping the trait this narrow is what lets the core
// test suite run against an in-memory fake enforcing the single-use
// invite contract.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Error;
use crate::types::{AdminPrompt, ChatInfo, Credential, Membership};

/// Outbound messaging operations consumed by tollgate-core.
///
/// Implementations must uphold the invite contract: a credential from
/// [`create_single_use_invite`](Transport::create_single_use_invite) is
/// redeemable at most once and expires after `ttl` even if unused.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Report a user's current standing in a chat.
    async fn membership(&self, chat_id: i64, user_id: i64) -> Result<Membership, Error>;

    /// Mint a single-use invite credential valid for `ttl`.
    ///
    /// `label` tags the credential for later audit on the platform side
    /// (the Bot API shows it in the chat's invite-link list).
    async fn create_single_use_invite(
        &self,
        chat_id: i64,
        label: &str,
        ttl: Duration,
    ) -> Result<Credential, Error>;

    /// Remove a user from a chat while leaving them free to rejoin
    /// through a fresh invite. Never a permanent ban.
    async fn remove_and_allow_rejoin(&self, chat_id: i64, user_id: i64) -> Result<(), Error>;

    /// Send a direct message to a user.
    async fn send_direct(&self, user_id: i64, text: &str) -> Result<(), Error>;

    /// Notify an admin, optionally attaching actionable follow-ups.
    async fn notify_admin(
        &self,
        admin_id: i64,
        text: &str,
        prompt: Option<AdminPrompt>,
    ) -> Result<(), Error>;

    /// Fetch chat metadata (used for admin-facing destination labels).
    async fn chat_info(&self, chat_id: i64) -> Result<ChatInfo, Error>;
}
