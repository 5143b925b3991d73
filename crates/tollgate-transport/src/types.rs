// ── Wire types for the transport seam ──
//
// Everything tollgate-core needs to know about the messaging side:
// membership standing, invite credentials, and the follow-up actions
// offered to admins on a warning. Rendering (keyboards, message text
// layout) stays on this side of the seam.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ── Membership ──────────────────────────────────────────────────────

/// A member's role within a chat, as reported by the Bot API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Administrator,
    Member,
    Restricted,
    Left,
    Banned,
}

impl MemberRole {
    /// Owners and administrators may never be removed by the bot.
    pub fn is_privileged(self) -> bool {
        matches!(self, Self::Owner | Self::Administrator)
    }
}

/// A subscriber's current standing in a destination chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub role: MemberRole,
    /// Whether the user currently counts as present in the chat.
    /// `Restricted` members may or may not be present; the API says which.
    pub is_member: bool,
}

// ── Invite credentials ──────────────────────────────────────────────

/// A single-use, time-limited invite credential minted for one subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// The redeemable invite URL.
    pub url: String,
    /// Unix timestamp after which the credential is dead even if unused.
    pub expires_at: i64,
    /// Redemption limit. Always 1 for credentials minted by tollgate.
    pub member_limit: u32,
}

// ── Chats ───────────────────────────────────────────────────────────

/// Kind of chat a destination id points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Group,
    Supergroup,
    Channel,
    Private,
}

/// Minimal chat metadata used for admin-facing labels.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatInfo {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ChatKind,
    #[serde(default)]
    pub title: Option<String>,
}

// ── Admin prompts ───────────────────────────────────────────────────

/// Follow-up action an admin can take from a warning notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum EscalationAction {
    MarkPaid,
    MarkNotPaid,
    ForceKick,
}

/// Actionable context attached to an admin notification.
///
/// The transport encodes this into whatever interactive affordance the
/// platform offers (inline keyboards on the Bot API); core only decides
/// which actions are on offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPrompt {
    pub subscriber: i64,
    pub destination: i64,
    pub actions: Vec<EscalationAction>,
}

impl AdminPrompt {
    /// The standard warning prompt: all three escalation actions.
    pub fn warning(subscriber: i64, destination: i64) -> Self {
        Self {
            subscriber,
            destination,
            actions: vec![
                EscalationAction::MarkPaid,
                EscalationAction::MarkNotPaid,
                EscalationAction::ForceKick,
            ],
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn owners_and_admins_are_privileged() {
        assert!(MemberRole::Owner.is_privileged());
        assert!(MemberRole::Administrator.is_privileged());
        assert!(!MemberRole::Member.is_privileged());
        assert!(!MemberRole::Left.is_privileged());
    }

    #[test]
    fn escalation_action_has_stable_text_form() {
        assert_eq!(EscalationAction::MarkPaid.to_string(), "mark_paid");
        assert_eq!(
            "force_kick".parse::<EscalationAction>().unwrap(),
            EscalationAction::ForceKick
        );
    }

    #[test]
    fn warning_prompt_offers_all_actions() {
        let prompt = AdminPrompt::warning(10, -100);
        assert_eq!(prompt.actions.len(), 3);
    }
}
