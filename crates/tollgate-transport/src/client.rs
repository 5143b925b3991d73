// Bot API HTTP client
//
// Wraps `reqwest::Client` with Bot API URL construction and envelope
// unwrapping. Every method call is a POST of a JSON body to
// `{base}/bot{token}/{method}`; the `{ ok, result, description,
// error_code }` envelope is stripped before the caller sees it.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::Transport;
use crate::types::{AdminPrompt, ChatInfo, Credential, MemberRole, Membership};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Production [`Transport`] implementation over the HTTP Bot API.
pub struct BotClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl BotClient {
    /// Create a client with a default HTTP stack (30s timeout).
    pub fn new(base_url: Url, token: impl Into<String>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self::from_reqwest(base_url, token, http))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn from_reqwest(base_url: Url, token: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url,
            token: token.into(),
        }
    }

    /// The API base URL (without the token path segment).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Request plumbing ─────────────────────────────────────────────

    /// Build the full URL for a Bot API method.
    fn method_url(&self, method: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/bot{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            self.token,
            method
        );
        Ok(Url::parse(&full)?)
    }

    /// POST a method call and unwrap the API envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        let url = self.method_url(method)?;
        debug!(method, "bot api call");

        let resp = self.http.post(url).json(body).send().await?;
        let text = resp.text().await?;

        let envelope: ApiEnvelope<T> =
            serde_json::from_str(&text).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: text.clone(),
            })?;

        if !envelope.ok {
            let code = envelope.error_code.unwrap_or_default();
            if code == 429 {
                let retry_after_secs = envelope
                    .parameters
                    .and_then(|p| p.retry_after)
                    .unwrap_or(1);
                return Err(Error::RateLimited { retry_after_secs });
            }
            return Err(Error::Api {
                code,
                description: envelope
                    .description
                    .unwrap_or_else(|| "unknown error".into()),
            });
        }

        envelope.result.ok_or_else(|| Error::Deserialization {
            message: "ok response without result".into(),
            body: text,
        })
    }
}

#[async_trait]
impl Transport for BotClient {
    async fn membership(&self, chat_id: i64, user_id: i64) -> Result<Membership, Error> {
        let member: ChatMember = self
            .call("getChatMember", &json!({ "chat_id": chat_id, "user_id": user_id }))
            .await?;
        member.try_into()
    }

    async fn create_single_use_invite(
        &self,
        chat_id: i64,
        label: &str,
        ttl: Duration,
    ) -> Result<Credential, Error> {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expire_date = Utc::now().timestamp() + ttl_secs;
        let link: InviteLink = self
            .call(
                "createChatInviteLink",
                &json!({
                    "chat_id": chat_id,
                    "name": label,
                    "expire_date": expire_date,
                    "member_limit": 1,
                }),
            )
            .await?;
        Ok(Credential {
            url: link.invite_link,
            expires_at: link.expire_date.unwrap_or(expire_date),
            member_limit: link.member_limit.unwrap_or(1),
        })
    }

    async fn remove_and_allow_rejoin(&self, chat_id: i64, user_id: i64) -> Result<(), Error> {
        // Ban-then-unban: the user is out, but a fresh invite lets them back.
        let _: bool = self
            .call("banChatMember", &json!({ "chat_id": chat_id, "user_id": user_id }))
            .await?;
        let _: bool = self
            .call(
                "unbanChatMember",
                &json!({ "chat_id": chat_id, "user_id": user_id, "only_if_banned": true }),
            )
            .await?;
        Ok(())
    }

    async fn send_direct(&self, user_id: i64, text: &str) -> Result<(), Error> {
        let _: Message = self
            .call("sendMessage", &json!({ "chat_id": user_id, "text": text }))
            .await?;
        Ok(())
    }

    async fn notify_admin(
        &self,
        admin_id: i64,
        text: &str,
        prompt: Option<AdminPrompt>,
    ) -> Result<(), Error> {
        let mut body = json!({ "chat_id": admin_id, "text": text });
        if let Some(prompt) = prompt {
            let rows: Vec<Vec<serde_json::Value>> = prompt
                .actions
                .iter()
                .map(|action| {
                    vec![json!({
                        "text": action.to_string(),
                        "callback_data": format!(
                            "{action}:{}:{}",
                            prompt.subscriber, prompt.destination
                        ),
                    })]
                })
                .collect();
            body["reply_markup"] = json!({ "inline_keyboard": rows });
        }
        let _: Message = self.call("sendMessage", &body).await?;
        Ok(())
    }

    async fn chat_info(&self, chat_id: i64) -> Result<ChatInfo, Error> {
        self.call("getChat", &json!({ "chat_id": chat_id })).await
    }
}

// ── Envelope & wire structs ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ApiEnvelope<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChatMember {
    status: String,
    /// Only present for restricted members.
    #[serde(default)]
    is_member: Option<bool>,
}

impl TryFrom<ChatMember> for Membership {
    type Error = Error;

    fn try_from(member: ChatMember) -> Result<Self, Error> {
        let (role, is_member) = match member.status.as_str() {
            "creator" => (MemberRole::Owner, true),
            "administrator" => (MemberRole::Administrator, true),
            "member" => (MemberRole::Member, true),
            "restricted" => (MemberRole::Restricted, member.is_member.unwrap_or(false)),
            "left" => (MemberRole::Left, false),
            "kicked" => (MemberRole::Banned, false),
            other => {
                return Err(Error::Deserialization {
                    message: format!("unknown member status: {other}"),
                    body: String::new(),
                });
            }
        };
        Ok(Self { role, is_member })
    }
}

#[derive(Debug, Deserialize)]
struct InviteLink {
    invite_link: String,
    #[serde(default)]
    expire_date: Option<i64>,
    #[serde(default)]
    member_limit: Option<u32>,
}

/// Minimal message acknowledgement -- we only care that the send succeeded.
#[derive(Debug, Deserialize)]
struct Message {
    #[serde(rename = "message_id")]
    _message_id: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn restricted_member_keeps_is_member_flag() {
        let m = ChatMember {
            status: "restricted".into(),
            is_member: Some(true),
        };
        let membership: Membership = m.try_into().unwrap();
        assert_eq!(membership.role, MemberRole::Restricted);
        assert!(membership.is_member);
    }

    #[test]
    fn kicked_member_is_absent() {
        let m = ChatMember {
            status: "kicked".into(),
            is_member: None,
        };
        let membership: Membership = m.try_into().unwrap();
        assert_eq!(membership.role, MemberRole::Banned);
        assert!(!membership.is_member);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let m = ChatMember {
            status: "lurker".into(),
            is_member: None,
        };
        assert!(Membership::try_from(m).is_err());
    }
}
