//! WebSocket 实时通道 `/socket.io/`
//!
//! 客户端消息格式 `{"type": "...", ...}`（也接受 `event` 键或纯文本事件名）：
//! - `ping` → 回复 `{"type": "pong"}`
//! - `broadcast` → 原样转发给所有连接
//! - 其他 → 原样回显
//!
//! 连接可带 `?token=`，带令牌的连接会收到发给本人的事件。

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::extract::SocketUser;
use super::AppState;

/// 广播通道上的一条消息
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    /// 为空表示发给所有连接
    pub recipient: Option<String>,
    pub payload: String,
}

impl Outbound {
    pub fn public(payload: impl Into<String>) -> Self {
        Self { recipient: None, payload: payload.into() }
    }

    fn visible_to(&self, user_id: Option<&str>) -> bool {
        match &self.recipient {
            None => true,
            Some(recipient) => user_id == Some(recipient.as_str()),
        }
    }
}

/// 服务端推送给单个用户的事件
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent<'a> {
    AssessmentCompleted { assessment_id: &'a str, score: f64 },
}

#[derive(Debug, Deserialize)]
struct ClientMessage {
    #[serde(rename = "type", alias = "event", default)]
    kind: Option<String>,
}

/// 推送给某个用户的所有连接；没有连接时直接丢弃
pub fn publish(events: &broadcast::Sender<Outbound>, user_id: &str, event: &ServerEvent<'_>) {
    match serde_json::to_string(event) {
        Ok(payload) => {
            let message = Outbound { recipient: Some(user_id.to_string()), payload };
            if events.send(message).is_err() {
                debug!("没有实时连接，事件未推送");
            }
        }
        Err(e) => warn!("实时事件序列化失败: {}", e),
    }
}

pub async fn websocket_handler(
    State(state): State<AppState>,
    SocketUser(user): SocketUser,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let user_id = user.map(|u| u.id);
    ws.on_upgrade(move |socket| handle_socket(socket, state.events, user_id))
}

async fn handle_socket(socket: WebSocket, events: broadcast::Sender<Outbound>, user_id: Option<String>) {
    let who = user_id.as_deref().unwrap_or("anonymous");
    info!("🔌 实时连接建立: {} (当前 {} 个)", who, events.receiver_count() + 1);
    let (mut sender, mut receiver) = socket.split();
    let mut subscription = events.subscribe();

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let Some(Ok(message)) = incoming else { break };
                match message {
                    Message::Text(text) => {
                        if let Some(reply) = handle_client_text(&text, &events) {
                            if sender.send(Message::Text(reply)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            event = subscription.recv() => match event {
                Ok(message) => {
                    if !message.visible_to(user_id.as_deref()) {
                        continue;
                    }
                    if sender.send(Message::Text(message.payload)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("⚠️ 实时连接处理过慢，丢弃 {} 条事件", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
    info!("🔌 实时连接断开: {}", who);
}

/// 处理一条客户端文本消息，返回需要单独回复给该连接的内容
fn handle_client_text(text: &str, events: &broadcast::Sender<Outbound>) -> Option<String> {
    let kind = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message.kind,
        Err(_) => Some(text.trim().to_string()),
    };

    match kind.as_deref() {
        Some("ping") => Some(json!({ "type": "pong" }).to_string()),
        Some("broadcast") => {
            // 发送方自己也订阅了，会从广播收到这条消息
            let _ = events.send(Outbound::public(text));
            None
        }
        _ => Some(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_ping_answers_pong() {
        let (events, _) = broadcast::channel(4);
        for ping in [r#"{"type":"ping"}"#, r#"{"event":"ping"}"#, "ping"] {
            let reply = handle_client_text(ping, &events).unwrap();
            assert_eq!(reply, r#"{"type":"pong"}"#);
        }
    }

    #[tokio::test]
    async fn test_broadcast_forwards_message_unchanged() {
        let (events, _) = broadcast::channel(4);
        let mut rx = events.subscribe();
        let text = r#"{"type":"broadcast","data":{"msg":"hi"}}"#;
        assert!(handle_client_text(text, &events).is_none());

        let received = rx.recv().await.unwrap();
        assert_eq!(received, Outbound::public(text));
        assert!(received.visible_to(None));
    }

    #[test]
    fn test_other_messages_echo_raw_text() {
        let (events, _) = broadcast::channel(4);
        let text = r#"{"type":"join","room":"room-1"}"#;
        assert_eq!(handle_client_text(text, &events).as_deref(), Some(text));
        assert_eq!(handle_client_text("hello", &events).as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_server_events_reach_only_the_owner() {
        let (events, mut rx) = broadcast::channel(4);
        publish(
            &events,
            "u1",
            &ServerEvent::AssessmentCompleted { assessment_id: "a1", score: 80.0 },
        );
        let message = rx.recv().await.unwrap();
        assert!(message.visible_to(Some("u1")));
        assert!(!message.visible_to(Some("u2")));
        assert!(!message.visible_to(None));

        let value: Value = serde_json::from_str(&message.payload).unwrap();
        assert_eq!(value["type"], "assessment_completed");
        assert_eq!(value["score"], 80.0);
        assert!(value.get("user_id").is_none());
    }
}
