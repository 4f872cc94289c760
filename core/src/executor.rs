//! Native executor contract
//!
//! The facade talks to the platform through named commands with positional
//! JSON arguments, plus an optional one-shot reply handler. Dispatch is
//! fire-and-forget: `exec` must not block on the native side.

use crate::events::LifecycleEvent;
use crate::notification::{BatchRequest, NormalizedNotification, NotificationId};
use crate::{BridgeError, MaybeSendSync};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Service name every command is addressed to.
pub const SERVICE_NAME: &str = "LocalNotification";

// ============================================================================
// COMMANDS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add(NormalizedNotification),
    AddMulti(BatchRequest),
    Cancel(NotificationId),
    CancelAll,
    HasPermission,
    PromptForPermission,
    Ready,
    IsScheduled(NotificationId),
    GetScheduledIds,
}

impl Command {
    /// Wire action name.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::AddMulti(_) => "addMulti",
            Self::Cancel(_) => "cancel",
            Self::CancelAll => "cancelAll",
            Self::HasPermission => "hasPermission",
            Self::PromptForPermission => "promptForPermission",
            Self::Ready => "ready",
            Self::IsScheduled(_) => "isScheduled",
            Self::GetScheduledIds => "getScheduledIds",
        }
    }

    /// Positional arguments as sent over the bridge.
    pub fn args(&self) -> Result<Vec<Value>, BridgeError> {
        Ok(match self {
            Self::Add(notification) => vec![serde_json::to_value(notification)?],
            Self::AddMulti(batch) => vec![serde_json::to_value(batch)?],
            Self::Cancel(id) | Self::IsScheduled(id) => vec![Value::from(id.clone())],
            Self::CancelAll
            | Self::HasPermission
            | Self::PromptForPermission
            | Self::Ready
            | Self::GetScheduledIds => Vec::new(),
        })
    }

    pub fn args_json(&self) -> Result<String, BridgeError> {
        Ok(serde_json::to_string(&self.args()?)?)
    }
}

// ============================================================================
// REPLIES
// ============================================================================

/// What the native side sends back through a reply handler.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeReply {
    /// A plain result value (permission flag, id list, ...).
    Value(Value),
    /// A lifecycle event to deliver to listeners.
    Hook(LifecycleEvent),
    /// The native side reported an error.
    Failure(String),
    /// Deprecated: a page script the old Windows Phone shells returned for
    /// the page to evaluate. Never evaluated; logged and dropped.
    Script(String),
}

impl NativeReply {
    /// Classify a JSON reply. Objects shaped like a lifecycle event become
    /// `Hook`, `{"error": ...}` becomes `Failure`, anything else is a value.
    pub fn from_json(value: Value) -> Self {
        if let Value::Object(map) = &value {
            if map.contains_key("event") {
                if let Ok(event) = serde_json::from_value::<LifecycleEvent>(value.clone()) {
                    return Self::Hook(event);
                }
            }
            if let Some(Value::String(message)) = map.get("error") {
                return Self::Failure(message.clone());
            }
        }
        Self::Value(value)
    }

    /// `add` replies on legacy shells: a bare string is the old script form.
    pub fn from_add_reply(value: Value) -> Self {
        match value {
            Value::String(script) => Self::Script(script),
            other => Self::from_json(other),
        }
    }

    /// Truthiness of a permission/badge-capability value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Value(Value::Bool(b)) => Some(*b),
            Self::Value(Value::Number(n)) => n.as_f64().map(|f| f != 0.0),
            _ => None,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub type ReplyHandler = Box<dyn FnOnce(NativeReply) + Send + 'static>;
#[cfg(target_arch = "wasm32")]
pub type ReplyHandler = Box<dyn FnOnce(NativeReply) + 'static>;

// ============================================================================
// EXECUTOR TRAIT
// ============================================================================

/// The platform-side component that actually schedules notifications.
#[cfg_attr(test, mockall::automock)]
pub trait NativeExecutor: MaybeSendSync {
    fn exec(&self, command: Command, reply: Option<ReplyHandler>);
}

impl<E: NativeExecutor + ?Sized> NativeExecutor for Arc<E> {
    fn exec(&self, command: Command, reply: Option<ReplyHandler>) {
        (**self).exec(command, reply)
    }
}

impl<E: NativeExecutor + ?Sized> NativeExecutor for Box<E> {
    fn exec(&self, command: Command, reply: Option<ReplyHandler>) {
        (**self).exec(command, reply)
    }
}

// ============================================================================
// CHANNEL EXECUTOR
// ============================================================================

/// A command on its way to the native side.
pub struct Dispatch {
    pub command: Command,
    pub reply: Option<ReplyHandler>,
}

impl Dispatch {
    /// Answer the command. Returns `false` if it carried no reply handler.
    pub fn respond(self, reply: NativeReply) -> bool {
        match self.reply {
            Some(handler) => {
                handler(reply);
                true
            }
            None => false,
        }
    }

    pub fn expects_reply(&self) -> bool {
        self.reply.is_some()
    }
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch")
            .field("command", &self.command)
            .field("expects_reply", &self.expects_reply())
            .finish()
    }
}

/// Executor that queues every command on an unbounded channel for a native
/// worker to drain.
#[derive(Debug, Clone)]
pub struct ChannelExecutor {
    tx: mpsc::UnboundedSender<Dispatch>,
}

impl ChannelExecutor {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Dispatch>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl NativeExecutor for ChannelExecutor {
    fn exec(&self, command: Command, reply: Option<ReplyHandler>) {
        let action = command.action();
        if self.tx.send(Dispatch { command, reply }).is_err() {
            tracing::warn!(action, "native side is gone, dropping command");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AppState, EventKind};
    use serde_json::json;

    #[test]
    fn test_actions_and_args() {
        assert_eq!(Command::CancelAll.action(), "cancelAll");
        assert_eq!(Command::CancelAll.args().unwrap(), Vec::<Value>::new());

        let cancel = Command::Cancel(NotificationId::from(7u32));
        assert_eq!(cancel.action(), "cancel");
        assert_eq!(cancel.args().unwrap(), vec![json!("7")]);
        assert_eq!(cancel.args_json().unwrap(), "[\"7\"]");

        let batch = Command::AddMulti(BatchRequest {
            notifications: Some(Vec::new()),
            cancel_all: Some(false),
            extra: serde_json::Map::new(),
        });
        assert_eq!(batch.action(), "addMulti");
        assert_eq!(
            batch.args().unwrap(),
            vec![json!({"notifications": [], "cancelAll": false})]
        );
    }

    #[test]
    fn test_reply_classification() {
        let hook = NativeReply::from_json(json!({
            "event": "click", "id": "4", "state": "background", "json": ""
        }));
        assert_eq!(
            hook,
            NativeReply::Hook(LifecycleEvent::new(EventKind::Click, "4", AppState::Background, ""))
        );

        assert_eq!(
            NativeReply::from_json(json!({"error": "denied"})),
            NativeReply::Failure("denied".to_string())
        );
        assert_eq!(NativeReply::from_json(json!(true)), NativeReply::Value(json!(true)));
        assert_eq!(
            NativeReply::from_add_reply(json!("plugin.onadd(1)")),
            NativeReply::Script("plugin.onadd(1)".to_string())
        );
    }

    #[test]
    fn test_reply_truthiness() {
        assert_eq!(NativeReply::Value(json!(true)).as_bool(), Some(true));
        assert_eq!(NativeReply::Value(json!(0)).as_bool(), Some(false));
        assert_eq!(NativeReply::Value(json!(2)).as_bool(), Some(true));
        assert_eq!(NativeReply::Value(json!("yes")).as_bool(), None);
        assert_eq!(NativeReply::Failure("x".into()).as_bool(), None);
    }

    #[test]
    fn test_channel_executor_queues_commands() {
        let (executor, mut rx) = ChannelExecutor::new();
        executor.exec(Command::Ready, None);
        executor.exec(Command::HasPermission, Some(Box::new(|_| {})));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.command, Command::Ready);
        assert!(!first.expects_reply());

        let second = rx.try_recv().unwrap();
        assert_eq!(second.command, Command::HasPermission);
        assert!(second.respond(NativeReply::Value(json!(true))));
    }

    #[test]
    fn test_channel_executor_survives_closed_receiver() {
        let (executor, rx) = ChannelExecutor::new();
        drop(rx);
        assert!(executor.is_closed());
        executor.exec(Command::CancelAll, None);
    }
}
