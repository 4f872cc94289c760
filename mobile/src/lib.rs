// localnotify-mobile: native mobile bindings for iOS and Android
// This crate exports the notification facade via UniFFI.
//
// Kotlin/Swift implement `ForeignExecutor` (the platform scheduler) and
// `ForeignListener`; descriptors cross the boundary as JSON strings.

use localnotify_core::{
    BridgeConfig, BridgeError, Command, EventKind, LifecycleEvent, ListenerId, LocalNotification,
    NativeExecutor, NativeReply, Notification, NotificationBatch, NotificationListener, Platform,
    ReplyHandler, SERVICE_NAME,
};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::{Arc, Once};

uniffi::setup_scaffolding!();

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum NotifyError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<BridgeError> for NotifyError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Config(_) | BridgeError::Io(_) => NotifyError::Config(err.to_string()),
            BridgeError::Json(_)
            | BridgeError::InvalidId(_)
            | BridgeError::InvalidDate(_)
            | BridgeError::InvalidDescriptor(_)
            | BridgeError::UnknownEvent(_)
            | BridgeError::UnknownAppState(_) => NotifyError::InvalidInput(err.to_string()),
        }
    }
}

// ============================================================================
// LOGGING
// ============================================================================

static LOGGING: Once = Once::new();

/// Install a stdout subscriber; later calls are no-ops.
#[uniffi::export]
pub fn init_logging(filter: String) {
    LOGGING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_new(&filter)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}

// ============================================================================
// FOREIGN INTERFACES
// ============================================================================

/// Implemented by the host: schedules, cancels and queries notifications.
#[uniffi::export(with_foreign)]
pub trait ForeignExecutor: Send + Sync {
    /// `args_json` is a JSON array of positional arguments. `reply` is set
    /// only for commands that expect an answer and must be resolved at most
    /// once.
    fn exec(
        &self,
        service: String,
        action: String,
        args_json: String,
        reply: Option<Arc<ReplyChannel>>,
    );
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct NotificationEvent {
    pub event: String,
    pub id: String,
    pub state: String,
    pub json: String,
}

impl From<&LifecycleEvent> for NotificationEvent {
    fn from(event: &LifecycleEvent) -> Self {
        Self {
            event: event.kind.as_str().to_string(),
            id: event.id.to_string(),
            state: event.state.as_str().to_string(),
            json: event.json.clone(),
        }
    }
}

#[uniffi::export(with_foreign)]
pub trait ForeignListener: Send + Sync {
    fn on_event(&self, event: NotificationEvent);
}

#[uniffi::export(with_foreign)]
pub trait FlagCallback: Send + Sync {
    fn on_result(&self, value: bool);
}

#[uniffi::export(with_foreign)]
pub trait IdsCallback: Send + Sync {
    fn on_result(&self, ids: Vec<String>);
}

struct ListenerAdapter(Arc<dyn ForeignListener>);

impl NotificationListener for ListenerAdapter {
    fn on_event(&self, event: &LifecycleEvent) {
        self.0.on_event(NotificationEvent::from(event));
    }
}

// ============================================================================
// REPLY CHANNEL
// ============================================================================

/// One-shot answer handle passed to the host with a command.
#[derive(uniffi::Object)]
pub struct ReplyChannel {
    handler: Mutex<Option<ReplyHandler>>,
    add_reply: bool,
}

impl ReplyChannel {
    fn new(handler: ReplyHandler, add_reply: bool) -> Self {
        Self {
            handler: Mutex::new(Some(handler)),
            add_reply,
        }
    }

    fn deliver(&self, reply: NativeReply) -> bool {
        let handler = self.handler.lock().take();
        match handler {
            Some(handler) => {
                handler(reply);
                true
            }
            None => {
                tracing::warn!("reply channel already resolved");
                false
            }
        }
    }
}

#[uniffi::export]
impl ReplyChannel {
    /// Answer with a JSON value. Text that is not JSON is taken as a string.
    pub fn resolve(&self, value_json: String) -> bool {
        let value = serde_json::from_str(&value_json).unwrap_or(Value::String(value_json));
        let reply = if self.add_reply {
            NativeReply::from_add_reply(value)
        } else {
            NativeReply::from_json(value)
        };
        self.deliver(reply)
    }

    pub fn reject(&self, message: String) -> bool {
        self.deliver(NativeReply::Failure(message))
    }

    pub fn is_resolved(&self) -> bool {
        self.handler.lock().is_none()
    }
}

// ============================================================================
// EXECUTOR ADAPTER
// ============================================================================

struct ForeignExecutorAdapter {
    service: String,
    inner: Arc<dyn ForeignExecutor>,
}

impl NativeExecutor for ForeignExecutorAdapter {
    fn exec(&self, command: Command, reply: Option<ReplyHandler>) {
        let args_json = match command.args_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(action = command.action(), "failed to encode args: {}", e);
                return;
            }
        };
        let add_reply = matches!(command, Command::Add(_));
        let reply = reply.map(|handler| Arc::new(ReplyChannel::new(handler, add_reply)));
        self.inner.exec(
            self.service.clone(),
            command.action().to_string(),
            args_json,
            reply,
        );
    }
}

// ============================================================================
// NOTIFICATION BRIDGE
// ============================================================================

#[derive(uniffi::Object)]
pub struct NotificationBridge {
    inner: LocalNotification<ForeignExecutorAdapter>,
}

fn parse_object(json: &str) -> Result<Map<String, Value>, NotifyError> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(NotifyError::InvalidInput(format!(
            "expected a JSON object, got {}",
            other
        ))),
        Err(e) => Err(NotifyError::InvalidInput(e.to_string())),
    }
}

fn parse_value(json: &str) -> Result<Value, NotifyError> {
    serde_json::from_str(json).map_err(|e| NotifyError::InvalidInput(e.to_string()))
}

#[uniffi::export]
impl NotificationBridge {
    #[uniffi::constructor]
    pub fn new(executor: Arc<dyn ForeignExecutor>) -> Arc<Self> {
        let adapter = ForeignExecutorAdapter {
            service: SERVICE_NAME.to_string(),
            inner: executor,
        };
        Arc::new(Self {
            inner: LocalNotification::new(adapter),
        })
    }

    #[uniffi::constructor]
    pub fn with_config(
        config_json: String,
        executor: Arc<dyn ForeignExecutor>,
    ) -> Result<Arc<Self>, NotifyError> {
        let config = BridgeConfig::from_json_str(&config_json)?;
        let adapter = ForeignExecutorAdapter {
            service: config.service.clone(),
            inner: executor,
        };
        Ok(Arc::new(Self {
            inner: LocalNotification::from_config(&config, adapter),
        }))
    }

    /// Current defaults as a JSON object.
    pub fn get_defaults(&self) -> Result<String, NotifyError> {
        serde_json::to_string(&*self.inner.defaults())
            .map_err(|e| NotifyError::Internal(e.to_string()))
    }

    pub fn set_defaults(&self, overrides_json: String) -> Result<(), NotifyError> {
        let overrides = parse_object(&overrides_json)?;
        self.inner.set_defaults(&overrides);
        Ok(())
    }

    /// Host readiness signal with the platform identifier ("Android", "iOS").
    pub fn device_ready(&self, platform: String) -> bool {
        self.inner.on_device_ready(Platform::from_identifier(&platform))
    }

    pub fn add(&self, descriptor_json: String) -> Result<String, NotifyError> {
        let notification = Notification::from_json(parse_value(&descriptor_json)?)?;
        Ok(self.inner.add(notification)?.into_string())
    }

    pub fn add_multi(&self, batch_json: String) -> Result<(), NotifyError> {
        let batch = NotificationBatch::from_json(parse_value(&batch_json)?)?;
        Ok(self.inner.add_multi(batch)?)
    }

    pub fn cancel(&self, id: String) {
        self.inner.cancel(id);
    }

    pub fn cancel_all(&self) {
        self.inner.cancel_all();
    }

    pub fn has_permission(&self, callback: Arc<dyn FlagCallback>) {
        self.inner.has_permission(move |granted| callback.on_result(granted));
    }

    pub fn prompt_for_permission(&self) {
        self.inner.prompt_for_permission();
    }

    /// Answers `false` locally unless the config sets `queryCommands`.
    pub fn is_scheduled(&self, id: String, callback: Arc<dyn FlagCallback>) {
        self.inner
            .is_scheduled(id, move |scheduled| callback.on_result(scheduled));
    }

    pub fn get_scheduled_ids(&self, callback: Arc<dyn IdsCallback>) {
        self.inner.get_scheduled_ids(move |ids| {
            callback.on_result(ids.into_iter().map(|id| id.into_string()).collect())
        });
    }

    pub fn ready(&self) {
        self.inner.ready();
    }

    /// Listen to every event. Returns a handle for `remove_listener`.
    pub fn add_listener(&self, listener: Arc<dyn ForeignListener>) -> u64 {
        self.inner
            .subscribe(Arc::new(ListenerAdapter(listener)))
            .as_u64()
    }

    /// Listen to one event kind ("click", "ontrigger", ...).
    pub fn add_listener_for(
        &self,
        event: String,
        listener: Arc<dyn ForeignListener>,
    ) -> Result<u64, NotifyError> {
        let kind: EventKind = event.parse()?;
        Ok(self
            .inner
            .subscribe_to(kind, Arc::new(ListenerAdapter(listener)))
            .as_u64())
    }

    pub fn remove_listener(&self, handle: u64) -> bool {
        self.inner.unsubscribe(ListenerId::from_u64(handle))
    }

    /// Entry point for native lifecycle events.
    pub fn dispatch_hook(
        &self,
        hook: String,
        id: String,
        state: String,
        json: String,
    ) -> Result<u32, NotifyError> {
        let delivered = self.inner.dispatch_hook(&hook, &id, &state, &json)?;
        Ok(delivered as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingHost {
        calls: Mutex<Vec<(String, String, String)>>,
        replies: Mutex<Vec<Arc<ReplyChannel>>>,
    }

    impl ForeignExecutor for RecordingHost {
        fn exec(
            &self,
            service: String,
            action: String,
            args_json: String,
            reply: Option<Arc<ReplyChannel>>,
        ) {
            self.calls.lock().push((service, action, args_json));
            if let Some(reply) = reply {
                self.replies.lock().push(reply);
            }
        }
    }

    #[derive(Default)]
    struct Collector {
        events: Mutex<Vec<NotificationEvent>>,
        flags: Mutex<Vec<bool>>,
    }

    impl ForeignListener for Collector {
        fn on_event(&self, event: NotificationEvent) {
            self.events.lock().push(event);
        }
    }

    impl FlagCallback for Collector {
        fn on_result(&self, value: bool) {
            self.flags.lock().push(value);
        }
    }

    fn bridge() -> (Arc<NotificationBridge>, Arc<RecordingHost>) {
        let host = Arc::new(RecordingHost::default());
        (NotificationBridge::new(host.clone()), host)
    }

    #[test]
    fn test_add_sends_json_args() {
        let (bridge, host) = bridge();
        let id = bridge
            .add(r#"{"id": 42, "title": "Hello", "date": 1704067200}"#.to_string())
            .unwrap();
        assert_eq!(id, "42");

        let calls = host.calls.lock();
        let (service, action, args) = &calls[0];
        assert_eq!(service, "LocalNotification");
        assert_eq!(action, "add");
        let args: Value = serde_json::from_str(args).unwrap();
        assert_eq!(args[0]["id"], Value::from("42"));
        assert_eq!(args[0]["date"], Value::from(1_704_067_200));
    }

    #[test]
    fn test_invalid_input_is_reported() {
        let (bridge, host) = bridge();
        assert!(matches!(
            bridge.add("[1]".to_string()),
            Err(NotifyError::InvalidInput(_))
        ));
        assert!(bridge.add("{not json".to_string()).is_err());
        assert!(bridge.set_defaults("3".to_string()).is_err());
        assert!(host.calls.lock().is_empty());
    }

    #[test]
    fn test_permission_reply_channel() {
        let (bridge, host) = bridge();
        let collector = Arc::new(Collector::default());
        bridge.has_permission(collector.clone());

        let reply = host.replies.lock().pop().unwrap();
        assert!(!reply.is_resolved());
        assert!(reply.resolve("true".to_string()));
        assert!(reply.is_resolved());
        assert!(!reply.resolve("false".to_string()));
        assert_eq!(*collector.flags.lock(), vec![true]);
    }

    #[test]
    fn test_listeners_and_hooks() {
        let (bridge, _host) = bridge();
        let collector = Arc::new(Collector::default());
        let handle = bridge
            .add_listener_for("onclick".to_string(), collector.clone())
            .unwrap();

        let delivered = bridge
            .dispatch_hook(
                "onclick".into(),
                "7".into(),
                "background".into(),
                "{}".into(),
            )
            .unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(
            collector.events.lock()[0],
            NotificationEvent {
                event: "click".into(),
                id: "7".into(),
                state: "background".into(),
                json: "{}".into(),
            }
        );

        assert!(bridge.remove_listener(handle));
        assert!(bridge.add_listener_for("bogus".to_string(), collector).is_err());
    }

    #[test]
    fn test_windows_phone_add_reply_delivers_event() {
        let (bridge, host) = bridge();
        assert!(bridge.device_ready("Win32NT".to_string()));
        let collector = Arc::new(Collector::default());
        bridge.add_listener(collector.clone());

        bridge.add(r#"{"id": "w"}"#.to_string()).unwrap();
        let reply = host.replies.lock().pop().unwrap();
        reply.resolve(
            r#"{"event": "add", "id": "w", "state": "foreground", "json": ""}"#.to_string(),
        );
        assert_eq!(collector.events.lock()[0].event, "add");
    }

    #[test]
    fn test_with_config_and_defaults() {
        let host = Arc::new(RecordingHost::default());
        let bridge = NotificationBridge::with_config(
            r#"{"service": "Notifier", "platform": "Android", "defaults": {"title": "T"}}"#
                .to_string(),
            host.clone(),
        )
        .unwrap();

        let defaults: Value = serde_json::from_str(&bridge.get_defaults().unwrap()).unwrap();
        assert_eq!(defaults["title"], Value::from("T"));
        assert_eq!(defaults["sound"], Value::from("TYPE_NOTIFICATION"));

        bridge.cancel("3".to_string());
        assert_eq!(host.calls.lock()[0].0, "Notifier");
        assert_eq!(host.calls.lock()[0].2, r#"["3"]"#);
    }
}
