//! Notification facade
//!
//! The object the application shell talks to. It owns the current defaults
//! snapshot, remembers the host platform once the host signals readiness,
//! normalizes descriptors and hands commands to the native executor.
//!
//! ```text
//! shell ──add/cancel/...──▶ LocalNotification ──Command──▶ NativeExecutor
//!   ▲                                                            │
//!   └──── listeners ◀── fire / dispatch_hook / add replies ◀─────┘
//! ```

use crate::config::BridgeConfig;
use crate::defaults::NotificationDefaults;
use crate::events::{EventKind, EventListeners, LifecycleEvent, ListenerId, NotificationListener};
use crate::executor::{Command, NativeExecutor, NativeReply, ReplyHandler};
use crate::notification::{Notification, NotificationBatch, NotificationId};
use crate::platform::Platform;
use crate::{BridgeError, MaybeSend, MaybeSendSync};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};

pub struct LocalNotification<E: NativeExecutor> {
    executor: E,
    defaults: RwLock<Arc<NotificationDefaults>>,
    platform: OnceLock<Platform>,
    listeners: Arc<EventListeners>,
    /// `isScheduled` / `getScheduledIds` are only sent to executors that
    /// implement them.
    query_commands: bool,
}

impl<E: NativeExecutor> LocalNotification<E> {
    pub fn new(executor: E) -> Self {
        Self::with_defaults(executor, NotificationDefaults::default())
    }

    pub fn with_defaults(executor: E, defaults: NotificationDefaults) -> Self {
        Self {
            executor,
            defaults: RwLock::new(Arc::new(defaults)),
            platform: OnceLock::new(),
            listeners: Arc::new(EventListeners::new()),
            query_commands: false,
        }
    }

    /// Opt in to the schedule query commands. Without it `is_scheduled`
    /// answers `false` and `get_scheduled_ids` an empty list, locally.
    pub fn with_query_commands(mut self, enabled: bool) -> Self {
        self.query_commands = enabled;
        self
    }

    pub fn query_commands_enabled(&self) -> bool {
        self.query_commands
    }

    /// Apply a loaded configuration: `defaults` are pre-readiness overrides
    /// and a configured `platform` marks the host ready right away.
    pub fn from_config(config: &BridgeConfig, executor: E) -> Self {
        let facade = Self::new(executor).with_query_commands(config.query_commands);
        facade.set_defaults(&config.defaults);
        if let Some(platform) = &config.platform {
            facade.on_device_ready(platform.clone());
        }
        facade
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    // ------------------------------------------------------------------
    // Defaults
    // ------------------------------------------------------------------

    /// Current defaults snapshot.
    pub fn defaults(&self) -> Arc<NotificationDefaults> {
        Arc::clone(&self.defaults.read())
    }

    /// Overwrite defaults for keys that already exist; other keys are ignored.
    pub fn set_defaults(&self, overrides: &Map<String, Value>) {
        let mut defaults = self.defaults.write();
        *defaults = Arc::new(defaults.with_overrides(overrides));
    }

    /// Merge `notification` with the current defaults.
    pub fn merge_with_defaults(&self, notification: Notification) -> Notification {
        self.defaults().merge(notification)
    }

    // ------------------------------------------------------------------
    // Readiness
    // ------------------------------------------------------------------

    /// Host readiness signal. Records the platform and adds its default
    /// fields; only the first call has any effect.
    pub fn on_device_ready(&self, platform: Platform) -> bool {
        let mut defaults = self.defaults.write();
        let mut first = false;
        let platform = self.platform.get_or_init(|| {
            first = true;
            platform
        });
        if !first {
            tracing::debug!(platform = %platform, "device ready already handled");
            return false;
        }

        *defaults = Arc::new(defaults.with_platform(platform));
        tracing::info!(
            platform = %platform,
            defaults = defaults.len(),
            "applied platform notification defaults"
        );
        true
    }

    pub fn platform(&self) -> Option<&Platform> {
        self.platform.get()
    }

    pub fn is_device_ready(&self) -> bool {
        self.platform.get().is_some()
    }

    /// Tell the native side it may flush queued events.
    pub fn ready(&self) {
        self.dispatch(Command::Ready, None);
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Schedule one notification and return its normalized id.
    pub fn add(&self, notification: Notification) -> Result<NotificationId, BridgeError> {
        let defaults = self.defaults();
        let normalized = notification.normalize(&defaults)?;
        let id = normalized.id.clone();

        let reply = self
            .platform()
            .filter(|p| p.uses_structured_add_reply())
            .map(|_| self.add_reply_handler());

        self.dispatch(Command::Add(normalized), reply);
        Ok(id)
    }

    /// Schedule a batch. Elements are normalized in order.
    pub fn add_multi(&self, batch: NotificationBatch) -> Result<(), BridgeError> {
        let defaults = self.defaults();
        let request = batch.normalize(&defaults)?;
        self.dispatch(Command::AddMulti(request), None);
        Ok(())
    }

    pub fn cancel(&self, id: impl Into<NotificationId>) {
        self.dispatch(Command::Cancel(id.into()), None);
    }

    pub fn cancel_all(&self) {
        self.dispatch(Command::CancelAll, None);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Ask whether the app may show badges/notifications. `callback` runs
    /// once, when the native side answers.
    pub fn has_permission<F>(&self, callback: F)
    where
        F: FnOnce(bool) + MaybeSend + 'static,
    {
        self.dispatch(
            Command::HasPermission,
            Some(Box::new(move |reply| callback(reply_flag("hasPermission", reply)))),
        );
    }

    pub fn prompt_for_permission(&self) {
        self.dispatch(Command::PromptForPermission, None);
    }

    pub fn is_scheduled<F>(&self, id: impl Into<NotificationId>, callback: F)
    where
        F: FnOnce(bool) + MaybeSend + 'static,
    {
        if !self.query_commands {
            tracing::debug!("isScheduled not enabled for this executor");
            callback(false);
            return;
        }
        self.dispatch(
            Command::IsScheduled(id.into()),
            Some(Box::new(move |reply| callback(reply_flag("isScheduled", reply)))),
        );
    }

    pub fn get_scheduled_ids<F>(&self, callback: F)
    where
        F: FnOnce(Vec<NotificationId>) + MaybeSend + 'static,
    {
        if !self.query_commands {
            tracing::debug!("getScheduledIds not enabled for this executor");
            callback(Vec::new());
            return;
        }
        self.dispatch(
            Command::GetScheduledIds,
            Some(Box::new(move |reply| callback(reply_ids(reply)))),
        );
    }

    // ------------------------------------------------------------------
    // Lifecycle events
    // ------------------------------------------------------------------

    pub fn listeners(&self) -> Arc<EventListeners> {
        Arc::clone(&self.listeners)
    }

    /// Listen to every lifecycle event.
    pub fn subscribe(&self, listener: Arc<dyn NotificationListener>) -> ListenerId {
        self.listeners.subscribe(None, listener)
    }

    pub fn subscribe_to(
        &self,
        kind: EventKind,
        listener: Arc<dyn NotificationListener>,
    ) -> ListenerId {
        self.listeners.subscribe(Some(kind), listener)
    }

    /// Closure shorthand for `subscribe_to`.
    pub fn on<F>(&self, kind: EventKind, f: F) -> ListenerId
    where
        F: Fn(&LifecycleEvent) + MaybeSendSync + 'static,
    {
        self.subscribe_to(kind, Arc::new(f))
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Deliver an event coming from the native side.
    pub fn fire(&self, event: &LifecycleEvent) -> usize {
        self.listeners.emit(event)
    }

    /// Deliver an event given by hook name (`onclick` or `click`).
    pub fn dispatch_hook(
        &self,
        hook: &str,
        id: &str,
        state: &str,
        json: &str,
    ) -> Result<usize, BridgeError> {
        let event = LifecycleEvent::from_hook(hook, id, state, json)?;
        Ok(self.fire(&event))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn dispatch(&self, command: Command, reply: Option<ReplyHandler>) {
        tracing::debug!(
            action = command.action(),
            expects_reply = reply.is_some(),
            "dispatching to native executor"
        );
        self.executor.exec(command, reply);
    }

    fn add_reply_handler(&self) -> ReplyHandler {
        let listeners = Arc::clone(&self.listeners);
        Box::new(move |reply| route_add_reply(&listeners, reply))
    }
}

fn route_add_reply(listeners: &EventListeners, reply: NativeReply) {
    match reply {
        NativeReply::Hook(event) => {
            listeners.emit(&event);
        }
        NativeReply::Failure(message) => {
            tracing::warn!(%message, "native add failed");
        }
        NativeReply::Value(value) => {
            tracing::debug!(%value, "add reply without event");
        }
        NativeReply::Script(script) => {
            tracing::warn!(
                len = script.len(),
                "ignoring script reply from native add; script evaluation is not supported"
            );
        }
    }
}

fn reply_flag(action: &str, reply: NativeReply) -> bool {
    match reply.as_bool() {
        Some(flag) => flag,
        None => {
            if let NativeReply::Failure(message) = &reply {
                tracing::warn!(action, %message, "native query failed");
            } else {
                tracing::warn!(action, ?reply, "unexpected reply shape, treating as false");
            }
            false
        }
    }
}

fn reply_ids(reply: NativeReply) -> Vec<NotificationId> {
    match reply {
        NativeReply::Value(Value::Array(items)) => items
            .iter()
            .filter_map(|raw| NotificationId::from_value(raw).ok().flatten())
            .collect(),
        other => {
            tracing::warn!(reply = ?other, "unexpected getScheduledIds reply");
            Vec::new()
        }
    }
}
