// Simulated native side
//
// Drains the facade's command channel on the Tokio runtime, prints every
// command, keeps an in-memory schedule and reports lifecycle events back
// the way a device plugin would.

use colored::*;
use localnotify_core::notification::now_epoch_seconds;
use localnotify_core::{
    AppState, Command, Dispatch, EventKind, EventListeners, LifecycleEvent, NativeReply,
    NormalizedNotification, NotificationId, Platform,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const SWEEP_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
struct Scheduled {
    date: i64,
    json: String,
}

/// What the simulator did over its lifetime.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulatorReport {
    pub commands: usize,
    pub triggered: usize,
    /// Ids still scheduled when the channel closed.
    pub pending: Vec<String>,
}

pub struct NativeSimulator {
    listeners: Arc<EventListeners>,
    platform: Platform,
    permission: bool,
    state: AppState,
    quiet: bool,
    scheduled: BTreeMap<String, Scheduled>,
    report: SimulatorReport,
}

impl NativeSimulator {
    pub fn new(listeners: Arc<EventListeners>, platform: Platform) -> Self {
        Self {
            listeners,
            platform,
            permission: true,
            state: AppState::Foreground,
            quiet: false,
            scheduled: BTreeMap::new(),
            report: SimulatorReport::default(),
        }
    }

    pub fn with_permission(mut self, granted: bool) -> Self {
        self.permission = granted;
        self
    }

    pub fn with_state(mut self, state: AppState) -> Self {
        self.state = state;
        self
    }

    /// Suppress command printing.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Run until every sender is dropped.
    pub fn spawn(self, rx: mpsc::UnboundedReceiver<Dispatch>) -> JoinHandle<SimulatorReport> {
        tokio::spawn(self.run(rx))
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Dispatch>) -> SimulatorReport {
        let mut sweep = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                dispatch = rx.recv() => match dispatch {
                    Some(dispatch) => self.handle(dispatch),
                    None => break,
                },
                _ = sweep.tick() => {
                    self.fire_due(now_epoch_seconds());
                }
            }
        }
        self.report.pending = self.scheduled.keys().cloned().collect();
        self.report
    }

    pub fn handle(&mut self, dispatch: Dispatch) {
        self.report.commands += 1;
        if !self.quiet {
            print_command(&dispatch.command);
        }

        let Dispatch { command, reply } = dispatch;
        let answer = match command {
            Command::Add(notification) => {
                let event = self.schedule(notification, EventKind::Add);
                // Legacy shells deliver the add event through the reply.
                if self.platform.uses_structured_add_reply() && reply.is_some() {
                    Some(NativeReply::Hook(event))
                } else {
                    self.emit(&event);
                    None
                }
            }
            Command::AddMulti(batch) => {
                if batch.cancel_all == Some(true) {
                    self.cancel_everything();
                }
                for notification in batch.notifications.unwrap_or_default() {
                    let event = self.schedule(notification, EventKind::AddMulti);
                    self.emit(&event);
                }
                None
            }
            Command::Cancel(id) => {
                self.cancel(&id);
                None
            }
            Command::CancelAll => {
                self.cancel_everything();
                None
            }
            Command::HasPermission => Some(NativeReply::Value(Value::Bool(self.permission))),
            Command::PromptForPermission => {
                self.permission = true;
                None
            }
            Command::Ready => {
                tracing::info!("page reported ready");
                None
            }
            Command::IsScheduled(id) => Some(NativeReply::Value(Value::Bool(
                self.scheduled.contains_key(id.as_str()),
            ))),
            Command::GetScheduledIds => Some(NativeReply::Value(Value::Array(
                self.scheduled.keys().cloned().map(Value::from).collect(),
            ))),
        };

        match (reply, answer) {
            (Some(handler), Some(answer)) => handler(answer),
            (Some(handler), None) => handler(NativeReply::Value(Value::Null)),
            (None, _) => {}
        }
    }

    /// Trigger every notification due at `now`. Returns how many fired.
    pub fn fire_due(&mut self, now: i64) -> usize {
        let due: Vec<String> = self
            .scheduled
            .iter()
            .filter(|(_, entry)| entry.date <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &due {
            if let Some(entry) = self.scheduled.remove(id) {
                let event = LifecycleEvent::new(EventKind::Trigger, id.as_str(), self.state, entry.json);
                self.emit(&event);
            }
        }
        self.report.triggered += due.len();
        due.len()
    }

    pub fn scheduled_ids(&self) -> Vec<String> {
        self.scheduled.keys().cloned().collect()
    }

    fn schedule(&mut self, notification: NormalizedNotification, kind: EventKind) -> LifecycleEvent {
        let json = notification
            .get("json")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let id = notification.id.as_str().to_string();
        self.scheduled.insert(
            id.clone(),
            Scheduled {
                date: notification.date,
                json: json.clone(),
            },
        );
        LifecycleEvent::new(kind, id, self.state, json)
    }

    fn cancel(&mut self, id: &NotificationId) {
        if let Some(entry) = self.scheduled.remove(id.as_str()) {
            let event = LifecycleEvent::new(EventKind::Cancel, id.clone(), self.state, entry.json);
            self.emit(&event);
        }
    }

    fn cancel_everything(&mut self) {
        let ids: Vec<String> = self.scheduled.keys().cloned().collect();
        for id in ids {
            self.cancel(&NotificationId::new(id));
        }
    }

    fn emit(&self, event: &LifecycleEvent) {
        let delivered = self.listeners.emit(event);
        tracing::debug!(event = %event.kind, id = %event.id.as_str(), delivered, "native event");
    }
}

fn print_command(command: &Command) {
    let args = command
        .args_json()
        .unwrap_or_else(|e| format!("<unencodable: {}>", e));
    println!("  {} {} {}", "→".bright_blue(), command.action().bright_cyan(), args.dimmed());
}

pub fn print_event(event: &LifecycleEvent) {
    let json = if event.json.is_empty() {
        String::new()
    } else {
        format!(" {}", event.json.dimmed())
    };
    println!(
        "  {} {} id={} ({}){}",
        "←".bright_green(),
        event.kind.hook_name().bright_yellow(),
        event.id.as_str().bold(),
        event.state,
        json
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use localnotify_core::{ChannelExecutor, LocalNotification, Notification};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(listeners: &EventListeners, kind: EventKind) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        listeners.subscribe(
            Some(kind),
            Arc::new(move |_: &LifecycleEvent| {
                sink.fetch_add(1, Ordering::SeqCst);
            }),
        );
        count
    }

    fn dispatch(command: Command) -> Dispatch {
        Dispatch { command, reply: None }
    }

    fn normalized(id: &str, date: i64) -> NormalizedNotification {
        let defaults = localnotify_core::NotificationDefaults::default();
        Notification::new().id(id).date(date).normalize(&defaults).unwrap()
    }

    #[test]
    fn test_add_then_trigger() {
        let listeners = Arc::new(EventListeners::default());
        let added = counting(&listeners, EventKind::Add);
        let triggered = counting(&listeners, EventKind::Trigger);

        let mut sim = NativeSimulator::new(Arc::clone(&listeners), Platform::Android).quiet();
        sim.handle(dispatch(Command::Add(normalized("1", 100))));
        sim.handle(dispatch(Command::Add(normalized("2", 200))));
        assert_eq!(added.load(Ordering::SeqCst), 2);

        assert_eq!(sim.fire_due(150), 1);
        assert_eq!(triggered.load(Ordering::SeqCst), 1);
        assert_eq!(sim.scheduled_ids(), vec!["2".to_string()]);
    }

    #[test]
    fn test_cancel_all_emits_cancel_per_entry() {
        let listeners = Arc::new(EventListeners::default());
        let cancelled = counting(&listeners, EventKind::Cancel);

        let mut sim = NativeSimulator::new(Arc::clone(&listeners), Platform::Ios).quiet();
        sim.handle(dispatch(Command::Add(normalized("1", 100))));
        sim.handle(dispatch(Command::Add(normalized("2", 100))));
        sim.handle(dispatch(Command::Cancel(NotificationId::new("9"))));
        assert_eq!(cancelled.load(Ordering::SeqCst), 0);

        sim.handle(dispatch(Command::CancelAll));
        assert_eq!(cancelled.load(Ordering::SeqCst), 2);
        assert!(sim.scheduled_ids().is_empty());
    }

    #[tokio::test]
    async fn test_facade_round_trip_over_channel() {
        let (executor, rx) = ChannelExecutor::new();
        let facade = LocalNotification::new(executor).with_query_commands(true);
        facade.on_device_ready(Platform::Android);

        let added = counting(&facade.listeners(), EventKind::Add);
        let worker = NativeSimulator::new(facade.listeners(), Platform::Android)
            .with_permission(false)
            .quiet()
            .spawn(rx);

        let far_future = now_epoch_seconds() + 3600;
        facade.add(Notification::new().id(5).date(far_future)).unwrap();

        let (tx, granted) = tokio::sync::oneshot::channel();
        facade.has_permission(move |flag| {
            let _ = tx.send(flag);
        });
        assert!(!granted.await.unwrap());

        let (tx, ids) = tokio::sync::oneshot::channel();
        facade.get_scheduled_ids(move |ids| {
            let _ = tx.send(ids);
        });
        assert_eq!(ids.await.unwrap(), vec![NotificationId::new("5")]);

        drop(facade);
        let report = worker.await.unwrap();
        assert_eq!(report.commands, 3);
        assert_eq!(report.pending, vec!["5".to_string()]);
        assert_eq!(added.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_legacy_platform_replies_with_hook() {
        let (executor, rx) = ChannelExecutor::new();
        let facade = LocalNotification::new(executor);
        facade.on_device_ready(Platform::WinCe);

        let (tx, seen) = tokio::sync::oneshot::channel();
        let tx = std::sync::Mutex::new(Some(tx));
        facade.on(EventKind::Add, move |event| {
            if let Some(tx) = tx.lock().unwrap().take() {
                let _ = tx.send(event.id.clone());
            }
        });

        let worker = NativeSimulator::new(facade.listeners(), Platform::WinCe)
            .quiet()
            .spawn(rx);
        facade
            .add(Notification::new().id("w1").date(now_epoch_seconds() + 3600))
            .unwrap();

        assert_eq!(seen.await.unwrap(), NotificationId::new("w1"));
        drop(facade);
        worker.await.unwrap();
    }
}
