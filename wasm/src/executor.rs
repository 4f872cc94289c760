// Page-side executor: calls a `cordova.exec`-shaped function
//
//   exec(success, error, service, action, args)
//
// `success` / `error` are one-shot closures when the command expects a
// reply and `null` otherwise.

use crate::convert::{to_js, to_json};
use localnotify_core::{
    Command, LifecycleEvent, NativeExecutor, NativeReply, NotificationListener, ReplyHandler,
};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

/// A JS function held by the core. On wasm32 the core drops its thread
/// bounds, so this stays on the page thread.
#[derive(Clone)]
pub struct JsCallback(js_sys::Function);

impl JsCallback {
    pub fn new(function: js_sys::Function) -> Self {
        Self(function)
    }

    pub fn call_with(&self, this: &JsValue, args: &[JsValue]) {
        let array = args.iter().collect::<js_sys::Array>();
        if let Err(e) = self.0.apply(this, &array) {
            tracing::warn!("page callback threw: {:?}", e);
        }
    }
}

impl NotificationListener for JsCallback {
    fn on_event(&self, event: &LifecycleEvent) {
        self.call_with(
            &JsValue::NULL,
            &[
                JsValue::from_str(event.id.as_str()),
                JsValue::from_str(event.state.as_str()),
                JsValue::from_str(&event.json),
            ],
        );
    }
}

pub struct JsExecutor {
    exec: JsCallback,
    service: String,
}

impl JsExecutor {
    pub fn new(exec: js_sys::Function, service: String) -> Self {
        Self {
            exec: JsCallback::new(exec),
            service,
        }
    }
}

/// Wrap a reply handler into a (success, error) pair sharing one slot.
fn reply_callbacks(handler: ReplyHandler, add_reply: bool) -> (JsValue, JsValue) {
    let slot = Rc::new(RefCell::new(Some(handler)));

    let on_success = Rc::clone(&slot);
    let success = Closure::once_into_js(move |value: JsValue| {
        let Some(handler) = on_success.borrow_mut().take() else {
            return;
        };
        let reply = match to_json(value) {
            Ok(json) if add_reply => NativeReply::from_add_reply(json),
            Ok(json) => NativeReply::from_json(json),
            Err(e) => NativeReply::Failure(format!("unreadable reply: {:?}", e)),
        };
        handler(reply);
    });

    let on_error = slot;
    let error = Closure::once_into_js(move |err: JsValue| {
        let Some(handler) = on_error.borrow_mut().take() else {
            return;
        };
        let message = err.as_string().unwrap_or_else(|| format!("{:?}", err));
        handler(NativeReply::Failure(message));
    });

    (success, error)
}

impl NativeExecutor for JsExecutor {
    fn exec(&self, command: Command, reply: Option<ReplyHandler>) {
        let args = match command
            .args()
            .map_err(|e| JsValue::from_str(&e.to_string()))
            .and_then(|a| to_js(&a))
        {
            Ok(args) => args,
            Err(e) => {
                tracing::error!(action = command.action(), "failed to encode args: {:?}", e);
                return;
            }
        };

        let add_reply = matches!(command, Command::Add(_));
        let (success, error) = match reply {
            Some(handler) => reply_callbacks(handler, add_reply),
            None => (JsValue::NULL, JsValue::NULL),
        };

        self.exec.call_with(
            &JsValue::NULL,
            &[
                success,
                error,
                JsValue::from_str(&self.service),
                JsValue::from_str(command.action()),
                args,
            ],
        );
    }
}
