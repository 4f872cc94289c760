// localnotify-wasm: WebAssembly bindings for web-technology app shells
//
// Exposes the notification facade as a `LocalNotification` JS class. The
// shell passes its `cordova.exec`-style bridge function in; native
// lifecycle events come back through `fire()`.
//
// JS values only exist on wasm32; on other targets the crate is empty.
#![cfg(target_arch = "wasm32")]

pub mod convert;
pub mod executor;

use crate::convert::{batch_from_js, notification_from_js, to_js, to_js_err, to_json};
use crate::executor::{JsCallback, JsExecutor};
use localnotify_core::{
    BridgeConfig, EventKind, ListenerId, LocalNotification as Facade, NotificationId, Platform,
    SERVICE_NAME,
};
use serde_json::Value;
use std::cell::RefCell;
use std::sync::Arc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

const DEVICE_READY_EVENT: &str = "deviceready";

#[wasm_bindgen]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}

/// Platform reported by the Cordova device plugin, `browser` if absent.
fn detect_platform() -> Platform {
    let platform = web_sys::window()
        .and_then(|window| js_sys::Reflect::get(&window, &JsValue::from_str("device")).ok())
        .filter(|device| device.is_object())
        .and_then(|device| js_sys::Reflect::get(&device, &JsValue::from_str("platform")).ok())
        .and_then(|platform| platform.as_string());
    match platform {
        Some(id) => Platform::from_identifier(&id),
        None => Platform::Other("browser".to_string()),
    }
}

fn id_from_js(id: JsValue) -> Result<NotificationId, JsValue> {
    NotificationId::from_value(&to_json(id)?)
        .map_err(to_js_err)?
        .ok_or_else(|| JsValue::from_str("Invalid notification id: null"))
}

#[wasm_bindgen(js_name = LocalNotification)]
pub struct WasmLocalNotification {
    inner: Arc<Facade<JsExecutor>>,
    /// Kept alive while attached; dropping it would invalidate the listener.
    device_ready: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>>,
}

impl WasmLocalNotification {
    fn from_facade(facade: Facade<JsExecutor>) -> Self {
        Self {
            inner: Arc::new(facade),
            device_ready: RefCell::new(None),
        }
    }
}

#[wasm_bindgen(js_class = LocalNotification)]
impl WasmLocalNotification {
    #[wasm_bindgen(constructor)]
    pub fn new(exec: js_sys::Function) -> Self {
        Self::from_facade(Facade::new(JsExecutor::new(exec, SERVICE_NAME.to_string())))
    }

    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(exec: js_sys::Function, config: JsValue) -> Result<WasmLocalNotification, JsValue> {
        let json = to_json(config)?;
        let config = BridgeConfig::from_json_str(&json.to_string()).map_err(to_js_err)?;
        let executor = JsExecutor::new(exec, config.service.clone());
        Ok(Self::from_facade(Facade::from_config(&config, executor)))
    }

    #[wasm_bindgen(js_name = getDefaults)]
    pub fn get_defaults(&self) -> Result<JsValue, JsValue> {
        to_js(&*self.inner.defaults())
    }

    #[wasm_bindgen(js_name = setDefaults)]
    pub fn set_defaults(&self, overrides: JsValue) -> Result<(), JsValue> {
        match to_json(overrides)? {
            Value::Object(map) => {
                self.inner.set_defaults(&map);
                Ok(())
            }
            other => Err(JsValue::from_str(&format!(
                "setDefaults expects an object, got {}",
                other
            ))),
        }
    }

    /// Listen for the document's `deviceready` event and apply platform
    /// defaults when it fires. Safe to call more than once.
    #[wasm_bindgen(js_name = attachDeviceReady)]
    pub fn attach_device_ready(&self) -> Result<(), JsValue> {
        if self.device_ready.borrow().is_some() {
            return Ok(());
        }
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| JsValue::from_str("no document to attach to"))?;

        let facade = Arc::clone(&self.inner);
        let handler = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
            facade.on_device_ready(detect_platform());
        });
        document.add_event_listener_with_callback(
            DEVICE_READY_EVENT,
            handler.as_ref().unchecked_ref(),
        )?;
        *self.device_ready.borrow_mut() = Some(handler);
        Ok(())
    }

    /// Readiness signal for shells that report the platform themselves.
    #[wasm_bindgen(js_name = deviceReady)]
    pub fn device_ready(&self, platform: String) -> bool {
        self.inner.on_device_ready(Platform::from_identifier(&platform))
    }

    #[wasm_bindgen(getter)]
    pub fn platform(&self) -> Option<String> {
        self.inner.platform().map(|p| p.identifier().to_string())
    }

    pub fn add(&self, descriptor: JsValue) -> Result<String, JsValue> {
        let notification = notification_from_js(&descriptor)?;
        self.inner
            .add(notification)
            .map(NotificationId::into_string)
            .map_err(to_js_err)
    }

    #[wasm_bindgen(js_name = addMulti)]
    pub fn add_multi(&self, batch: JsValue) -> Result<(), JsValue> {
        let batch = batch_from_js(&batch)?;
        self.inner.add_multi(batch).map_err(to_js_err)
    }

    pub fn cancel(&self, id: JsValue) -> Result<(), JsValue> {
        self.inner.cancel(id_from_js(id)?);
        Ok(())
    }

    #[wasm_bindgen(js_name = cancelAll)]
    pub fn cancel_all(&self) {
        self.inner.cancel_all();
    }

    /// `callback` runs with `scope` as `this`. A falsy scope counts as
    /// absent and `this` is this plugin instance instead.
    #[wasm_bindgen(js_name = hasPermission)]
    pub fn has_permission(&self, callback: js_sys::Function, scope: JsValue) {
        let callback = JsCallback::new(callback);
        let scope = if scope.is_falsy() {
            JsValue::from(Self {
                inner: Arc::clone(&self.inner),
                device_ready: RefCell::new(None),
            })
        } else {
            scope
        };
        self.inner.has_permission(move |granted| {
            callback.call_with(&scope, &[JsValue::from_bool(granted)]);
        });
    }

    #[wasm_bindgen(js_name = promptForPermission)]
    pub fn prompt_for_permission(&self) {
        self.inner.prompt_for_permission();
    }

    #[wasm_bindgen(js_name = isScheduled)]
    pub fn is_scheduled(&self, id: JsValue, callback: js_sys::Function) -> Result<(), JsValue> {
        let callback = JsCallback::new(callback);
        self.inner.is_scheduled(id_from_js(id)?, move |scheduled| {
            callback.call_with(&JsValue::NULL, &[JsValue::from_bool(scheduled)]);
        });
        Ok(())
    }

    #[wasm_bindgen(js_name = getScheduledIds)]
    pub fn get_scheduled_ids(&self, callback: js_sys::Function) {
        let callback = JsCallback::new(callback);
        self.inner.get_scheduled_ids(move |ids| {
            let array = ids
                .iter()
                .map(|id| JsValue::from_str(id.as_str()))
                .collect::<js_sys::Array>();
            callback.call_with(&JsValue::NULL, &[array.into()]);
        });
    }

    pub fn ready(&self) {
        self.inner.ready();
    }

    /// Register `listener(id, state, json)` for an event ("click" or
    /// "onclick"). Returns a handle for `off`.
    pub fn on(&self, event: String, listener: js_sys::Function) -> Result<f64, JsValue> {
        let kind: EventKind = event.parse().map_err(to_js_err)?;
        let id = self
            .inner
            .subscribe_to(kind, Arc::new(JsCallback::new(listener)));
        Ok(id.as_u64() as f64)
    }

    pub fn off(&self, handle: f64) -> bool {
        if handle < 0.0 || handle.fract() != 0.0 {
            return false;
        }
        self.inner.unsubscribe(ListenerId::from_u64(handle as u64))
    }

    /// Entry point for the native side: deliver a lifecycle event by hook
    /// name. Returns how many listeners received it.
    pub fn fire(&self, hook: String, id: String, state: String, json: String) -> Result<u32, JsValue> {
        self.inner
            .dispatch_hook(&hook, &id, &state, &json)
            .map(|delivered| delivered as u32)
            .map_err(to_js_err)
    }
}

impl Drop for WasmLocalNotification {
    fn drop(&mut self) {
        let Some(handler) = self.device_ready.borrow_mut().take() else {
            return;
        };
        if let Some(document) = web_sys::window().and_then(|window| window.document()) {
            let _ = document.remove_event_listener_with_callback(
                DEVICE_READY_EVENT,
                handler.as_ref().unchecked_ref(),
            );
        }
    }
}
