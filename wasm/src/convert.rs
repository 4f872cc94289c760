// JS <-> JSON conversion at the page boundary
//
// Descriptors arrive as plain JS objects. Properties holding `undefined`
// count as missing and are dropped, as `JSON.stringify` would. `Date`
// instances have no JSON shape of their own, so they are rewritten to ISO
// strings and resolved by the core like any other RFC 3339 date.

use localnotify_core::{BridgeError, Notification, NotificationBatch};
use serde::Serialize;
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub fn to_js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}", err))
}

/// Serialize to plain JS objects (not `Map`s).
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(to_js_err)
}

pub fn to_json(value: JsValue) -> Result<Value, JsValue> {
    if value.is_undefined() {
        return Ok(Value::Null);
    }
    if let Some(date) = value.dyn_ref::<js_sys::Date>() {
        return date_to_iso(date).map(Value::String);
    }
    if js_sys::Array::is_array(&value) {
        let items: js_sys::Array = value.unchecked_into();
        return items
            .iter()
            .map(to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }
    if value.is_object() && !value.is_function() {
        return object_to_json(value.unchecked_ref::<js_sys::Object>());
    }
    serde_wasm_bindgen::from_value(value).map_err(to_js_err)
}

/// Own enumerable properties, skipping those set to `undefined`.
fn object_to_json(object: &js_sys::Object) -> Result<Value, JsValue> {
    let mut map = Map::new();
    for entry in js_sys::Object::entries(object).iter() {
        let entry: js_sys::Array = entry.unchecked_into();
        let value = entry.get(1);
        if value.is_undefined() {
            continue;
        }
        let key = entry
            .get(0)
            .as_string()
            .ok_or_else(|| JsValue::from_str("non-string property key"))?;
        map.insert(key, to_json(value)?);
    }
    Ok(Value::Object(map))
}

fn date_to_iso(date: &js_sys::Date) -> Result<String, JsValue> {
    if date.get_time().is_nan() {
        return Err(to_js_err(BridgeError::InvalidDate("Invalid Date".into())));
    }
    Ok(String::from(date.to_iso_string()))
}

pub fn notification_from_js(descriptor: &JsValue) -> Result<Notification, JsValue> {
    Notification::from_json(to_json(descriptor.clone())?).map_err(to_js_err)
}

pub fn batch_from_js(batch: &JsValue) -> Result<NotificationBatch, JsValue> {
    NotificationBatch::from_json(to_json(batch.clone())?).map_err(to_js_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn object(entries: &[(&str, JsValue)]) -> JsValue {
        let object = js_sys::Object::new();
        for (key, value) in entries {
            js_sys::Reflect::set(&object, &JsValue::from_str(key), value).unwrap();
        }
        object.into()
    }

    #[wasm_bindgen_test]
    fn test_undefined_properties_are_dropped() {
        let nested = object(&[("keep", JsValue::from_f64(1.0)), ("drop", JsValue::UNDEFINED)]);
        let value = object(&[
            ("title", JsValue::UNDEFINED),
            ("badge", JsValue::NULL),
            ("nested", nested),
        ]);
        assert_eq!(
            to_json(value).unwrap(),
            json!({"badge": null, "nested": {"keep": 1.0}})
        );
    }

    #[wasm_bindgen_test]
    fn test_dates_become_iso_strings() {
        let date = js_sys::Date::new(&JsValue::from_str("2024-01-01T00:00:00Z"));
        let value = object(&[("date", date.into())]);
        assert_eq!(
            to_json(value).unwrap(),
            json!({"date": "2024-01-01T00:00:00.000Z"})
        );

        let invalid = js_sys::Date::new(&JsValue::from_str("not a date"));
        assert!(to_json(invalid.into()).is_err());
    }

    #[wasm_bindgen_test]
    fn test_batch_items_skip_undefined() {
        let items = js_sys::Array::of2(
            &object(&[("id", JsValue::from_f64(1.0)), ("title", JsValue::UNDEFINED)]),
            &object(&[("id", JsValue::from_str("2"))]),
        );
        let batch = batch_from_js(&object(&[("notifications", items.into())])).unwrap();
        let notifications = batch.notifications.unwrap();
        assert!(!notifications[0].contains("title"));
        assert_eq!(notifications[1].get("id"), Some(&json!("2")));
    }
}
