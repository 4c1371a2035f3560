//! WASM bindings for the htmlfmt formatter.
//!
//! Exposes `format()` to JavaScript via wasm-bindgen.
//! Returns a JS object `{ formatted, changed }` or throws on error.

use htmlfmt::{FormatError, Formatter};
use wasm_bindgen::prelude::*;

/// Format HTML source.
///
/// `indent` overrides the indent unit (two spaces by default).
/// Returns a JS object with `{ formatted: string, changed: boolean }`.
/// Throws a JS error if the source cannot be formatted.
#[wasm_bindgen]
pub fn format(source: &str, indent: Option<String>) -> Result<JsValue, JsError> {
    let formatted = format_native(source, indent).map_err(|e| JsError::new(&e.to_string()))?;
    let changed = formatted != source;

    let js_obj = js_sys::Object::new();
    js_sys::Reflect::set(&js_obj, &"formatted".into(), &formatted.into())
        .map_err(|_| JsError::new("Failed to set formatted property"))?;
    js_sys::Reflect::set(&js_obj, &"changed".into(), &changed.into())
        .map_err(|_| JsError::new("Failed to set changed property"))?;

    Ok(js_obj.into())
}

/// Get the formatter version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn format_native(source: &str, indent: Option<String>) -> Result<String, FormatError> {
    let formatter = match indent {
        Some(indent) => Formatter::new().with_indent(indent),
        None => Formatter::new(),
    };
    formatter.format_str(source)
}
