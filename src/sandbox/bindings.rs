#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Browser-like globals for the sandboxed script engine.
//!
//! Native functions in Boa must be `Copy` closures, so none of these
//! bindings capture the sandbox directly; element proxies carry their arena
//! node id in a `__node` property and every binding reaches the live DOM,
//! console log, and listener records through the thread-local sandbox state.

use boa_engine::{
    Context, JsNativeError, JsObject, JsResult, JsString, JsValue, NativeFunction, Source,
    js_string,
    object::{ObjectInitializer, builtins::JsArray},
    property::Attribute,
};

use crate::{
    css::{computed_value, parse_declarations, serialize_declarations},
    dom::{selector::SelectorList, tree::NodeId},
    sandbox::state::{self, CallbackRef, DOCUMENT_TARGET_KEY, ListenerRecord, TimerRecord},
};

/// Inline-style properties exposed as direct accessors on `element.style`,
/// keyed by their JavaScript names. Anything else goes through
/// `setProperty`/`getPropertyValue`.
const STYLE_PROPS: &[(&str, &str)] = &[
    ("background", "background"),
    ("backgroundColor", "background-color"),
    ("backgroundImage", "background-image"),
    ("border", "border"),
    ("borderColor", "border-color"),
    ("borderRadius", "border-radius"),
    ("borderStyle", "border-style"),
    ("borderWidth", "border-width"),
    ("bottom", "bottom"),
    ("color", "color"),
    ("cursor", "cursor"),
    ("display", "display"),
    ("fontFamily", "font-family"),
    ("fontSize", "font-size"),
    ("fontWeight", "font-weight"),
    ("height", "height"),
    ("left", "left"),
    ("margin", "margin"),
    ("opacity", "opacity"),
    ("padding", "padding"),
    ("position", "position"),
    ("right", "right"),
    ("textAlign", "text-align"),
    ("textDecoration", "text-decoration"),
    ("top", "top"),
    ("transform", "transform"),
    ("transition", "transition"),
    ("visibility", "visibility"),
    ("width", "width"),
];

/// Installs every binding into a freshly created context. Must run before
/// any submission script executes, and after the sandbox state is
/// installed on this thread.
pub fn install(context: &mut Context, base_url: &str) -> JsResult<()> {
    register_console(context)?;
    register_document(context)?;
    register_window(context, base_url)?;

    // Plain-script Event/CustomEvent shims so submissions can construct and
    // dispatch their own events; dispatchEvent only reads `type` off them.
    context.eval(Source::from_bytes(
        br#"
        function Event(type, options) {
            this.type = String(type);
            this.bubbles = !!(options && options.bubbles);
        }
        function CustomEvent(type, options) {
            Event.call(this, type, options);
            this.detail = options && options.detail;
        }
        "#,
    ))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// console
// ---------------------------------------------------------------------------

/// Registers the intercepted `console` object.
fn register_console(context: &mut Context) -> JsResult<()> {
    let mut init = ObjectInitializer::new(context);
    for level in ["log", "info", "warn", "error"] {
        init.function(
            NativeFunction::from_copy_closure(move |_this, args, ctx| {
                let message = join_args(args, ctx)?;
                state::try_with(|s| s.log(level, message));
                Ok(JsValue::undefined())
            }),
            JsString::from(level),
            1,
        );
    }
    let console = init.build();
    context.register_global_property(js_string!("console"), console, Attribute::all())
}

// ---------------------------------------------------------------------------
// document
// ---------------------------------------------------------------------------

/// Registers the `document` object.
fn register_document(context: &mut Context) -> JsResult<()> {
    let body = state::try_with(|s| s.dom.body());
    let head = state::try_with(|s| {
        s.dom
            .elements()
            .into_iter()
            .find(|&e| s.dom.tag(e) == Some("head"))
    })
    .flatten();

    let body_proxy = body.map(|id| build_element_proxy(context, id));
    let head_proxy = head.map(|id| build_element_proxy(context, id));

    let mut init = ObjectInitializer::new(context);
    init.function(
        NativeFunction::from_fn_ptr(doc_get_element_by_id),
        js_string!("getElementById"),
        1,
    );
    init.function(
        NativeFunction::from_fn_ptr(doc_query_selector),
        js_string!("querySelector"),
        1,
    );
    init.function(
        NativeFunction::from_fn_ptr(doc_query_selector_all),
        js_string!("querySelectorAll"),
        1,
    );
    init.function(
        NativeFunction::from_fn_ptr(doc_create_element),
        js_string!("createElement"),
        1,
    );
    init.function(
        NativeFunction::from_fn_ptr(doc_create_text_node),
        js_string!("createTextNode"),
        1,
    );
    init.function(
        NativeFunction::from_fn_ptr(doc_add_event_listener),
        js_string!("addEventListener"),
        2,
    );
    init.function(
        NativeFunction::from_fn_ptr(noop),
        js_string!("removeEventListener"),
        2,
    );
    if let Some(proxy) = body_proxy {
        init.property(js_string!("body"), proxy, Attribute::all());
    }
    if let Some(proxy) = head_proxy {
        init.property(js_string!("head"), proxy, Attribute::all());
    }
    let document = init.build();
    context.register_global_property(js_string!("document"), document, Attribute::all())
}

/// `document.getElementById(id)`
fn doc_get_element_by_id(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let id = arg_str(args, 0, context)?;
    if id.is_empty() {
        return Ok(JsValue::null());
    }
    match state::try_with(|s| s.dom.element_by_id(&id)).flatten() {
        Some(node) => Ok(JsValue::from(build_element_proxy(context, node))),
        None => Ok(JsValue::null()),
    }
}

/// `document.querySelector(selector)`
fn doc_query_selector(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    query_scoped(args, context, None, true)
}

/// `document.querySelectorAll(selector)`
fn doc_query_selector_all(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    query_scoped(args, context, None, false)
}

/// `document.createElement(tag)`
fn doc_create_element(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let tag = arg_str(args, 0, context)?;
    match state::try_with(|s| s.dom.create_element(&tag)) {
        Some(node) => Ok(JsValue::from(build_element_proxy(context, node))),
        None => Ok(JsValue::null()),
    }
}

/// `document.createTextNode(text)`
fn doc_create_text_node(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let text = arg_str(args, 0, context)?;
    match state::try_with(|s| s.dom.create_text(text)) {
        Some(node) => Ok(JsValue::from(build_element_proxy(context, node))),
        None => Ok(JsValue::null()),
    }
}

/// `document.addEventListener(type, listener, options)`
///
/// `DOMContentLoaded` listeners run immediately: by the time any script
/// executes here, the document is already fully parsed.
fn doc_add_event_listener(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let event_type = arg_str(args, 0, context)?;
    let callback = park_callback(args.get(1), context)?;
    let capture = capture_flag(args.get(2), context)?;
    state::try_with(|s| {
        s.listeners.push(ListenerRecord {
            element_key: DOCUMENT_TARGET_KEY.to_string(),
            event_type:  event_type.clone(),
            callback:    callback.clone(),
            capture,
        });
    });
    if event_type == "DOMContentLoaded" {
        run_callback(&callback, &JsValue::undefined(), &[], context);
    }
    Ok(JsValue::undefined())
}

// ---------------------------------------------------------------------------
// window and plain globals
// ---------------------------------------------------------------------------

/// Registers `window` (as an alias of the global object, so
/// `window.NAME = NAME` produces a real global) plus the timer, listener,
/// and style globals scripts reach for without the `window.` prefix.
fn register_window(context: &mut Context, base_url: &str) -> JsResult<()> {
    let global = context.global_object();
    context.register_global_property(js_string!("window"), global, Attribute::all())?;

    let functions: &[(&str, fn(&JsValue, &[JsValue], &mut Context) -> JsResult<JsValue>)] = &[
        ("addEventListener", win_add_event_listener),
        ("removeEventListener", noop),
        ("setTimeout", set_timeout),
        ("setInterval", set_interval),
        ("clearTimeout", clear_timer),
        ("clearInterval", clear_timer),
        ("requestAnimationFrame", request_animation_frame),
        ("getComputedStyle", get_computed_style),
        ("alert", noop),
    ];
    for &(name, function) in functions {
        let function = NativeFunction::from_fn_ptr(function).to_js_function(context.realm());
        context.register_global_property(JsString::from(name), function, Attribute::all())?;
    }

    let location = ObjectInitializer::new(context)
        .property(js_string!("href"), JsString::from(base_url), Attribute::all())
        .property(js_string!("protocol"), js_string!("https:"), Attribute::all())
        .property(js_string!("pathname"), js_string!("/"), Attribute::all())
        .property(js_string!("search"), js_string!(""), Attribute::all())
        .property(js_string!("hash"), js_string!(""), Attribute::all())
        .build();
    context.register_global_property(js_string!("location"), location, Attribute::all())
}

/// `window.addEventListener(type, listener, options)`
fn win_add_event_listener(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let event_type = arg_str(args, 0, context)?;
    let callback = park_callback(args.get(1), context)?;
    let capture = capture_flag(args.get(2), context)?;
    state::try_with(|s| {
        s.listeners.push(ListenerRecord {
            element_key: DOCUMENT_TARGET_KEY.to_string(),
            event_type:  event_type.clone(),
            callback:    callback.clone(),
            capture,
        });
    });
    if event_type == "DOMContentLoaded" || event_type == "load" {
        run_callback(&callback, &JsValue::undefined(), &[], context);
    }
    Ok(JsValue::undefined())
}

/// `setTimeout(callback, delay)`
fn set_timeout(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    record_timer(args, context, false)
}

/// `setInterval(callback, delay)`
fn set_interval(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    record_timer(args, context, true)
}

/// Shared body of `setTimeout`/`setInterval`.
fn record_timer(args: &[JsValue], context: &mut Context, interval: bool) -> JsResult<JsValue> {
    let callback = park_callback(args.first(), context)?;
    let delay_ms = match args.get(1) {
        Some(v) => v.to_number(context)?.max(0.0) as u64,
        None => 0,
    };
    let Some(callback) = callback else {
        return Ok(JsValue::from(0));
    };
    let id = state::try_with(|s| {
        let id = s.next_timer_id();
        s.timers.push(TimerRecord {
            id,
            callback,
            delay_ms,
            interval,
        });
        id
    })
    .unwrap_or(0);
    Ok(JsValue::from(id))
}

/// `clearTimeout(id)` / `clearInterval(id)`
fn clear_timer(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let id = match args.first() {
        Some(v) => v.to_number(context)? as u32,
        None => 0,
    };
    state::try_with(|s| s.timers.retain(|t| t.id != id));
    Ok(JsValue::undefined())
}

/// `requestAnimationFrame(callback)`: treated as a zero-delay timeout.
fn request_animation_frame(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let callback = [args.first().cloned().unwrap_or(JsValue::undefined())];
    record_timer(&callback, context, false)
}

/// `getComputedStyle(element)`
fn get_computed_style(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let node = match args.first() {
        Some(value) => node_of(value, context)?,
        None => None,
    };
    let Some(node) = node else {
        return Err(JsNativeError::typ()
            .with_message("getComputedStyle expects an element")
            .into());
    };
    let object = ObjectInitializer::new(context)
        .property(
            js_string!("__node"),
            JsValue::from(node as f64),
            Attribute::READONLY,
        )
        .function(
            NativeFunction::from_fn_ptr(computed_get_property_value),
            js_string!("getPropertyValue"),
            1,
        )
        .build();
    Ok(JsValue::from(object))
}

/// `getComputedStyle(el).getPropertyValue(property)`
fn computed_get_property_value(
    this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let property = arg_str(args, 0, context)?;
    let Some(node) = node_of(this, context)? else {
        return Ok(JsValue::from(js_string!("")));
    };
    let value = state::try_with(|s| computed_value(&s.dom, &s.sheets, node, &property))
        .flatten()
        .unwrap_or_default();
    Ok(JsValue::from(JsString::from(value.as_str())))
}

// ---------------------------------------------------------------------------
// element proxies
// ---------------------------------------------------------------------------

/// Builds a proxy object for one arena node. Methods and accessors find the
/// node again through the `__node` property on `this`.
pub(crate) fn build_element_proxy(context: &mut Context, node: NodeId) -> JsObject {
    let accessors: &[(
        &str,
        fn(&JsValue, &[JsValue], &mut Context) -> JsResult<JsValue>,
        Option<fn(&JsValue, &[JsValue], &mut Context) -> JsResult<JsValue>>,
    )] = &[
        ("id", el_get_id, None),
        ("tagName", el_get_tag_name, None),
        ("className", el_get_class_name, Some(el_set_class_name)),
        ("textContent", el_get_text, Some(el_set_text)),
        ("innerHTML", el_get_inner_html, Some(el_set_inner_html)),
        ("innerText", el_get_text, Some(el_set_text)),
        ("value", el_get_value, Some(el_set_value)),
        ("parentElement", el_get_parent, None),
        ("style", el_get_style, None),
        ("classList", el_get_class_list, None),
    ];

    let mut built = Vec::with_capacity(accessors.len());
    for &(name, getter, setter) in accessors {
        let getter = NativeFunction::from_fn_ptr(getter).to_js_function(context.realm());
        let setter =
            setter.map(|s| NativeFunction::from_fn_ptr(s).to_js_function(context.realm()));
        built.push((name, getter, setter));
    }

    let mut init = ObjectInitializer::new(context);
    init.property(
        js_string!("__node"),
        JsValue::from(node as f64),
        Attribute::READONLY,
    );
    for (name, getter, setter) in built {
        init.accessor(JsString::from(name), Some(getter), setter, Attribute::all());
    }
    init.function(
        NativeFunction::from_fn_ptr(el_get_attribute),
        js_string!("getAttribute"),
        1,
    );
    init.function(
        NativeFunction::from_fn_ptr(el_set_attribute),
        js_string!("setAttribute"),
        2,
    );
    init.function(
        NativeFunction::from_fn_ptr(el_has_attribute),
        js_string!("hasAttribute"),
        1,
    );
    init.function(
        NativeFunction::from_fn_ptr(el_remove_attribute),
        js_string!("removeAttribute"),
        1,
    );
    init.function(
        NativeFunction::from_fn_ptr(el_add_event_listener),
        js_string!("addEventListener"),
        2,
    );
    init.function(
        NativeFunction::from_fn_ptr(noop),
        js_string!("removeEventListener"),
        2,
    );
    init.function(
        NativeFunction::from_fn_ptr(el_append_child),
        js_string!("appendChild"),
        1,
    );
    init.function(
        NativeFunction::from_fn_ptr(el_remove_child),
        js_string!("removeChild"),
        1,
    );
    init.function(NativeFunction::from_fn_ptr(el_remove), js_string!("remove"), 0);
    init.function(
        NativeFunction::from_fn_ptr(el_query_selector),
        js_string!("querySelector"),
        1,
    );
    init.function(
        NativeFunction::from_fn_ptr(el_query_selector_all),
        js_string!("querySelectorAll"),
        1,
    );
    init.function(
        NativeFunction::from_fn_ptr(el_dispatch_event),
        js_string!("dispatchEvent"),
        1,
    );
    init.build()
}

/// `element.id`
fn el_get_id(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    read_attr_of_this(this, "id", context)
}

/// `element.tagName`
fn el_get_tag_name(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let Some(node) = node_of(this, context)? else {
        return Ok(JsValue::from(js_string!("")));
    };
    let tag = state::try_with(|s| s.dom.tag(node).map(str::to_ascii_uppercase))
        .flatten()
        .unwrap_or_default();
    Ok(JsValue::from(JsString::from(tag.as_str())))
}

/// `element.className`
fn el_get_class_name(
    this: &JsValue,
    _args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    read_attr_of_this(this, "class", context)
}

/// `element.className = …`
fn el_set_class_name(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let value = arg_str(args, 0, context)?;
    if let Some(node) = node_of(this, context)? {
        state::try_with(|s| s.dom.set_attr(node, "class", &value));
    }
    Ok(JsValue::undefined())
}

/// `element.textContent`
fn el_get_text(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let Some(node) = node_of(this, context)? else {
        return Ok(JsValue::from(js_string!("")));
    };
    let text = state::try_with(|s| s.dom.text_content(node)).unwrap_or_default();
    Ok(JsValue::from(JsString::from(text.as_str())))
}

/// `element.textContent = …`
fn el_set_text(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let text = arg_str(args, 0, context)?;
    if let Some(node) = node_of(this, context)? {
        state::try_with(|s| s.dom.set_text_content(node, &text));
    }
    Ok(JsValue::undefined())
}

/// `element.innerHTML`
fn el_get_inner_html(
    this: &JsValue,
    _args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let Some(node) = node_of(this, context)? else {
        return Ok(JsValue::from(js_string!("")));
    };
    let html = state::try_with(|s| s.dom.inner_html(node)).unwrap_or_default();
    Ok(JsValue::from(JsString::from(html.as_str())))
}

/// `element.innerHTML = …`
fn el_set_inner_html(
    this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let html = arg_str(args, 0, context)?;
    if let Some(node) = node_of(this, context)? {
        let failed =
            state::try_with(|s| s.dom.set_inner_html(node, &html).is_err()).unwrap_or(false);
        if failed {
            state::try_with(|s| s.log("error", "innerHTML fragment could not be parsed".into()));
        }
    }
    Ok(JsValue::undefined())
}

/// `element.value`
fn el_get_value(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    read_attr_of_this(this, "value", context)
}

/// `element.value = …`
fn el_set_value(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let value = arg_str(args, 0, context)?;
    if let Some(node) = node_of(this, context)? {
        state::try_with(|s| s.dom.set_attr(node, "value", &value));
    }
    Ok(JsValue::undefined())
}

/// `element.parentElement`
fn el_get_parent(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let Some(node) = node_of(this, context)? else {
        return Ok(JsValue::null());
    };
    match state::try_with(|s| s.dom.parent_element(node)).flatten() {
        Some(parent) => Ok(JsValue::from(build_element_proxy(context, parent))),
        None => Ok(JsValue::null()),
    }
}

/// `element.style`
fn el_get_style(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let Some(node) = node_of(this, context)? else {
        return Ok(JsValue::null());
    };
    Ok(JsValue::from(build_style_object(context, node)))
}

/// `element.classList`
fn el_get_class_list(
    this: &JsValue,
    _args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let Some(node) = node_of(this, context)? else {
        return Ok(JsValue::null());
    };
    Ok(JsValue::from(build_class_list(context, node)))
}

/// `element.getAttribute(name)`
fn el_get_attribute(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let name = arg_str(args, 0, context)?;
    let Some(node) = node_of(this, context)? else {
        return Ok(JsValue::null());
    };
    match state::try_with(|s| s.dom.attr(node, &name).map(str::to_string)).flatten() {
        Some(value) => Ok(JsValue::from(JsString::from(value.as_str()))),
        None => Ok(JsValue::null()),
    }
}

/// `element.setAttribute(name, value)`
fn el_set_attribute(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let name = arg_str(args, 0, context)?;
    let value = arg_str(args, 1, context)?;
    if let Some(node) = node_of(this, context)?
        && !name.is_empty()
    {
        state::try_with(|s| s.dom.set_attr(node, &name, &value));
    }
    Ok(JsValue::undefined())
}

/// `element.hasAttribute(name)`
fn el_has_attribute(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let name = arg_str(args, 0, context)?;
    let Some(node) = node_of(this, context)? else {
        return Ok(JsValue::from(false));
    };
    let present = state::try_with(|s| s.dom.has_attr(node, &name)).unwrap_or(false);
    Ok(JsValue::from(present))
}

/// `element.removeAttribute(name)`
fn el_remove_attribute(
    this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let name = arg_str(args, 0, context)?;
    if let Some(node) = node_of(this, context)? {
        state::try_with(|s| s.dom.remove_attr(node, &name));
    }
    Ok(JsValue::undefined())
}

/// `element.addEventListener(type, listener, options)`
fn el_add_event_listener(
    this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let event_type = arg_str(args, 0, context)?;
    let callback = park_callback(args.get(1), context)?;
    let capture = capture_flag(args.get(2), context)?;
    if let Some(node) = node_of(this, context)? {
        state::try_with(|s| {
            let element_key = s.element_key(node);
            s.listeners.push(ListenerRecord {
                element_key,
                event_type,
                callback,
                capture,
            });
        });
    }
    Ok(JsValue::undefined())
}

/// `element.appendChild(child)`
fn el_append_child(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let parent = node_of(this, context)?;
    let child = match args.first() {
        Some(value) => node_of(value, context)?,
        None => None,
    };
    if let (Some(parent), Some(child)) = (parent, child) {
        state::try_with(|s| s.dom.attach(parent, child));
    }
    Ok(args.first().cloned().unwrap_or(JsValue::undefined()))
}

/// `element.removeChild(child)`
fn el_remove_child(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let child = match args.first() {
        Some(value) => node_of(value, context)?,
        None => None,
    };
    if let Some(child) = child {
        state::try_with(|s| s.dom.detach(child));
    }
    Ok(args.first().cloned().unwrap_or(JsValue::undefined()))
}

/// `element.remove()`
fn el_remove(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    if let Some(node) = node_of(this, context)? {
        state::try_with(|s| s.dom.detach(node));
    }
    Ok(JsValue::undefined())
}

/// `element.querySelector(selector)`
fn el_query_selector(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let scope = node_of(this, context)?;
    query_scoped(args, context, scope, true)
}

/// `element.querySelectorAll(selector)`
fn el_query_selector_all(
    this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let scope = node_of(this, context)?;
    query_scoped(args, context, scope, false)
}

/// `element.dispatchEvent(event)`
fn el_dispatch_event(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let event_type = match args.first() {
        Some(JsValue::Object(event)) => event
            .get(js_string!("type"), context)?
            .to_string(context)?
            .to_std_string_escaped(),
        Some(other) => other.to_string(context)?.to_std_string_escaped(),
        None => String::new(),
    };
    if let Some(node) = node_of(this, context)?
        && !event_type.is_empty()
    {
        dispatch_event_at(context, node, &event_type)?;
    }
    Ok(JsValue::from(true))
}

// ---------------------------------------------------------------------------
// style and classList objects
// ---------------------------------------------------------------------------

/// Builds the inline `style` object for one element.
fn build_style_object(context: &mut Context, node: NodeId) -> JsObject {
    let mut built = Vec::with_capacity(STYLE_PROPS.len());
    for &(js_name, css_name) in STYLE_PROPS {
        let getter = NativeFunction::from_copy_closure(move |this, _args, ctx| {
            let Some(node) = node_of(this, ctx)? else {
                return Ok(JsValue::from(js_string!("")));
            };
            let value = inline_style_value(node, css_name);
            Ok(JsValue::from(JsString::from(value.as_str())))
        })
        .to_js_function(context.realm());
        let setter = NativeFunction::from_copy_closure(move |this, args, ctx| {
            let value = arg_str(args, 0, ctx)?;
            if let Some(node) = node_of(this, ctx)? {
                set_inline_style(node, css_name, &value);
            }
            Ok(JsValue::undefined())
        })
        .to_js_function(context.realm());
        built.push((js_name, getter, setter));
    }

    let mut init = ObjectInitializer::new(context);
    init.property(
        js_string!("__node"),
        JsValue::from(node as f64),
        Attribute::READONLY,
    );
    init.function(
        NativeFunction::from_fn_ptr(style_set_property),
        js_string!("setProperty"),
        2,
    );
    init.function(
        NativeFunction::from_fn_ptr(style_get_property_value),
        js_string!("getPropertyValue"),
        1,
    );
    init.function(
        NativeFunction::from_fn_ptr(style_remove_property),
        js_string!("removeProperty"),
        1,
    );
    for (name, getter, setter) in built {
        init.accessor(JsString::from(name), Some(getter), Some(setter), Attribute::all());
    }
    init.build()
}

/// `style.setProperty(property, value)`
fn style_set_property(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let property = arg_str(args, 0, context)?.to_ascii_lowercase();
    let value = arg_str(args, 1, context)?;
    if let Some(node) = node_of(this, context)?
        && !property.is_empty()
    {
        set_inline_style(node, &property, &value);
    }
    Ok(JsValue::undefined())
}

/// `style.getPropertyValue(property)`
fn style_get_property_value(
    this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let property = arg_str(args, 0, context)?.to_ascii_lowercase();
    let Some(node) = node_of(this, context)? else {
        return Ok(JsValue::from(js_string!("")));
    };
    let value = inline_style_value(node, &property);
    Ok(JsValue::from(JsString::from(value.as_str())))
}

/// `style.removeProperty(property)`
fn style_remove_property(
    this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let property = arg_str(args, 0, context)?.to_ascii_lowercase();
    if let Some(node) = node_of(this, context)? {
        state::try_with(|s| {
            let mut declarations = parse_declarations(s.dom.attr(node, "style").unwrap_or(""));
            declarations.retain(|d| d.property != property);
            let serialized = serialize_declarations(&declarations);
            s.dom.set_attr(node, "style", &serialized);
        });
    }
    Ok(JsValue::undefined())
}

/// Reads one inline style declaration.
fn inline_style_value(node: NodeId, property: &str) -> String {
    state::try_with(|s| {
        parse_declarations(s.dom.attr(node, "style").unwrap_or(""))
            .into_iter()
            .find(|d| d.property == property)
            .map(|d| d.value)
    })
    .flatten()
    .unwrap_or_default()
}

/// Upserts one inline style declaration.
fn set_inline_style(node: NodeId, property: &str, value: &str) {
    state::try_with(|s| {
        let mut declarations = parse_declarations(s.dom.attr(node, "style").unwrap_or(""));
        match declarations.iter_mut().find(|d| d.property == property) {
            Some(slot) => slot.value = value.to_string(),
            None => declarations.push(crate::css::model::Declaration {
                property:  property.to_string(),
                value:     value.to_string(),
                important: false,
            }),
        }
        let serialized = serialize_declarations(&declarations);
        s.dom.set_attr(node, "style", &serialized);
    });
}

/// Builds the `classList` object for one element.
fn build_class_list(context: &mut Context, node: NodeId) -> JsObject {
    let mut init = ObjectInitializer::new(context);
    init.property(
        js_string!("__node"),
        JsValue::from(node as f64),
        Attribute::READONLY,
    );
    init.function(NativeFunction::from_fn_ptr(cl_add), js_string!("add"), 1);
    init.function(NativeFunction::from_fn_ptr(cl_remove), js_string!("remove"), 1);
    init.function(NativeFunction::from_fn_ptr(cl_toggle), js_string!("toggle"), 1);
    init.function(
        NativeFunction::from_fn_ptr(cl_contains),
        js_string!("contains"),
        1,
    );
    init.build()
}

/// `classList.add(class)`
fn cl_add(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let class = arg_str(args, 0, context)?;
    if let Some(node) = node_of(this, context)?
        && !class.is_empty()
    {
        state::try_with(|s| s.dom.add_class(node, &class));
    }
    Ok(JsValue::undefined())
}

/// `classList.remove(class)`
fn cl_remove(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let class = arg_str(args, 0, context)?;
    if let Some(node) = node_of(this, context)? {
        state::try_with(|s| s.dom.remove_class(node, &class));
    }
    Ok(JsValue::undefined())
}

/// `classList.toggle(class)`
fn cl_toggle(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let class = arg_str(args, 0, context)?;
    let Some(node) = node_of(this, context)? else {
        return Ok(JsValue::from(false));
    };
    let present = state::try_with(|s| s.dom.toggle_class(node, &class)).unwrap_or(false);
    Ok(JsValue::from(present))
}

/// `classList.contains(class)`
fn cl_contains(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let class = arg_str(args, 0, context)?;
    let Some(node) = node_of(this, context)? else {
        return Ok(JsValue::from(false));
    };
    let present = state::try_with(|s| s.dom.has_class(node, &class)).unwrap_or(false);
    Ok(JsValue::from(present))
}

// ---------------------------------------------------------------------------
// events
// ---------------------------------------------------------------------------

/// Builds a minimal event object.
pub(crate) fn build_event(
    context: &mut Context,
    event_type: &str,
    target: Option<JsObject>,
) -> JsObject {
    let target_value = target.map(JsValue::from).unwrap_or(JsValue::null());
    ObjectInitializer::new(context)
        .property(
            js_string!("type"),
            JsString::from(event_type),
            Attribute::all(),
        )
        .property(js_string!("bubbles"), true, Attribute::all())
        .property(js_string!("target"), target_value.clone(), Attribute::all())
        .property(js_string!("currentTarget"), target_value, Attribute::all())
        .function(NativeFunction::from_fn_ptr(noop), js_string!("preventDefault"), 0)
        .function(
            NativeFunction::from_fn_ptr(noop),
            js_string!("stopPropagation"),
            0,
        )
        .build()
}

/// Synthetically dispatches an event at a node.
///
/// Approximates bubbling: for the target and each ancestor, the inline
/// `on<type>` attribute runs first, then recorded listeners whose element
/// signature matches; document/window-level registrations run last.
/// Exceptions from individual handlers become console `error` entries and do
/// not stop the remaining handlers.
pub(crate) fn dispatch_event_at(
    context: &mut Context,
    node: NodeId,
    event_type: &str,
) -> JsResult<()> {
    let (chain, keys, inline_sources) = state::with(|s| {
        let mut chain = vec![node];
        chain.extend(s.dom.ancestors(node));
        let keys: Vec<String> = chain.iter().map(|&n| s.element_key(n)).collect();
        let attr = format!("on{event_type}");
        let inline: Vec<Option<String>> = chain
            .iter()
            .map(|&n| s.dom.attr(n, &attr).map(str::to_string))
            .collect();
        (chain, keys, inline)
    });

    let target_proxy = build_element_proxy(context, node);
    let event = JsValue::from(build_event(context, event_type, Some(target_proxy.clone())));
    let this = JsValue::from(target_proxy);

    for (index, &element) in chain.iter().enumerate() {
        if let Some(source) = &inline_sources[index] {
            run_inline_handler(context, element, source, &event);
        }
        let callbacks: Vec<CallbackRef> = state::with(|s| {
            s.listeners
                .iter()
                .filter(|l| l.event_type == event_type && l.element_key == keys[index])
                .filter_map(|l| l.callback.clone())
                .collect()
        });
        for callback in callbacks {
            run_callback(&Some(callback), &this, std::slice::from_ref(&event), context);
        }
    }

    let document_level: Vec<CallbackRef> = state::with(|s| {
        s.listeners
            .iter()
            .filter(|l| l.event_type == event_type && l.element_key == DOCUMENT_TARGET_KEY)
            .filter_map(|l| l.callback.clone())
            .collect()
    });
    for callback in document_level {
        run_callback(&Some(callback), &this, std::slice::from_ref(&event), context);
    }

    let _ = context.run_jobs();
    Ok(())
}

/// Evaluates one inline `on<type>` attribute with `this` bound to its
/// element.
fn run_inline_handler(context: &mut Context, element: NodeId, source: &str, event: &JsValue) {
    let wrapped = format!("(function (event) {{\n{source}\n}})");
    match context.eval(Source::from_bytes(wrapped.as_bytes())) {
        Ok(JsValue::Object(handler)) if handler.is_callable() => {
            let this = JsValue::from(build_element_proxy(context, element));
            if let Err(error) = handler.call(&this, std::slice::from_ref(event), context) {
                state::try_with(|s| s.log("error", format!("Uncaught {error}")));
            }
        }
        Ok(_) => {}
        Err(error) => {
            state::try_with(|s| s.log("error", format!("Uncaught {error}")));
        }
    }
}

/// Invokes a parked callback, converting exceptions into console `error`
/// entries.
pub(crate) fn run_callback(
    callback: &Option<CallbackRef>,
    this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) {
    match callback {
        Some(CallbackRef::Slot(slot)) => {
            let global = context.global_object();
            match global.get(JsString::from(slot.as_str()), context) {
                Ok(JsValue::Object(function)) if function.is_callable() => {
                    if let Err(error) = function.call(this, args, context) {
                        state::try_with(|s| s.log("error", format!("Uncaught {error}")));
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    state::try_with(|s| s.log("error", format!("Uncaught {error}")));
                }
            }
        }
        Some(CallbackRef::Source(source)) => {
            if let Err(error) = context.eval(Source::from_bytes(source.as_bytes())) {
                state::try_with(|s| s.log("error", format!("Uncaught {error}")));
            }
        }
        None => {}
    }
}

// ---------------------------------------------------------------------------
// shared helpers
// ---------------------------------------------------------------------------

/// A native function that does nothing.
fn noop(_this: &JsValue, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::undefined())
}

/// Stringifies and space-joins every argument of a console call.
fn join_args(args: &[JsValue], context: &mut Context) -> JsResult<String> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(arg.to_string(context)?.to_std_string_escaped());
    }
    Ok(parts.join(" "))
}

/// Reads the string argument at `index`, defaulting to empty.
fn arg_str(args: &[JsValue], index: usize, context: &mut Context) -> JsResult<String> {
    match args.get(index) {
        Some(value) => Ok(value.to_string(context)?.to_std_string_escaped()),
        None => Ok(String::new()),
    }
}

/// Reads the `__node` property off a proxy object.
fn node_of(value: &JsValue, context: &mut Context) -> JsResult<Option<NodeId>> {
    let JsValue::Object(object) = value else {
        return Ok(None);
    };
    let node = object.get(js_string!("__node"), context)?;
    if node.is_undefined() || node.is_null() {
        return Ok(None);
    }
    Ok(Some(node.to_number(context)? as NodeId))
}

/// Reads an attribute off the element behind `this`, defaulting to empty.
fn read_attr_of_this(this: &JsValue, name: &str, context: &mut Context) -> JsResult<JsValue> {
    let Some(node) = node_of(this, context)? else {
        return Ok(JsValue::from(js_string!("")));
    };
    let value = state::try_with(|s| s.dom.attr(node, name).map(str::to_string))
        .flatten()
        .unwrap_or_default();
    Ok(JsValue::from(JsString::from(value.as_str())))
}

/// Parks a callback argument in a hidden global so it can be re-invoked
/// later; strings are kept as source text.
fn park_callback(arg: Option<&JsValue>, context: &mut Context) -> JsResult<Option<CallbackRef>> {
    match arg {
        Some(value) if value.is_callable() || value.is_object() => {
            let Some(slot) = state::try_with(|s| s.next_callback_slot()) else {
                return Ok(None);
            };
            context.register_global_property(
                JsString::from(slot.as_str()),
                value.clone(),
                Attribute::all(),
            )?;
            Ok(Some(CallbackRef::Slot(slot)))
        }
        Some(value) if value.is_string() => Ok(Some(CallbackRef::Source(
            value.to_string(context)?.to_std_string_escaped(),
        ))),
        _ => Ok(None),
    }
}

/// Reads the capture flag from an `addEventListener` options argument.
fn capture_flag(arg: Option<&JsValue>, context: &mut Context) -> JsResult<bool> {
    match arg {
        Some(JsValue::Boolean(flag)) => Ok(*flag),
        Some(JsValue::Object(options)) => {
            Ok(options.get(js_string!("capture"), context)?.to_boolean())
        }
        _ => Ok(false),
    }
}

/// Shared body of the scoped and document-wide query methods.
fn query_scoped(
    args: &[JsValue],
    context: &mut Context,
    scope: Option<NodeId>,
    first_only: bool,
) -> JsResult<JsValue> {
    let selector = arg_str(args, 0, context)?;
    let list = SelectorList::parse(&selector)
        .map_err(|message| JsNativeError::syntax().with_message(message))?;
    let matches = state::try_with(|s| list.query_under(&s.dom, scope.unwrap_or(0)))
        .unwrap_or_default();

    if first_only {
        return match matches.first() {
            Some(&node) => Ok(JsValue::from(build_element_proxy(context, node))),
            None => Ok(JsValue::null()),
        };
    }

    let array = JsArray::new(context);
    for node in matches {
        let proxy = build_element_proxy(context, node);
        array.push(JsValue::from(proxy), context)?;
    }
    Ok(JsValue::from(array))
}
