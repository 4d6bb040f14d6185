//! JavaScript fragments evaluated in the page to resolve selectors and
//! perform element actions.
//!
//! The page under test renders through a virtual DOM, so value changes go
//! through the native property setters followed by synthetic `input`/`change`
//! events; a plain `.value =` assignment would not be observed.

use serde_json::json;

use crate::errors::DriveError;
use crate::selector::Selector;

/// Shared helpers prepended to every element script.
const RESOLVER_JS: &str = r#"
function __visible(el) {
    if (!el || !el.getClientRects || el.getClientRects().length === 0) return false;
    const style = window.getComputedStyle(el);
    return style.visibility !== 'hidden' && style.display !== 'none';
}
function __ownText(el) {
    return (el.innerText || el.textContent || '').trim();
}
function __accessibleName(el) {
    const aria = el.getAttribute && el.getAttribute('aria-label');
    if (aria) return aria.trim();
    return __ownText(el);
}
function __roleCandidates(root, role) {
    const out = [];
    root.querySelectorAll('[role="' + role + '"]').forEach((el) => out.push(el));
    const implicit = {
        button: 'button, input[type="button"], input[type="submit"]',
        heading: 'h1, h2, h3, h4, h5, h6',
        checkbox: 'input[type="checkbox"]',
        link: 'a[href]',
        textbox: 'input:not([type]), input[type="text"], input[type="email"], input[type="password"], textarea'
    }[role];
    if (implicit) {
        root.querySelectorAll(implicit).forEach((el) => {
            if (!out.includes(el)) out.push(el);
        });
    }
    return out;
}
function __matchOne(root, part) {
    switch (part.kind) {
        case 'role': {
            let els = __roleCandidates(root, part.role);
            if (part.name != null) {
                els = els.filter((el) => __accessibleName(el) === part.name);
            }
            return els;
        }
        case 'placeholder':
            return Array.from(root.querySelectorAll('input, textarea'))
                .filter((el) => (el.getAttribute('placeholder') || '') === part.text);
        case 'text': {
            const hits = Array.from(root.querySelectorAll('*')).filter((el) => {
                const t = __ownText(el);
                if (!t) return false;
                return part.exact ? t === part.text : t.includes(part.text);
            });
            // keep only the deepest matches so a hit on <body> never
            // shadows the real node
            return hits.filter((el) => !hits.some((o) => o !== el && el.contains(o)));
        }
        case 'css':
            return Array.from(root.querySelectorAll(part.css));
        default:
            return [];
    }
}
function __resolveAll(spec) {
    let els = null;
    for (const part of spec.parts) {
        if (part.kind === 'nth') {
            els = els && els.length > part.index ? [els[part.index]] : [];
            continue;
        }
        if (els === null) {
            els = __matchOne(document, part);
        } else {
            const next = [];
            els.forEach((root) => __matchOne(root, part).forEach((el) => {
                if (!next.includes(el)) next.push(el);
            }));
            els = next;
        }
    }
    return els || [];
}
"#;

/// Lower a selector into the JSON spec the resolver consumes.
fn selector_spec(selector: &Selector) -> Result<serde_json::Value, DriveError> {
    fn part(selector: &Selector) -> Result<serde_json::Value, DriveError> {
        match selector {
            Selector::Role { role, name } => Ok(json!({
                "kind": "role",
                "role": role.to_lowercase(),
                "name": name,
            })),
            Selector::Placeholder(text) => Ok(json!({ "kind": "placeholder", "text": text })),
            Selector::Text { text, exact } => {
                Ok(json!({ "kind": "text", "text": text, "exact": exact }))
            }
            Selector::Css(css) => Ok(json!({ "kind": "css", "css": css })),
            Selector::Nth(index) => Ok(json!({ "kind": "nth", "index": index })),
            Selector::Chain(_) => Err(DriveError::InvalidSelector(
                "nested selector chains are not supported".to_string(),
            )),
            Selector::Invalid(reason) => Err(DriveError::InvalidSelector(reason.clone())),
        }
    }

    let parts = match selector {
        Selector::Chain(parts) => parts.iter().map(part).collect::<Result<Vec<_>, _>>()?,
        other => vec![part(other)?],
    };
    Ok(json!({ "parts": parts }))
}

fn element_script(selector: &Selector, body: &str) -> Result<String, DriveError> {
    let spec = selector_spec(selector)?;
    Ok(format!(
        "(() => {{\n{RESOLVER_JS}\nconst __els = __resolveAll({spec});\n{body}\n}})()"
    ))
}

pub fn is_visible(selector: &Selector) -> Result<String, DriveError> {
    element_script(selector, "return __els.some(__visible);")
}

/// Reports presence and visibility in one probe, for element-state waits.
pub fn element_state(selector: &Selector) -> Result<String, DriveError> {
    element_script(
        selector,
        "return { found: __els.length > 0, visible: __els.some(__visible) };",
    )
}

pub fn click(selector: &Selector, force: bool) -> Result<String, DriveError> {
    let force = if force { "true" } else { "false" };
    element_script(
        selector,
        &format!(
            r#"const el = __els.find(__visible) || __els[0];
if (!el) return {{ found: false }};
if (!{force} && !__visible(el)) return {{ found: true, clicked: false }};
el.scrollIntoView({{ block: 'center', inline: 'center' }});
el.click();
return {{ found: true, clicked: true }};"#
        ),
    )
}

pub fn fill(selector: &Selector, value: &str) -> Result<String, DriveError> {
    let value = serde_json::to_string(value)
        .map_err(|e| DriveError::Protocol(format!("value serialize: {e}")))?;
    element_script(
        selector,
        &format!(
            r#"const el = __els.find(__visible) || __els[0];
if (!el) return {{ found: false }};
const proto = el instanceof HTMLTextAreaElement
    ? HTMLTextAreaElement.prototype
    : HTMLInputElement.prototype;
const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
el.focus();
setter.call(el, {value});
el.dispatchEvent(new Event('input', {{ bubbles: true }}));
el.dispatchEvent(new Event('change', {{ bubbles: true }}));
return {{ found: true }};"#
        ),
    )
}

pub fn set_checked(selector: &Selector, checked: bool) -> Result<String, DriveError> {
    let want = if checked { "true" } else { "false" };
    // Toggling goes through click() so framework change handlers fire.
    element_script(
        selector,
        &format!(
            r#"const el = __els[0];
if (!el) return {{ found: false }};
if (!!el.checked !== {want}) el.click();
return {{ found: true, checked: !!el.checked }};"#
        ),
    )
}

pub fn dispatch_event(event_name: &str) -> Result<String, DriveError> {
    let name = serde_json::to_string(event_name)
        .map_err(|e| DriveError::Protocol(format!("event name serialize: {e}")))?;
    Ok(format!("window.dispatchEvent(new Event({name})); true"))
}

pub const READY_STATE: &str = "document.readyState";
pub const CURRENT_URL: &str = "window.location.href";
pub const PAGE_CONTENT: &str = "document.documentElement.outerHTML";
