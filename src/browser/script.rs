//! DOM query snippets evaluated in the page
//!
//! Every user-supplied string is embedded as a JSON string literal, which is
//! also a valid JavaScript string literal, so selectors and values cannot
//! break out of the expression.

/// Shared visibility predicate, in the spirit of Playwright's `isVisible`:
/// attached, not `display: none`/`visibility: hidden`, and a non-empty box.
const IS_VISIBLE_FN: &str = "function __visible(el) {\
 if (!el || !el.isConnected) return false;\
 const style = window.getComputedStyle(el);\
 if (style.display === 'none' || style.visibility === 'hidden' || style.visibility === 'collapse') return false;\
 const rect = el.getBoundingClientRect();\
 return rect.width > 0 || rect.height > 0;\
}";

fn quote(s: &str) -> String {
    // Serializing a &str cannot fail
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// `true` when an element matches `selector`
pub fn exists(selector: &str) -> String {
    format!("document.querySelector({}) !== null", quote(selector))
}

/// `true` when the element matching `selector` is visible
pub fn is_visible(selector: &str) -> String {
    format!(
        "(() => {{ {IS_VISIBLE_FN} return __visible(document.querySelector({})); }})()",
        quote(selector)
    )
}

/// `{ found, text }` for the element matching `selector`
///
/// An object rather than `null` for a missing element, since a by-value
/// `null` carries no value over CDP.
pub fn text_of(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); \
return {{ found: el !== null, text: el ? (el.innerText ?? el.textContent ?? '') : '' }}; }})()",
        quote(selector)
    )
}

/// `true` when a visible element directly holds text containing `text`
///
/// Only text nodes are inspected, so a match means the innermost element
/// carrying the text is visible, not merely `<body>`.
pub fn text_visible(text: &str) -> String {
    format!(
        "(() => {{ {IS_VISIBLE_FN} const needle = {}; \
const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT); \
let node; \
while ((node = walker.nextNode())) {{ \
if (node.nodeValue && node.nodeValue.includes(needle) && __visible(node.parentElement)) return true; \
}} \
return false; }})()",
        quote(text)
    )
}

/// Set an input's value the way typing would, firing `input` and `change`
///
/// Evaluates to `false` when no element matches.
pub fn fill(selector: &str, value: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); \
if (!el) return false; \
el.focus(); \
el.value = {}; \
el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
return true; }})()",
        quote(selector),
        quote(value)
    )
}
