//! Message personalization.
//!
//! Pure string transforms applied by the send worker to a queue item's
//! content snapshot, in this order:
//!
//! 1. [`render`] — substitute `{{ placeholder }}` tokens from the field map.
//! 2. [`rewrite_links`] — route outbound hyperlinks through the click
//!    redirector.
//! 3. [`inject_tracking_pixel`] — add the one-pixel open beacon.
//! 4. [`append_unsubscribe_footer`] — add the unsubscribe/manage-preferences
//!    footer.
//!
//! The pixel and footer are inserted immediately before the closing
//! `</body>` tag when one exists, otherwise appended at the end. The footer
//! runs last so its own links are never rewritten through the redirector.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::types::DbId;

/// Placeholder token: `{{ name }}`. Whitespace inside the delimiters is
/// tolerated; the token name is matched case-insensitively against the
/// field map.
fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("static regex"))
}

/// `href="..."` attribute with an absolute http(s) target.
fn href_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)href\s*=\s*"(https?://[^"]+)""#).expect("static regex")
    })
}

/// Case-insensitive closing body tag.
fn body_close_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</body\s*>").expect("static regex"))
}

/// Substitute placeholder tokens from `fields`.
///
/// Known field with an absent/empty value renders as the empty string;
/// unknown tokens are left verbatim. Partial personalization is acceptable
/// for marketing templates, so this never errors.
pub fn render(template: &str, fields: &HashMap<String, String>) -> String {
    // Case-insensitive lookup table, built once per call.
    let lowered: HashMap<String, &str> = fields
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.as_str()))
        .collect();

    placeholder_regex()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let token = caps[1].to_ascii_lowercase();
            match lowered.get(&token) {
                Some(value) => (*value).to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Build the one-pixel open-beacon URL, unique to (queue item, subscriber).
pub fn beacon_url(tracking_base: &Url, queue_item_id: DbId, subscriber_id: DbId) -> Url {
    let mut url = tracking_base.clone();
    url.set_path(&format!("t/open/{queue_item_id}-{subscriber_id}.gif"));
    url
}

/// Build the click-redirector URL for one outbound link.
///
/// Carries the original target, the (queue item, subscriber) identifiers,
/// and any campaign-supplied UTM parameters.
pub fn redirect_url(
    tracking_base: &Url,
    queue_item_id: DbId,
    subscriber_id: DbId,
    target: &str,
    utm_params: Option<&serde_json::Value>,
) -> Url {
    let mut url = tracking_base.clone();
    url.set_path("t/click");
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("qi", &queue_item_id.to_string());
        query.append_pair("sid", &subscriber_id.to_string());
        query.append_pair("url", target);
        if let Some(serde_json::Value::Object(params)) = utm_params {
            for (key, value) in params {
                if let Some(value) = value.as_str() {
                    query.append_pair(key, value);
                }
            }
        }
    }
    url
}

/// Deterministic unsubscribe URL for (subscriber, campaign).
pub fn unsubscribe_url(tracking_base: &Url, subscriber_id: DbId, campaign_id: DbId) -> Url {
    let mut url = tracking_base.clone();
    url.set_path("unsubscribe");
    url.query_pairs_mut()
        .append_pair("sid", &subscriber_id.to_string())
        .append_pair("cid", &campaign_id.to_string());
    url
}

/// Rewrite outbound http(s) hyperlinks through the click redirector.
///
/// `mailto:`, anchors, and relative links are left alone.
pub fn rewrite_links(
    html: &str,
    tracking_base: &Url,
    queue_item_id: DbId,
    subscriber_id: DbId,
    utm_params: Option<&serde_json::Value>,
) -> String {
    href_regex()
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let target = &caps[1];
            let wrapped =
                redirect_url(tracking_base, queue_item_id, subscriber_id, target, utm_params);
            format!("href=\"{wrapped}\"")
        })
        .into_owned()
}

/// Insert `fragment` immediately before the closing `</body>` tag, or append
/// it when the document has none. This placement is load-bearing for visual
/// ordering and must not change.
fn insert_before_body_close(html: &str, fragment: &str) -> String {
    match body_close_regex().find(html) {
        Some(m) => {
            let mut out = String::with_capacity(html.len() + fragment.len());
            out.push_str(&html[..m.start()]);
            out.push_str(fragment);
            out.push_str(&html[m.start()..]);
            out
        }
        None => {
            let mut out = String::with_capacity(html.len() + fragment.len());
            out.push_str(html);
            out.push_str(fragment);
            out
        }
    }
}

/// Add the invisible one-pixel open beacon.
pub fn inject_tracking_pixel(html: &str, beacon: &Url) -> String {
    let pixel = format!(
        "<img src=\"{beacon}\" width=\"1\" height=\"1\" alt=\"\" \
         style=\"display:none;\" />"
    );
    insert_before_body_close(html, &pixel)
}

/// Add the unsubscribe/manage-preferences footer.
pub fn append_unsubscribe_footer(html: &str, unsubscribe: &Url) -> String {
    let footer = format!(
        "<div style=\"margin-top:24px;font-size:12px;color:#888;\">\
         <a href=\"{unsubscribe}\">Unsubscribe</a> | \
         <a href=\"{unsubscribe}\">Manage preferences</a>\
         </div>"
    );
    insert_before_body_close(html, &footer)
}
