//! Hyperlink extraction from remote HTML

use std::borrow::Cow;
use std::sync::{Arc, Mutex};

/// Collect `<a href>` targets from `html`
///
/// Relative links are resolved against `base` (the document's own id).
/// Only http(s) links are returned, deduplicated in first-seen order.
pub fn extract_links(html: &str, base: &str) -> Vec<String> {
    let hrefs = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = hrefs.clone();

    ammonia::Builder::new()
        .attribute_filter(move |element, attribute, value| {
            if element == "a" && attribute == "href" {
                if let Ok(mut hrefs) = sink.lock() {
                    hrefs.push(value.to_string());
                }
            }
            Some(Cow::Borrowed(value))
        })
        .clean(html);

    let base = url::Url::parse(base).ok();
    let raw = match hrefs.lock() {
        Ok(mut hrefs) => std::mem::take(&mut *hrefs),
        Err(_) => return Vec::new(),
    };

    let mut links: Vec<String> = Vec::with_capacity(raw.len());
    for href in raw {
        let resolved = match &base {
            Some(base) => base.join(&href),
            None => url::Url::parse(&href),
        };
        let Ok(resolved) = resolved else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        let link = resolved.to_string();
        if !links.contains(&link) {
            links.push(link);
        }
    }
    links
}
