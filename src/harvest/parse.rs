// src/harvest/parse.rs
//! RSS 2.0, RSS 1.0 (RDF) and Atom documents into [`RawItem`]s.

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde::Deserialize;

use crate::error::{FetchErrorKind, HarvestError, Result};
use crate::harvest::types::RawItem;

const SNIPPET_MAX_CHARS: usize = 1500;

#[derive(Debug, Default, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: Option<String>,
}

fn text(t: Option<Text>) -> Option<String> {
    t.and_then(|t| t.value)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

// Elements are matched on their local name: `<dc:date>` arrives as `date`,
// `<content:encoded>` as `encoded`, and `<atom:link>` lands among the `link`s.
#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<Text>,
    #[serde(rename = "link", default)]
    links: Vec<Text>,
    guid: Option<Text>,
    #[serde(rename = "pubDate")]
    pub_date: Option<Text>,
    #[serde(rename = "date")]
    dc_date: Option<Text>,
    description: Option<Text>,
    encoded: Option<Text>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<Text>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    id: Option<Text>,
    published: Option<Text>,
    updated: Option<Text>,
    summary: Option<Text>,
    content: Option<Text>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Rss,
    Rdf,
    Atom,
}

/// Parse a feed body fetched from `origin`.
pub fn parse_feed(xml: &str, origin: &str) -> Result<Vec<RawItem>> {
    let malformed = |msg: String| HarvestError::fetch(origin, FetchErrorKind::Malformed, msg);

    let xml = scrub_html_entities_for_xml(xml);
    let kind = detect_kind(&xml).map_err(malformed)?;

    let items: Vec<RawItem> = match kind {
        FeedKind::Rss => {
            let rss: Rss = from_str(&xml).map_err(|e| malformed(format!("rss: {e}")))?;
            rss.channel.items.into_iter().map(|it| rss_item(it, origin)).collect()
        }
        FeedKind::Rdf => {
            let rdf: Rdf = from_str(&xml).map_err(|e| malformed(format!("rdf: {e}")))?;
            rdf.items.into_iter().map(|it| rss_item(it, origin)).collect()
        }
        FeedKind::Atom => {
            let feed: AtomFeed = from_str(&xml).map_err(|e| malformed(format!("atom: {e}")))?;
            feed.entries.into_iter().map(|e| atom_entry(e, origin)).collect()
        }
    };
    Ok(items)
}

fn detect_kind(xml: &str) -> std::result::Result<FeedKind, String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return match e.local_name().as_ref() {
                    b"rss" => Ok(FeedKind::Rss),
                    b"RDF" => Ok(FeedKind::Rdf),
                    b"feed" => Ok(FeedKind::Atom),
                    other => Err(format!(
                        "unsupported root element <{}>",
                        String::from_utf8_lossy(other)
                    )),
                };
            }
            Ok(Event::Eof) => return Err("empty document".to_string()),
            Ok(_) => continue,
            Err(e) => return Err(format!("xml: {e}")),
        }
    }
}

fn rss_item(it: RssItem, origin: &str) -> RawItem {
    let body = text(it.encoded).or_else(|| text(it.description));
    RawItem {
        title: text(it.title).unwrap_or_default(),
        link: it.links.into_iter().find_map(|l| text(Some(l))),
        guid: text(it.guid),
        published_at: text(it.pub_date).or_else(|| text(it.dc_date)).map(|d| normalize_date(&d)),
        content_snippet: body.as_deref().map(normalize_snippet).unwrap_or_default(),
        origin: origin.to_string(),
    }
}

fn atom_entry(e: AtomEntry, origin: &str) -> RawItem {
    let link = e
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| e.links.first())
        .and_then(|l| l.href.clone())
        .filter(|h| !h.trim().is_empty());
    let body = text(e.content).or_else(|| text(e.summary));
    RawItem {
        title: text(e.title).unwrap_or_default(),
        link,
        guid: text(e.id),
        published_at: text(e.published).or_else(|| text(e.updated)).map(|d| normalize_date(&d)),
        content_snippet: body.as_deref().map(normalize_snippet).unwrap_or_default(),
        origin: origin.to_string(),
    }
}

/// RFC 2822 / RFC 3339 dates become RFC 3339 UTC; anything else is kept as published.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|_| raw.to_string())
}

/// Plain-text snippet: entities decoded, tags stripped, whitespace collapsed, length capped.
pub fn normalize_snippet(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > SNIPPET_MAX_CHARS {
        out = out.chars().take(SNIPPET_MAX_CHARS).collect();
    }
    out
}

// HTML entities that are not XML entities and would make the parser bail.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
