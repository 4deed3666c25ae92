//! Listing page scraper producing the local `rss.xml` feed.
//!
//! The news site has no feed of its own. Its listing page links every article
//! as `<a href="/noticias/<slug>">` with the headline in a heading inside the
//! anchor and a `dd/mm/yyyy` date somewhere before it in the document.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Result;
use crate::output::write_atomic;
use crate::sitemap::write_text_element;
use crate::source::{build_client, get_text};

pub const SCRAPER_USER_AGENT: &str = "ASClub-RSS-Bot/1.0";
pub const DEFAULT_SITE_URL: &str = "https://www.asclub.pt/noticias";
pub const DEFAULT_MAX_LINKS: usize = 30;

const FEED_TITLE: &str = "AS CLUB - Notícias";
const FEED_DESCRIPTION: &str = "Últimas notícias de finanças e investimentos do AS Club";
const FEED_LINK: &str = "https://www.asclub.pt";
const FEED_SELF_LINK: &str = "https://axtancap.github.io/asclub-feeds/rss.xml";
const FEED_LANGUAGE: &str = "pt";
const CREATOR: &str = "AS CLUB";

const RFC822_UTC: &str = "%a, %d %b %Y %H:%M:%S +0000";

static RE_ARTICLE_HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r"/noticias/[^/]+$").expect("valid regex"));
static RE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}").expect("valid regex"));
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedArticle {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published: DateTime<Utc>,
}

fn collapse_whitespace(s: &str) -> String {
    RE_WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Text directly owned by an element, ignoring nested elements.
fn own_text(el: &ElementRef<'_>) -> String {
    el.children()
        .filter_map(|c| c.value().as_text().map(|t| t.to_string()))
        .collect::<String>()
}

/// First `dd/mm/yyyy` in `text` as UTC midnight.
fn parse_listing_date(text: &str) -> Option<DateTime<Utc>> {
    let m = RE_DATE.find(text)?;
    NaiveDate::parse_from_str(m.as_str(), "%d/%m/%Y")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}

fn heading_text(anchor: &ElementRef<'_>) -> Option<String> {
    anchor
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| matches!(el.value().name(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6"))
        .map(|h| collapse_whitespace(&h.text().collect::<Vec<_>>().join(" ")))
        .filter(|t| !t.is_empty())
}

/// Extract articles from a listing page.
///
/// Walks the document in order so the last date-bearing `div`, `span` or `p`
/// seen before an anchor is the one that dates it. Articles without a
/// recognizable date are stamped with `now`.
pub fn extract_articles(document: &Html, base: &Url, max_links: usize, now: DateTime<Utc>) -> Vec<ScrapedArticle> {
    let mut articles: Vec<ScrapedArticle> = Vec::new();
    let mut last_date: Option<String> = None;
    let mut anchors_seen = 0;
    // article hrefs are site-relative, not listing-relative
    let root = base.join("/").unwrap_or_else(|_| base.clone());

    for node in document.root_element().descendants() {
        let Some(el) = ElementRef::wrap(node) else { continue };
        match el.value().name() {
            "div" | "span" | "p" => {
                let text = own_text(&el);
                if RE_DATE.is_match(&text) {
                    last_date = Some(text.trim().to_string());
                }
            }
            "a" => {
                let Some(href) = el.value().attr("href") else { continue };
                if !RE_ARTICLE_HREF.is_match(href) {
                    continue;
                }
                if anchors_seen >= max_links {
                    break;
                }
                anchors_seen += 1;

                let Ok(link) = root.join(href) else { continue };
                let Some(title) = heading_text(&el) else {
                    debug!("skipping {} (no heading)", link);
                    continue;
                };
                let published = last_date.as_deref().and_then(parse_listing_date).unwrap_or(now);

                articles.push(ScrapedArticle {
                    description: title.clone(),
                    title,
                    link: link.to_string(),
                    published,
                });
            }
            _ => {}
        }
    }

    let mut seen = std::collections::HashSet::new();
    articles.retain(|a| seen.insert(a.link.clone()));
    articles
}

/// Serialize articles as an RSS 2.0 channel.
pub fn render_rss(articles: &[ScrapedArticle], now: DateTime<Utc>) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut rss_start = BytesStart::new("rss");
    rss_start.push_attribute(("version", "2.0"));
    rss_start.push_attribute(("xmlns:atom", "http://www.w3.org/2005/Atom"));
    rss_start.push_attribute(("xmlns:dc", "http://purl.org/dc/elements/1.1/"));
    writer.write_event(Event::Start(rss_start))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;
    write_text_element(&mut writer, "title", FEED_TITLE)?;
    write_text_element(&mut writer, "link", FEED_LINK)?;
    write_text_element(&mut writer, "description", FEED_DESCRIPTION)?;
    write_text_element(&mut writer, "language", FEED_LANGUAGE)?;
    write_text_element(&mut writer, "lastBuildDate", &now.format(RFC822_UTC).to_string())?;

    let mut self_link = BytesStart::new("atom:link");
    self_link.push_attribute(("href", FEED_SELF_LINK));
    self_link.push_attribute(("rel", "self"));
    self_link.push_attribute(("type", "application/rss+xml"));
    writer.write_event(Event::Empty(self_link))?;

    for a in articles {
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        write_text_element(&mut writer, "title", &a.title)?;
        write_text_element(&mut writer, "link", &a.link)?;
        write_text_element(&mut writer, "description", &a.description)?;
        write_text_element(&mut writer, "pubDate", &a.published.format(RFC822_UTC).to_string())?;

        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "true"));
        writer.write_event(Event::Start(guid))?;
        writer.write_event(Event::Text(BytesText::new(&a.link)))?;
        writer.write_event(Event::End(BytesEnd::new("guid")))?;

        write_text_element(&mut writer, "dc:creator", CREATOR)?;
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let mut out = writer.into_inner();
    out.push(b'\n');
    Ok(out)
}

/// Fetch the listing page and write the feed. Returns the number of items
/// written; nothing is written when the page yields no article.
pub fn run(site_url: &Url, max_links: usize, output: &Path, timeout: Duration) -> Result<usize> {
    info!("scraping news from {}", site_url);
    let client = build_client(SCRAPER_USER_AGENT, timeout)?;
    let body = get_text(&client, site_url, SCRAPER_USER_AGENT)?;
    let document = Html::parse_document(&body);

    let now = Utc::now();
    let articles = extract_articles(&document, site_url, max_links, now);
    info!("found {} articles", articles.len());

    if articles.is_empty() {
        warn!("no articles found on {}; {} not written", site_url, output.display());
        return Ok(0);
    }

    write_atomic(output, &render_rss(&articles, now)?)?;
    Ok(articles.len())
}
