use std::path::{Path, PathBuf};
use std::str::FromStr;
use nw_core::{Error, RawFeedItem, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use tracing::info;
use url::Url;

/// Where a feed document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Path(PathBuf),
    Url(Url),
}

impl FromStr for FeedSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(Error::Config("Feed source cannot be empty".to_string()));
        }
        match Url::parse(s) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self::Url(url)),
            _ => Ok(Self::Path(PathBuf::from(s))),
        }
    }
}

impl std::fmt::Display for FeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{}", url),
        }
    }
}

impl FeedSource {
    /// The file backing this source, if it is local.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Url(_) => None,
        }
    }

    pub async fn fetch(&self) -> Result<String> {
        match self {
            Self::Path(path) => Ok(tokio::fs::read_to_string(path).await?),
            Self::Url(url) => {
                let response = reqwest::get(url.clone())
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| Error::Feed(format!("Failed to download {}: {}", url, e)))?;
                response
                    .text()
                    .await
                    .map_err(|e| Error::Feed(format!("Failed to read {}: {}", url, e)))
            }
        }
    }
}

/// Fetches and parses a feed.
pub async fn load_feed(source: &FeedSource) -> Result<Vec<RawFeedItem>> {
    info!("📦 Reading {}...", source);
    let document = source.fetch().await?;
    let items = parse_feed(&document)?;
    info!("📰 Found {} items", items.len());
    Ok(items)
}

/// JSON documents start with `[` or `{`; anything else is read as RSS.
pub fn parse_feed(document: &str) -> Result<Vec<RawFeedItem>> {
    match document.trim_start().chars().next() {
        Some('[') | Some('{') => parse_json(document),
        Some(_) => parse_rss(document),
        None => Err(Error::Feed("Feed document is empty".to_string())),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonFeed {
    Items(Vec<RawFeedItem>),
    Wrapped { items: Vec<RawFeedItem> },
}

pub fn parse_json(document: &str) -> Result<Vec<RawFeedItem>> {
    match serde_json::from_str::<JsonFeed>(document) {
        Ok(JsonFeed::Items(items)) | Ok(JsonFeed::Wrapped { items }) => Ok(items),
        Err(e) => Err(Error::Feed(format!("Invalid JSON feed: {}", e))),
    }
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Description,
    Link,
    PubDate,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"title" => Some(Self::Title),
            b"description" => Some(Self::Description),
            b"link" => Some(Self::Link),
            b"pubDate" => Some(Self::PubDate),
            _ => None,
        }
    }

    fn slot(self, item: &mut RawFeedItem) -> &mut Option<String> {
        match self {
            Self::Title => &mut item.title,
            Self::Description => &mut item.description,
            Self::Link => &mut item.link,
            Self::PubDate => &mut item.pub_date,
        }
    }
}

/// Field element currently being read inside an `<item>`.
struct OpenField {
    field: Field,
    /// Path length while inside the field element.
    depth: usize,
    text: String,
    /// Set once a child element opens; text after it is not the field's own.
    sealed: bool,
}

/// Reads every `<item>` of an RSS document. Only the first direct `title`,
/// `description`, `link` and `pubDate` child of each item is kept, with its
/// text trimmed once as a whole.
pub fn parse_rss(document: &str) -> Result<Vec<RawFeedItem>> {
    let mut reader = Reader::from_str(document);

    let mut items = Vec::new();
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<RawFeedItem> = None;
    let mut open: Option<OpenField> = None;
    let mut saw_element = false;

    let invalid = |reader: &Reader<&[u8]>, e: &dyn std::fmt::Display| {
        Error::Feed(format!("Invalid RSS at byte {}: {}", reader.buffer_position(), e))
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                saw_element = true;
                let name = e.name().as_ref().to_vec();
                if let Some(field) = open.as_mut() {
                    field.sealed = true;
                } else if name == b"item" && current.is_none() {
                    current = Some(RawFeedItem::default());
                } else if path.last().is_some_and(|parent| parent == b"item") {
                    if let (Some(item), Some(field)) = (current.as_mut(), Field::from_tag(&name)) {
                        if field.slot(item).is_none() {
                            open = Some(OpenField {
                                field,
                                depth: path.len() + 1,
                                text: String::new(),
                                sealed: false,
                            });
                        }
                    }
                }
                path.push(name);
            }
            Ok(Event::Empty(_)) => saw_element = true,
            Ok(Event::End(_)) => {
                if open.as_ref().is_some_and(|field| field.depth == path.len()) {
                    if let (Some(field), Some(item)) = (open.take(), current.as_mut()) {
                        *field.field.slot(item) = Some(field.text.trim().to_string());
                    }
                }
                if let Some(name) = path.pop() {
                    if name == b"item" && !path.iter().any(|n| n == b"item") {
                        if let Some(item) = current.take() {
                            items.push(item);
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(field) = open.as_mut().filter(|field| !field.sealed) {
                    let text = e.unescape().map_err(|e| invalid(&reader, &e))?;
                    field.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(field) = open.as_mut().filter(|field| !field.sealed) {
                    field.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(invalid(&reader, &e)),
        }
    }

    if !saw_element {
        return Err(Error::Feed("Feed document has no elements".to_string()));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Example channel</title>
    <link>http://x/</link>
    <item>
      <title>AI Breakthrough</title>
      <description><![CDATA[New model <b>released</b>]]></description>
      <link>http://x/1</link>
      <pubDate>Mon, 01 Jan 2024</pubDate>
      <media:title>ignored</media:title>
    </item>
    <item>
      <title>Tom &amp; Jerry</title>
      <link>http://x/2</link>
    </item>
    <item>
      <title/>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss_items() {
        let items = parse_feed(RSS).unwrap();
        assert_eq!(items.len(), 3);

        assert_eq!(items[0].title.as_deref(), Some("AI Breakthrough"));
        assert_eq!(items[0].description.as_deref(), Some("New model <b>released</b>"));
        assert_eq!(items[0].link.as_deref(), Some("http://x/1"));
        assert_eq!(items[0].pub_date.as_deref(), Some("Mon, 01 Jan 2024"));

        assert_eq!(items[1].title.as_deref(), Some("Tom & Jerry"));
        assert_eq!(items[1].description, None);
        assert_eq!(items[1].pub_date, None);

        assert_eq!(items[2], RawFeedItem::default());
    }

    #[test]
    fn test_mixed_text_and_cdata_keep_inner_spacing() {
        let items = parse_rss(
            "<rss><channel><item>\
             <title>  Tom &amp; Jerry  </title>\
             <description>Hello <![CDATA[<b>world</b>]]> again</description>\
             </item></channel></rss>",
        )
        .unwrap();
        assert_eq!(items[0].title.as_deref(), Some("Tom & Jerry"));
        assert_eq!(items[0].description.as_deref(), Some("Hello <b>world</b> again"));
    }

    #[test]
    fn test_first_child_wins() {
        let items = parse_rss(
            "<rss><channel><item>\
             <title>First</title><title>Second</title>\
             <link>http://x/1</link><link>http://x/2</link>\
             </item></channel></rss>",
        )
        .unwrap();
        assert_eq!(items[0].title.as_deref(), Some("First"));
        assert_eq!(items[0].link.as_deref(), Some("http://x/1"));
    }

    #[test]
    fn test_text_after_nested_element_is_dropped() {
        let items = parse_rss(
            "<rss><channel><item><description>Lead <em>bold</em> tail</description></item></channel></rss>",
        )
        .unwrap();
        assert_eq!(items[0].description.as_deref(), Some("Lead"));
    }

    #[test]
    fn test_channel_fields_are_not_items() {
        let items = parse_rss("<rss><channel><title>Only channel</title></channel></rss>").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_parse_json_array_and_object() {
        let items = parse_feed(r#"[{"title": "A", "pubDate": "today"}, {}]"#).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].pub_date.as_deref(), Some("today"));
        assert_eq!(items[1], RawFeedItem::default());

        let items = parse_feed(r#"{"items": [{"link": "http://x/1"}]}"#).unwrap();
        assert_eq!(items[0].link.as_deref(), Some("http://x/1"));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(parse_feed(""), Err(Error::Feed(_))));
        assert!(matches!(parse_feed("{\"nope\": 1}"), Err(Error::Feed(_))));
        assert!(matches!(parse_feed("<rss><item></channel>"), Err(Error::Feed(_))));
        assert!(matches!(parse_feed("just some text"), Err(Error::Feed(_))));
    }

    #[test]
    fn test_feed_source_from_str() {
        assert_eq!(
            "feed.xml".parse::<FeedSource>().unwrap(),
            FeedSource::Path(PathBuf::from("feed.xml"))
        );
        let source = "https://example.com/feed.xml".parse::<FeedSource>().unwrap();
        assert!(matches!(source, FeedSource::Url(_)));
        assert!(source.local_path().is_none());
        assert!("".parse::<FeedSource>().is_err());
    }

    #[tokio::test]
    async fn test_load_feed_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(RSS.as_bytes()).unwrap();

        let source = FeedSource::Path(file.path().to_path_buf());
        let items = load_feed(&source).await.unwrap();
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let source = FeedSource::Path(PathBuf::from("/definitely/not/here.xml"));
        assert!(matches!(load_feed(&source).await, Err(Error::Io(_))));
    }
}
