use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use regex::Regex;
use reqwest::Client;
use tokio::sync::mpsc;

use crate::cache::{TtlCache, DEFAULT_TTL};
use crate::error::Result;
use crate::models::{ChannelShorts, Short};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

static ID_RE: OnceLock<Regex> = OnceLock::new();
static TITLE_RE: OnceLock<Regex> = OnceLock::new();

/// Fetches the public Shorts listing of a channel and extracts flat video
/// metadata; nothing is downloaded. Results are cached per (url, limit) for
/// an hour.
pub struct ShortsFetcher {
    client: Client,
    cache: TtlCache<(String, usize), Vec<Short>>,
}

impl ShortsFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("autodrop-dash/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            cache: TtlCache::new(),
        }
    }

    pub async fn fetch_shorts(&self, channel_url: &str, max_entries: usize) -> Result<Vec<Short>> {
        let cache_key = (channel_url.to_string(), max_entries);
        self.cache
            .get_or_compute(cache_key, DEFAULT_TTL, || async move {
                let listing_url = shorts_url(channel_url);
                let response = self.client.get(&listing_url).send().await?;

                if !response.status().is_success() {
                    return Err(anyhow::anyhow!(
                        "Failed to fetch shorts listing: HTTP {}",
                        response.status()
                    )
                    .into());
                }

                let html = response.text().await?;
                let videos = extract_shorts(&html, max_entries);
                tracing::debug!("Extracted {} shorts from {}", videos.len(), listing_url);
                Ok(videos)
            })
            .await
    }

    /// Fetch every configured channel concurrently, one task per channel, and
    /// send each result as soon as it completes. A failing channel carries its
    /// error in its own entry and never aborts the siblings.
    pub async fn fetch_all(
        &self,
        channels: BTreeMap<String, String>,
        max_entries: usize,
        tx: mpsc::Sender<ChannelShorts>,
    ) {
        let concurrency = channels.len().max(1);
        stream::iter(channels)
            .map(|(name, url)| async move {
                let result = self
                    .fetch_shorts(&url, max_entries)
                    .await
                    .map_err(|e| e.to_string());
                ChannelShorts { name, url, result }
            })
            .buffer_unordered(concurrency)
            .for_each(|channel| {
                let tx = tx.clone();
                async move {
                    // Send failure means the page moved on; nothing to do
                    let _ = tx.send(channel).await;
                }
            })
            .await;
    }
}

impl Default for ShortsFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Listing endpoint convention: the channel URL with a `/shorts` suffix.
fn shorts_url(channel_url: &str) -> String {
    format!("{}/shorts", channel_url.trim_end_matches('/'))
}

/// Pull video entries out of the listing page's embedded JSON. Each videoId
/// occurrence is paired with the first headline/title appearing before the
/// next videoId; entries are de-duplicated in first-seen order and truncated
/// to `max_entries`, with a missing title becoming "Untitled".
fn extract_shorts(html: &str, max_entries: usize) -> Vec<Short> {
    let id_re = ID_RE.get_or_init(|| {
        Regex::new(r#""videoId":"([0-9A-Za-z_-]{11})""#).expect("valid videoId regex")
    });
    let title_re = TITLE_RE.get_or_init(|| {
        Regex::new(r#""(?:headline|title)":\{"simpleText":"((?:[^"\\]|\\.)*)""#)
            .expect("valid title regex")
    });

    let ids: Vec<(usize, &str)> = id_re
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).map(|m| (m.start(), m.as_str())))
        .collect();
    let titles: Vec<(usize, &str)> = title_re
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).map(|m| (m.start(), m.as_str())))
        .collect();

    let mut videos: Vec<Short> = Vec::new();
    let mut title_index = 0;
    for (entry, &(pos, id)) in ids.iter().enumerate() {
        let boundary = ids
            .get(entry + 1)
            .map(|&(next_pos, _)| next_pos)
            .unwrap_or(html.len());

        while title_index < titles.len() && titles[title_index].0 < pos {
            title_index += 1;
        }
        let mut title = match titles.get(title_index) {
            Some(&(title_pos, raw)) if title_pos < boundary => {
                title_index += 1;
                unescape_json_str(raw)
            }
            _ => String::new(),
        };
        if title.is_empty() {
            title = "Untitled".to_string();
        }

        if videos.iter().any(|v| v.id == id) {
            continue;
        }
        videos.push(Short {
            id: id.to_string(),
            title,
            url: format!("{WATCH_URL}{id}"),
            thumbnail: format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg"),
        });

        if videos.len() >= max_entries {
            break;
        }
    }
    videos
}

/// Titles are captured as raw JSON string contents (`\"`, `&`, ...).
fn unescape_json_str(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = concat!(
        r#"{"richItemRenderer":{"content":{"reelItemRenderer":{"videoId":"abc123def45","#,
        r#""thumbnail":{"thumbnails":[]},"headline":{"simpleText":"Breaking & Entering"}}}}},"#,
        r#"{"reelItemRenderer":{"videoId":"abc123def45","headline":{"simpleText":"Duplicate"}}},"#,
        r#"{"reelItemRenderer":{"videoId":"xyz987ghi21","thumbnail":{}}},"#,
        r#"{"reelItemRenderer":{"videoId":"qrs456tuv89","headline":{"simpleText":"Third"}}}"#,
    );

    #[test]
    fn extracts_id_title_url_and_thumbnail() {
        let videos = extract_shorts(LISTING, 20);
        assert_eq!(videos.len(), 3);

        assert_eq!(videos[0].id, "abc123def45");
        assert_eq!(videos[0].title, "Breaking & Entering");
        assert_eq!(videos[0].url, "https://www.youtube.com/watch?v=abc123def45");
        assert_eq!(
            videos[0].thumbnail,
            "https://i.ytimg.com/vi/abc123def45/hqdefault.jpg"
        );
    }

    #[test]
    fn missing_title_defaults_to_untitled() {
        let videos = extract_shorts(LISTING, 20);
        assert_eq!(videos[1].id, "xyz987ghi21");
        assert_eq!(videos[1].title, "Untitled");
    }

    #[test]
    fn listing_is_truncated_to_max_entries() {
        let videos = extract_shorts(LISTING, 2);
        assert_eq!(videos.len(), 2);
    }

    #[test]
    fn no_entries_is_an_empty_listing_not_an_error() {
        assert!(extract_shorts("<html><body>nothing here</body></html>", 5).is_empty());
    }

    #[test]
    fn shorts_url_strips_trailing_slash() {
        assert_eq!(
            shorts_url("https://youtube.com/@newsdaily/"),
            "https://youtube.com/@newsdaily/shorts"
        );
        assert_eq!(
            shorts_url("https://youtube.com/@newsdaily"),
            "https://youtube.com/@newsdaily/shorts"
        );
    }

    /// Minimal one-shot HTTP server for exercising the success path without
    /// leaving the host.
    async fn serve_once(body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 1024];
                let _ = socket.read(&mut request).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn failing_channel_does_not_taint_successful_sibling() {
        let body = r#"{"reelItemRenderer":{"videoId":"abc123def45","headline":{"simpleText":"Works"}}}"#;
        let good_url = serve_once(body).await;

        let channels = BTreeMap::from([
            ("Bad".to_string(), "http://127.0.0.1:1/bad".to_string()),
            ("Good".to_string(), good_url),
        ]);

        let fetcher = ShortsFetcher::new();
        let (tx, mut rx) = mpsc::channel(8);
        fetcher.fetch_all(channels, 3, tx).await;

        let mut received = Vec::new();
        while let Some(channel) = rx.recv().await {
            received.push(channel);
        }
        assert_eq!(received.len(), 2);

        let good = received.iter().find(|c| c.name == "Good").unwrap();
        let videos = good.result.as_ref().unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].id, "abc123def45");
        assert_eq!(videos[0].title, "Works");

        let bad = received.iter().find(|c| c.name == "Bad").unwrap();
        assert!(bad.result.is_err());
    }

    #[tokio::test]
    async fn failing_channels_resolve_independently() {
        let fetcher = ShortsFetcher::new();
        let channels: BTreeMap<String, String> = [
            ("One".to_string(), "http://127.0.0.1:1/a".to_string()),
            ("Two".to_string(), "http://127.0.0.1:1/b".to_string()),
        ]
        .into_iter()
        .collect();

        let (tx, mut rx) = mpsc::channel(8);
        fetcher.fetch_all(channels, 3, tx).await;

        let mut received = Vec::new();
        while let Some(channel) = rx.recv().await {
            received.push(channel);
        }

        assert_eq!(received.len(), 2);
        for channel in received {
            assert!(channel.result.is_err(), "{} should have failed", channel.name);
        }
    }
}
