use std::future::Future;

use eyre::{Result, bail, eyre};
use log::debug;
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::SourceRef;
use crate::captions::{self, CaptionLine};
use crate::retry::retry;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Items requested per listing page
pub const PAGE_SIZE: u32 = 50;
const PAGE_ATTEMPTS: u32 = 3;

const DATA_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const WEB_BASE: &str = "https://www.youtube.com";

/// Remote listing and caption lookups
pub trait VideoCatalog {
    /// Every video ID in the listing, in listing order
    fn list_videos(&self, source: &SourceRef) -> impl Future<Output = Result<Vec<String>>>;

    /// Captions for a video, or `None` when there are none to be had
    fn fetch_captions(&self, video_id: &str, lang: &str) -> impl Future<Output = Option<Vec<CaptionLine>>>;
}

impl<T: VideoCatalog> VideoCatalog for &T {
    fn list_videos(&self, source: &SourceRef) -> impl Future<Output = Result<Vec<String>>> {
        (**self).list_videos(source)
    }

    fn fetch_captions(&self, video_id: &str, lang: &str) -> impl Future<Output = Option<Vec<CaptionLine>>> {
        (**self).fetch_captions(video_id, lang)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet {
    resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    kind: String,
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
}

/// YouTube Data API v3 client for playlist and channel listings
pub struct YouTubeClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    web_base: String,
}

impl YouTubeClient {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            api_base: DATA_API_BASE.to_string(),
            web_base: WEB_BASE.to_string(),
        }
    }

    /// Point the client at different hosts (used against local mock servers)
    pub fn with_base_urls(mut self, api_base: impl Into<String>, web_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self.web_base = web_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Video IDs of a playlist, paging until no continuation token is returned
    pub async fn playlist_video_ids(&self, playlist_id: &str) -> Result<Vec<String>> {
        self.paginate("playlistItems", &[("part", "snippet"), ("playlistId", playlist_id)], |item: PlaylistItem| {
            item.snippet.resource_id.video_id
        })
        .await
    }

    /// Video IDs uploaded to a channel, via the search endpoint
    pub async fn channel_video_ids(&self, channel_id: &str) -> Result<Vec<String>> {
        self.paginate("search", &[("part", "snippet"), ("channelId", channel_id)], |item: SearchItem| {
            (item.id.kind == "youtube#video").then_some(item.id.video_id).flatten()
        })
        .await
    }

    async fn paginate<T, F>(&self, endpoint: &str, params: &[(&str, &str)], video_id: F) -> Result<Vec<String>>
    where
        T: DeserializeOwned,
        F: Fn(T) -> Option<String>,
    {
        let mut video_ids = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0;

        loop {
            let page: ListPage<T> = retry(PAGE_ATTEMPTS, || {
                let token = page_token.as_deref();
                async move { self.fetch_page(endpoint, params, token).await }
            })
            .await?;

            pages += 1;
            video_ids.extend(page.items.into_iter().filter_map(&video_id));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("Listed {} videos from {endpoint} in {pages} page(s)", video_ids.len());
        Ok(video_ids)
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        page_token: Option<&str>,
    ) -> Result<ListPage<T>> {
        let url = format!("{}/{endpoint}", self.api_base);
        let page_size = PAGE_SIZE.to_string();

        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("maxResults", page_size.as_str()));
        query.push(("key", self.api_key.as_str()));
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        debug!("Fetching {endpoint} page (token={page_token:?})");
        let resp = self.client.get(&url).query(&query).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("YouTube Data API returned {status}: {body}");
        }

        Ok(resp.json().await?)
    }

    /// Fetch a video's captions through the InnerTube player endpoint
    pub async fn captions(&self, video_id: &str, lang: &str) -> Result<Vec<CaptionLine>> {
        let watch_url = format!("{}/watch?v={video_id}", self.web_base);
        debug!("Fetching watch page: {watch_url}");

        let page_html = self
            .client
            .get(&watch_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let innertube_key = extract_innertube_key(&page_html)?;
        let player_url = format!("{}/youtubei/v1/player?key={innertube_key}&prettyPrint=false", self.web_base);

        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": lang,
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": "2.20241126.01.00"
                }
            },
            "videoId": video_id
        });

        let resp: InnerTubePlayerResponse = self
            .client
            .post(&player_url)
            .header("User-Agent", USER_AGENT)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let tracks = resp
            .captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .and_then(|r| r.caption_tracks)
            .unwrap_or_default();

        let track = tracks
            .iter()
            .find(|t| t.language_code == lang)
            .or_else(|| tracks.first())
            .ok_or_else(|| eyre!("no captions available for video {video_id}"))?;
        debug!("Using caption track: lang={}", track.language_code);

        let caption_xml = self
            .client
            .get(&track.base_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        captions::parse_caption_xml(&caption_xml)
    }
}

impl VideoCatalog for YouTubeClient {
    async fn list_videos(&self, source: &SourceRef) -> Result<Vec<String>> {
        match source {
            SourceRef::Playlist(id) => self.playlist_video_ids(id).await,
            SourceRef::Channel(id) => self.channel_video_ids(id).await,
        }
    }

    async fn fetch_captions(&self, video_id: &str, lang: &str) -> Option<Vec<CaptionLine>> {
        match self.captions(video_id, lang).await {
            Ok(lines) => Some(lines),
            Err(e) => {
                debug!("No captions for {video_id}: {e}");
                None
            }
        }
    }
}

/// Patterns the watch page has used for the InnerTube key, newest first
const INNERTUBE_KEY_PATTERNS: [&str; 2] = [
    r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#,
    r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#,
];

fn extract_innertube_key(html: &str) -> Result<String> {
    for pattern in INNERTUBE_KEY_PATTERNS {
        if let Some(caps) = Regex::new(pattern)?.captures(html) {
            return Ok(caps[1].to_string());
        }
    }
    bail!("watch page carries no InnerTube key")
}
