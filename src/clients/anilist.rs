use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{ListSync, MediaProvider, ProviderError, RemoteListEntry, season_query};
use crate::config::AnilistConfig;
use crate::domain::{AnimeId, RemoteListStatus, WatchStatus};
use crate::models::{MediaSummary, MediaWithRelations};

const MEDIA_RELATIONS_QUERY: &str = r"
    query ($id: Int) {
        Media(id: $id, type: ANIME) {
            id
            title { romaji english native }
            episodes
            format
            relations {
                edges {
                    relationType
                    node {
                        id
                        type
                        format
                        title { romaji english native }
                        episodes
                    }
                }
            }
        }
    }
";

const SEARCH_QUERY: &str = r"
    query ($search: String) {
        Page(page: 1, perPage: 10) {
            media(search: $search, type: ANIME) {
                id
                title { romaji english native }
                episodes
                format
            }
        }
    }
";

const SAVE_ENTRY_MUTATION: &str = r"
    mutation ($mediaId: Int, $progress: Int, $status: MediaListStatus) {
        SaveMediaListEntry(mediaId: $mediaId, progress: $progress, status: $status) {
            id
            progress
            status
        }
    }
";

const VIEWER_QUERY: &str = r"
    query {
        Viewer {
            id
            name
        }
    }
";

const LIST_COLLECTION_QUERY: &str = r"
    query ($userName: String) {
        MediaListCollection(userName: $userName, type: ANIME) {
            lists {
                entries {
                    status
                    progress
                    media {
                        id
                        title { romaji english native }
                        episodes
                        format
                    }
                }
            }
        }
    }
";

#[derive(Serialize)]
struct GraphQLRequest<'a> {
    query: &'a str,
    variables: &'a Value,
}

#[derive(Deserialize)]
struct GraphQLResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Deserialize)]
struct MediaData {
    #[serde(rename = "Media")]
    media: Option<Media>,
}

#[derive(Deserialize)]
struct SearchData {
    #[serde(rename = "Page")]
    page: Page,
}

#[derive(Deserialize)]
struct Page {
    media: Vec<Media>,
}

#[derive(Deserialize)]
struct ViewerData {
    #[serde(rename = "Viewer")]
    viewer: Option<Viewer>,
}

#[derive(Deserialize)]
struct Viewer {
    name: String,
}

impl ViewerData {
    fn into_name(self) -> Result<String, ProviderError> {
        self.viewer
            .map(|v| v.name)
            .filter(|name| !name.trim().is_empty())
            .ok_or(ProviderError::Unauthenticated)
    }
}

#[derive(Deserialize)]
struct ListData {
    #[serde(rename = "MediaListCollection")]
    collection: Option<ListCollection>,
}

#[derive(Deserialize)]
struct ListCollection {
    lists: Vec<MediaList>,
}

#[derive(Deserialize)]
struct MediaList {
    entries: Vec<MediaListEntry>,
}

#[derive(Deserialize)]
struct MediaListEntry {
    status: Option<RemoteListStatus>,
    progress: Option<u32>,
    media: Media,
}

#[derive(Deserialize)]
struct Media {
    id: i32,
    title: Title,
    episodes: Option<u32>,
    relations: Option<Relations>,
}

#[derive(Deserialize)]
struct Title {
    romaji: Option<String>,
    english: Option<String>,
    native: Option<String>,
}

#[derive(Deserialize)]
struct Relations {
    edges: Vec<RelationEdge>,
}

#[derive(Deserialize)]
struct RelationEdge {
    #[serde(rename = "relationType")]
    relation_type: Option<String>,
    node: Option<RelationNode>,
}

#[derive(Deserialize)]
struct RelationNode {
    id: i32,
    #[serde(rename = "type")]
    media_type: Option<String>,
    format: Option<String>,
}

/// Formats that count as a season when a node has several prequels/sequels.
const SEASON_FORMATS: &[&str] = &["TV", "TV_SHORT", "ONA"];

struct CachedResponse {
    data: Value,
    fetched_at: Instant,
}

/// Enforces a minimum interval between requests.
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// AniList GraphQL client with a response cache, request throttling and
/// retries on transient failures.
pub struct AnilistClient {
    client: Client,
    api_url: String,
    access_token: Option<String>,
    cache: Mutex<HashMap<String, CachedResponse>>,
    cache_ttl: Duration,
    rate_limiter: RateLimiter,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl AnilistClient {
    pub fn new(config: &AnilistConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(concat!("Shiori/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            access_token: config.access_token.clone(),
            cache: Mutex::new(HashMap::new()),
            cache_ttl: Duration::from_secs(config.cache_ttl_seconds),
            rate_limiter: RateLimiter::new(Duration::from_millis(config.min_request_interval_ms)),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        query: &str,
        variables: Value,
        cacheable: bool,
    ) -> Result<T, ProviderError> {
        let cache_key = format!("{query}|{variables}");

        if cacheable && let Some(data) = self.cached(&cache_key).await {
            debug!(operation, "AniList cache hit");
            return decode(data);
        }

        let mut attempt = 0;
        let data = loop {
            metrics::counter!("shiori_provider_requests_total", "operation" => operation)
                .increment(1);

            match self.send_once(query, &variables).await {
                Ok(data) => break data,
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.retry_base_delay * 2_u32.saturating_pow(attempt);
                    attempt += 1;
                    warn!(
                        operation,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "AniList request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    metrics::counter!("shiori_provider_failures_total", "operation" => operation)
                        .increment(1);
                    return Err(e);
                }
            }
        };

        if cacheable {
            self.store_cached(cache_key, data.clone()).await;
        }

        decode(data)
    }

    /// Name of the user the access token belongs to.
    pub async fn viewer_name(&self) -> Result<String, ProviderError> {
        if self.access_token.is_none() {
            return Err(ProviderError::Unauthenticated);
        }

        let data: ViewerData = self
            .execute("viewer", VIEWER_QUERY, json!({}), true)
            .await?;
        data.into_name()
    }

    /// Caches `data` under `key`, dropping every expired entry first.
    async fn store_cached(&self, key: String, data: Value) {
        let mut cache = self.cache.lock().await;
        let ttl = self.cache_ttl;
        cache.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
        cache.insert(
            key,
            CachedResponse {
                data,
                fetched_at: Instant::now(),
            },
        );
    }

    async fn cached(&self, key: &str) -> Option<Value> {
        let mut cache = self.cache.lock().await;
        match cache.get(key) {
            Some(entry) if entry.fetched_at.elapsed() < self.cache_ttl => Some(entry.data.clone()),
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }

    async fn send_once(&self, query: &str, variables: &Value) -> Result<Value, ProviderError> {
        self.rate_limiter.wait().await;

        let mut request = self
            .client
            .post(&self.api_url)
            .json(&GraphQLRequest { query, variables });

        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            // GraphQL errors come back with 4xx statuses too.
            if let Ok(parsed) = serde_json::from_str::<GraphQLResponse>(&body)
                && let Some(message) = graphql_error_message(parsed.errors.as_deref())
            {
                if status == StatusCode::NOT_FOUND {
                    return Err(ProviderError::Api(status.as_u16(), message));
                }
                return Err(ProviderError::GraphQl(message));
            }
            return Err(ProviderError::Api(status.as_u16(), body));
        }

        let parsed: GraphQLResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;

        if let Some(message) = graphql_error_message(parsed.errors.as_deref()) {
            return Err(ProviderError::GraphQl(message));
        }

        parsed
            .data
            .ok_or_else(|| ProviderError::Parse("response has no data".to_string()))
    }
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, ProviderError> {
    serde_json::from_value(data).map_err(|e| ProviderError::Parse(e.to_string()))
}

fn graphql_error_message(errors: Option<&[GraphQLError]>) -> Option<String> {
    let errors = errors.filter(|e| !e.is_empty())?;
    Some(
        errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; "),
    )
}

fn map_media(m: &Media) -> MediaSummary {
    let title = m
        .title
        .romaji
        .clone()
        .or_else(|| m.title.english.clone())
        .or_else(|| m.title.native.clone())
        .unwrap_or_else(|| format!("Unknown ({})", m.id));

    MediaSummary {
        id: AnimeId::new(m.id),
        title,
        title_english: m.title.english.clone(),
        title_japanese: m.title.native.clone(),
        episodes: m.episodes,
    }
}

/// First anime edge of the given kind, preferring season-like formats over
/// movies and specials.
fn pick_relation(edges: &[RelationEdge], kind: &str) -> Option<AnimeId> {
    let candidates: Vec<&RelationNode> = edges
        .iter()
        .filter(|e| e.relation_type.as_deref() == Some(kind))
        .filter_map(|e| e.node.as_ref())
        .filter(|n| n.media_type.as_deref().is_none_or(|t| t == "ANIME"))
        .collect();

    candidates
        .iter()
        .find(|n| {
            n.format
                .as_deref()
                .is_some_and(|f| SEASON_FORMATS.contains(&f))
        })
        .or_else(|| candidates.first())
        .map(|n| AnimeId::new(n.id))
}

fn map_relations(m: &Media) -> MediaWithRelations {
    let edges = m.relations.as_ref().map_or(&[][..], |r| r.edges.as_slice());

    MediaWithRelations {
        media: map_media(m),
        prequel_id: pick_relation(edges, "PREQUEL"),
        sequel_id: pick_relation(edges, "SEQUEL"),
    }
}

#[async_trait]
impl MediaProvider for AnilistClient {
    async fn get_media_relations(
        &self,
        id: AnimeId,
    ) -> Result<MediaWithRelations, ProviderError> {
        let data: MediaData = self
            .execute(
                "media_relations",
                MEDIA_RELATIONS_QUERY,
                json!({ "id": id.value() }),
                true,
            )
            .await?;

        data.media
            .as_ref()
            .map(map_relations)
            .ok_or(ProviderError::NotFound(id))
    }

    async fn search_by_title(
        &self,
        query: &str,
        season_hint: Option<u32>,
    ) -> Result<Vec<MediaSummary>, ProviderError> {
        let search = season_query(query, season_hint);
        let data: SearchData = self
            .execute("search", SEARCH_QUERY, json!({ "search": search }), true)
            .await?;

        Ok(data.page.media.iter().map(map_media).collect())
    }
}

#[async_trait]
impl ListSync for AnilistClient {
    async fn update_progress(
        &self,
        id: AnimeId,
        progress: u32,
        status: WatchStatus,
        episode_hint: Option<u32>,
    ) -> Result<(), ProviderError> {
        if self.access_token.is_none() {
            return Err(ProviderError::Unauthenticated);
        }

        debug!(anime_id = %id, progress, ?episode_hint, "Saving AniList list entry");

        let _: Value = self
            .execute(
                "save_entry",
                SAVE_ENTRY_MUTATION,
                json!({
                    "mediaId": id.value(),
                    "progress": progress,
                    "status": status.to_remote().as_str(),
                }),
                false,
            )
            .await?;

        Ok(())
    }

    async fn fetch_list(&self, user_name: &str) -> Result<Vec<RemoteListEntry>, ProviderError> {
        let data: ListData = self
            .execute(
                "list_collection",
                LIST_COLLECTION_QUERY,
                json!({ "userName": user_name }),
                false,
            )
            .await?;

        let entries = data
            .collection
            .map(|c| c.lists)
            .unwrap_or_default()
            .into_iter()
            .flat_map(|list| list.entries)
            .map(|entry| RemoteListEntry {
                media: map_media(&entry.media),
                status: entry
                    .status
                    .map_or(WatchStatus::PlanToWatch, WatchStatus::from_remote),
                progress: entry.progress.unwrap_or(0),
            })
            .collect();

        Ok(entries)
    }
}
