use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};

use crate::config::PriceApiConfig;
use crate::global::GlobalState;

/// One trading pair quote from the external price API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairQuote {
    pub pair_address: String,
    #[serde(default)]
    pub dex_id: String,
    #[serde(default)]
    pub price_usd: Option<String>,
    #[serde(default)]
    pub liquidity: Liquidity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Liquidity {
    #[serde(default)]
    pub usd: f64,
}

#[derive(Debug, Deserialize)]
struct TokenPairsResponse {
    pairs: Option<Vec<PairQuote>>,
}

#[async_trait]
pub trait PriceFetcher: Send + Sync + 'static {
    async fn fetch_pairs(&self, address: &str) -> anyhow::Result<Vec<PairQuote>>;
}

pub struct HttpPriceFetcher {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPriceFetcher {
    pub fn new(config: &PriceApiConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PriceFetcher for HttpPriceFetcher {
    async fn fetch_pairs(&self, address: &str) -> anyhow::Result<Vec<PairQuote>> {
        let resp: TokenPairsResponse = self
            .http
            .get(format!("{}/{}", self.base_url, address))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp.pairs.unwrap_or_default())
    }
}

/// Picks the pair with the deepest USD liquidity. Tokens trade on several
/// venues at once; the deepest pool carries the most trustworthy price.
pub fn best_pair(mut pairs: Vec<PairQuote>) -> Option<PairQuote> {
    pairs.sort_by(|a, b| b.liquidity.usd.total_cmp(&a.liquidity.usd));
    pairs.into_iter().next()
}

struct CacheEntry {
    quote: Option<PairQuote>,
    fetched_at: Instant,
}

struct Watcher {
    tx: broadcast::Sender<Option<PairQuote>>,
}

/// TTL read-through cache over the price API, with a broadcast channel per
/// watched address fed by the shared polling loop.
pub struct PriceCache {
    fetcher: Arc<dyn PriceFetcher>,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
    watchers: Mutex<HashMap<String, Watcher>>,
}

impl PriceCache {
    pub fn new(fetcher: Arc<dyn PriceFetcher>, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            entries: Mutex::new(HashMap::new()),
            watchers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached quote when fresh, otherwise fetches. A failed
    /// fetch yields `None` without disturbing the cached entry.
    pub async fn get(&self, address: &str) -> Option<PairQuote> {
        {
            let entries = self.entries.lock().await;
            if let Some(entry) = entries.get(address) {
                if entry.fetched_at.elapsed() < self.ttl {
                    return entry.quote.clone();
                }
            }
        }

        match self.fetcher.fetch_pairs(address).await {
            Ok(pairs) => {
                let quote = best_pair(pairs);
                self.entries.lock().await.insert(
                    address.to_string(),
                    CacheEntry {
                        quote: quote.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                quote
            }
            Err(err) => {
                tracing::warn!(address = %address, error = %err, "price fetch failed");
                None
            }
        }
    }

    /// Subscribes to quote updates for an address. The shared polling loop
    /// feeds every subscribed address; the entry is torn down once all
    /// receivers are dropped.
    pub async fn subscribe(&self, address: &str) -> broadcast::Receiver<Option<PairQuote>> {
        let mut watchers = self.watchers.lock().await;

        match watchers.get(address) {
            Some(watcher) => watcher.tx.subscribe(),
            None => {
                let (tx, rx) = broadcast::channel(16);
                watchers.insert(address.to_string(), Watcher { tx });
                rx
            }
        }
    }

    /// One poller tick: drop abandoned watchers, refresh the rest. A failed
    /// fetch leaves the cached entry alone and sends nothing, so readers and
    /// subscribers keep the last known quote.
    pub async fn refresh_watched(&self) {
        let addresses: Vec<String> = {
            let mut watchers = self.watchers.lock().await;
            watchers.retain(|_, watcher| watcher.tx.receiver_count() > 0);
            watchers.keys().cloned().collect()
        };

        for address in addresses {
            let quote = match self.fetcher.fetch_pairs(&address).await {
                Ok(pairs) => best_pair(pairs),
                Err(err) => {
                    tracing::warn!(address = %address, error = %err, "price poll failed");
                    continue;
                }
            };

            self.entries.lock().await.insert(
                address.clone(),
                CacheEntry {
                    quote: quote.clone(),
                    fetched_at: Instant::now(),
                },
            );

            if let Some(watcher) = self.watchers.lock().await.get(&address) {
                let _ = watcher.tx.send(quote);
            }
        }
    }

    #[cfg(test)]
    async fn watched_len(&self) -> usize {
        self.watchers.lock().await.len()
    }
}

/// The shared polling loop behind price subscriptions.
pub async fn run(global: Arc<GlobalState>) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(Duration::from_secs(
        global.config.price_api.poll_interval_secs.max(1),
    ));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = global.ctx.done() => {
                return Ok(());
            }
            _ = interval.tick() => {
                global.price_cache.refresh_watched().await;
            }
        }
    }
}
