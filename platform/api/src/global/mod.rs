use std::sync::Arc;
use std::time::Duration;

use common::context::Context;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::price::{HttpPriceFetcher, PriceCache};
use crate::rooms::{RoomApi, RoomApiClient};

pub struct GlobalState {
    pub config: AppConfig,
    pub ctx: Context,
    pub db: Arc<sqlx::PgPool>,
    pub rooms: Arc<dyn RoomApi>,
    pub price_cache: PriceCache,
    /// Serializes the scheduled sweep and the manual sync endpoint.
    pub sweep_lock: Mutex<()>,
}

impl GlobalState {
    pub fn new(config: AppConfig, db: Arc<sqlx::PgPool>, ctx: Context) -> anyhow::Result<Self> {
        let rooms: Arc<dyn RoomApi> = Arc::new(RoomApiClient::new(&config.media_server)?);
        let price_cache = PriceCache::new(
            Arc::new(HttpPriceFetcher::new(&config.price_api)?),
            Duration::from_secs(config.price_api.cache_ttl_secs),
        );

        Ok(Self {
            config,
            ctx,
            db,
            rooms,
            price_cache,
            sweep_lock: Mutex::new(()),
        })
    }
}
