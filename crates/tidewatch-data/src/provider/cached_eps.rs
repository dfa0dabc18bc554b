//! EPS 캐시 래퍼.
//!
//! 캐시에 신선한 값이 있으면 그대로 쓰고, 없으면 내부 Provider를 호출한 뒤
//! 결과를 캐시에 기록합니다. 조회/저장 실패는 모두 `None`으로 처리되어
//! 밸류에이션이 `unknown`으로 남을 뿐 호출자에게 오류가 전파되지 않습니다.

use async_trait::async_trait;
use chrono::Duration;
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{EpsForecastProvider, ProviderError};
use crate::storage::EpsCacheStore;

pub struct CachedEpsProvider {
    inner: Arc<dyn EpsForecastProvider>,
    cache: Arc<dyn EpsCacheStore>,
    ttl: Duration,
    /// 캐시 미스 시 동시 조회 수
    concurrency: usize,
}

impl CachedEpsProvider {
    pub fn new(
        inner: Arc<dyn EpsForecastProvider>,
        cache: Arc<dyn EpsCacheStore>,
        ttl: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            inner,
            cache,
            ttl,
            concurrency: concurrency.max(1),
        }
    }

    async fn fetch_and_store(&self, code: &str) -> Option<Decimal> {
        match self.inner.fetch_eps(code).await {
            Ok(Some(eps)) => {
                if let Err(e) = self.cache.set(code, eps).await {
                    warn!(code = %code, error = %e, "EPS 캐시 저장 실패");
                }
                Some(eps)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(code = %code, error = %e, "EPS 조회 실패");
                None
            }
        }
    }
}

#[async_trait]
impl EpsForecastProvider for CachedEpsProvider {
    async fn fetch_eps(&self, code: &str) -> Result<Option<Decimal>, ProviderError> {
        let key = [code.to_string()];
        match self.cache.get_batch(&key, self.ttl).await {
            Ok(hits) => {
                if let Some(eps) = hits.get(code) {
                    return Ok(Some(*eps));
                }
            }
            Err(e) => warn!(code = %code, error = %e, "EPS 캐시 조회 실패"),
        }
        Ok(self.fetch_and_store(code).await)
    }

    async fn fetch_eps_batch(&self, codes: &[String]) -> HashMap<String, Decimal> {
        let mut found = match self.cache.get_batch(codes, self.ttl).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "EPS 캐시 일괄 조회 실패");
                HashMap::new()
            }
        };

        let misses: Vec<&String> = codes.iter().filter(|c| !found.contains_key(*c)).collect();
        debug!(hits = found.len(), misses = misses.len(), "EPS 캐시 조회");

        let fetched: Vec<(String, Option<Decimal>)> = stream::iter(misses.into_iter().cloned())
            .map(|code: String| async move {
                let eps = self.fetch_and_store(&code).await;
                (code, eps)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        found.extend(
            fetched
                .into_iter()
                .filter_map(|(code, eps)| eps.map(|e| (code, e))),
        );
        found
    }
}
