//! 동화순(同花顺) EPS 컨센서스 크롤러.
//!
//! `GET /new/{code}/worth.html` 페이지의 "예측 연보 EPS" 표에서 가장 이른 연도
//! (당해 연도) 행의 `均值` 열을 읽습니다.
//!
//! blocking HTTP 클라이언트를 쓰므로 호출은 전용 [`BlockingPool`]에서 실행됩니다.
//! blocking 클라이언트는 async 컨텍스트에서 생성/해제하면 안 되므로 작업마다
//! 풀 스레드 안에서 만듭니다.

use async_trait::async_trait;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tidewatch_core::bare_code;
use tokio::sync::Semaphore;
use tracing::{debug, instrument};

use super::{EpsForecastProvider, ProviderError};

/// 크기가 제한된 blocking 작업 풀.
///
/// `spawn_blocking` 앞에 세마포어를 두어 동시에 도는 작업 수를 `workers`로 제한합니다.
#[derive(Debug, Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl BlockingPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// 작업을 풀에서 실행하고 결과를 기다립니다.
    pub async fn run<F, T>(&self, job: F) -> Result<T, ProviderError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ProviderError::Network("blocking 풀이 닫혔습니다".to_string()))?;

        tokio::task::spawn_blocking(job)
            .await
            .map_err(|e| ProviderError::Network(format!("blocking 작업 실패: {}", e)))
    }
}

/// 동화순 EPS 클라이언트.
#[derive(Debug, Clone)]
pub struct ThsEpsClient {
    base_url: String,
    timeout: Duration,
    pool: BlockingPool,
}

impl ThsEpsClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://basic.10jqka.com.cn";

    pub fn new(base_url: impl Into<String>, timeout: Duration, pool: BlockingPool) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            pool,
        }
    }

    fn fetch_page_blocking(url: &str, timeout: Duration) -> Result<String, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .build()?;

        let response = client.get(url).send()?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: url.to_string(),
            });
        }
        Ok(response.text()?)
    }
}

/// 셀 텍스트를 공백 없이 모읍니다.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// 컨센서스 표에서 가장 이른 연도의 평균 EPS를 찾습니다.
///
/// 헤더에 `年度`와 `均值`가 모두 있는 첫 번째 표를 사용합니다. 표가 없거나
/// 값이 숫자가 아니면 `None`입니다.
pub(crate) fn parse_consensus_eps(html: &str) -> Option<Decimal> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table").ok()?;
    let row_sel = Selector::parse("tr").ok()?;
    let cell_sel = Selector::parse("th, td").ok()?;

    for table in document.select(&table_sel) {
        let mut rows = table.select(&row_sel);
        let Some(header) = rows.next() else {
            continue;
        };
        let headers: Vec<String> = header.select(&cell_sel).map(cell_text).collect();
        let year_col = headers.iter().position(|h| h.contains("年度"));
        let mean_col = headers.iter().position(|h| h.contains("均值"));
        let (Some(year_col), Some(mean_col)) = (year_col, mean_col) else {
            continue;
        };

        let earliest = rows
            .filter_map(|row| {
                let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
                let year: i32 = cells.get(year_col)?.parse().ok()?;
                let mean: Decimal = cells.get(mean_col)?.parse().ok()?;
                Some((year, mean))
            })
            .min_by_key(|(year, _)| *year);

        if let Some((_, eps)) = earliest {
            return Some(eps);
        }
    }
    None
}

#[async_trait]
impl EpsForecastProvider for ThsEpsClient {
    #[instrument(skip(self), fields(provider = "ths"))]
    async fn fetch_eps(&self, code: &str) -> Result<Option<Decimal>, ProviderError> {
        let url = format!("{}/new/{}/worth.html", self.base_url, bare_code(code));
        let timeout = self.timeout;

        let html = self
            .pool
            .run(move || Self::fetch_page_blocking(&url, timeout))
            .await??;

        let eps = parse_consensus_eps(&html);
        debug!(code = %code, eps = ?eps, "EPS 컨센서스 조회");
        Ok(eps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const PAGE: &str = r#"
        <html><body>
        <table class="m_table"><tr><th>机构</th><th>评级</th></tr><tr><td>A</td><td>买入</td></tr></table>
        <table class="m_table m_hl">
          <thead><tr><th>年度</th><th>预测机构数</th><th>最小值</th><th>均值</th><th>最大值</th></tr></thead>
          <tbody>
            <tr><td>2025</td><td>12</td><td>1.30</td><td>1.42</td><td>1.55</td></tr>
            <tr><td>2024</td><td>15</td><td>1.20</td><td>1.31</td><td>1.40</td></tr>
            <tr><td>2026</td><td>9</td><td>1.41</td><td>1.52</td><td>1.70</td></tr>
          </tbody>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_earliest_year_mean() {
        assert_eq!(parse_consensus_eps(PAGE), Some(dec!(1.31)));
    }

    #[test]
    fn test_parse_without_table() {
        assert_eq!(parse_consensus_eps("<html><body>暂无数据</body></html>"), None);
    }

    #[tokio::test]
    async fn test_blocking_pool_runs_job() {
        let pool = BlockingPool::new(0);
        assert_eq!(pool.workers(), 1);
        assert_eq!(pool.run(|| 21 * 2).await.unwrap(), 42);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fetch_eps_with_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/new/600900/worth.html")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(PAGE)
            .create_async()
            .await;

        let client = ThsEpsClient::new(server.url(), Duration::from_secs(5), BlockingPool::new(2));
        let eps = client.fetch_eps("sh600900").await.unwrap();

        mock.assert_async().await;
        assert_eq!(eps, Some(dec!(1.31)));
    }
}
