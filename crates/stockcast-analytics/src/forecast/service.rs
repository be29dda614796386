//! 예측 서비스.
//!
//! 모델은 첫 예측 요청 때 한 번만 로드되며, 이후 추론은 하나의 뮤텍스로
//! 직렬화됩니다. 로드 실패는 캐시되지 않으므로 다음 요청이 다시 시도합니다.
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! let service = ForecastService::new(ForecasterConfig::drift());
//! let plan = resolve_horizon(true, BarPeriod::M60, 0, service.config().max_horizon)?;
//! let outcome = service.forecast(&closes, 200, &plan).await?;
//! println!("{}", outcome.summary.trend);
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use super::config::ForecasterConfig;
use super::error::{ForecastError, ForecastResult};
use super::horizon::HorizonPlan;
use super::loader::{BackendLoader, ModelLoader};
use super::postprocess::run_forecaster;
use super::predictor::Forecaster;
use super::summary::ForecastSummary;
use super::types::ForecastBand;
use crate::chart::{render_forecast_png, ChartOptions};

type SharedModel = Arc<Mutex<Box<dyn Forecaster>>>;

/// 예측 결과.
#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    /// 모델에 넣은 과거 종가 (lookback 창)
    pub history: Vec<f64>,
    pub plan: HorizonPlan,
    /// 점 예측
    pub point: Vec<f64>,
    pub band: ForecastBand,
    pub summary: ForecastSummary,
    pub model_name: String,
    /// 추론 소요 시간
    pub elapsed: Duration,
    /// 렌더링된 PNG (요청한 경우)
    pub chart_png: Option<Vec<u8>>,
}

/// 지연 로드되는 예측 모델을 감싼 서비스.
pub struct ForecastService {
    config: ForecasterConfig,
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<SharedModel>,
}

impl ForecastService {
    /// 기본 로더로 서비스를 생성합니다. 모델은 아직 로드하지 않습니다.
    pub fn new(config: ForecasterConfig) -> Self {
        Self::with_loader(config, Arc::new(BackendLoader))
    }

    /// 로더를 지정하여 생성합니다.
    pub fn with_loader(config: ForecasterConfig, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            config,
            loader,
            model: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ForecasterConfig {
        &self.config
    }

    /// 모델이 로드되었는지 확인.
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// 모델을 미리 로드합니다.
    pub async fn warm_up(&self) -> ForecastResult<()> {
        self.model().await.map(|_| ())
    }

    async fn model(&self) -> ForecastResult<SharedModel> {
        let model = self
            .model
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                let config = self.config.clone();
                let started = Instant::now();

                let model = tokio::task::spawn_blocking(move || loader.load(&config)).await??;

                info!(
                    model = model.model_name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "예측 모델 준비 완료"
                );
                Ok::<_, ForecastError>(Arc::new(Mutex::new(model)))
            })
            .await?;
        Ok(Arc::clone(model))
    }

    /// 종가에서 모델 컨텍스트를 만듭니다.
    ///
    /// 마지막 `min(lookback, max_context)`개 중 유한한 값만 남기며,
    /// `min_points`보다 적으면 에러입니다.
    pub fn prepare_context(&self, closes: &[f64], lookback: usize) -> ForecastResult<Vec<f64>> {
        if lookback == 0 {
            return Err(ForecastError::InvalidInput(
                "lookback must be >= 1".to_string(),
            ));
        }

        let window = lookback.min(self.config.max_context.max(1));
        let start = closes.len().saturating_sub(window);
        let context: Vec<f64> = closes[start..]
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .collect();

        if context.len() < self.config.min_points {
            return Err(ForecastError::InsufficientData {
                required: self.config.min_points,
                actual: context.len(),
            });
        }
        Ok(context)
    }

    /// 종가 시계열을 예측합니다.
    ///
    /// 입력 검증은 모델 로드 전에 수행되므로, 데이터가 부족한 요청은
    /// 모델을 로드하지 않습니다.
    pub async fn forecast(
        &self,
        closes: &[f64],
        lookback: usize,
        plan: &HorizonPlan,
    ) -> ForecastResult<ForecastOutcome> {
        let history = self.prepare_context(closes, lookback)?;
        if plan.steps == 0 {
            return Err(ForecastError::InvalidInput(
                "horizon must be >= 1".to_string(),
            ));
        }
        let current = *history
            .last()
            .ok_or_else(|| ForecastError::InvalidInput("empty context".to_string()))?;

        let model = self.model().await?;
        let guard = model.lock_owned().await;

        let config = self.config.clone();
        let context = history.clone();
        let horizon = plan.steps;
        let started = Instant::now();

        let (raw, model_name) = tokio::task::spawn_blocking(move || {
            let mut guard = guard;
            let raw = run_forecaster(&mut **guard, &context, horizon, &config)?;
            Ok::<_, ForecastError>((raw, guard.model_name().to_string()))
        })
        .await??;
        let elapsed = started.elapsed();

        let band = raw.quantiles.band();
        let summary = ForecastSummary::compute(current, &raw.point, &band)?;

        debug!(
            model = %model_name,
            context = history.len(),
            horizon,
            elapsed_ms = elapsed.as_millis() as u64,
            trend = %summary.trend,
            "예측 요청 처리"
        );

        Ok(ForecastOutcome {
            history,
            plan: *plan,
            point: raw.point,
            band,
            summary,
            model_name,
            elapsed,
            chart_png: None,
        })
    }

    /// 예측 후 차트까지 렌더링합니다.
    pub async fn forecast_with_chart(
        &self,
        closes: &[f64],
        lookback: usize,
        plan: &HorizonPlan,
        options: ChartOptions,
    ) -> ForecastResult<ForecastOutcome> {
        let mut outcome = self.forecast(closes, lookback, plan).await?;

        let history = outcome.history.clone();
        let point = outcome.point.clone();
        let band = outcome.band.clone();
        let png = tokio::task::spawn_blocking(move || {
            render_forecast_png(&history, &point, &band, &options)
        })
        .await??;

        outcome.chart_png = Some(png);
        Ok(outcome)
    }
}

impl std::fmt::Debug for ForecastService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForecastService")
            .field("backend", &self.config.backend)
            .field("model_name", &self.config.model_name)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::horizon::resolve_horizon;
    use crate::forecast::predictor::DriftForecaster;
    use crate::forecast::summary::Trend;
    use crate::forecast::types::RawForecast;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stockcast_core::BarPeriod;

    #[derive(Default)]
    struct Counters {
        loads: AtomicUsize,
        failures_left: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    struct CountingLoader {
        counters: Arc<Counters>,
    }

    impl ModelLoader for CountingLoader {
        fn load(&self, _config: &ForecasterConfig) -> ForecastResult<Box<dyn Forecaster>> {
            self.counters.loads.fetch_add(1, Ordering::SeqCst);
            if self
                .counters
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(ForecastError::ModelLoad("weights missing".to_string()));
            }
            // 동시 로드가 겹치도록 잠시 대기
            std::thread::sleep(Duration::from_millis(20));
            Ok(Box::new(CountingForecaster {
                inner: DriftForecaster::default(),
                counters: Arc::clone(&self.counters),
            }))
        }
    }

    struct CountingForecaster {
        inner: DriftForecaster,
        counters: Arc<Counters>,
    }

    impl Forecaster for CountingForecaster {
        fn forecast(&mut self, context: &[f64], horizon: usize) -> ForecastResult<RawForecast> {
            let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.counters.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            let out = self.inner.forecast(context, horizon);
            self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
            out
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    fn service(counters: &Arc<Counters>) -> Arc<ForecastService> {
        Arc::new(ForecastService::with_loader(
            ForecasterConfig::drift(),
            Arc::new(CountingLoader {
                counters: Arc::clone(counters),
            }),
        ))
    }

    fn closes() -> Vec<f64> {
        (0..60).map(|i| 10.0 + 0.05 * i as f64).collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_calls_load_once_and_serialize() {
        let counters = Arc::new(Counters::default());
        let service = service(&counters);
        let plan = resolve_horizon(true, BarPeriod::M60, 0, 256).unwrap();

        let mut set = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let service = Arc::clone(&service);
            let closes = closes();
            set.spawn(async move { service.forecast(&closes, 100, &plan).await });
        }
        while let Some(result) = set.join_next().await {
            let outcome = result.unwrap().unwrap();
            assert_eq!(outcome.point.len(), 12);
            assert_eq!(outcome.model_name, "counting");
        }

        assert_eq!(counters.loads.load(Ordering::SeqCst), 1);
        assert_eq!(counters.calls.load(Ordering::SeqCst), 8);
        assert_eq!(counters.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(service.is_loaded());
    }

    #[tokio::test]
    async fn test_insufficient_data_does_not_load_model() {
        let counters = Arc::new(Counters::default());
        let service = service(&counters);
        let plan = resolve_horizon(false, BarPeriod::M60, 5, 256).unwrap();

        let err = service
            .forecast(&[1.0, 2.0, f64::NAN, 3.0], 100, &plan)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientData {
                required: 10,
                actual: 3
            }
        ));
        assert_eq!(counters.loads.load(Ordering::SeqCst), 0);
        assert!(!service.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let counters = Arc::new(Counters::default());
        counters.failures_left.store(1, Ordering::SeqCst);
        let service = service(&counters);
        let plan = resolve_horizon(false, BarPeriod::M60, 3, 256).unwrap();

        let err = service.forecast(&closes(), 50, &plan).await.unwrap_err();
        assert!(err.requires_reload());
        assert!(!service.is_loaded());

        let outcome = service.forecast(&closes(), 50, &plan).await.unwrap();
        assert_eq!(outcome.point.len(), 3);
        assert_eq!(counters.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_lookback_window_and_summary() {
        let service = ForecastService::new(ForecasterConfig::drift());
        let closes: Vec<f64> = (1..=30).map(f64::from).collect();
        let plan = resolve_horizon(false, BarPeriod::M60, 5, 256).unwrap();

        let outcome = service.forecast(&closes, 10, &plan).await.unwrap();
        assert_eq!(outcome.history, (21..=30).map(f64::from).collect::<Vec<_>>());
        assert_eq!(outcome.summary.current_price, 30.0);
        assert_eq!(outcome.summary.pct_changes.len(), 5);
        assert_eq!(outcome.summary.trend.label(), "上升");
        assert!(outcome.chart_png.is_none());
    }

    #[tokio::test]
    async fn test_ten_rising_closes_forecast_up() {
        let service = ForecastService::new(ForecasterConfig::drift());
        let closes: Vec<f64> = (1..=10).map(f64::from).collect();
        let plan = resolve_horizon(false, BarPeriod::M60, 5, 256).unwrap();

        let outcome = service.forecast(&closes, 200, &plan).await.unwrap();
        assert_eq!(outcome.history, closes);
        assert_eq!(outcome.point.len(), 5);
        assert_eq!(outcome.band.lower.len(), 5);
        assert_eq!(outcome.band.upper.len(), 5);
        assert_eq!(outcome.summary.current_price, 10.0);
        assert_eq!(outcome.summary.trend, Trend::Up);
    }

    #[tokio::test]
    async fn test_zero_lookback_rejected() {
        let service = ForecastService::new(ForecasterConfig::drift());
        let plan = resolve_horizon(false, BarPeriod::M60, 5, 256).unwrap();
        let err = service.forecast(&closes(), 0, &plan).await.unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_forecast_with_chart_renders_png() {
        let service = ForecastService::new(ForecasterConfig::drift());
        let plan = resolve_horizon(false, BarPeriod::M60, 4, 256).unwrap();
        let outcome = service
            .forecast_with_chart(&closes(), 40, &plan, ChartOptions::new(320, 160))
            .await
            .unwrap();
        let png = outcome.chart_png.unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
