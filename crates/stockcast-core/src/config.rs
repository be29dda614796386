//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! 설정 파일(`config/default.toml`)과 `STOCKCAST__` 접두사 환경 변수를 합쳐
//! 로드하며, 값이 없으면 코드 기본값을 사용합니다.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 시세 데이터 수집 설정
    #[serde(default)]
    pub data: DataConfig,
    /// 예측 모델 설정
    #[serde(default)]
    pub model: ModelConfig,
    /// 차트 설정
    #[serde(default)]
    pub chart: ChartConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 요청 전체 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: 120,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 시세 데이터 수집 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    /// Sina K-line API 기본 URL
    pub sina_base_url: String,
    /// Sina 수정주가 계수 기본 URL
    pub finance_base_url: String,
    /// EastMoney 종목 정보 API 기본 URL
    pub eastmoney_base_url: String,
    /// 요청당 봉 개수
    pub datalen: usize,
    /// 최대 시도 횟수
    pub max_retries: u32,
    /// 재시도 대기 증가 단위 (초). k번째 재시도 전 k × step 대기
    pub backoff_step_secs: u64,
    /// HTTP 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// 회사명 조회 최대 시도 횟수
    pub company_lookup_retries: u32,
    /// 회사명 조회 재시도 대기 (밀리초)
    pub company_lookup_delay_ms: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            sina_base_url: "https://quotes.sina.cn".to_string(),
            finance_base_url: "https://finance.sina.com.cn".to_string(),
            eastmoney_base_url: "https://push2.eastmoney.com".to_string(),
            datalen: 1970,
            max_retries: 3,
            backoff_step_secs: 2,
            request_timeout_secs: 15,
            company_lookup_retries: 2,
            company_lookup_delay_ms: 1000,
        }
    }
}

/// 예측 모델 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// 백엔드 ("drift" | "onnx"). onnx는 `ml` feature 빌드에서만 로드됩니다.
    pub backend: String,
    /// ONNX 모델 파일 경로
    pub model_path: String,
    /// 로깅/식별용 모델 이름
    pub model_name: String,
    /// 최대 컨텍스트 길이
    pub max_context: usize,
    /// 최대 예측 길이
    pub max_horizon: usize,
    /// 입력 정규화 여부
    pub normalize_inputs: bool,
    /// 입력이 모두 양수이면 출력을 0 이상으로 제한
    pub infer_is_positive: bool,
    /// 분위수 교차 보정
    pub fix_quantile_crossing: bool,
    /// 예측에 필요한 최소 유효 관측치 수
    pub min_points: usize,
    /// 분위수 출력 배치 ("horizon_major" | "quantile_major"), 없으면 shape로 판단
    pub quantile_layout: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: "drift".to_string(),
            model_path: "models/timesfm-2.5-200m.onnx".to_string(),
            model_name: "timesfm-2.5-200m".to_string(),
            max_context: 1024,
            max_horizon: 256,
            normalize_inputs: true,
            infer_is_positive: true,
            fix_quantile_crossing: true,
            min_points: 10,
            quantile_layout: Some("horizon_major".to_string()),
        }
    }
}

/// 차트 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChartConfig {
    /// 이미지 너비 (픽셀)
    pub width: u32,
    /// 이미지 높이 (픽셀)
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 800,
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // 파일에서 로드 (없어도 됨)
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("STOCKCAST")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.data.max_retries, 3);
        assert_eq!(config.data.backoff_step_secs, 2);
        assert_eq!(config.model.max_context, 1024);
        assert_eq!(config.model.max_horizon, 256);
        assert_eq!(config.model.min_points, 10);
        assert!(config.model.fix_quantile_crossing);
        assert_eq!(config.model.backend, "drift");
    }

    #[test]
    fn test_shipped_config_file_runs_without_ml_feature() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/default.toml");
        assert!(Path::new(path).exists());

        let config = AppConfig::load(path).unwrap();
        assert_eq!(config.model.backend, "drift");
        assert_eq!(config.model.quantile_layout.as_deref(), Some("horizon_major"));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AppConfig::load("does/not/exist.toml").unwrap();
        assert_eq!(config.data.datalen, 1970);
        assert_eq!(config.chart.width, 1600);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"model": {"backend": "onnx"}}"#).unwrap();
        assert_eq!(parsed.model.backend, "onnx");
        assert_eq!(parsed.model.max_horizon, 256);
        assert_eq!(parsed.server.port, 8000);
    }
}
