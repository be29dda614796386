//! 설정 출력 명령어.

use anyhow::{Context, Result};

use stockcast_core::AppConfig;

/// 적용 중인 설정을 TOML로 렌더링합니다.
pub fn render_config(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config).context("failed to serialize configuration")
}

/// 설정 명령 실행.
pub fn run_config(config: &AppConfig) -> Result<()> {
    print!("{}", render_config(config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_round_trips_defaults() {
        let text = render_config(&AppConfig::default()).unwrap();
        assert!(text.contains("[server]"));
        assert!(text.contains("[model]"));

        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.server.port, 8000);
        assert_eq!(parsed.data.max_retries, 3);
    }
}
