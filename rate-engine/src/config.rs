use crate::refresh::DEFAULT_DEBOUNCE_MS;
use shared::models::PricingMode;
use std::time::Duration;

/// 引擎配置 - 刷新合并窗口与写操作超时
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | RATE_REFRESH_DEBOUNCE_MS | 250 | 矩阵刷新合并窗口(毫秒) |
/// | RATE_MUTATION_TIMEOUT_MS | 15000 | 写操作超时(毫秒) |
/// | RATE_DEFAULT_PRICING_MODE | (空) | 方案未设置口径时的兜底计价方式 |
///
/// # 示例
///
/// ```ignore
/// RATE_MUTATION_TIMEOUT_MS=5000 rate-cli matrix 1
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// 事件合并窗口，窗口内多次变更只触发一次重新加载
    pub refresh_debounce_ms: u64,
    /// 每个写请求的客户端超时
    pub mutation_timeout_ms: u64,
    /// 方案 default_pricing_mode 缺失时使用
    pub default_pricing_mode: Option<PricingMode>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_debounce_ms: DEFAULT_DEBOUNCE_MS,
            mutation_timeout_ms: 15_000,
            default_pricing_mode: None,
        }
    }
}

impl EngineConfig {
    /// 从环境变量加载配置
    ///
    /// 未设置或无法解析时使用默认值
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            refresh_debounce_ms: std::env::var("RATE_REFRESH_DEBOUNCE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.refresh_debounce_ms),
            mutation_timeout_ms: std::env::var("RATE_MUTATION_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.mutation_timeout_ms),
            default_pricing_mode: std::env::var("RATE_DEFAULT_PRICING_MODE")
                .ok()
                .and_then(|v| PricingMode::parse_lenient(&v)),
        }
    }

    pub fn with_mutation_timeout(mut self, timeout: Duration) -> Self {
        self.mutation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }

    pub fn mutation_timeout(&self) -> Duration {
        Duration::from_millis(self.mutation_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.mutation_timeout(), Duration::from_secs(15));
        assert_eq!(config.default_pricing_mode, None);
    }

    #[test]
    fn test_timeout_override() {
        let config = EngineConfig::default().with_mutation_timeout(Duration::from_millis(40));
        assert_eq!(config.mutation_timeout_ms, 40);
    }
}
