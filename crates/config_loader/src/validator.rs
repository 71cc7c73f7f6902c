//! 配置校验模块
//!
//! 校验规则：
//! - URL 可解析且为 http(s)
//! - organism / service / subservice 非空
//! - subservice 以 `/` 开头
//! - batch_size / workers / lookback_hours > 0
//! - 限流参数 > 0
//!
//! 凭据单独校验 (`validate_credentials`)，因为密钥通常在 CLI / 环境变量覆盖后才齐全。

use contracts::{SyncBlueprint, SyncError};
use url::Url;

/// 校验 SyncBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &SyncBlueprint) -> Result<(), SyncError> {
    validate_urls(blueprint)?;
    validate_tenant(blueprint)?;
    validate_sync_settings(blueprint)?;
    validate_rate_limit(blueprint)?;
    Ok(())
}

/// 校验凭据齐全
pub fn validate_credentials(blueprint: &SyncBlueprint) -> Result<(), SyncError> {
    let required = [
        ("sensor_api.username", &blueprint.sensor_api.username),
        ("sensor_api.password", &blueprint.sensor_api.password),
        ("context_store.username", &blueprint.context_store.username),
        ("context_store.password", &blueprint.context_store.password),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(SyncError::config_validation(field, "credential is missing"));
        }
    }
    Ok(())
}

/// 校验 URL
fn validate_urls(blueprint: &SyncBlueprint) -> Result<(), SyncError> {
    check_http_url("sensor_api.endpoint", &blueprint.sensor_api.endpoint)?;
    check_http_url("context_store.keystone_url", &blueprint.context_store.keystone_url)?;
    check_http_url("context_store.orion_url", &blueprint.context_store.orion_url)?;
    Ok(())
}

fn check_http_url(field: &str, raw: &str) -> Result<(), SyncError> {
    let url = Url::parse(raw)
        .map_err(|e| SyncError::config_validation(field, format!("invalid url '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(SyncError::config_validation(
            field,
            format!("unsupported scheme '{other}', expected http or https"),
        )),
    }
}

/// 校验租户标识
fn validate_tenant(blueprint: &SyncBlueprint) -> Result<(), SyncError> {
    if blueprint.sensor_api.organism.trim().is_empty() {
        return Err(SyncError::config_validation("sensor_api.organism", "organism cannot be empty"));
    }

    let store = &blueprint.context_store;
    if store.service.trim().is_empty() {
        return Err(SyncError::config_validation(
            "context_store.service",
            "service cannot be empty",
        ));
    }
    if store.subservice.trim().is_empty() {
        return Err(SyncError::config_validation(
            "context_store.subservice",
            "subservice cannot be empty",
        ));
    }
    if !store.subservice.starts_with('/') {
        return Err(SyncError::config_validation(
            "context_store.subservice",
            format!("subservice must start with '/', got '{}'", store.subservice),
        ));
    }
    Ok(())
}

/// 校验同步参数
fn validate_sync_settings(blueprint: &SyncBlueprint) -> Result<(), SyncError> {
    let sync = &blueprint.sync;

    if sync.batch_size == 0 {
        return Err(SyncError::config_validation("sync.batch_size", "batch_size must be > 0"));
    }
    if sync.workers == 0 {
        return Err(SyncError::config_validation("sync.workers", "workers must be > 0"));
    }
    if sync.lookback_hours == 0 {
        return Err(SyncError::config_validation(
            "sync.lookback_hours",
            "lookback_hours must be > 0",
        ));
    }
    Ok(())
}

/// 校验限流参数
fn validate_rate_limit(blueprint: &SyncBlueprint) -> Result<(), SyncError> {
    let rl = &blueprint.sensor_api.rate_limit;
    let fields = [
        ("sensor_api.rate_limit.capacity", u64::from(rl.capacity)),
        ("sensor_api.rate_limit.refill_amount", u64::from(rl.refill_amount)),
        ("sensor_api.rate_limit.refill_interval_secs", rl.refill_interval_secs),
    ];
    for (field, value) in fields {
        if value == 0 {
            return Err(SyncError::config_validation(field, "must be > 0"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        ConfigVersion, ContextStoreConfig, RateLimitConfig, SensorApiConfig, SyncSettings,
    };

    fn minimal_blueprint() -> SyncBlueprint {
        SyncBlueprint {
            version: ConfigVersion::V1,
            sensor_api: SensorApiConfig {
                endpoint: "http://api.urbiotica.net".into(),
                organism: "org".into(),
                username: "user".into(),
                password: "secret".into(),
                request_timeout_secs: 30,
                rate_limit: RateLimitConfig::default(),
            },
            context_store: ContextStoreConfig {
                keystone_url: "https://keystone.example.org:15001".into(),
                orion_url: "https://orion.example.org:1026".into(),
                service: "smartcity".into(),
                subservice: "/parking".into(),
                username: "operator".into(),
                password: "secret".into(),
                request_timeout_secs: 30,
            },
            sync: SyncSettings::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
        assert!(validate_credentials(&bp).is_ok());
    }

    #[test]
    fn test_non_http_url() {
        let mut bp = minimal_blueprint();
        bp.context_store.orion_url = "ftp://orion:21".into();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("context_store.orion_url"), "got: {err}");
        assert!(err.contains("unsupported scheme"), "got: {err}");
    }

    #[test]
    fn test_unparseable_url() {
        let mut bp = minimal_blueprint();
        bp.sensor_api.endpoint = "not a url".into();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("invalid url"), "got: {err}");
    }

    #[test]
    fn test_subservice_requires_leading_slash() {
        let mut bp = minimal_blueprint();
        bp.context_store.subservice = "parking".into();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("must start with '/'"), "got: {err}");
    }

    #[test]
    fn test_empty_organism() {
        let mut bp = minimal_blueprint();
        bp.sensor_api.organism = "  ".into();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_zero_batch_size() {
        let mut bp = minimal_blueprint();
        bp.sync.batch_size = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("batch_size must be > 0"), "got: {err}");
    }

    #[test]
    fn test_zero_workers() {
        let mut bp = minimal_blueprint();
        bp.sync.workers = 0;
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_zero_rate_limit() {
        let mut bp = minimal_blueprint();
        bp.sensor_api.rate_limit.refill_interval_secs = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("refill_interval_secs"), "got: {err}");
    }

    #[test]
    fn test_missing_credentials() {
        let mut bp = minimal_blueprint();
        bp.context_store.password = String::new();
        assert!(validate(&bp).is_ok());
        let err = validate_credentials(&bp).unwrap_err().to_string();
        assert!(err.contains("context_store.password"), "got: {err}");
    }
}
