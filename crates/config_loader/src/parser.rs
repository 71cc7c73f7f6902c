//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。
//! 解析前展开 `${NAME}` / `${NAME:-fallback}` 环境变量引用。

use contracts::{SyncBlueprint, SyncError};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<SyncBlueprint, SyncError> {
    toml::from_str(content).map_err(|e| SyncError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<SyncBlueprint, SyncError> {
    serde_json::from_str(content).map_err(|e| SyncError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置 (先展开环境变量)
pub fn parse(content: &str, format: ConfigFormat) -> Result<SyncBlueprint, SyncError> {
    let content = interpolate(content, |name| std::env::var(name).ok())?;
    match format {
        ConfigFormat::Toml => parse_toml(&content),
        ConfigFormat::Json => parse_json(&content),
    }
}

/// 展开 `${NAME}`、`${NAME:-fallback}` 与 `$$`
///
/// 其余 `$` 原样保留。
pub fn interpolate<F>(content: &str, lookup: F) -> Result<String, SyncError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];

        if let Some(after) = tail.strip_prefix('$') {
            out.push('$');
            rest = after;
        } else if let Some(body) = tail.strip_prefix('{') {
            let end = body.find('}').ok_or_else(|| {
                SyncError::config_parse(format!(
                    "unterminated variable reference at byte {}",
                    content.len() - rest.len() + pos
                ))
            })?;
            let reference = &body[..end];
            let (name, fallback) = match reference.split_once(":-") {
                Some((name, fallback)) => (name, Some(fallback)),
                None => (reference, None),
            };
            if name.is_empty() {
                return Err(SyncError::config_parse("empty variable reference '${}'"));
            }

            match (lookup(name), fallback) {
                (Some(value), _) => out.push_str(&value),
                (None, Some(fallback)) => out.push_str(fallback),
                (None, None) => {
                    return Err(SyncError::config_parse(format!(
                        "environment variable '{name}' is not set"
                    )))
                }
            }
            rest = &body[end + 1..];
        } else {
            out.push('$');
            rest = tail;
        }
    }

    out.push_str(rest);
    Ok(out)
}
