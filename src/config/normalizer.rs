//! 配置值规范化
//!
//! 对解析结果做数值转换和去引号处理

use crate::config::parser::{ConfigFormat, ParsedConfig};
use crate::config::types::{ConfigMap, ConfigValue};

/// 规范化解析结果
///
/// 先对INI来源的值做数值转换，再对所有字符串值去掉一层成对引号。
/// 顺序不可颠倒：带引号的数字（如 `"42"`）不是数字，去引号后仍为字符串。
pub fn normalize(parsed: ParsedConfig) -> ConfigMap {
    let coerce = parsed.format == ConfigFormat::Ini;
    parsed
        .values
        .into_iter()
        .map(|(key, value)| {
            let value = if coerce { coerce_number(value) } else { value };
            (key, strip_quotes(value))
        })
        .collect()
}

/// 整个字符串是有限数值时转换为数值
pub fn coerce_number(value: ConfigValue) -> ConfigValue {
    match value {
        ConfigValue::String(s) => match parse_finite(&s) {
            Some(n) => ConfigValue::Number(n),
            None => ConfigValue::String(s),
        },
        other => other,
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// 去掉一层成对的单引号或双引号
///
/// 少于两个字符的字符串和非字符串值原样返回
pub fn strip_quotes(value: ConfigValue) -> ConfigValue {
    match value {
        ConfigValue::String(s) => ConfigValue::String(unquote(&s).to_string()),
        other => other,
    }
}

fn unquote(s: &str) -> &str {
    let mut chars = s.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if first == last && (first == '"' || first == '\'') => {
            // 引号都是单字节字符
            &s[1..s.len() - 1]
        }
        _ => s,
    }
}
