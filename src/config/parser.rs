//! 配置文件解析器
//!
//! 根据文件扩展名选择格式，将文件内容解析为扁平的键值映射

use crate::config::types::{config_map_from_json, ConfigMap, ConfigValue};
use crate::error::{ConfigError, ConfigLoaderError, ParseError, Result};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFormat {
    /// `key = value` 逐行格式
    Ini,
    /// 扁平JSON对象
    Json,
    /// 由注册的提供者回调生成的模块配置
    Module,
}

impl ConfigFormat {
    /// 根据文件扩展名识别格式
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<ConfigFormat>` - 识别出的格式，不支持时返回 [`ConfigError::UnsupportedFileType`]
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ini") => Ok(ConfigFormat::Ini),
            Some("json") => Ok(ConfigFormat::Json),
            Some("js") => Ok(ConfigFormat::Module),
            _ => Err(ConfigError::UnsupportedFileType {
                path: path.to_string_lossy().to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFormat::Ini => write!(f, "ini"),
            ConfigFormat::Json => write!(f, "json"),
            ConfigFormat::Module => write!(f, "module"),
        }
    }
}

/// 配置提供者trait，用于以代码形式生成配置
///
/// 每次加载都会重新调用，不做任何缓存，因此提供者内部状态的变化会在下次重载时生效
pub trait ConfigProvider: Send + Sync {
    /// 生成配置映射
    ///
    /// # 参数
    /// * `path` - 与提供者关联的模块文件路径
    fn provide(&self, path: &Path) -> Result<ConfigMap>;
}

impl<F> ConfigProvider for F
where
    F: Fn(&Path) -> Result<ConfigMap> + Send + Sync,
{
    fn provide(&self, path: &Path) -> Result<ConfigMap> {
        self(path)
    }
}

/// 配置来源：静态文件或提供者回调
#[derive(Clone)]
pub enum ConfigSource {
    /// 由解析器读取的静态文件
    File { path: PathBuf, format: ConfigFormat },
    /// 由提供者生成的模块配置
    Provider {
        path: PathBuf,
        provider: Option<Arc<dyn ConfigProvider>>,
    },
}

impl fmt::Debug for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File { path, format } => f
                .debug_struct("File")
                .field("path", path)
                .field("format", format)
                .finish(),
            ConfigSource::Provider { path, provider } => f
                .debug_struct("Provider")
                .field("path", path)
                .field("registered", &provider.is_some())
                .finish(),
        }
    }
}

/// 解析得到的原始结果
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedConfig {
    /// 来源格式
    pub format: ConfigFormat,
    /// 原始键值
    pub values: ConfigMap,
}

impl ConfigSource {
    /// 根据路径构建配置来源
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    /// * `provider` - `.js` 模块使用的提供者（可选）
    pub fn resolve(path: &Path, provider: Option<Arc<dyn ConfigProvider>>) -> Result<Self> {
        let path = path.to_path_buf();
        match ConfigFormat::from_path(&path)? {
            ConfigFormat::Module => Ok(ConfigSource::Provider { path, provider }),
            format => Ok(ConfigSource::File { path, format }),
        }
    }

    /// 配置来源关联的文件路径
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::File { path, .. } | ConfigSource::Provider { path, .. } => path,
        }
    }

    /// 来源格式
    pub fn format(&self) -> ConfigFormat {
        match self {
            ConfigSource::File { format, .. } => *format,
            ConfigSource::Provider { .. } => ConfigFormat::Module,
        }
    }

    /// 读取并解析配置
    pub fn load(&self) -> Result<ParsedConfig> {
        let values = match self {
            ConfigSource::File { path, format } => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| ConfigLoaderError::io(path, e))?;
                parse_content(&content, *format)?
            }
            ConfigSource::Provider { path, provider } => load_module(path, provider.as_deref())?,
        };

        log::debug!(
            "解析配置文件 {} 完成，共 {} 个键",
            self.path().display(),
            values.len()
        );

        Ok(ParsedConfig {
            format: self.format(),
            values,
        })
    }
}

/// 按格式解析文本内容
///
/// # 参数
/// * `content` - 文件内容
/// * `format` - 文件格式，`Module` 格式没有文本形式
pub fn parse_content(content: &str, format: ConfigFormat) -> Result<ConfigMap> {
    match format {
        ConfigFormat::Ini => parse_ini(content),
        ConfigFormat::Json => parse_json(content),
        ConfigFormat::Module => Err(ParseError::Provider("模块配置不能从文本解析".to_string()).into()),
    }
}

/// 解析INI内容
///
/// 每行匹配 `key = value`，键中不能包含 `;`（因此 `;` 开头的注释行被忽略），
/// 键在第一个 `=` 处结束，不匹配的行直接跳过。值保持原始字符串，数值转换由规范化阶段完成。
pub fn parse_ini(content: &str) -> Result<ConfigMap> {
    let line_break = Regex::new(r"\r\n?|\n")
        .map_err(|e| anyhow::anyhow!("正则表达式错误: {}", e))?;
    let line_pattern = Regex::new(r"^\s*(?P<key>[^;=]+?)\s*=\s*(?P<value>.*?)\s*$")
        .map_err(|e| anyhow::anyhow!("正则表达式错误: {}", e))?;

    let mut values = ConfigMap::new();
    for line in line_break.split(content) {
        let Some(captures) = line_pattern.captures(line) else {
            continue;
        };
        let key = captures["key"].trim();
        if key.is_empty() {
            continue;
        }
        let value = captures.name("value").map_or("", |m| m.as_str().trim());
        values.insert(key.to_string(), ConfigValue::String(value.to_string()));
    }

    Ok(values)
}

/// 解析JSON内容，顶层必须是对象
pub fn parse_json(content: &str) -> Result<ConfigMap> {
    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|e| ParseError::Json(e.to_string()))?;
    config_map_from_json(value)
}

/// 通过提供者加载模块配置
fn load_module(path: &Path, provider: Option<&dyn ConfigProvider>) -> Result<ConfigMap> {
    if !path.exists() {
        return Err(ParseError::ModuleNotFound {
            path: path.to_string_lossy().to_string(),
        }
        .into());
    }

    let provider = provider.ok_or_else(|| ParseError::NoProvider {
        path: path.to_string_lossy().to_string(),
    })?;

    provider.provide(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("config.ini")).unwrap(),
            ConfigFormat::Ini
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("/etc/app/config.json")).unwrap(),
            ConfigFormat::Json
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("./config.js")).unwrap(),
            ConfigFormat::Module
        );

        let err = ConfigFormat::from_path(Path::new("config.txt")).unwrap_err();
        assert!(err.to_string().contains("unsupported file type"));
        assert!(ConfigFormat::from_path(Path::new("")).is_err());
        assert!(ConfigFormat::from_path(Path::new("config")).is_err());
    }

    #[test]
    fn test_parse_ini_trims_key_and_value() {
        let values = parse_ini("  PORT   =   8080   \nNAME=\"svc\"\n\tHOST\t= localhost").unwrap();

        assert_eq!(values.len(), 3);
        assert_eq!(values["PORT"], ConfigValue::from("8080"));
        assert_eq!(values["NAME"], ConfigValue::from("\"svc\""));
        assert_eq!(values["HOST"], ConfigValue::from("localhost"));
    }

    #[test]
    fn test_parse_ini_ignores_unmatched_lines() {
        let content = "[section]\n; comment = ignored\n\njust text\nkey;x = 1\nvalid = yes";
        let values = parse_ini(content).unwrap();

        assert_eq!(values.len(), 1);
        assert_eq!(values["valid"], ConfigValue::from("yes"));
    }

    #[test]
    fn test_parse_ini_semicolon_and_equals_in_value() {
        let values = parse_ini("DSN = host=db;port=5432\nEMPTY =\n = orphan").unwrap();

        assert_eq!(values["DSN"], ConfigValue::from("host=db;port=5432"));
        assert_eq!(values["EMPTY"], ConfigValue::from(""));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_parse_ini_line_endings() {
        let values = parse_ini("A=1\r\nB=2\rC=3\nD=4").unwrap();
        assert_eq!(values.len(), 4);
        assert_eq!(values["C"], ConfigValue::from("3"));
    }

    #[test]
    fn test_parse_json() {
        let values = parse_json(r#"{"PORT": 8080, "NAME": "'svc'"}"#).unwrap();
        assert_eq!(values["PORT"], ConfigValue::Number(8080.0));
        assert_eq!(values["NAME"], ConfigValue::from("'svc'"));

        assert!(matches!(
            parse_json("{ not json"),
            Err(ConfigLoaderError::Parse(ParseError::Json(_)))
        ));
        assert!(matches!(
            parse_json("[1, 2]"),
            Err(ConfigLoaderError::Parse(ParseError::NotAnObject))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let source = ConfigSource::resolve(Path::new("/nonexistent/config.ini"), None).unwrap();
        assert!(matches!(source.load(), Err(ConfigLoaderError::Io { .. })));
    }

    #[test]
    fn test_module_requires_file_and_provider() {
        let temp_dir = TempDir::new().unwrap();
        let module_path = temp_dir.path().join("config.js");

        let provider: Arc<dyn ConfigProvider> = Arc::new(|_: &Path| -> Result<ConfigMap> {
            let mut map = ConfigMap::new();
            map.insert("FROM_CODE".to_string(), ConfigValue::from("yes"));
            Ok(map)
        });

        // 模块文件不存在
        let source = ConfigSource::resolve(&module_path, Some(provider.clone())).unwrap();
        assert!(matches!(
            source.load(),
            Err(ConfigLoaderError::Parse(ParseError::ModuleNotFound { .. }))
        ));

        fs::write(&module_path, "module.exports = {}").unwrap();

        // 没有注册提供者
        let source = ConfigSource::resolve(&module_path, None).unwrap();
        assert!(matches!(
            source.load(),
            Err(ConfigLoaderError::Parse(ParseError::NoProvider { .. }))
        ));

        let source = ConfigSource::resolve(&module_path, Some(provider)).unwrap();
        let parsed = source.load().unwrap();
        assert_eq!(parsed.format, ConfigFormat::Module);
        assert_eq!(parsed.values["FROM_CODE"], ConfigValue::from("yes"));
    }
}
