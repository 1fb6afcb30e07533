//! 启动参数预处理
//!
//! 从进程参数中提取 `config_option_<key>=<value>` 形式的加载器选项

use regex::Regex;
use std::ffi::OsString;

/// 选项参数前缀
pub const OPTION_PREFIX: &str = "config_option_";

/// 参数扫描结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedArgs {
    /// 提取出的选项，按出现顺序排列，后出现的同名选项覆盖前者
    pub options: Vec<(String, String)>,
    /// 其余参数
    pub remaining: Vec<String>,
}

/// 扫描参数列表
///
/// 参数中任意位置出现 `config_option_<key>=<value>` 即视为选项参数，
/// 键为前缀与第一个 `=` 之间的内容，值为其后的全部内容
pub fn scan_config_options<I, S>(args: I) -> ScannedArgs
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut scanned = ScannedArgs::default();
    let pattern = match Regex::new(r"(?s)config_option_(?P<key>[^=]*)=(?P<value>.*)") {
        Ok(pattern) => pattern,
        Err(e) => {
            tracing::warn!("选项参数正则表达式错误: {}", e);
            scanned.remaining = args.into_iter().map(Into::into).collect();
            return scanned;
        }
    };

    for arg in args {
        let arg = arg.into();
        match pattern.captures(&arg) {
            Some(captures) => {
                scanned
                    .options
                    .push((captures["key"].to_string(), captures["value"].to_string()));
            }
            None => scanned.remaining.push(arg),
        }
    }

    scanned
}

/// 扫描进程原始参数
///
/// 非UTF-8参数按有损方式转换后再扫描，不会panic
pub fn scan_os_args<I>(args: I) -> ScannedArgs
where
    I: IntoIterator<Item = OsString>,
{
    scan_config_options(
        args.into_iter()
            .map(|arg| arg.to_string_lossy().into_owned()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoaderOptions;
    use std::path::PathBuf;

    #[test]
    fn test_scan_extracts_options() {
        let scanned = scan_config_options([
            "confwatch",
            "config_option_filename=app.ini",
            "--debug",
            "config_option_watchIntervalMs=100",
            "run",
        ]);

        assert_eq!(
            scanned.options,
            vec![
                ("filename".to_string(), "app.ini".to_string()),
                ("watchIntervalMs".to_string(), "100".to_string()),
            ]
        );
        assert_eq!(scanned.remaining, vec!["confwatch", "--debug", "run"]);
    }

    #[test]
    fn test_scan_is_unanchored_and_keeps_equals_in_value() {
        let scanned = scan_config_options(["--config_option_filename=a=b.ini"]);
        assert_eq!(
            scanned.options,
            vec![("filename".to_string(), "a=b.ini".to_string())]
        );
        assert!(scanned.remaining.is_empty());
    }

    #[test]
    fn test_scan_without_equals_is_not_an_option() {
        let scanned = scan_config_options(["config_option_debug"]);
        assert!(scanned.options.is_empty());
        assert_eq!(scanned.remaining, vec!["config_option_debug"]);
    }

    #[test]
    fn test_scanned_options_feed_loader_options() {
        let scanned = scan_config_options([
            "config_option_filename=first.ini",
            "config_option_setEnv=false",
            "config_option_filename=second.json",
        ]);
        let options = LoaderOptions::from_pairs(scanned.options);

        assert_eq!(options.filename, Some(PathBuf::from("second.json")));
        assert!(!options.set_env);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_args_are_passed_through() {
        use std::os::unix::ffi::OsStringExt;

        let args = vec![
            OsString::from("confwatch"),
            OsString::from("config_option_debug=true"),
            OsString::from_vec(vec![b'r', b'u', b'n', 0xff]),
        ];

        let scanned = scan_os_args(args);
        assert_eq!(scanned.options, vec![("debug".to_string(), "true".to_string())]);
        assert_eq!(scanned.remaining.len(), 2);
        assert_eq!(scanned.remaining[1], "run\u{fffd}");
    }
}
