//! User-agent 分类
//!
//! 纯函数，无状态：
//! - [`is_bot`]: 爬虫 / 命令行工具过滤
//! - [`classify_device`]: 设备类型，按顺序第一条匹配的规则生效
//! - [`is_browser`]: 浏览器特征匹配，浏览器流量不被代理

use std::sync::OnceLock;

use strum::{AsRefStr, Display};
use woothee::parser::Parser;

/// 爬虫 / 工具 UA 关键字（小写子串匹配）
const BOT_TOKENS: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "curl",
    "wget",
    "slurp",
    "mediapartners",
];

const SMART_TV_TOKENS: &[&str] = &[
    "smarttv",
    "smart-tv",
    "hbbtv",
    "netcast",
    "tizen",
    "webos",
    "appletv",
    "googletv",
    "firetv",
    "android tv",
];

const BROWSER_SIGNATURES: &[&str] = &["mozilla", "chrome", "safari", "firefox", "edge"];

static PARSER: OnceLock<Parser> = OnceLock::new();

fn parser() -> &'static Parser {
    PARSER.get_or_init(Parser::new)
}

/// 设备类型，`Display` 输出即为写入访问日志的字符串
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum DeviceType {
    #[strum(serialize = "SmartTV")]
    SmartTv,
    #[strum(serialize = "iPhone")]
    IPhone,
    #[strum(serialize = "iPad")]
    IPad,
    #[strum(serialize = "Mobile")]
    Mobile,
    #[strum(serialize = "Windows PC")]
    WindowsPc,
    #[strum(serialize = "Mac")]
    Mac,
    #[strum(serialize = "Linux")]
    Linux,
    #[strum(serialize = "Unknown")]
    Unknown,
}

impl DeviceType {
    pub fn is_known(self) -> bool {
        self != DeviceType::Unknown
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// 是否为爬虫或工具流量
///
/// 先匹配关键字黑名单，再用 woothee 的 `crawler` 分类兜住不含关键字的爬虫
pub fn is_bot(user_agent: &str) -> bool {
    let ua = user_agent.to_lowercase();
    if contains_any(&ua, BOT_TOKENS) {
        return true;
    }

    parser()
        .parse(user_agent)
        .is_some_and(|r| r.category == "crawler")
}

pub fn classify_device(user_agent: &str) -> DeviceType {
    let ua = user_agent.to_lowercase();

    if contains_any(&ua, SMART_TV_TOKENS) {
        DeviceType::SmartTv
    } else if ua.contains("iphone") {
        DeviceType::IPhone
    } else if ua.contains("ipad") {
        DeviceType::IPad
    } else if ua.contains("android") || ua.contains("mobile") {
        DeviceType::Mobile
    } else if ua.contains("window") {
        DeviceType::WindowsPc
    } else if ua.contains("macintosh") || ua.contains("mac os") {
        DeviceType::Mac
    } else if ua.contains("linux") {
        DeviceType::Linux
    } else {
        DeviceType::Unknown
    }
}

pub fn is_browser(user_agent: &str) -> bool {
    contains_any(&user_agent.to_lowercase(), BROWSER_SIGNATURES)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

    #[test]
    fn test_bot_tokens() {
        assert!(is_bot(
            "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)"
        ));
        assert!(is_bot("curl/8.4.0"));
        assert!(is_bot("Wget/1.21.4"));
        assert!(is_bot("Mozilla/5.0 (compatible; Yahoo! Slurp)"));
        assert!(is_bot("Mediapartners-Google"));
        assert!(!is_bot(CHROME_WIN));
        assert!(!is_bot("VLC/3.0.20 LibVLC/3.0.20"));
    }

    #[test]
    fn test_device_priority() {
        // TV 关键字优先于 UA 中的其他特征
        assert_eq!(
            classify_device("Mozilla/5.0 (Linux; Tizen 6.0) SamsungBrowser/4.0 TV Safari"),
            DeviceType::SmartTv
        );
        assert_eq!(
            classify_device("Mozilla/5.0 (Linux; Android 9; Android TV) ExoPlayer"),
            DeviceType::SmartTv
        );
        assert_eq!(classify_device(IPHONE), DeviceType::IPhone);
        assert_eq!(
            classify_device("Mozilla/5.0 (iPad; CPU OS 16_0 like Mac OS X)"),
            DeviceType::IPad
        );
        assert_eq!(
            classify_device("Dalvik/2.1.0 (Linux; U; Android 13; SM-S918B)"),
            DeviceType::Mobile
        );
        assert_eq!(classify_device(CHROME_WIN), DeviceType::WindowsPc);
        assert_eq!(
            classify_device("Mozilla/5.0 (Macintosh; Intel Mac OS X 14_1)"),
            DeviceType::Mac
        );
        assert_eq!(
            classify_device("mpv 0.36 (X11; Linux x86_64)"),
            DeviceType::Linux
        );
    }

    #[test]
    fn test_unknown_device() {
        assert_eq!(classify_device("CustomClient/1.0"), DeviceType::Unknown);
        assert_eq!(classify_device(""), DeviceType::Unknown);
        assert!(!DeviceType::Unknown.is_known());
    }

    #[test]
    fn test_device_display() {
        assert_eq!(DeviceType::WindowsPc.to_string(), "Windows PC");
        assert_eq!(DeviceType::SmartTv.as_ref(), "SmartTV");
        assert_eq!(DeviceType::IPhone.to_string(), "iPhone");
    }

    #[test]
    fn test_is_browser() {
        assert!(is_browser(CHROME_WIN));
        assert!(is_browser("Mozilla/5.0 (X11; rv:121.0) Gecko/20100101 Firefox/121.0"));
        assert!(!is_browser("VLC/3.0.20 LibVLC/3.0.20"));
        assert!(!is_browser("AppleCoreMedia/1.0.0.21A329 (iPhone; U; CPU OS 17_0)"));
        assert!(!is_browser(""));
    }
}
