use std::fmt;

const VIDEO_HOST_TOKENS: &[&str] = &["youtube.com", "youtu.be"];
const MICROBLOG_TOKENS: &[&str] = &["twitter.com", "x.com"];

/// Platform family a URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformKind {
    VideoHost,
    Microblog,
    Generic,
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlatformKind::VideoHost => "video-host",
            PlatformKind::Microblog => "microblog",
            PlatformKind::Generic => "generic",
        };
        f.write_str(name)
    }
}

/// Classify by case-insensitive substring match on the whole URL string.
pub fn classify(url: &str) -> PlatformKind {
    let url = url.to_ascii_lowercase();
    if VIDEO_HOST_TOKENS.iter().any(|token| url.contains(token)) {
        PlatformKind::VideoHost
    } else if MICROBLOG_TOKENS.iter().any(|token| url.contains(token)) {
        PlatformKind::Microblog
    } else {
        PlatformKind::Generic
    }
}

pub fn is_youtube_url(url: &str) -> bool {
    classify(url) == PlatformKind::VideoHost
}

pub fn is_twitter_url(url: &str) -> bool {
    classify(url) == PlatformKind::Microblog
}
