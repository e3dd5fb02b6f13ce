/// A probe is only worth dispatching for URLs shaped like a video page.
/// Scheme and `www.` prefixes are optional.
pub fn looks_like_video_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    rest.starts_with("youtube.com/") || rest.starts_with("youtu.be/")
}
