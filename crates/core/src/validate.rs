use url::Url;

/// Hosts that serve YouTube videos.
pub const ALLOWED_HOSTS: [&str; 5] = [
    "youtube.com",
    "www.youtube.com",
    "youtu.be",
    "m.youtube.com",
    "music.youtube.com",
];

/// Check that `input` is an absolute URL on one of [`ALLOWED_HOSTS`] or a
/// subdomain of one. Lookalike hosts such as `youtube.com.example.net` are
/// rejected.
pub fn is_valid_url(input: &str) -> bool {
    let Ok(url) = Url::parse(input) else {
        return false;
    };
    if url.scheme().is_empty() {
        return false;
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => is_allowed_host(host),
        _ => false,
    }
}

/// [`is_valid_url`] restricted to `http` and `https`, as handed to the downloader.
pub fn is_downloadable_url(input: &str) -> bool {
    is_valid_url(input)
        && Url::parse(input).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

fn is_allowed_host(host: &str) -> bool {
    let host = host.trim_end_matches('.');
    ALLOWED_HOSTS.iter().any(|domain| {
        host == *domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}
