//! Classify a remote URL into the hosting service it points at.

use crate::model::RemoteKind;

/// Classify `url` by host name. Pure; unknown or missing URLs are
/// [`RemoteKind::Other`].
#[must_use]
pub fn classify_url(url: Option<&str>) -> RemoteKind {
    let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
        return RemoteKind::Other;
    };
    if is_local(url) {
        return RemoteKind::Local;
    }
    let Some(host) = host_of(url) else {
        return RemoteKind::Other;
    };
    let host = host.to_ascii_lowercase();

    if host == "dev.azure.com"
        || host.ends_with(".dev.azure.com")
        || host.ends_with(".visualstudio.com")
    {
        RemoteKind::AzureDevOps
    } else if host.contains("github") {
        RemoteKind::GitHub
    } else if host.contains("gitlab") {
        RemoteKind::GitLab
    } else if host.contains("bitbucket") {
        RemoteKind::Bitbucket
    } else if host == "codeberg.org" || host.contains("gitea") || host.contains("forgejo") {
        RemoteKind::Gitea
    } else {
        RemoteKind::Other
    }
}

fn is_local(url: &str) -> bool {
    if url.starts_with("file://") || url.starts_with('/') || url.starts_with('.') {
        return true;
    }
    // C:\repo or C:/repo
    let bytes = url.as_bytes();
    if bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'\\' | b'/')
    {
        return true;
    }
    // no scheme and no scp-style host: a relative path
    !url.contains("://") && !url.contains(':')
}

/// Host part of `scheme://[user@]host[:port]/path` or scp-style
/// `[user@]host:path`.
fn host_of(url: &str) -> Option<&str> {
    let rest = match url.split_once("://") {
        Some((_, rest)) => rest,
        None => url,
    };
    let authority = rest.split(['/', ':']).next()?;
    let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    (!host.is_empty()).then_some(host)
}
