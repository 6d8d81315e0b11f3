use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopicUrlError {
    #[error("not a valid URL")]
    Invalid,
    #[error("URL host {0} is not the forum host")]
    WrongHost(String),
    #[error("URL has no topic id (t parameter)")]
    MissingTopicId,
}

/// Normalize a topic URL to scheme + host + path + the single `t` topic-id
/// query parameter.
///
/// phpBB topic links accumulate volatile parameters (`sid`, `start`,
/// highlight anchors); stripping them keeps one canonical URL per topic so
/// duplicate tracking entries cannot sneak in.
///
/// # Errors
///
/// Returns an error if the URL is unparseable, not on the given forum host,
/// or carries no topic id.
pub fn normalize_topic_url(raw: &str, forum_host: &str) -> Result<String, TopicUrlError> {
    let parsed = Url::parse(raw).map_err(|_| TopicUrlError::Invalid)?;

    // Exact host or a subdomain of it; a substring check would let a
    // lookalike host embedding the forum host slip through.
    let host = parsed.host_str().ok_or(TopicUrlError::Invalid)?;
    if host != forum_host && !host.ends_with(&format!(".{forum_host}")) {
        return Err(TopicUrlError::WrongHost(host.to_string()));
    }

    let topic_id = parsed
        .query_pairs()
        .find(|(k, _)| k == "t")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
        .ok_or(TopicUrlError::MissingTopicId)?;

    // Rebuild from scratch rather than mutating, so nothing else survives.
    let port = parsed
        .port()
        .map_or_else(String::new, |p| format!(":{p}"));
    Ok(format!(
        "{}://{}{}{}?t={}",
        parsed.scheme(),
        host,
        port,
        parsed.path(),
        topic_id
    ))
}
