// Media URL extraction from Reddit submissions.
//
// Precedence, first match wins:
//   1. gallery  -> every valid item, largest preview else source
//   2. hosted video -> fallback_url
//   3. preview images -> source url of each
//   4. direct link ending in an image/video extension
// Listing JSON escapes '&' as "&amp;" inside URLs unless raw_json=1 was
// honoured, so every URL is unescaped.

use super::reddit::RedditPost;

const DIRECT_MEDIA_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".mp4"];

pub fn extract_media_urls(post: &RedditPost) -> Vec<String> {
    if post.is_gallery {
        return gallery_urls(post);
    }

    if let Some(video) = post
        .media
        .as_ref()
        .and_then(|m| m.reddit_video.as_ref())
    {
        return video
            .fallback_url
            .iter()
            .map(|u| unescape(u))
            .collect();
    }

    if let Some(preview) = &post.preview {
        return preview
            .images
            .iter()
            .filter_map(|img| img.source.as_ref()?.url.as_deref())
            .filter(|u| !u.is_empty())
            .map(unescape)
            .collect();
    }

    match post.url.as_deref() {
        Some(url) if is_direct_media(url) => vec![url.to_string()],
        _ => Vec::new(),
    }
}

/// Gallery items in display order. Entries missing from gallery_data (or
/// galleries without it) follow in key order so output is deterministic.
fn gallery_urls(post: &RedditPost) -> Vec<String> {
    let Some(metadata) = &post.media_metadata else {
        return Vec::new();
    };

    let mut ids: Vec<&str> = post
        .gallery_data
        .iter()
        .flat_map(|g| g.items.iter().map(|i| i.media_id.as_str()))
        .filter(|id| metadata.contains_key(*id))
        .collect();

    let mut rest: Vec<&str> = metadata
        .keys()
        .map(String::as_str)
        .filter(|k| !ids.contains(k))
        .collect();
    rest.sort_unstable();
    ids.extend(rest);

    ids.into_iter()
        .filter_map(|id| metadata.get(id))
        .filter(|m| m.status.as_deref() == Some("valid"))
        .filter_map(|m| match m.p.last() {
            Some(largest) => largest.u.clone(),
            None => m.s.as_ref().and_then(|s| s.u.clone()),
        })
        .filter(|u| !u.is_empty())
        .map(|u| unescape(&u))
        .collect()
}

fn is_direct_media(url: &str) -> bool {
    let lower = url.to_lowercase();
    DIRECT_MEDIA_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn unescape(url: &str) -> String {
    url.replace("&amp;", "&")
}
