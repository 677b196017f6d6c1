/// Path segment that precedes the version and public id in delivery URLs.
const UPLOAD_MARKER: &str = "/upload/";

/// Recover the image store's public id from a delivery URL.
///
/// `https://host/<cloud>/image/upload/v1712/doctors/dr-rao.jpg` → `doctors/dr-rao`.
/// Returns `None` when the URL has no `/upload/` segment; callers then skip
/// the remote delete and only clean up the document.
pub fn derive_public_id(url: &str) -> Option<String> {
    let url = url.split(['?', '#']).next().unwrap_or(url);
    let start = url.find(UPLOAD_MARKER)? + UPLOAD_MARKER.len();
    let rest = &url[start..];

    let rest = match rest.split_once('/') {
        Some((segment, tail)) if is_version_segment(segment) => tail,
        _ => rest,
    };

    let without_ext = match rest.rfind('.') {
        Some(dot) if !rest[dot..].contains('/') => &rest[..dot],
        _ => rest,
    };

    if without_ext.is_empty() {
        None
    } else {
        Some(without_ext.to_string())
    }
}

fn is_version_segment(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}
