/// A file field of a `multipart/form-data` body.
#[derive(Debug, PartialEq)]
pub struct FilePart {
    pub filename: String,
    pub bytes: Vec<u8>,
}

fn position(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Sections of `body` between consecutive `delimiter`s. The preamble before
/// the first delimiter is skipped.
fn sections<'a>(body: &'a [u8], delimiter: &'a [u8]) -> impl Iterator<Item = &'a [u8]> + 'a {
    let mut rest = position(body, delimiter).map(|p| &body[p + delimiter.len()..]);
    std::iter::from_fn(move || {
        let current = rest?;
        match position(current, delimiter) {
            Some(p) => {
                rest = Some(&current[p + delimiter.len()..]);
                Some(&current[..p])
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}

/// Boundary token of a `multipart/form-data; boundary=...` content type.
pub fn extract_boundary(content_type: &str) -> Option<String> {
    let boundary = content_type
        .split(';')
        .find_map(|param| param.trim().strip_prefix("boundary="))?
        .trim_matches('"');
    if boundary.is_empty() {
        None
    } else {
        Some(boundary.to_owned())
    }
}

fn disposition_param(headers: &str, key: &str) -> Option<String> {
    let key = format!("{}=\"", key);
    // `name="` also matches inside `filename="`, so anchor on the separator
    let pos = headers
        .match_indices(&key)
        .find(|(i, _)| *i == 0 || matches!(headers.as_bytes()[i - 1], b' ' | b';'))?
        .0;
    let rest = &headers[pos + key.len()..];
    let end = rest.find('"')?;
    Some(rest[..end].to_owned())
}

/// First part carrying a `filename` parameter.
pub fn extract_file(body: &[u8], boundary: &str) -> Option<FilePart> {
    let delimiter = format!("--{}", boundary);
    let separator = b"\r\n\r\n";

    for part in sections(body, delimiter.as_bytes()) {
        let sep_pos = match position(part, separator) {
            Some(pos) => pos,
            None => continue,
        };
        let headers = String::from_utf8_lossy(&part[..sep_pos]);
        let filename = match disposition_param(&headers, "filename") {
            Some(name) => name,
            None => continue,
        };
        let raw = &part[sep_pos + separator.len()..];
        let bytes = raw.strip_suffix(b"\r\n").unwrap_or(raw).to_vec();
        return Some(FilePart { filename, bytes });
    }
    None
}
