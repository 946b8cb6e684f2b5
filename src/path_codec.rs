//! Remote-path <-> URL-path codec.
//!
//! Remote paths are `/`-separated identifiers (trailing `/` marks a folder).
//! Each segment is percent-encoded independently so the separator itself is
//! never escaped; this is the only place in the crate that has to round-trip
//! spaces, non-ASCII, and reserved characters faithfully.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// RFC 3986 unreserved set is `ALPHA / DIGIT / "-" / "." / "_" / "~"`; everything
/// else in a path segment gets percent-encoded, including `/` itself (we split
/// on `/` ourselves and re-join it unescaped).
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}')
    .add(b'!')
    .add(b'$')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b';')
    .add(b'=')
    .add(b':')
    .add(b'@');

/// Percent-encodes every segment of `path` and appends it to `base`.
///
/// `base` must already end in `/`; the leading `/` on `path` is dropped so the
/// join doesn't double up. Each segment (the substrings between `/`) is
/// encoded independently, and the separators are reinserted unescaped.
pub fn resolve(base: &str, path: &str) -> String {
    debug_assert!(base.ends_with('/'), "base endpoint must end with '/'");
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let encoded = encode_path(trimmed);
    format!("{base}{encoded}")
}

/// Percent-encodes each `/`-separated segment of a remote path, without the
/// leading-slash trim `resolve` performs. A trailing empty segment (i.e. a
/// trailing `/` in the input) is preserved as a trailing `/` in the output.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii_segment_is_unchanged() {
        assert_eq!(encode_path("foo/bar"), "foo/bar");
    }

    #[test]
    fn spaces_are_percent_encoded() {
        assert_eq!(encode_path("my folder/file name.txt"), "my%20folder/file%20name.txt");
    }

    #[test]
    fn non_ascii_is_percent_encoded() {
        assert_eq!(encode_path("café/résumé.pdf"), "caf%C3%A9/r%C3%A9sum%C3%A9.pdf");
    }

    #[test]
    fn reserved_characters_are_escaped_but_slash_is_preserved() {
        assert_eq!(encode_path("a+b/c?d=e"), "a%2Bb/c%3Fd%3De");
    }

    #[test]
    fn trailing_slash_is_preserved() {
        assert_eq!(encode_path("folder/"), "folder/");
    }

    #[test]
    fn resolve_drops_leading_slash_before_joining() {
        assert_eq!(
            resolve("https://storage.example/api/", "/cat/file one.ics"),
            "https://storage.example/api/cat/file%20one.ics"
        );
    }

    #[test]
    fn resolve_root_path_joins_to_bare_base() {
        assert_eq!(resolve("https://storage.example/api/", "/"), "https://storage.example/api/");
    }
}
