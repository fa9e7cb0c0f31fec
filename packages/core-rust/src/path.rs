use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped inside a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
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
    .add(b'}');

/// Joins segments into an absolute upstream path, escaping each one.
///
/// `endpoint(["collections", id, "folders"])` yields
/// `/collections/<id>/folders` with `id` unable to introduce extra segments
/// or a query string.
pub fn endpoint<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut path = String::new();
    for segment in segments {
        path.push('/');
        path.extend(utf8_percent_encode(segment.as_ref(), PATH_SEGMENT));
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_plain_segments() {
        assert_eq!(
            endpoint(["apis", "abc123", "versions", "v1"]),
            "/apis/abc123/versions/v1"
        );
    }

    #[test]
    fn escapes_reserved_characters() {
        assert_eq!(
            endpoint(["collections", "a/b?c=d#e"]),
            "/collections/a%2Fb%3Fc=d%23e"
        );
        assert_eq!(endpoint(["mocks", "with space"]), "/mocks/with%20space");
    }

    #[test]
    fn empty_is_root() {
        assert_eq!(endpoint(Vec::<&str>::new()), "/");
    }
}
