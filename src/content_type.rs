//! A minimal `type "/" subtype *( ";" parameter )` grammar.
//!
//! This deliberately does not pull in a general-purpose MIME crate: the
//! Response Assembler only ever needs the media type and the `charset`
//! parameter, so a small hand-rolled parser is enough.

/// The parsed pieces of a `Content-Type` header that the Response
/// Assembler cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub type_: String,
    pub subtype: String,
    pub charset: Option<String>,
}

impl MediaType {
    pub fn is_json(&self) -> bool {
        self.type_.eq_ignore_ascii_case("application") && self.subtype.eq_ignore_ascii_case("json")
    }
}

/// Parse a `Content-Type` header value. Returns `None` if it doesn't
/// even have a `type/subtype` shape.
pub fn parse(value: &str) -> Option<MediaType> {
    let mut parts = value.split(';');
    let type_subtype = parts.next()?.trim();
    let (type_, subtype) = type_subtype.split_once('/')?;
    let type_ = type_.trim();
    let subtype = subtype.trim();
    if type_.is_empty() || subtype.is_empty() {
        return None;
    }

    let mut charset = None;
    for param in parts {
        let Some((name, raw_value)) = param.split_once('=') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("charset") {
            let raw_value = raw_value.trim();
            let unquoted = raw_value
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(raw_value);
            charset = Some(unquoted.to_ascii_lowercase());
        }
    }

    Some(MediaType {
        type_: type_.to_string(),
        subtype: subtype.to_string(),
        charset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_media_type() {
        let mt = parse("application/json").unwrap();
        assert_eq!(mt.type_, "application");
        assert_eq!(mt.subtype, "json");
        assert_eq!(mt.charset, None);
        assert!(mt.is_json());
    }

    #[test]
    fn parses_charset_parameter() {
        let mt = parse("application/json; charset=utf-8").unwrap();
        assert_eq!(mt.charset.as_deref(), Some("utf-8"));
    }

    #[test]
    fn parses_quoted_charset() {
        let mt = parse("text/plain; charset=\"UTF-8\"").unwrap();
        assert_eq!(mt.charset.as_deref(), Some("utf-8"));
    }

    #[test]
    fn rejects_missing_slash() {
        assert!(parse("not-a-media-type").is_none());
    }

    #[test]
    fn ignores_unrelated_parameters() {
        let mt = parse("multipart/form-data; boundary=abc; charset=ascii").unwrap();
        assert_eq!(mt.charset.as_deref(), Some("ascii"));
        assert!(!mt.is_json());
    }
}
