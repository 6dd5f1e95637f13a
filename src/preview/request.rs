use base64::{
    alphabet,
    engine::{general_purpose::GeneralPurposeConfig, DecodePaddingMode, GeneralPurpose},
    Engine as _,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use url::Url;

use super::errors::PreviewError;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

static PERCENT_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%[0-9A-Fa-f]{2}").expect("Failed to compile percent escape regex")
});

/// A '%' left over once every valid escape is removed starts a malformed one.
fn has_malformed_escape(value: &str) -> bool {
    PERCENT_ESCAPE.replace_all(value, "").contains('%')
}

/// A decoded, validated http(s) URL with a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl(Url);

impl TargetUrl {
    /// Validate an already-decoded URL string.
    pub fn parse(decoded: &str) -> Result<Self, PreviewError> {
        let url = Url::parse(decoded.trim())
            .map_err(|err| PreviewError::InvalidUrl(format!("{decoded}: {err}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(PreviewError::InvalidUrl(format!(
                "{decoded}: unsupported scheme {}",
                url.scheme()
            )));
        }

        match url.host_str() {
            Some(host) if !host.is_empty() => Ok(Self(url)),
            _ => Err(PreviewError::InvalidUrl(format!("{decoded}: missing host"))),
        }
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Accept exactly one non-empty raw value.
pub fn single_value(values: Vec<String>) -> Result<String, PreviewError> {
    let mut values = values.into_iter();

    match (values.next(), values.next()) {
        (Some(value), None) if !value.trim().is_empty() => Ok(value),
        _ => Err(PreviewError::InvalidInput),
    }
}

/// base64-decode, then percent-decode, then validate.
pub fn decode_target_url(raw: &str) -> Result<TargetUrl, PreviewError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PreviewError::InvalidInput);
    }

    let bytes = STANDARD_LENIENT
        .decode(raw)
        .or_else(|_| URL_SAFE_LENIENT.decode(raw))
        .map_err(|err| PreviewError::InvalidUrl(format!("base64: {err}")))?;

    let decoded = String::from_utf8(bytes)
        .map_err(|_| PreviewError::InvalidUrl("decoded value is not utf-8".into()))?;

    if has_malformed_escape(&decoded) {
        return Err(PreviewError::InvalidUrl(format!(
            "{decoded}: malformed percent escape"
        )));
    }

    let decoded = urlencoding::decode(&decoded)
        .map_err(|err| PreviewError::InvalidUrl(format!("percent-decoding: {err}")))?;

    TargetUrl::parse(&decoded)
}

/// The inverse of [`decode_target_url`], used to build request paths.
pub fn encode_target_url(url: &str) -> String {
    STANDARD_LENIENT.encode(urlencoding::encode(url).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
    use base64::Engine as _;

    fn encode(url: &str) -> String {
        STANDARD.encode(urlencoding::encode(url).as_bytes())
    }

    #[test]
    fn test_decodes_base64_then_percent() {
        let target = decode_target_url(&encode("https://example.com/article?id=1")).unwrap();
        assert_eq!(target.as_str(), "https://example.com/article?id=1");
        assert_eq!(target.host(), "example.com");
    }

    #[test]
    fn test_accepts_url_safe_without_padding() {
        let raw = URL_SAFE_NO_PAD.encode("https://example.com/?q=a>b");
        let target = decode_target_url(&raw).unwrap();
        assert_eq!(target.host(), "example.com");
    }

    #[test]
    fn test_normalizes_unescaped_characters() {
        let target = decode_target_url(&encode("https://example.com/a b/ü")).unwrap();
        assert_eq!(target.as_str(), "https://example.com/a%20b/%C3%BC");
    }

    #[test]
    fn test_empty_input_is_invalid_input() {
        assert_eq!(decode_target_url("  "), Err(PreviewError::InvalidInput));
    }

    #[test]
    fn test_non_url_is_invalid_url() {
        let err = decode_target_url(&encode("not a url")).unwrap_err();
        assert!(matches!(err, PreviewError::InvalidUrl(_)));
    }

    #[test]
    fn test_rejects_non_web_scheme() {
        let err = decode_target_url(&encode("ftp://example.com/file")).unwrap_err();
        assert!(matches!(err, PreviewError::InvalidUrl(_)));

        let err = decode_target_url(&encode("javascript:alert(1)")).unwrap_err();
        assert!(matches!(err, PreviewError::InvalidUrl(_)));
    }

    #[test]
    fn test_garbage_base64_is_invalid_url() {
        let err = decode_target_url("%%%not-base64%%%").unwrap_err();
        assert!(matches!(err, PreviewError::InvalidUrl(_)));
    }

    #[test]
    fn test_malformed_escape_is_invalid_url() {
        for raw in [
            "https://example.com/%zz",
            "https://example.com/a%2",
            "https://example.com/100%",
        ] {
            let err = decode_target_url(&STANDARD.encode(raw)).unwrap_err();
            assert!(matches!(err, PreviewError::InvalidUrl(_)), "{raw}: {err:?}");
        }
    }

    #[test]
    fn test_valid_escapes_pass() {
        let target = decode_target_url(&STANDARD.encode("https://example.com/a%20b%2Fc")).unwrap();
        assert_eq!(target.as_str(), "https://example.com/a%20b/c");
    }

    #[test]
    fn test_single_value() {
        assert_eq!(single_value(vec!["a".into()]), Ok("a".to_string()));
        assert_eq!(single_value(vec![]), Err(PreviewError::InvalidInput));
        assert_eq!(
            single_value(vec!["a".into(), "b".into()]),
            Err(PreviewError::InvalidInput)
        );
        assert_eq!(single_value(vec!["".into()]), Err(PreviewError::InvalidInput));
    }

    #[test]
    fn test_encode_roundtrips_through_decode() {
        let url = "https://example.com/search?q=rust lang&page=2";
        let target = decode_target_url(&encode_target_url(url)).unwrap();
        assert_eq!(target.as_str(), "https://example.com/search?q=rust%20lang&page=2");
    }
}
