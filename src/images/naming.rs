//! File naming for cached image assets.

use serde::{Deserialize, Serialize};
use url::Url;

pub const FILLER: char = '_';
pub const DEFAULT_EXTENSION: &str = "jpg";
const MAX_EXTENSION_LEN: usize = 5;

/// Characters a file stem keeps; everything else becomes `_`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StemCharset {
    /// Any Unicode letter or digit, so Hangul names stay distinct
    #[default]
    Unicode,
    /// ASCII letters and digits only
    Ascii,
}

impl StemCharset {
    fn keeps(self, c: char) -> bool {
        match self {
            StemCharset::Unicode => c.is_alphanumeric(),
            StemCharset::Ascii => c.is_ascii_alphanumeric(),
        }
    }
}

/// Build the file stem for a product image from its brand and name.
///
/// Characters outside `charset` become `_` and the result is cut to `max_len`
/// characters, which keeps the stem a legal file name on any platform.
///
/// With [`StemCharset::Unicode`] a Korean product keeps its Hangul, so its
/// stem differs from the one an ASCII-only image cache holds for the same
/// product (`라운드랩_토너` against `_______`). Set `images.stem_charset` to
/// `ascii` to reuse such a cache; all-Hangul names then collide on
/// filler-only stems.
pub fn sanitize_stem(brand: &str, name: &str, max_len: usize, charset: StemCharset) -> String {
    format!("{}_{}", brand, name)
        .chars()
        .map(|c| if charset.keeps(c) { c } else { FILLER })
        .take(max_len)
        .collect()
}

/// Infer a file extension from the last path segment of an image URL,
/// ignoring the query string. Falls back to `jpg`.
pub fn infer_extension(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    path.rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_punctuation() {
        assert_eq!(
            sanitize_stem("Round Lab", "Dokdo Toner 200ml", 50, StemCharset::Unicode),
            "Round_Lab_Dokdo_Toner_200ml"
        );
        assert_eq!(sanitize_stem("A&B", "C/D:E", 50, StemCharset::Unicode), "A_B_C_D_E");
    }

    #[test]
    fn test_sanitize_keeps_hangul() {
        assert_eq!(
            sanitize_stem("라운드랩", "보습 에센스", 50, StemCharset::Unicode),
            "라운드랩_보습_에센스"
        );
    }

    #[test]
    fn test_sanitize_truncates_by_characters() {
        let stem = sanitize_stem("브랜드", &"가".repeat(100), 50, StemCharset::Unicode);
        assert_eq!(stem.chars().count(), 50);
    }

    #[test]
    fn test_sanitize_output_is_filesystem_safe() {
        for charset in [StemCharset::Unicode, StemCharset::Ascii] {
            let stem = sanitize_stem("../etc", "pass\\wd\0*?<>|\"", 50, charset);
            assert!(stem.chars().all(|c| c.is_alphanumeric() || c == FILLER));
        }
    }

    #[test]
    fn test_ascii_charset_folds_hangul() {
        assert_eq!(
            sanitize_stem("라운드랩", "Toner 200ml", 50, StemCharset::Ascii),
            "_____Toner_200ml"
        );
        assert_eq!(
            sanitize_stem("Round Lab", "Dokdo Toner", 50, StemCharset::Ascii),
            sanitize_stem("Round Lab", "Dokdo Toner", 50, StemCharset::Unicode)
        );
    }

    #[test]
    fn test_stem_charset_from_config_value() {
        #[derive(Deserialize)]
        struct Wrapper {
            charset: StemCharset,
        }
        let parsed: Wrapper = toml::from_str("charset = \"ascii\"").unwrap();
        assert_eq!(parsed.charset, StemCharset::Ascii);
        assert_eq!(StemCharset::default(), StemCharset::Unicode);
    }

    #[test]
    fn test_infer_extension_from_path() {
        assert_eq!(infer_extension("https://cdn.example.com/a/b.png"), "png");
        assert_eq!(infer_extension("https://cdn.example.com/a/b.JPEG?w=300&h=300"), "jpeg");
        assert_eq!(infer_extension("https://cdn.example.com/a/b.webp#frag"), "webp");
    }

    #[test]
    fn test_infer_extension_falls_back_to_jpg() {
        assert_eq!(infer_extension("https://cdn.example.com/image"), "jpg");
        assert_eq!(infer_extension("https://cdn.v1.example.com/thumb"), "jpg");
        assert_eq!(infer_extension("https://cdn.example.com/a.php-x"), "jpg");
        assert_eq!(infer_extension(""), "jpg");
    }
}
