//! String transforms from a cell's `transforms.read` / `transforms.write`.

use bunsen_types::Transform;
use regex::Regex;
use tracing::warn;

/// Apply one transform to `text`
pub fn apply_transform(text: &str, transform: &Transform) -> String {
    if transform.regex {
        match Regex::new(&transform.from) {
            Ok(pattern) if transform.global => pattern.replace_all(text, transform.to.as_str()).into_owned(),
            Ok(pattern) => pattern.replace(text, transform.to.as_str()).into_owned(),
            Err(e) => {
                warn!("skipping transform with invalid pattern '{}': {}", transform.from, e);
                text.to_string()
            }
        }
    } else if transform.global {
        text.replace(&transform.from, &transform.to)
    } else {
        text.replacen(&transform.from, &transform.to, 1)
    }
}

/// Apply transforms in order
pub fn apply_transforms(text: &str, transforms: &[Transform]) -> String {
    transforms
        .iter()
        .fold(text.to_string(), |acc, transform| apply_transform(&acc, transform))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform(from: &str, to: &str, regex: bool, global: bool) -> Transform {
        Transform {
            from: from.into(),
            to: to.into(),
            regex,
            global,
        }
    }

    #[test]
    fn test_literal_transforms() {
        assert_eq!(apply_transform("a-b-c", &transform("-", "_", false, false)), "a_b-c");
        assert_eq!(apply_transform("a-b-c", &transform("-", "_", false, true)), "a_b_c");
    }

    #[test]
    fn test_regex_transforms() {
        assert_eq!(
            apply_transform("a1b22", &transform(r"\d+", "#", true, false)),
            "a#b22"
        );
        assert_eq!(
            apply_transform("a1b22", &transform(r"\d+", "#", true, true)),
            "a#b#"
        );
        assert_eq!(
            apply_transform("Ada Lovelace", &transform(r"(\w+) (\w+)", "$2, $1", true, false)),
            "Lovelace, Ada"
        );
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        assert_eq!(apply_transform("abc", &transform("(", "x", true, true)), "abc");
    }

    #[test]
    fn test_chain() {
        let chain = vec![
            transform("a", "b", false, true),
            transform("b", "c", false, true),
        ];
        assert_eq!(apply_transforms("ab", &chain), "cc");
    }
}
