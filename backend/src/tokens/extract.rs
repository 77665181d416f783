use std::collections::HashSet;

use tracing::debug;

use crate::error::InputError;
use crate::tokens::{TokenId, TokenPair};

/// Parses `white:black` entries separated by commas.
///
/// Segments that do not split into exactly two non-empty trimmed parts are
/// dropped silently. Order is preserved and duplicates are kept.
pub fn extract_pairs(raw: &str) -> Vec<TokenPair> {
    raw.split(',')
        .filter_map(|segment| {
            let mut parts = segment.split(':').map(str::trim);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(w), Some(b), None) if !w.is_empty() && !b.is_empty() => {
                    Some(TokenPair::new(w, b))
                }
                _ => None,
            }
        })
        .collect()
}

/// Canonical form of a pair list; `extract_pairs(render_pairs(p)) == p`.
pub fn render_pairs(pairs: &[TokenPair]) -> String {
    pairs
        .iter()
        .map(|p| format!("{}:{}", p.white, p.black))
        .collect::<Vec<_>>()
        .join(",")
}

/// Extraction plus the form-level checks: at least one pair, strictly fewer
/// than `max_games` pairs, and no token used twice on either side.
pub fn validate_pairs(raw: &str, max_games: usize) -> Result<Vec<TokenPair>, InputError> {
    let pairs = extract_pairs(raw);

    if pairs.is_empty() {
        return Err(InputError::TooFewTokens);
    }

    if pairs.len() >= max_games {
        return Err(InputError::TooManyTokens {
            count: pairs.len(),
            max: max_games,
        });
    }

    let mut seen: HashSet<&TokenId> = HashSet::with_capacity(pairs.len() * 2);
    for token in pairs.iter().flat_map(|p| [&p.white, &p.black]) {
        if !seen.insert(token) {
            return Err(InputError::DuplicateTokens(token.clone()));
        }
    }

    debug!(pairs = pairs.len(), "token pairs extracted");
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pairs(v: &[(&str, &str)]) -> Vec<TokenPair> {
        v.iter().map(|(w, b)| TokenPair::new(*w, *b)).collect()
    }

    fn n_pairs(n: usize) -> String {
        (0..n)
            .map(|i| format!("w{i}:b{i}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    #[test]
    fn keeps_order_and_drops_malformed_segments() {
        let got = extract_pairs("a:b, c:d,bad, e:f");
        assert_eq!(got, pairs(&[("a", "b"), ("c", "d"), ("e", "f")]));
    }

    #[test]
    fn drops_empty_sides_and_extra_colons() {
        let got = extract_pairs(":b,a:,a:b:c,, ,x : y");
        assert_eq!(got, pairs(&[("x", "y")]));
    }

    #[test]
    fn extraction_keeps_duplicates() {
        let got = extract_pairs("a:b,a:c");
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn empty_input_is_too_few() {
        assert_eq!(validate_pairs("", 500), Err(InputError::TooFewTokens));
        assert_eq!(validate_pairs("junk,,", 500), Err(InputError::TooFewTokens));
    }

    #[test]
    fn duplicate_token_across_pairs_is_rejected() {
        assert_eq!(
            validate_pairs("a:b,a:c", 500),
            Err(InputError::DuplicateTokens(TokenId::from("a")))
        );
    }

    #[test]
    fn duplicate_token_error_text_is_redacted() {
        let err = validate_pairs("lip_supersecret1:x,lip_supersecret1:y", 500).unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("duplicate token: TokenId(lip_"));
        assert!(!text.contains("supersecret1"));
    }

    #[test]
    fn duplicate_token_within_pair_is_rejected() {
        assert_eq!(
            validate_pairs("a:a", 500),
            Err(InputError::DuplicateTokens(TokenId::from("a")))
        );
    }

    #[test]
    fn max_games_boundary() {
        assert_eq!(
            validate_pairs(&n_pairs(500), 500),
            Err(InputError::TooManyTokens {
                count: 500,
                max: 500
            })
        );

        let ok = validate_pairs(&n_pairs(499), 500).unwrap();
        assert_eq!(ok.len(), 499);
    }

    #[test]
    fn token_debug_does_not_print_full_value() {
        let t = TokenId::from("lip_secretvalue");
        let dbg = format!("{t:?}");
        assert!(!dbg.contains("secretvalue"));
    }

    proptest! {
        #[test]
        fn canonical_form_round_trips(
            raw in prop::collection::vec(("[a-zA-Z0-9_]{1,12}", "[a-zA-Z0-9_]{1,12}"), 0..40)
        ) {
            let input: Vec<TokenPair> = raw.iter().map(|(w, b)| TokenPair::new(w.as_str(), b.as_str())).collect();
            let first = extract_pairs(&render_pairs(&input));
            prop_assert_eq!(&first, &input);

            let second = extract_pairs(&render_pairs(&first));
            prop_assert_eq!(second, first);
        }

        #[test]
        fn never_yields_blank_tokens(raw in "[a-z:, ]{0,64}") {
            for p in extract_pairs(&raw) {
                prop_assert!(!p.white.as_str().is_empty());
                prop_assert!(!p.black.as_str().is_empty());
                prop_assert_eq!(p.white.as_str().trim(), p.white.as_str());
            }
        }
    }
}
