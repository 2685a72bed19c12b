//! Origin AS resolution from AS-path attributes
//!
//! Every route received for a prefix carries an AS-path; the rightmost entry
//! is conventionally the originating AS. The resolver inspects only the last
//! path observed for the prefix and scans its tokens from the origin end,
//! accepting either a plain AS number or the body of an AS-SET
//! (`{65000,65001}` resolves to `65000,65001`, kept verbatim).

/// Resolve the origin ASN for one prefix from its observed AS paths.
///
/// Returns `None` when no token on the last path qualifies; the caller is
/// expected to drop the prefix from aggregation rather than fail.
pub fn resolve_origin(as_paths: &[String]) -> Option<String> {
    let path = as_paths.last()?;
    for token in path.split_whitespace().rev() {
        if is_asn(token) {
            return Some(token.to_string());
        }
        // AS-SET bracket convention: strip one character on each side and
        // test the inner text.
        if token.is_ascii() && token.len() >= 2 {
            let inner = &token[1..token.len() - 1];
            if is_as_set_body(inner) {
                return Some(inner.to_string());
            }
        }
    }
    None
}

fn is_asn(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

fn is_as_set_body(inner: &str) -> bool {
    inner.bytes().any(|b| b.is_ascii_digit())
        && inner.bytes().all(|b| b.is_ascii_digit() || b == b',')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plain_path() {
        let result = resolve_origin(&paths(&["64511 64512 64513"]));
        assert_eq!(result, Some("64513".to_string()));
    }

    #[test]
    fn test_as_set_origin() {
        let result = resolve_origin(&paths(&["64511 64512 {64513,64514}"]));
        assert_eq!(result, Some("64513,64514".to_string()));
    }

    #[test]
    fn test_single_member_as_set() {
        let result = resolve_origin(&paths(&["64511 {64513}"]));
        assert_eq!(result, Some("64513".to_string()));
    }

    #[test]
    fn test_bogus_set_skipped_toward_near_end() {
        // The non-numeric set does not qualify; the scan continues and picks
        // up the next token toward the near end.
        let result = resolve_origin(&paths(&["64511 64512 {bogus}"]));
        assert_eq!(result, Some("64512".to_string()));
    }

    #[test]
    fn test_unresolved() {
        assert_eq!(resolve_origin(&paths(&["{bogus}"])), None);
        assert_eq!(resolve_origin(&paths(&["{bogus} {alsobad}"])), None);
        assert_eq!(resolve_origin(&paths(&[""])), None);
        assert_eq!(resolve_origin(&[]), None);
    }

    #[test]
    fn test_only_last_path_considered() {
        let result = resolve_origin(&paths(&["1 2 3", "64511 64512 65000"]));
        assert_eq!(result, Some("65000".to_string()));
    }

    #[test]
    fn test_prepended_path() {
        let result = resolve_origin(&paths(&["64511 65000 65000 65000"]));
        assert_eq!(result, Some("65000".to_string()));
    }
}
