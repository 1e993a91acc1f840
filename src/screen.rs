/// Safety pre-screener: static textual analysis of a submission before any
/// execution. Advisory by design; containment is the executor's job.
///
/// Matching is token-boundary-aware, not raw substring: a token whose edge
/// characters are identifier characters only matches when the neighbouring
/// source characters are not identifier characters. `medieval` must never
/// trip the `eval` rule, while `eval(...)` must. Known limitation, documented
/// and accepted: renamed imports, string concatenation, and encoded payloads
/// slip through this layer.
use crate::config::SandboxConfig;
use crate::types::{SafetyVerdict, ScreenCategory};

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whether `token` occurs in `source` at an identifier boundary.
///
/// Tokens may carry non-identifier edges of their own (`getattr(`, `socket.`,
/// dotted names like `os.system`); such an edge is its own boundary and the
/// neighbouring character is not inspected on that side.
fn contains_token(source: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    let first_is_ident = token.chars().next().map(is_ident_char).unwrap_or(false);
    let last_is_ident = token.chars().next_back().map(is_ident_char).unwrap_or(false);

    for (idx, _) in source.match_indices(token) {
        let left_ok = !first_is_ident
            || source[..idx]
                .chars()
                .next_back()
                .map(|c| !is_ident_char(c))
                .unwrap_or(true);
        let right_ok = !last_is_ident
            || source[idx + token.len()..]
                .chars()
                .next()
                .map(|c| !is_ident_char(c))
                .unwrap_or(true);
        if left_ok && right_ok {
            return true;
        }
    }
    false
}

/// Screen a submission against the configured rule sets.
///
/// Forbidden tokens are scanned first, then suspicious substrings; the first
/// match wins and is reported. Total: every input yields exactly one verdict.
pub fn screen(source: &str, config: &SandboxConfig) -> SafetyVerdict {
    for token in &config.forbidden_tokens {
        if contains_token(source, token) {
            return SafetyVerdict::Rejected {
                category: ScreenCategory::ForbiddenFunction,
                token: token.clone(),
                reason: format!("Code contains forbidden function: {}", token),
            };
        }
    }

    for pattern in &config.suspicious_patterns {
        if contains_token(source, pattern) {
            return SafetyVerdict::Rejected {
                category: ScreenCategory::SuspiciousPattern,
                token: pattern.clone(),
                reason: format!("Code contains suspicious pattern: {}", pattern),
            };
        }
    }

    SafetyVerdict::Accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(source: &str) -> SafetyVerdict {
        screen(source, &SandboxConfig::default())
    }

    #[test]
    fn test_plain_plotting_code_accepted() {
        let source = "import matplotlib.pyplot as plt\nplt.plot([1, 2, 3])\nplt.show()\n";
        assert_eq!(verdict(source), SafetyVerdict::Accepted);
    }

    #[test]
    fn test_eval_call_rejected_as_forbidden_function() {
        match verdict("result = eval('2+2')") {
            SafetyVerdict::Rejected { category, token, .. } => {
                assert_eq!(category, ScreenCategory::ForbiddenFunction);
                assert_eq!(token, "eval");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_embedded_substring_identifier_accepted() {
        // "medieval" contains "eval" but only inside a longer identifier
        assert_eq!(verdict("medieval = 42\nprint(medieval)"), SafetyVerdict::Accepted);
        assert_eq!(verdict("evaluate_scores([1, 2])"), SafetyVerdict::Accepted);
    }

    #[test]
    fn test_whole_word_token_rejected_regardless_of_surroundings() {
        match verdict("x = 1\nos.system('ls')\ny = 2") {
            SafetyVerdict::Rejected { category, token, .. } => {
                assert_eq!(category, ScreenCategory::ForbiddenFunction);
                // "system" scans before the dotted "os.system" in the default set
                assert_eq!(token, "system");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_dotted_token_respects_boundaries() {
        // ecosystem.print is not os.system; my_os.system still contains the
        // bare "system" token at a boundary and must reject
        assert_eq!(verdict("ecosystem = 1"), SafetyVerdict::Accepted);
        assert!(!verdict("my_os.system('ls')").is_accepted());
    }

    #[test]
    fn test_dunder_reflection_rejected_as_suspicious() {
        match verdict("x = ().__class__") {
            SafetyVerdict::Rejected { category, token, .. } => {
                assert_eq!(category, ScreenCategory::SuspiciousPattern);
                assert_eq!(token, "__class__");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_call_form_pattern_requires_paren() {
        assert!(!verdict("getattr(obj, 'x')").is_accepted());
        // Identifier merely containing the verb does not match the call form
        assert_eq!(verdict("regetattrx = 1"), SafetyVerdict::Accepted);
        assert_eq!(verdict("already = spread(1)"), SafetyVerdict::Accepted);
    }

    #[test]
    fn test_network_scheme_tokens() {
        assert!(!verdict("u = 'http://example.com'").is_accepted());
        assert!(!verdict("u = 'https://example.com'").is_accepted());
        assert!(!verdict("import urllib.request").is_accepted());
    }

    #[test]
    fn test_function_globals_reflection_rejected_as_suspicious() {
        // Any callable seeded into the namespace carries its defining module's
        // globals; reaching for them must trip the screen
        match verdict("leak = helper.__globals__['__builtins__']") {
            SafetyVerdict::Rejected { category, token, .. } => {
                assert_eq!(category, ScreenCategory::SuspiciousPattern);
                assert_eq!(token, "__builtins__");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        match verdict("leak = helper.__globals__") {
            SafetyVerdict::Rejected { category, token, .. } => {
                assert_eq!(category, ScreenCategory::SuspiciousPattern);
                assert_eq!(token, "__globals__");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_forbidden_reported_before_suspicious() {
        // Both sets match; the forbidden-token scan runs first
        match verdict("eval(x.__dict__)") {
            SafetyVerdict::Rejected { category, .. } => {
                assert_eq!(category, ScreenCategory::ForbiddenFunction);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_source_accepted() {
        assert_eq!(verdict(""), SafetyVerdict::Accepted);
    }

    #[test]
    fn test_token_at_source_edges() {
        assert!(!verdict("eval").is_accepted());
        assert!(!verdict("x=1;exec").is_accepted());
    }
}
