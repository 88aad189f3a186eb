//! Query-to-person string matching, shared by the directory adapter's fuzzy
//! step and the ranker's match-quality tier.

/// How well a query matches a person's name/addresses. Tiers are strictly
/// ordered: exact > prefix > substring > fuzzy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum MatchQuality {
    /// Query equals a name or address (case-insensitive)
    Exact,
    /// Query is a prefix of a name or address
    Prefix,
    /// Query occurs inside a name or address
    Substring,
    /// Best approximate similarity in [0, 1]
    Fuzzy(f64),
}

/// Best Jaro-Winkler similarity of `query` against a display name, its
/// whitespace tokens, and the address (whole plus local part).
///
/// Token-level comparison is what lets `"Jon"` reach `"John Smith"`.
pub(crate) fn fuzzy_similarity(query: &str, display_name: &str, address: Option<&str>) -> f64 {
    let q = query.to_lowercase();
    let name = display_name.to_lowercase();

    let mut best = strsim::jaro_winkler(&q, &name);
    for token in name.split_whitespace() {
        best = best.max(strsim::jaro_winkler(&q, token));
    }
    if let Some(addr) = address {
        let addr = addr.to_lowercase();
        best = best.max(strsim::jaro_winkler(&q, &addr));
        if let Some(local) = addr.split('@').next() {
            best = best.max(strsim::jaro_winkler(&q, local));
        }
    }
    best
}

/// Classify how `query` matches a person's display name and addresses.
pub(crate) fn match_quality(query: &str, display_name: &str, emails: &[String]) -> MatchQuality {
    let q = query.to_lowercase();
    let name = display_name.to_lowercase();
    let lowered: Vec<String> = std::iter::once(name)
        .chain(emails.iter().map(|e| e.to_lowercase()))
        .collect();

    if lowered.iter().any(|c| *c == q) {
        return MatchQuality::Exact;
    }
    if lowered.iter().any(|c| c.starts_with(&q)) {
        return MatchQuality::Prefix;
    }
    if lowered.iter().any(|c| c.contains(&q)) {
        return MatchQuality::Substring;
    }

    let best = lowered
        .iter()
        .skip(1)
        .fold(
            fuzzy_similarity(query, display_name, None),
            |best, email| best.max(fuzzy_similarity(query, "", Some(email))),
        );
    MatchQuality::Fuzzy(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzzy_matches_name_token() {
        let sim = fuzzy_similarity("Jon", "John Smith", Some("john.smith@example.com"));
        assert!(sim >= 0.85, "similarity {sim} below threshold");
    }

    #[test]
    fn test_fuzzy_rejects_unrelated() {
        let sim = fuzzy_similarity("Xavier", "John Smith", Some("john.smith@example.com"));
        assert!(sim < 0.85, "similarity {sim} unexpectedly high");
    }

    #[test]
    fn test_quality_tiers() {
        let emails = vec!["ahmed@co.com".to_string()];
        assert_eq!(
            match_quality("ahmed@co.com", "Ahmed Al-Rashid", &emails),
            MatchQuality::Exact
        );
        assert_eq!(
            match_quality("Ahmed", "Ahmed Al-Rashid", &emails),
            MatchQuality::Prefix
        );
        assert_eq!(
            match_quality("Rashid", "Ahmed Al-Rashid", &emails),
            MatchQuality::Substring
        );
        assert!(matches!(
            match_quality("Ahmad", "Hmed", &[]),
            MatchQuality::Fuzzy(_)
        ));
    }
}
