//! BLAKE3-derived identifiers for candidates and lookup cache keys.

use blake3::Hasher;

use crate::citation::{CitationFields, SourceSpan};

/// Stable identifier for a candidate: raw text, normalized fields and position.
///
/// Two candidates with identical text at different offsets get different ids.
/// Truncated to 64 bits; ids are only unique within one run.
pub fn candidate_id(raw: &str, fields: &CitationFields, span: SourceSpan) -> String {
    let mut hasher = Hasher::new();
    hasher.update(raw.as_bytes());
    hasher.update(b"|");
    for value in [
        fields.author.as_deref(),
        fields.title.as_deref(),
        fields.url.as_deref(),
        fields.doi.as_deref(),
        fields.arxiv_id.as_deref(),
        fields.venue.as_deref(),
    ] {
        hasher.update(value.unwrap_or("").as_bytes());
        hasher.update(b"|");
    }
    hasher.update(&fields.year.unwrap_or(0).to_le_bytes());
    hasher.update(&(span.start as u64).to_le_bytes());
    hasher.update(&(span.end as u64).to_le_bytes());

    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    format!("{:016x}", u64::from_le_bytes(bytes))
}

/// Cache key of the form `"{prefix}:{hash}"` over `parts`.
///
/// Parts are length-prefixed so `["ab", "c"]` and `["a", "bc"]` never collide.
pub fn cache_key(prefix: &str, parts: &[&str]) -> String {
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    let hash = hasher.finalize();
    format!("{}:{}", prefix, &hash.to_hex()[..24])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_candidate_id_format() {
        let id = candidate_id("Smith (2020)", &CitationFields::default(), SourceSpan::new(0, 12));
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_candidate_id_depends_on_fields() {
        let span = SourceSpan::new(0, 4);
        let mut with_year = CitationFields::default();
        with_year.year = Some(2020);

        let ids: HashSet<_> = [
            candidate_id("raw", &CitationFields::default(), span),
            candidate_id("raw", &with_year, span),
            candidate_id("raw2", &CitationFields::default(), span),
        ]
        .into_iter()
        .collect();

        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_cache_key_prefix_and_separation() {
        let k1 = cache_key("crossref", &["ab", "c"]);
        let k2 = cache_key("crossref", &["a", "bc"]);

        assert!(k1.starts_with("crossref:"));
        assert_eq!(k1.len(), "crossref:".len() + 24);
        assert_ne!(k1, k2);
        assert_eq!(k1, cache_key("crossref", &["ab", "c"]));
    }
}
