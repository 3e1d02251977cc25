use super::*;

fn extract(text: &str) -> Vec<CitationCandidate> {
    Extractor::default()
        .extract(text, TextFormat::Plain)
        .expect("extraction succeeds")
}

#[test]
fn test_no_citations_is_empty() {
    assert!(extract("").is_empty());
    assert!(extract("The weather was pleasant and nobody cited anything.").is_empty());
}

#[test]
fn test_parenthetical_author_year() {
    let found = extract("Transformers dominate NLP (Vaswani et al., 2017). Later work agreed.");
    assert_eq!(found.len(), 1);

    let c = &found[0];
    assert_eq!(c.raw(), "(Vaswani et al., 2017)");
    assert_eq!(c.fields().author.as_deref(), Some("Vaswani et al."));
    assert_eq!(c.fields().year, Some(2017));
    assert_eq!(
        c.context(),
        Some("Transformers dominate NLP (Vaswani et al., 2017).")
    );
}

#[test]
fn test_parenthetical_group_with_several_works() {
    let found = extract("Both groups reported gains (Smith & Lee, 2019; Brown, 2020).");
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].fields().author.as_deref(), Some("Smith & Lee"));
    assert_eq!(found[0].fields().year, Some(2019));
    assert_eq!(found[1].fields().author.as_deref(), Some("Brown"));
    assert_eq!(found[1].raw(), "Brown, 2020");
}

#[test]
fn test_narrative_author_year() {
    let found = extract("As Devlin et al. (2019) showed, pretraining helps.");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].raw(), "Devlin et al. (2019)");
    assert_eq!(found[0].fields().year, Some(2019));
}

#[test]
fn test_years_alone_are_not_citations() {
    assert!(extract("In (2019) the results changed. Table (2020) lists them.").is_empty());
}

#[test]
fn test_bare_url_trims_punctuation() {
    let found = extract("See https://example.org/paper/1. It explains the method.");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].fields().url.as_deref(), Some("https://example.org/paper/1"));
    assert_eq!(found[0].raw(), "https://example.org/paper/1");
}

#[test]
fn test_doi_url_yields_doi() {
    let found = extract("Data from https://doi.org/10.1038/s41586-020-2649-2 was used.");
    assert_eq!(found.len(), 1);
    let fields = found[0].fields();
    assert_eq!(fields.doi.as_deref(), Some("10.1038/s41586-020-2649-2"));
    assert!(fields.url.is_some());
}

#[test]
fn test_bare_doi_and_arxiv() {
    let found = extract("Compare doi:10.1145/3292500.3330701 with arXiv:1706.03762v5 for details.");
    assert_eq!(found.len(), 1, "same-line fragments merge: {:?}", found);
    let fields = found[0].fields();
    assert_eq!(fields.doi.as_deref(), Some("10.1145/3292500.3330701"));
    assert_eq!(fields.arxiv_id.as_deref(), Some("1706.03762v5"));
}

#[test]
fn test_fragments_on_separate_lines_stay_apart() {
    let found = extract("doi:10.1145/3292500.3330701\narXiv:1706.03762");
    assert_eq!(found.len(), 2);
}

#[test]
fn test_author_year_merges_with_url_on_same_line() {
    let found = extract(
        "Scaling laws hold (Kaplan et al., 2020) https://arxiv.org/abs/2001.08361 for language models.",
    );
    assert_eq!(found.len(), 1);
    let fields = found[0].fields();
    assert_eq!(fields.author.as_deref(), Some("Kaplan et al."));
    assert_eq!(fields.year, Some(2020));
    assert_eq!(fields.arxiv_id.as_deref(), Some("2001.08361"));
}

#[test]
fn test_fragments_in_different_sentences_stay_apart() {
    let found =
        extract("Smith (2020) found that sleep improves memory. Details at https://x.test/p.");
    assert_eq!(found.len(), 2);

    assert_eq!(found[0].raw(), "Smith (2020)");
    assert_eq!(
        found[0].context(),
        Some("Smith (2020) found that sleep improves memory.")
    );
    assert_eq!(found[1].raw(), "https://x.test/p");
    assert_eq!(found[1].context(), Some("Details at https://x.test/p."));
}

#[test]
fn test_two_different_citations_on_one_line_do_not_merge() {
    let found = extract("Prior work (Smith, 2018) and (Jones, 2021) disagree.");
    assert_eq!(found.len(), 2);
}

#[test]
fn test_reference_list_entry() {
    let text = "References\n\
        [1] Vaswani, A., Shazeer, N., & Parmar, N. (2017). Attention is all you need. \
        Advances in Neural Information Processing Systems, 30, 5998-6008. \
        https://arxiv.org/abs/1706.03762\n";
    let found = extract(text);
    assert_eq!(found.len(), 1);

    let c = &found[0];
    let fields = c.fields();
    assert_eq!(fields.author.as_deref(), Some("Vaswani, A., Shazeer, N., & Parmar, N."));
    assert_eq!(fields.year, Some(2017));
    assert_eq!(fields.title.as_deref(), Some("Attention is all you need"));
    assert_eq!(
        fields.venue.as_deref(),
        Some("Advances in Neural Information Processing Systems")
    );
    assert_eq!(fields.arxiv_id.as_deref(), Some("1706.03762"));
    assert!(c.context().is_none());
}

#[test]
fn test_duplicates_removed_in_document_order() {
    let found = extract(
        "First (Smith, 2020) claim.\nSecond (SMITH, 2020) claim.\nThird (Lee, 2021) claim.",
    );
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].fields().author.as_deref(), Some("Smith"));
    assert_eq!(found[1].fields().author.as_deref(), Some("Lee"));
    assert!(found[0].span().start < found[1].span().start);
}

#[test]
fn test_spans_point_at_raw_text() {
    let text = "Intro. Results (Hinton, 2006) were striking.";
    for c in extract(text) {
        assert_eq!(&text[c.span().start..c.span().end], c.raw());
    }
}

#[test]
fn test_markdown_link_gives_title() {
    let found = Extractor::default()
        .extract(
            "Read [Attention Is All You Need](https://arxiv.org/abs/1706.03762) first.",
            TextFormat::Markdown,
        )
        .unwrap();
    assert_eq!(found.len(), 1);
    let fields = found[0].fields();
    assert_eq!(fields.title.as_deref(), Some("Attention Is All You Need"));
    assert_eq!(fields.arxiv_id.as_deref(), Some("1706.03762"));
}

#[test]
fn test_markdown_code_is_ignored() {
    let text = "Run `curl https://example.org/api` then see (Smith, 2020).\n\
                ```\nhttps://example.org/inside\n```";
    let found = Extractor::default()
        .extract(text, TextFormat::Markdown)
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].fields().author.as_deref(), Some("Smith"));
}

#[test]
fn test_plain_mode_keeps_link_url_without_title() {
    let found = extract("Read [the paper](https://example.org/p) now.");
    assert_eq!(found.len(), 1);
    assert!(found[0].fields().title.is_none());
    assert_eq!(found[0].fields().url.as_deref(), Some("https://example.org/p"));
}

#[test]
fn test_rejects_oversized_input() {
    let extractor = Extractor::new(ExtractionLimits {
        max_text_bytes: 10,
        max_citations: 100,
    });
    assert_eq!(
        extractor.extract("this text is too long", TextFormat::Plain),
        Err(ExtractionError::TooLarge {
            size: 21,
            limit: 10
        })
    );
}

#[test]
fn test_rejects_binary_input() {
    let err = Extractor::default()
        .extract("abc\u{0}def", TextFormat::Plain)
        .unwrap_err();
    assert_eq!(err, ExtractionError::Binary { offset: 3, code: 0 });
}

#[test]
fn test_allows_ordinary_whitespace() {
    assert!(
        Extractor::default()
            .extract("a\tb\r\nc", TextFormat::Plain)
            .is_ok()
    );
}

#[test]
fn test_rejects_too_many_citations() {
    let extractor = Extractor::new(ExtractionLimits {
        max_text_bytes: 1024,
        max_citations: 2,
    });
    let text = "(Smith, 2001)\n(Jones, 2002)\n(Brown, 2003)";
    assert_eq!(
        extractor.extract(text, TextFormat::Plain),
        Err(ExtractionError::TooManyCitations { found: 3, limit: 2 })
    );
}

#[test]
fn test_parse_citation_reference_style() {
    let fields = parse_citation("Smith, J. (2020). Deep learning for citations. Nature, 1, 2-3.");
    assert_eq!(fields.author.as_deref(), Some("Smith, J."));
    assert_eq!(fields.year, Some(2020));
    assert_eq!(fields.title.as_deref(), Some("Deep learning for citations"));
    assert_eq!(fields.venue.as_deref(), Some("Nature"));
}

#[test]
fn test_parse_citation_doi_only() {
    let fields = parse_citation("https://doi.org/10.1000/XYZ123");
    assert_eq!(fields.doi.as_deref(), Some("10.1000/xyz123"));
}

#[test]
fn test_parse_citation_quoted_title_and_loose_year() {
    let fields = parse_citation("Jones wrote \"A Study of Fabricated References\" in 2021");
    assert_eq!(fields.title.as_deref(), Some("A Study of Fabricated References"));
    assert_eq!(fields.year, Some(2021));
}

#[test]
fn test_parse_citation_falls_back_to_title() {
    let fields = parse_citation("  Attention Is All You Need  ");
    assert_eq!(fields.title.as_deref(), Some("Attention Is All You Need"));
    assert!(fields.author.is_none());
}
