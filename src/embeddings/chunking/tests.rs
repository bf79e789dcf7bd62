use super::*;

fn page(text: &str, page_number: u32) -> PageRecord {
    PageRecord {
        text: text.to_string(),
        source_path: "/docs/sample.pdf".to_string(),
        page_number,
    }
}

fn config(chunk_size: usize, overlap_fraction: f64) -> ChunkingConfig {
    ChunkingConfig {
        chunk_size,
        overlap_fraction,
        ..ChunkingConfig::default()
    }
}

/// Length of the longest suffix of `prev` that is also a prefix of `next`
fn shared_len(prev: &str, next: &str) -> usize {
    let max = prev.len().min(next.len());
    (1..=max)
        .rev()
        .find(|&n| next.is_char_boundary(n) && prev.ends_with(&next[..n]))
        .unwrap_or(0)
}

#[test]
fn default_config() {
    let config = ChunkingConfig::default();
    assert_eq!(config.chunk_size, 384);
    assert_eq!(config.overlap_chars(), 115);
    assert_eq!(config.separators[0], "\n\n");
    assert_eq!(config.separators.last().map(String::as_str), Some(" "));
}

#[test]
fn short_text_is_single_chunk() {
    let text = "A short sentence that fits.";
    let pieces = split_text(text, &ChunkingConfig::default());
    assert_eq!(pieces, vec![text.to_string()]);
}

#[test]
fn empty_page_produces_no_chunks() {
    let chunks = chunk_pages(&[page("", 0), page("   \n\n  ", 1)], &ChunkingConfig::default());
    assert!(chunks.is_empty());
}

#[test]
fn sentence_boundaries_with_overlap() {
    let pieces = split_text("The sky is blue. The grass is green.", &config(20, 0.3));
    assert_eq!(pieces, vec!["The sky is blue.", "blue. The grass is", "is green."]);
}

#[test]
fn paragraph_break_wins_over_later_sentence_end() {
    let text = "Alpha beta gamma.\n\nDelta epsilon. Zeta eta theta iota kappa";
    let pieces = split_text(text, &config(40, 0.0));
    assert_eq!(pieces[0], "Alpha beta gamma.");
    assert!(pieces[1].starts_with("Delta epsilon."));
}

#[test]
fn raw_cut_without_separators() {
    let pieces = split_text("abcdefghijklmnopqrstuvwxyz", &config(10, 0.3));
    assert_eq!(pieces[0], "abcdefghij");
    assert!(pieces[1].starts_with("hij"));
    assert_eq!(pieces.last().map(String::as_str), Some("vwxyz"));
    assert!(pieces.iter().all(|p| p.chars().count() <= 10));
}

#[test]
fn chunks_respect_size_or_contain_no_separator() {
    let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. \
                Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.\n\
                Ut enim ad minim veniam, quis nostrud exercitation ullamco laboris.\n\n\
                Duis aute irure dolor in reprehenderit in voluptate velit esse."
        .repeat(5);
    let config = config(64, 0.3);

    for piece in split_text(&text, &config) {
        let within_bound = piece.chars().count() <= config.chunk_size;
        let has_separator = config.separators.iter().any(|s| piece.contains(s.as_str()));
        assert!(within_bound || !has_separator, "bad chunk: {:?}", piece);
    }
}

#[test]
fn adjacent_chunks_overlap() {
    let text = (0..100)
        .map(|i| format!("w{:02}", i))
        .collect::<Vec<_>>()
        .join(" ");
    let config = config(40, 0.3);
    let overlap = config.overlap_chars();

    let pieces = split_text(&text, &config);
    assert!(pieces.len() > 2);

    for pair in pieces.windows(2) {
        let shared = shared_len(&pair[0], &pair[1]);
        assert!(shared <= overlap, "overlap too large: {}", shared);
        assert!(shared + 5 >= overlap, "overlap too small: {}", shared);
    }
}

#[test]
fn multibyte_text_never_splits_chars() {
    let text = "日本語のテキストです。".repeat(20);
    let pieces = split_text(&text, &config(16, 0.25));
    assert!(pieces.len() > 1);
    assert!(pieces.iter().all(|p| p.chars().count() <= 16));
}

#[test]
fn chunking_is_deterministic() {
    let pages = vec![
        page("The sky is blue. The grass is green.", 0),
        page("Water boils at 100 degrees.", 1),
    ];
    let config = config(20, 0.3);
    assert_eq!(chunk_pages(&pages, &config), chunk_pages(&pages, &config));
}

#[test]
fn chunks_keep_page_metadata_and_order() {
    let pages = vec![
        page("The sky is blue. The grass is green.", 0),
        page("Water boils at 100 degrees.", 1),
    ];

    let chunks = chunk_pages(&pages, &config(20, 0.3));

    let first_page = chunks.iter().filter(|c| c.page_number == 0).count();
    let second_page = chunks.iter().filter(|c| c.page_number == 1).count();
    assert!(first_page >= 2);
    assert!(second_page >= 1);

    // page order is preserved and indices restart per page
    let page_numbers = chunks.iter().map(|c| c.page_number).collect::<Vec<_>>();
    let mut sorted = page_numbers.clone();
    sorted.sort_unstable();
    assert_eq!(page_numbers, sorted);
    assert_eq!(chunks[0].chunk_index, 0);
    assert_eq!(chunks[first_page].chunk_index, 0);

    assert!(chunks.iter().all(|c| c.source_path == "/docs/sample.pdf"));
    assert!(chunks.iter().all(|c| c.vector.is_none()));
}
