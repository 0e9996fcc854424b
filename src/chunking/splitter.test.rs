use super::*;

#[test]
fn empty_content_produces_no_chunks() {
    let chunker = Chunker::default();
    assert!(chunker.chunk("").unwrap().is_empty());
}

#[test]
fn small_file_is_a_single_chunk_covering_all_lines() {
    let chunker = Chunker::default();
    let content = "line one\nline two\nline three\n";
    let chunks = chunker.chunk(content).unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].start_line, 1);
    assert!(chunks[0].text.contains("line one"));
}

#[test]
fn start_line_is_never_greater_than_end_line() {
    let chunker = Chunker::new(20, 5);
    let content = (0..200)
        .map(|i| format!("token_{i} "))
        .collect::<Vec<_>>()
        .join("\n");
    let chunks = chunker.chunk(&content).unwrap();
    assert!(!chunks.is_empty());
    for chunk in &chunks {
        assert!(chunk.start_line <= chunk.end_line);
    }
}

#[test]
fn large_file_splits_into_multiple_overlapping_chunks() {
    let chunker = Chunker::new(20, 5);
    let content = (0..500)
        .map(|i| format!("word{i}"))
        .collect::<Vec<_>>()
        .join(" ");
    let chunks = chunker.chunk(&content).unwrap();
    assert!(chunks.len() > 1, "expected more than one chunk for long content");
}
