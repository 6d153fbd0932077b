use search_core::dedup::deduplicate;
use search_core::index::{InvertedIndex, DEFAULT_TOP_K};
use search_core::tokenizer::Tokenizer;
use search_core::Document;

struct SpaceTokenizer;

impl Tokenizer for SpaceTokenizer {
    fn cut(&self, sentence: &str) -> Vec<String> {
        sentence.split_whitespace().map(str::to_string).collect()
    }
}

fn doc(id: i32, content: &str) -> Document {
    let raw = format!("<doc><content>{}</content></doc>", content);
    Document::parse(id, &raw, &SpaceTokenizer)
}

fn words(ws: &[&str]) -> Vec<String> {
    ws.iter().map(|w| w.to_string()).collect()
}

fn fruit_corpus() -> Vec<Document> {
    vec![doc(1, "苹果 手机"), doc(2, "苹果 电脑"), doc(3, "香蕉 水果")]
}

#[test]
fn single_term_query_hits_symmetric_docs_equally() {
    let mut index = InvertedIndex::default();
    index.build(&fruit_corpus());

    let results = index.search(&words(&["苹果"]), DEFAULT_TOP_K);
    let ids: Vec<i32> = results.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert!((results[0].1 - results[1].1).abs() < 1e-12);
}

#[test]
fn two_term_query_ranks_the_double_match_first() {
    let mut index = InvertedIndex::default();
    index.build(&fruit_corpus());

    let results = index.search(&words(&["苹果", "电脑"]), DEFAULT_TOP_K);
    assert_eq!(results[0].0, 2);
    assert!(results[0].1 > results[1].1);
    assert!(results.iter().all(|(id, _)| *id != 3));
}

#[test]
fn empty_query_returns_nothing() {
    let mut index = InvertedIndex::default();
    index.build(&fruit_corpus());
    assert!(index.search(&[], DEFAULT_TOP_K).is_empty());
}

#[test]
fn unknown_terms_contribute_nothing() {
    let mut index = InvertedIndex::default();
    index.build(&fruit_corpus());

    assert!(index.search(&words(&["不存在"]), DEFAULT_TOP_K).is_empty());
    let with_noise = index.search(&words(&["苹果", "不存在"]), DEFAULT_TOP_K);
    let alone = index.search(&words(&["苹果"]), DEFAULT_TOP_K);
    assert_eq!(with_noise, alone);
}

#[test]
fn posting_lists_are_sorted_and_duplicate_free() {
    let mut pages = fruit_corpus();
    pages.push(doc(4, "苹果 苹果 苹果 手机 手机 电脑"));
    let mut index = InvertedIndex::default();
    index.build(&pages);

    for term in ["苹果", "手机", "电脑", "香蕉", "水果"] {
        let list = index.postings(term).unwrap();
        for pair in list.windows(2) {
            assert!(pair[0].weight >= pair[1].weight);
        }
        let mut ids: Vec<i32> = list.iter().map(|e| e.doc_id).collect();
        ids.dedup();
        assert_eq!(ids.len(), list.len());
    }
}

#[test]
fn avg_doc_len_is_the_exact_mean() {
    let pages = vec![doc(1, "a b c"), doc(2, "d e"), doc(3, "f")];
    let mut index = InvertedIndex::default();
    index.build(&pages);
    assert_eq!(index.total_docs(), 3);
    assert_eq!(index.avg_doc_len(), 2.0);
}

#[test]
fn zero_term_document_counts_toward_totals_only() {
    let empty = Document::parse(3, "<doc><title>x</title><content> </content></doc>", &SpaceTokenizer);
    assert_eq!(empty.doc_len(), 1); // the title token

    let blank = doc(4, " ");
    let pages = vec![doc(1, "苹果 手机"), blank];
    let mut index = InvertedIndex::default();
    index.build(&pages);
    assert_eq!(index.total_docs(), 2);
    assert_eq!(index.doc_len(4), Some(0));
    assert_eq!(index.avg_doc_len(), 1.0);
}

#[test]
fn empty_corpus_skips_build() {
    let mut index = InvertedIndex::default();
    index.build(&[]);
    assert_eq!(index.total_docs(), 0);
    assert!(index.search(&words(&["苹果"]), DEFAULT_TOP_K).is_empty());
}

#[test]
fn top_k_truncates_deterministically() {
    let pages: Vec<Document> =
        (1..=30).map(|i| doc(i, &format!("共同 词{}", i))).collect();
    let mut index = InvertedIndex::default();
    index.build(&pages);

    let results = index.search(&words(&["共同"]), 10);
    assert_eq!(results.len(), 10);
    // every doc scores the same on the shared term; ids break the tie
    let ids: Vec<i32> = results.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, (1..=10).collect::<Vec<i32>>());
}

#[test]
fn store_load_roundtrip_preserves_ranking() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.dat");

    let mut pages = fruit_corpus();
    pages.push(doc(4, "苹果 苹果 水果 行情"));
    let mut index = InvertedIndex::default();
    index.build(&pages);
    index.store(&path).unwrap();

    let loaded = InvertedIndex::load(&path).unwrap();
    assert_eq!(loaded.total_docs(), index.total_docs());
    assert_eq!(loaded.avg_doc_len(), index.avg_doc_len());
    assert_eq!(loaded.term_count(), index.term_count());
    assert_eq!(loaded.doc_len(4), index.doc_len(4));

    for query in [vec!["苹果"], vec!["苹果", "电脑"], vec!["水果", "香蕉"]] {
        let q = words(&query);
        let before: Vec<i32> =
            index.search(&q, DEFAULT_TOP_K).into_iter().map(|(id, _)| id).collect();
        let after: Vec<i32> =
            loaded.search(&q, DEFAULT_TOP_K).into_iter().map(|(id, _)| id).collect();
        assert_eq!(before, after);
    }
}

#[test]
fn loader_skips_malformed_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.dat");
    std::fs::write(
        &path,
        "#META 2 3.5\n#DOCLENS 1:3 broken 2:4\n苹果 1:0.8:1 garbage 2:0.4:1\nnoitems\n",
    )
    .unwrap();

    let index = InvertedIndex::load(&path).unwrap();
    assert_eq!(index.total_docs(), 2);
    assert_eq!(index.doc_len(1), Some(3));
    assert_eq!(index.doc_len(2), Some(4));
    assert_eq!(index.postings("苹果").unwrap().len(), 2);
    assert!(index.postings("noitems").is_none());
}

#[test]
fn duplicate_documents_are_removed_before_indexing() {
    let pages = vec![doc(1, "苹果 手机 发布"), doc(2, "苹果 手机 发布"), doc(3, "香蕉 水果")];
    let kept = deduplicate(pages);
    let ids: Vec<i32> = kept.iter().map(|d| d.doc_id).collect();
    assert_eq!(ids, vec![1, 3]);

    let mut index = InvertedIndex::default();
    index.build(&kept);
    let results = index.search(&words(&["苹果"]), DEFAULT_TOP_K);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, 1);
}
