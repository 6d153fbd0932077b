use criterion::{criterion_group, criterion_main, Criterion};
use search_core::tokenizer::{JiebaTokenizer, Tokenizer};

const SAMPLE: &str = "搜索引擎通过倒排索引对网页库进行检索，\
    查询词经过分词之后在索引中查找对应的倒排列表，\
    再按照相关性得分对候选文档排序，返回标题、链接和摘要。\
    Modern search engines mix CJK segmentation with plain whitespace tokens.";

fn bench_tokenize(c: &mut Criterion) {
    let tokenizer = JiebaTokenizer::new();
    c.bench_function("tokenize_mixed_cjk", |b| b.iter(|| tokenizer.cut(SAMPLE)));
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
