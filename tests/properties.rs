//! Property tests for normalization, chunking and scoring.

use ocrchunk::chunker::split_sentences;
use ocrchunk::{normalize, ChunkOptions, Chunker, Domain, DomainConfig, QualityScorer};
use proptest::prelude::*;

const WORDS: &[&str] = &[
    "الطلاب", "يتعلمون", "القراءة", "والكتابة", "في", "المدرسة", "كل", "يوم", "المعادلة", "الخلية",
    "النبات", "الماء", "الدرس", "الأول", "حل", "اكتب",
];

const TERMINATORS: &[char] = &['.', '؟', '!', '،'];

fn word() -> impl Strategy<Value = &'static str> {
    prop::sample::select(WORDS)
}

fn sentence() -> impl Strategy<Value = String> {
    (prop::collection::vec(word(), 2..15), prop::sample::select(TERMINATORS)).prop_map(|(words, t)| {
        let mut s = words.join(" ");
        s.push(t);
        s
    })
}

// A run of Arabic letters with no whitespace or terminator, as left behind
// by OCR that lost its spaces
fn unbroken_run() -> impl Strategy<Value = String> {
    "[\u{0628}-\u{063A}]{600,900}".prop_map(|mut s| {
        s.push('.');
        s
    })
}

fn mixed_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof![9 => sentence(), 1 => unbroken_run()], 1..60).prop_map(|s| s.join(" "))
}

fn visible(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn arabic_text(min_sentences: usize, max_sentences: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(sentence(), min_sentences..max_sentences).prop_map(|s| s.join(" "))
}

// Arabic letters, Arabic-Indic digits, tashkeel, Latin, ASCII digits,
// punctuation, whitespace and bidi marks.
const NOISY_ALPHABET: &str = "[\u{0621}-\u{064A}\u{0660}-\u{0669}\u{064B}-\u{0652}a-zA-Z0-9 \t\n.،؟+=\u{200F}\u{200B}\u{00A0}]{0,200}";

proptest! {
    #[test]
    fn normalize_is_idempotent(input in NOISY_ALPHABET, strip in any::<bool>()) {
        let once = normalize(&input, strip);
        prop_assert_eq!(normalize(&once, strip), once.clone());
    }

    #[test]
    fn normalize_leaves_no_arabic_indic_digits(input in NOISY_ALPHABET) {
        let out = normalize(&input, true);
        prop_assert!(!out.chars().any(|c| ('\u{0660}'..='\u{0669}').contains(&c)), "arabic-indic digit survived normalization: {:?}", out);
    }

    #[test]
    fn score_is_bounded(text in ".{0,300}", domain in prop::sample::select(Domain::ALL.to_vec()), strict in any::<bool>()) {
        let config = DomainConfig::resolve(domain, strict);
        let score = QualityScorer::new(&config).score(&text);
        prop_assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn noise_never_raises_score(
        base in arabic_text(8, 16),
        latin in 0usize..6,
        digits in 0usize..4,
        domain in prop::sample::select(Domain::ALL.to_vec()),
    ) {
        let config = DomainConfig::for_domain(domain);
        prop_assume!(base.chars().count() >= config.min_chars);
        let scorer = QualityScorer::new(&config);

        let mut noisy = base.clone();
        for _ in 0..latin {
            noisy.push_str(" lorem ipsum");
        }
        for _ in 0..digits {
            noisy.push_str(" 1234567890");
        }
        prop_assert!(scorer.score(&noisy) <= scorer.score(&base));
    }

    #[test]
    fn chunks_are_bounded_and_ordered(text in arabic_text(1, 60)) {
        let options = ChunkOptions::default();
        let chunks = Chunker::new(options).chunk(&text);

        prop_assert!(chunks.iter().all(|c| !c.is_empty()));
        if let Some((_, body)) = chunks.split_last() {
            for chunk in body {
                let len = chunk.chars().count();
                prop_assert!(len >= options.min - options.overflow_tolerance, "short chunk: {}", len);
                prop_assert!(len <= options.max + options.overflow_tolerance, "long chunk: {}", len);
            }
        }

        // Dropping a sub-viable page is the only way text can disappear
        if !chunks.is_empty() {
            prop_assert_eq!(chunks.join(" "), split_sentences(&text).join(" "));
        }
    }

    #[test]
    fn long_runs_keep_bounds_and_text(text in mixed_text()) {
        let options = ChunkOptions::default();
        let chunks = Chunker::new(options).chunk(&text);

        if let Some((_, body)) = chunks.split_last() {
            for chunk in body {
                let len = chunk.chars().count();
                prop_assert!(len >= options.min - options.overflow_tolerance, "short chunk: {}", len);
                prop_assert!(len <= options.max + options.overflow_tolerance, "long chunk: {}", len);
            }
        }
        if !chunks.is_empty() {
            prop_assert_eq!(visible(&chunks.concat()), visible(&text));
        }
    }
}
