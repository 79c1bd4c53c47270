// tests/normalize_scenarios.rs
//
// Cleaning behaviour against the builtin bilingual lexicon:
// - the three reference reviews
// - projection (cleaning twice == cleaning once), and where it stops holding
// - negators survive stopword removal
// - repeat collapsing and prefix normalization

use review_absa::lang::Language;
use review_absa::lexicon::Lexicon;
use review_absa::normalize::{normalize_by_prefix, reduce_repeating_chars, KeywordSet, Normalizer};
use review_absa::resources;

fn clean(text: &str, lang: Language) -> String {
    let keywords = Lexicon::builtin().combined_keywords();
    Normalizer::default().clean(text, lang, &keywords, true)
}

#[test]
fn indonesian_review_with_suffixes_and_slang() {
    assert_eq!(
        clean("aplikasinya bagus tapi uinya jelek", Language::Id),
        "aplikasi bagus tapi ui buruk"
    );
}

#[test]
fn possessive_suffix_on_keywords_is_dropped() {
    assert_eq!(
        clean("lagunya bagus tapi musiknya bagus", Language::Id),
        "lagu bagus tapi musik bagus"
    );
}

#[test]
fn forced_indonesian_on_english_text_uses_bilingual_keywords() {
    assert_eq!(
        clean("i dont like the music but the ui is good", Language::Id),
        "i dont like the musik but the ui is bagus"
    );
}

#[test]
fn cleaning_is_a_projection() {
    let n = Normalizer::default();
    let k = Lexicon::builtin().combined_keywords();
    let samples = [
        ("aplikasinya bagus tapi uinya jelek", Language::Id),
        ("Lagunya baguuuus bgt!!! tp iklannya ganggu @spotify", Language::Id),
        ("i dont like the music but the ui is good", Language::Id),
        ("The ads are SOOOO annoying, 30 seconds each... https://x.y", Language::En),
        ("pembayaran premium mahal, gak worth it", Language::Id),
        ("", Language::En),
    ];
    for (text, lang) in samples {
        let once = n.clean(text, lang, &k, true);
        let twice = n.clean(&once, lang, &k, true);
        assert_eq!(once, twice, "not idempotent for {text:?}");
    }
}

// The stem gate counts tokens before stopword removal, so a long text that
// shrinks under the limit is only stemmed by the next pass.
#[test]
fn stem_gate_counts_stopwords_so_projection_breaks_at_the_limit() {
    let n = Normalizer::default();
    let k = Lexicon::builtin().combined_keywords();
    let mut words = vec!["yang"; 29];
    words.push("pembayaran");
    let text = words.join(" ");

    let once = n.clean(&text, Language::Id, &k, true);
    assert_eq!(once, "pembayaran");
    assert_eq!(n.clean(&once, Language::Id, &k, true), "bayar");

    // One stopword fewer and the first pass already stems.
    let short = words[1..].join(" ");
    assert_eq!(n.clean(&short, Language::Id, &k, true), "bayar");
}

#[test]
fn negators_survive_while_stopwords_go() {
    let out = clean("saya tidak suka dengan iklan yang ini", Language::Id);
    let tokens: Vec<&str> = out.split(' ').collect();
    assert!(tokens.contains(&"tidak"), "{out}");
    for stop in ["saya", "dengan", "yang", "ini"] {
        assert!(resources::stopwords(Language::Id).contains(stop));
        assert!(!tokens.contains(&stop), "{stop} survived in {out}");
    }

    let out = clean("I do not think this is never worth it", Language::En);
    assert!(out.split(' ').any(|t| t == "not"));
    assert!(out.split(' ').any(|t| t == "never"));
    assert!(!out.split(' ').any(|t| t == "this"));
}

#[test]
fn long_runs_collapse_to_exactly_two() {
    assert_eq!(reduce_repeating_chars("kereeeeen", 2), "kereen");
    assert_eq!(reduce_repeating_chars("keren", 2), "keren");
    assert_eq!(reduce_repeating_chars("mantapp", 2), "mantapp");
    assert_eq!(clean("soundnya jelekkkkk", Language::Id), "sound jelekk");
}

#[test]
fn prefix_normalization_is_deterministic() {
    let k: KeywordSet = ["ui", "fitur"].iter().map(|s| s.to_string()).collect();
    for _ in 0..3 {
        assert_eq!(normalize_by_prefix("uinya", &k), "ui");
    }
    assert_eq!(normalize_by_prefix("fiturnya", &k), "fitur");
    assert_eq!(normalize_by_prefix("u", &k), "u");
}
