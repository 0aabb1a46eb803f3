#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use typeahead::store::{CaseMatching, MatchMode, Record, StoreOptions, TextIndexStore};

#[derive(Arbitrary, Debug)]
struct Input {
    names: Vec<String>,
    term: String,
    limit: u8,
    substring: bool,
    insensitive: bool,
}

fuzz_target!(|input: Input| {
    let options = StoreOptions {
        match_mode: if input.substring {
            MatchMode::Substring
        } else {
            MatchMode::Prefix
        },
        case_matching: if input.insensitive {
            CaseMatching::Insensitive
        } else {
            CaseMatching::Sensitive
        },
        ..Default::default()
    };
    let store = TextIndexStore::new(options);
    store.load(input.names.iter().map(|n| Record::new(n.as_str())));

    let Ok(results) = store.search(&input.term, input.limit as usize) else {
        return;
    };
    let matcher = store.matcher();
    let term = matcher.fold(&input.term).unwrap_or_else(|| input.term.clone());
    let key = |name: &str| matcher.fold(name).unwrap_or_else(|| name.to_string());

    // Bounded, every hit matches, ordered by key
    assert!(results.len() <= input.limit as usize);
    assert!(results.iter().all(|r| matcher.is_match(&key(&r.name), &term)));
    assert!(results.windows(2).all(|w| key(&w[0].name) <= key(&w[1].name)));

    // Nothing matching was left out when the limit was not reached
    if results.len() < input.limit as usize {
        let everything = store.search("", usize::MAX).unwrap_or_default();
        let expected = everything
            .iter()
            .filter(|r| matcher.is_match(&key(&r.name), &term))
            .count();
        assert_eq!(results.len(), expected);
    }
});
