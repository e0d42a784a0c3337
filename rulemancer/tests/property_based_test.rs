use proptest::prelude::*;
use rulemancer::{split_fields, Environment};

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        ..ProptestConfig::default()
    })]

    #[test]
    fn prop_split_plain_tokens(tokens in prop::collection::vec("[a-z0-9()?-]{1,8}", 0..10)) {
        let input = tokens.join(" ");
        prop_assert_eq!(split_fields(&input), tokens);
    }

    #[test]
    fn prop_split_ignores_extra_whitespace(
        tokens in prop::collection::vec("[a-z]{1,6}", 1..6),
        gap in "[ \t]{1,4}",
    ) {
        let input = format!("{}{}{}", gap, tokens.join(&gap), gap);
        prop_assert_eq!(split_fields(&input), tokens);
    }

    #[test]
    fn prop_split_keeps_quoted_words_together(words in prop::collection::vec("[a-z]{1,5}", 1..5)) {
        let phrase = words.join(" ");
        let input = format!("say \"{}\" done", phrase);
        prop_assert_eq!(split_fields(&input), vec!["say".to_string(), phrase, "done".to_string()]);
    }

    #[test]
    fn prop_split_never_yields_empty_fields(input in "[a-z \t\"]{0,40}") {
        let fields = split_fields(&input);
        prop_assert!(fields.iter().all(|f| !f.is_empty() && !f.contains('"')));
    }

    #[test]
    fn prop_full_dump_has_one_line_per_fact(values in prop::collection::btree_set(-1000i64..1000, 0..20)) {
        let mut env = Environment::new();
        for v in &values {
            env.assert_string(&format!("(n {})", v)).unwrap();
        }
        let dump = env.dump_facts().unwrap();
        prop_assert_eq!(dump.lines().count(), values.len());
        prop_assert!(dump.is_empty() || dump.ends_with('\n'));

        let by_relation = env.dump_facts_by_relation("n").unwrap();
        prop_assert_eq!(by_relation, dump.replace('\n', ""));
    }

    #[test]
    fn prop_duplicate_asserts_are_ignored(v in any::<i64>(), repeats in 1usize..5) {
        let mut env = Environment::new();
        let first = env.assert_string(&format!("(n {})", v)).unwrap();
        for _ in 0..repeats {
            prop_assert_eq!(env.assert_string(&format!("(n {})", v)).unwrap(), first);
        }
        prop_assert_eq!(env.fact_count(), 1);
    }
}
