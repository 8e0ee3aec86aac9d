use proptest::prelude::*;
use reel_text::{normalize, IndentStyle};

fn content_strategy() -> impl Strategy<Value = String> {
    // Lines of space/tab indentation followed by a short word.
    let line = (0usize..6, 0usize..3, "[a-z]{1,8}")
        .prop_map(|(spaces, tabs, word)| format!("{}{}{word}", " ".repeat(spaces), "\t".repeat(tabs)));
    prop::collection::vec(line, 1..10).prop_map(|lines| {
        let mut s = lines.join("\n");
        s.push('\n');
        s
    })
}

proptest! {
    #[test]
    fn normalize_is_idempotent(content in content_strategy(), width in 1usize..5) {
        let style = IndentStyle { use_spaces: true, width };
        let target = " ".repeat(width);

        let once = normalize(&content, &target, &style);
        let twice = normalize(&once, &target, &style);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn normalized_lines_start_at_the_target(content in content_strategy()) {
        let style = IndentStyle::default();
        let target = "    ";

        let out = normalize(&content, target, &style);
        for line in out.lines().filter(|l| !l.trim().is_empty()) {
            prop_assert!(line.starts_with(target));
        }
        // Minimal-common-strip guarantees some line sits exactly at target.
        prop_assert!(out
            .lines()
            .filter(|l| !l.trim().is_empty())
            .any(|l| !l.starts_with("     ")));
    }
}
