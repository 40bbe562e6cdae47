//! Canonical form for titles, artists and tags.

/// Featuring markers removed wherever they occur.
const FEATURING: &[&str] = &["feat.", "ft."];

/// Canonicalize a string for comparison.
///
/// Lower-cases, removes `feat.`/`ft.`, keeps only `[a-z0-9 ]`, drops the
/// standalone token `by`, and collapses whitespace. Total and idempotent.
pub fn normalize(s: &str) -> String {
    let mut text: String = s
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect::<String>()
        .to_lowercase();

    for marker in FEATURING {
        text = text.replace(marker, " ");
    }

    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect();

    kept.split(' ')
        .filter(|tok| !tok.is_empty() && *tok != "by")
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_punctuation() {
        assert_eq!(normalize("Snooze — SZA"), "snooze sza");
        assert_eq!(normalize("  CUFF IT!! "), "cuff it");
    }

    #[test]
    fn removes_featuring_markers() {
        assert_eq!(normalize("Kill Bill (feat. Doja Cat)"), "kill bill doja cat");
        assert_eq!(normalize("Song ft. Someone"), "song someone");
    }

    #[test]
    fn drops_standalone_by_only() {
        assert_eq!(normalize("Snooze by SZA"), "snooze sza");
        assert_eq!(normalize("Bye Bye Baby"), "bye bye baby");
        assert_eq!(normalize("Stand By Me"), "stand me");
    }

    #[test]
    fn non_ascii_letters_are_removed() {
        assert_eq!(normalize("Beyoncé"), "beyonc");
    }

    #[test]
    fn tabs_and_newlines_separate_words() {
        assert_eq!(normalize("blinding\tlights\nweeknd"), "blinding lights weeknd");
    }

    #[test]
    fn empty_and_whitespace() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t "), "");
        assert_eq!(normalize("by"), "");
    }

    #[test]
    fn idempotent() {
        let samples = [
            "Snooze — SZA",
            "x by.",
            "by-pass feat.ft.",
            "Leave The Door Open (Bruno Mars, Anderson .Paak)",
            "aft. by  BY By",
            "Beyoncé — CUFF IT",
            "f.t. fe at.",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }
}
