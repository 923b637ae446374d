/// Cleans a free-text location before it goes into an outbound query.
///
/// Keeps ASCII letters, Russian Cyrillic letters, whitespace and `-`, drops
/// everything else, then trims and collapses whitespace runs to one space.
/// Never fails; returns an empty string when nothing is left.
pub fn normalize(raw: &str) -> String {
    let kept: String = raw.chars().filter(|&c| is_retained(c)).collect();

    let mut out = String::with_capacity(kept.len());
    for word in kept.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

fn is_retained(c: char) -> bool {
    c.is_ascii_alphabetic()
        || matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё')
        || c.is_whitespace()
        || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation() {
        assert_eq!(normalize("London!!"), "London");
    }

    #[test]
    fn collapses_and_trims_whitespace() {
        assert_eq!(normalize("   New   York  "), "New York");
        assert_eq!(normalize("\tRio\nde \r\n Janeiro "), "Rio de Janeiro");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  123 !?  "), "");
    }

    #[test]
    fn keeps_cyrillic_and_hyphens() {
        assert_eq!(normalize("Санкт-Петербург"), "Санкт-Петербург");
        assert_eq!(normalize("Ёлкино, ёж"), "Ёлкино ёж");
        assert_eq!(normalize("Stratford-upon-Avon"), "Stratford-upon-Avon");
    }

    #[test]
    fn drops_digits_and_non_supported_letters() {
        assert_eq!(normalize("Paris 75001"), "Paris");
        assert_eq!(normalize("São Paulo"), "So Paulo");
        assert_eq!(normalize("東京 Tokyo"), "Tokyo");
    }

    #[test]
    fn removing_chars_between_words_does_not_glue_spaces() {
        assert_eq!(normalize("New , York"), "New York");
    }

    #[test]
    fn output_has_no_control_chars_digits_or_punctuation() {
        let out = normalize("a\u{0}b\u{7}c 1,2;3 d.e/f_g'h\"i (j) -k-");
        assert!(out.chars().all(|c| !c.is_control()));
        assert!(out.chars().all(|c| !c.is_ascii_digit()));
        assert!(out.chars().all(|c| c == '-' || c == ' ' || c.is_alphabetic()));
    }

    #[test]
    fn is_idempotent() {
        let samples = [
            "",
            "London!!",
            "   New   York  ",
            "Санкт - Петербург 2024",
            "\u{a0}Oslo\u{2003}Norway\u{a0}",
            "--- ---",
            "x\ty\nz",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "input: {s:?}");
            assert_eq!(once.trim(), once);
            assert!(!once.contains("  "));
        }
    }
}
