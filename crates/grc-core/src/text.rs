//! Small text and number helpers shared by report generators.

/// Round to one decimal place.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `part / total * 100`, rounded to one decimal. Zero when `total` is zero.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to_tenth(part as f64 / total as f64 * 100.0)
}

/// Display form of a slug: `access-control` becomes `Access Control`.
///
/// Hyphens become spaces; each run of letters starts uppercase and
/// continues lowercase.
pub fn title_case(slug: &str) -> String {
    let mut out = String::with_capacity(slug.len());
    let mut at_word_start = true;
    for ch in slug.chars() {
        let ch = if ch == '-' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_of_empty_is_zero() {
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn percentage_rounds_to_one_decimal() {
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(4, 4), 100.0);
    }

    #[test]
    fn title_case_slug() {
        assert_eq!(title_case("access-control"), "Access Control");
        assert_eq!(title_case("INCIDENT-response"), "Incident Response");
        assert_eq!(title_case(""), "");
    }
}
