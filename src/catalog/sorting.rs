use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Sort key that puts titles starting with a letter first, then digits,
/// then anything else, and empty strings last. Within a group, titles compare
/// case-folded with diacritics stripped, so "Émile" sorts among the E's.
pub fn title_key(s: &str) -> (u8, String) {
    let s = s.trim();
    let group = match s.chars().next() {
        None => 3,
        Some(ch) if ch.is_alphabetic() => 0,
        Some(ch) if ch.is_numeric() => 1,
        Some(_) => 2,
    };
    let folded: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    (group, folded.to_lowercase())
}

pub fn compare_titles(a: &str, b: &str) -> Ordering {
    title_key(a).cmp(&title_key(b)).then_with(|| a.cmp(b))
}

/// Sort strings letters → digits → symbols.
pub fn sort_titles<T: AsRef<str>>(items: &mut [T]) {
    items.sort_by(|a, b| compare_titles(a.as_ref(), b.as_ref()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_before_digits_before_symbols() {
        let mut items = vec!["#hashtag", "1984", "brave new world", "Animal Farm", ""];
        sort_titles(&mut items);
        assert_eq!(
            items,
            vec!["Animal Farm", "brave new world", "1984", "#hashtag", ""]
        );
    }

    #[test]
    fn test_case_folded_within_group() {
        let mut items = vec!["beta", "Alpha", "alpha"];
        sort_titles(&mut items);
        assert_eq!(items, vec!["Alpha", "alpha", "beta"]);
    }

    #[test]
    fn test_diacritics_sort_with_their_base_letter() {
        let mut items = vec!["Zorro", "Émile", "Apple", "ecole", "Ésope"];
        sort_titles(&mut items);
        assert_eq!(items, vec!["Apple", "ecole", "Émile", "Ésope", "Zorro"]);
    }

    #[test]
    fn test_compatibility_forms_are_folded() {
        assert_eq!(title_key("ﬁnal").1, "final");
        assert_eq!(title_key("Ça va").1, "ca va");
    }
}
