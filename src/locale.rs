//! Picking the best-language subset of a multilingual list.
//!
//! Preferred locales are tried in order and compared by exact tag equality:
//! `"ja"` never matches `"ja-Hrkt"`, and nothing outside the list is ever
//! returned.

/// Anything that carries a language tag.
pub trait LanguageTagged {
    fn language_tag(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedItem<T> {
    pub language_tag: String,
    pub payload: T,
}

impl<T> LocalizedItem<T> {
    pub fn new(language_tag: impl Into<String>, payload: T) -> Self {
        Self {
            language_tag: language_tag.into(),
            payload,
        }
    }
}

impl<T> LanguageTagged for LocalizedItem<T> {
    fn language_tag(&self) -> &str {
        &self.language_tag
    }
}

/// Items of the first locale in `locales` that has any, in their original
/// order. Empty when no locale matches. An empty tag is not a locale, so
/// untagged items are never selected.
pub fn select_all<'a, T, L>(items: &'a [T], locales: &[L]) -> Vec<&'a T>
where
    T: LanguageTagged,
    L: AsRef<str>,
{
    for locale in locales {
        let locale = locale.as_ref();
        if locale.is_empty() {
            continue;
        }
        let matched: Vec<&T> = items
            .iter()
            .filter(|item| item.language_tag() == locale)
            .collect();
        if !matched.is_empty() {
            return matched;
        }
    }
    Vec::new()
}

/// First element of [`select_all`].
pub fn select_one<'a, T, L>(items: &'a [T], locales: &[L]) -> Option<&'a T>
where
    T: LanguageTagged,
    L: AsRef<str>,
{
    select_all(items, locales).into_iter().next()
}
