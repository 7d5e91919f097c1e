//! Case-insensitive name search shared by file views and the index.

use regex::{Regex, RegexBuilder};

use crate::error::{SdError, SdResult};

/// Compiled search expression.
///
/// Matching is unanchored: a name matches when the expression is found
/// anywhere in it, ignoring case. A plain word therefore behaves like a
/// substring search.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    pub fn new(pattern: &str) -> SdResult<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| SdError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// Matching names, in the order they are given.
    pub fn select<'a, I, S>(&self, names: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a S>,
        S: AsRef<str> + ?Sized + 'a,
    {
        names
            .into_iter()
            .map(|name| name.as_ref())
            .filter(|name| self.is_match(name))
            .collect()
    }

    /// Positions of the matching names.
    pub fn positions<'a, I, S>(&self, names: I) -> Vec<usize>
    where
        I: IntoIterator<Item = &'a S>,
        S: AsRef<str> + ?Sized + 'a,
    {
        names
            .into_iter()
            .enumerate()
            .filter(|(_, name)| self.is_match(name.as_ref()))
            .map(|(i, _)| i)
            .collect()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn plain_words_match_regardless_of_case(
            word in "[a-z]{1,8}",
            prefix in "[a-z.]{0,6}",
            suffix in "[a-z.]{0,6}",
        ) {
            let p = Pattern::new(&word).unwrap();
            let name = format!("{}{}{}", prefix, word.to_uppercase(), suffix);
            prop_assert!(p.is_match(&name));
        }

        #[test]
        fn select_agrees_with_positions(
            names in prop::collection::vec("[a-cA-C]{0,4}", 0..12),
            pattern in "[a-c]{1,2}",
        ) {
            let p = Pattern::new(&pattern).unwrap();
            let selected = p.select(&names);
            let positions = p.positions(&names);
            prop_assert_eq!(selected.len(), positions.len());
            for (name, i) in selected.iter().zip(&positions) {
                prop_assert_eq!(*name, names[*i].as_str());
            }
        }
    }
}
