use std::collections::HashSet;

use super::RecipientEmail;

/// Ordered recipients taken from one workbook. Duplicates are kept unless
/// [`RecipientList::dedupe`] is called.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct RecipientList(Vec<RecipientEmail>);

impl RecipientList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecipientEmail> {
        self.0.iter()
    }

    /// The first `n` recipients, or all of them if there are fewer.
    pub fn preview(&self, n: usize) -> &[RecipientEmail] {
        &self.0[..n.min(self.0.len())]
    }

    /// Keeps the first occurrence of every address. Addresses differing only
    /// in ASCII case count as the same recipient.
    pub fn dedupe(self) -> Self {
        let mut seen = HashSet::new();
        self.0
            .into_iter()
            .filter(|email| seen.insert(email.as_ref().to_ascii_lowercase()))
            .collect()
    }
}

impl FromIterator<RecipientEmail> for RecipientList {
    fn from_iter<I: IntoIterator<Item = RecipientEmail>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RecipientList {
    type Item = &'a RecipientEmail;
    type IntoIter = std::slice::Iter<'a, RecipientEmail>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
