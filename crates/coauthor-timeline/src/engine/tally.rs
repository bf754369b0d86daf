//! Majority vote over mentions.

/// Counts mentions in first-seen order.
///
/// `majority` returns the most frequent key; among equal counts the key seen
/// first wins, so the result depends only on the mention sequence.
#[derive(Debug, Clone)]
pub struct MentionTally<K> {
    entries: Vec<(K, u32)>,
}

impl<K> Default for MentionTally<K> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<K: PartialEq> MentionTally<K> {
    /// Create an empty tally.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one mention.
    pub fn add(&mut self, key: K) {
        self.add_n(key, 1);
    }

    /// Record `n` mentions.
    pub fn add_n(&mut self, key: K, n: u32) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += n,
            None => self.entries.push((key, n)),
        }
    }

    /// Mentions recorded for `key`.
    #[must_use]
    pub fn count(&self, key: &K) -> u32 {
        self.entries.iter().find(|(k, _)| k == key).map_or(0, |(_, c)| *c)
    }

    /// Most mentioned key, first-seen on ties.
    #[must_use]
    pub fn majority(&self) -> Option<&K> {
        let mut best: Option<&(K, u32)> = None;
        for entry in &self.entries {
            if best.is_none_or(|(_, c)| entry.1 > *c) {
                best = Some(entry);
            }
        }
        best.map(|(k, _)| k)
    }

    /// Total mentions.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    /// True when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: PartialEq> FromIterator<K> for MentionTally<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tally = Self::new();
        for key in iter {
            tally.add(key);
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majority_picks_most_frequent() {
        let tally: MentionTally<&str> = ["X", "Y", "Y", "Z"].into_iter().collect();
        assert_eq!(tally.majority(), Some(&"Y"));
        assert_eq!(tally.count(&"Y"), 2);
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn test_majority_tie_goes_to_first_seen() {
        let tally: MentionTally<&str> = ["Y", "X", "X", "Y"].into_iter().collect();
        assert_eq!(tally.majority(), Some(&"Y"));

        let tally: MentionTally<&str> = ["X", "Y", "Y", "X"].into_iter().collect();
        assert_eq!(tally.majority(), Some(&"X"));
    }

    #[test]
    fn test_empty_tally() {
        let tally = MentionTally::<String>::new();
        assert!(tally.is_empty());
        assert_eq!(tally.majority(), None);
    }
}
