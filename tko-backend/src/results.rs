//! Finite, consuming sequences returned by list operations

/// Info records produced by a list call
///
/// Results are consumed once; there is no way to rewind them. Use
/// [`Results::into_vec`] when the whole listing is needed at once.
#[derive(Debug)]
pub struct Results<E> {
    entries: std::vec::IntoIter<E>,
}

impl<E> Results<E> {
    pub fn from_vec(entries: Vec<E>) -> Self {
        Self {
            entries: entries.into_iter(),
        }
    }

    pub fn empty() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Remaining entries
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }

    pub fn into_vec(self) -> Vec<E> {
        self.entries.collect()
    }
}

impl<E> Iterator for Results<E> {
    type Item = E;

    fn next(&mut self) -> Option<E> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}
