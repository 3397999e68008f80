//! Greedy packing of strings into bounded pages.
//!
//! Used to surface large key listings in chunks that fit a message size
//! limit. Lengths are counted in characters.

use crate::error::{Error, Result};
use crate::store::KeyStream;
use futures::stream::{self, BoxStream, StreamExt};

/// Separator used between items when none is configured.
pub const DEFAULT_SEPARATOR: &str = ", ";

/// Page length limit used when none is configured.
pub const DEFAULT_LIMIT: usize = 2000;

/// Joins items into pages of at most `limit` characters.
///
/// Page boundaries depend only on the input sequence, separator and limit.
///
/// # Example
///
/// ```
/// use kvshift::Paginator;
///
/// let pages = Paginator::new(", ", 6)?.pages(["aa", "bb", "cc"])?;
/// assert_eq!(pages, vec!["aa, bb", "cc"]);
/// # Ok::<(), kvshift::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Paginator {
    separator: String,
    separator_len: usize,
    limit: usize,
    buffer: Vec<String>,
    length: usize,
}

impl Paginator {
    /// Creates a paginator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pagination`] if `limit` is zero.
    pub fn new(separator: impl Into<String>, limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(Error::pagination("page limit must be at least 1"));
        }
        let separator = separator.into();
        Ok(Self {
            separator_len: separator.chars().count(),
            separator,
            limit,
            buffer: Vec::new(),
            length: 0,
        })
    }

    /// Returns the page length limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Adds one item, returning a completed page if the item did not fit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pagination`] if the item alone exceeds the limit.
    /// Nothing is buffered in that case.
    pub fn add(&mut self, item: impl Into<String>) -> Result<Option<String>> {
        let item = item.into();
        let item_len = item.chars().count();
        if item_len > self.limit {
            return Err(Error::pagination(format!(
                "item of {item_len} characters exceeds page limit of {}",
                self.limit
            )));
        }

        if self.buffer.is_empty() {
            self.buffer.push(item);
            self.length = item_len;
            return Ok(None);
        }

        if self.length + self.separator_len + item_len <= self.limit {
            self.buffer.push(item);
            self.length += self.separator_len + item_len;
            return Ok(None);
        }

        let page = self.buffer.join(&self.separator);
        self.buffer = vec![item];
        self.length = item_len;
        Ok(Some(page))
    }

    /// Emits the buffered items as a final page, or `None` if empty.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let page = self.buffer.join(&self.separator);
        self.buffer.clear();
        self.length = 0;
        Some(page)
    }

    /// Paginates a whole sequence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pagination`] on the first item that exceeds the limit.
    pub fn pages<I>(mut self, items: I) -> Result<Vec<String>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut pages = Vec::new();
        for item in items {
            if let Some(page) = self.add(item)? {
                pages.push(page);
            }
        }
        pages.extend(self.flush());
        Ok(pages)
    }

    /// Paginates a key stream as it is produced.
    ///
    /// The first error, from the stream or from an oversized key, is yielded
    /// once and ends the page stream.
    pub fn page_stream<'a>(self, keys: KeyStream<'a>) -> BoxStream<'a, Result<String>> {
        stream::unfold(Some((self, keys)), |state| async move {
            let (mut paginator, mut keys) = state?;
            loop {
                match keys.next().await {
                    Some(Ok(key)) => match paginator.add(key) {
                        Ok(Some(page)) => return Some((Ok(page), Some((paginator, keys)))),
                        Ok(None) => {},
                        Err(e) => return Some((Err(e), None)),
                    },
                    Some(Err(e)) => return Some((Err(e), None)),
                    None => return paginator.flush().map(|page| (Ok(page), None)),
                }
            }
        })
        .boxed()
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            separator_len: DEFAULT_SEPARATOR.chars().count(),
            limit: DEFAULT_LIMIT,
            buffer: Vec::new(),
            length: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packs_greedily() {
        let pages = Paginator::new(", ", 6)
            .unwrap()
            .pages(["aa", "bb", "cc"])
            .unwrap();
        assert_eq!(pages, vec!["aa, bb", "cc"]);
    }

    #[test]
    fn test_oversized_item_rejected() {
        let mut paginator = Paginator::new(", ", 3).unwrap();
        assert!(matches!(paginator.add("toolong"), Err(Error::Pagination(_))));
        // Nothing was buffered.
        assert_eq!(paginator.flush(), None);
    }

    #[test]
    fn test_oversized_item_fails_whole_sequence() {
        let result = Paginator::new(", ", 3).unwrap().pages(["ok", "toolong"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert!(Paginator::new(", ", 0).is_err());
    }

    #[test]
    fn test_exact_fit() {
        let pages = Paginator::new("|", 5).unwrap().pages(["ab", "cd"]).unwrap();
        assert_eq!(pages, vec!["ab|cd"]);
    }

    #[test]
    fn test_item_equal_to_limit_gets_own_page() {
        let pages = Paginator::new(", ", 4)
            .unwrap()
            .pages(["a", "full", "b"])
            .unwrap();
        assert_eq!(pages, vec!["a", "full", "b"]);
    }

    #[test]
    fn test_empty_input() {
        let pages = Paginator::default().pages(Vec::<String>::new()).unwrap();
        assert!(pages.is_empty());
    }

    #[test]
    fn test_flush_resets() {
        let mut paginator = Paginator::new(" ", 10).unwrap();
        assert_eq!(paginator.add("one").unwrap(), None);
        assert_eq!(paginator.flush().as_deref(), Some("one"));
        assert_eq!(paginator.flush(), None);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // Each item is 2 characters but 4 bytes.
        let pages = Paginator::new("", 4).unwrap().pages(["éé", "üü"]).unwrap();
        assert_eq!(pages, vec!["ééüü"]);
    }

    #[test]
    fn test_deterministic() {
        let items: Vec<String> = (0..50).map(|i| format!("key-{i}")).collect();
        let first = Paginator::new(", ", 40).unwrap().pages(items.clone()).unwrap();
        let second = Paginator::new(", ", 40).unwrap().pages(items).unwrap();
        assert_eq!(first, second);
        assert!(first.iter().all(|page| page.chars().count() <= 40));
    }

    #[tokio::test]
    async fn test_page_stream_matches_pages() {
        let items: Vec<String> = (0..30).map(|i| format!("k{i}")).collect();
        let expected = Paginator::new(", ", 12).unwrap().pages(items.clone()).unwrap();

        let keys = stream::iter(items.into_iter().map(Ok)).boxed();
        let pages: Vec<String> = Paginator::new(", ", 12)
            .unwrap()
            .page_stream(keys)
            .map(|page| page.unwrap())
            .collect()
            .await;
        assert_eq!(pages, expected);
    }

    #[tokio::test]
    async fn test_page_stream_stops_at_error() {
        let keys = stream::iter(vec![
            Ok("a".to_string()),
            Err(Error::config("boom")),
            Ok("b".to_string()),
        ])
        .boxed();
        let pages: Vec<Result<String>> = Paginator::default().page_stream(keys).collect().await;
        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_err());
    }
}
