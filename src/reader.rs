use std::collections::VecDeque;

use crate::error::StoreError;
use crate::traits::ParameterStore;
use crate::types::ParameterRecord;

/// Iterates over every record below a prefix, fetching pages lazily.
///
/// Records come out in store order. A failed page fetch yields one `Err`
/// and ends the iteration.
pub struct DefinitionPages<'a, S: ?Sized> {
    store: &'a S,
    prefix: String,
    page_size: Option<usize>,
    buffer: VecDeque<ParameterRecord>,
    next_token: Option<String>,
    pages: usize,
    done: bool,
}

impl<'a, S: ParameterStore + ?Sized> DefinitionPages<'a, S> {
    pub fn new(store: &'a S, prefix: impl Into<String>, page_size: Option<usize>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            page_size,
            buffer: VecDeque::new(),
            next_token: None,
            pages: 0,
            done: false,
        }
    }

    /// Number of pages fetched so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    fn fetch(&mut self) -> Result<(), StoreError> {
        let page = self
            .store
            .list_page(&self.prefix, self.page_size, self.next_token.as_deref())?;
        self.pages += 1;
        self.buffer.extend(page.records);
        self.next_token = page.next_token;
        if self.next_token.is_none() {
            self.done = true;
        }
        Ok(())
    }
}

impl<S: ParameterStore + ?Sized> Iterator for DefinitionPages<'_, S> {
    type Item = Result<ParameterRecord, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        // Pages may legitimately be empty while a continuation token remains.
        while self.buffer.is_empty() && !self.done {
            if let Err(e) = self.fetch() {
                self.done = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fakes::FakeStore;
    use yare::parameterized;

    fn store_with(n: usize) -> FakeStore {
        let store = FakeStore::default();
        for i in 0..n {
            store.insert(&format!("/defs/svc-{i:02}"), "{}");
        }
        store.insert("/other/ignored", "{}");
        store
    }

    #[parameterized(
        unpaged = { None, 5, 1 },
        exact = { Some(5), 5, 1 },
        two_pages = { Some(3), 5, 2 },
        single_records = { Some(1), 5, 5 },
        empty = { Some(2), 0, 1 },
    )]
    fn test_reads_every_page_in_order(page_size: Option<usize>, records: usize, pages: usize) {
        let store = store_with(records);
        let mut reader = DefinitionPages::new(&store, "/defs/", page_size);

        let names: Vec<String> = reader
            .by_ref()
            .map(|r| r.unwrap().name)
            .collect();

        let expected: Vec<String> = (0..records).map(|i| format!("/defs/svc-{i:02}")).collect();
        assert_eq!(names, expected);
        assert_eq!(reader.pages(), pages);
        assert_eq!(store.list_calls(), pages);
    }

    #[test]
    fn test_failed_page_ends_iteration() {
        let store = store_with(4);
        store.fail_list_from(2);
        let reader = DefinitionPages::new(&store, "/defs/", Some(2));

        let results: Vec<_> = reader.collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok() && results[1].is_ok());
        assert!(matches!(results[2], Err(StoreError::Io { .. })));
    }

    #[test]
    fn test_is_lazy() {
        let store = store_with(4);
        let mut reader = DefinitionPages::new(&store, "/defs/", Some(2));
        assert_eq!(store.list_calls(), 0);
        reader.next();
        assert_eq!(store.list_calls(), 1);
    }
}
