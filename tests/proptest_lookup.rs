//! Property-based tests using proptest
//!
//! These tests verify the name scan, listing and pagination helpers
//! against randomized page layouts.

use futures::TryStreamExt;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tfibm::ibm::event_notifications::{next_offset, PAGE_LIMIT};
use tfibm::ibm::http::RemoteError;
use tfibm::lookup::{
    find_by_name, list_all, resolve, Collection, Lookup, LookupContext, LookupError, Named, Page,
};

#[derive(Debug, Clone, PartialEq)]
struct Item {
    id: String,
    name: String,
}

impl Named for Item {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Pages served in order; the cursor is the index of the next page
struct PagedItems {
    pages: Vec<Vec<Item>>,
    calls: AtomicUsize,
}

impl PagedItems {
    fn new(names: Vec<Vec<String>>) -> Self {
        let pages = names
            .into_iter()
            .enumerate()
            .map(|(p, names)| {
                names
                    .into_iter()
                    .enumerate()
                    .map(|(i, name)| Item {
                        id: format!("item-{}-{}", p, i),
                        name,
                    })
                    .collect()
            })
            .collect();
        Self {
            pages,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn flattened(&self) -> impl Iterator<Item = &Item> {
        self.pages.iter().flatten()
    }
}

impl Collection for PagedItems {
    type Record = Item;
    const ENTITY: &'static str = "Item";

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<Item>, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let index: usize = cursor.map_or(Ok(0), |c| {
            c.parse().map_err(|_| RemoteError::Cursor(c.to_string()))
        })?;

        let records = self.pages.get(index).cloned().unwrap_or_default();
        if index + 1 < self.pages.len() {
            Ok(Page::new(records, Some((index + 1).to_string())))
        } else {
            Ok(Page::last(records))
        }
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Item, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.flattened()
            .find(|item| item.id == id)
            .cloned()
            .ok_or(RemoteError::Status {
                status: 404,
                message: "not found".to_string(),
            })
    }
}

/// Pages of names drawn from a small alphabet so matches and duplicates are common
fn arb_pages() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(
        prop::collection::vec(prop_oneof!["alpha", "beta", "gamma", "delta", "Alpha"], 0..6),
        1..8,
    )
    .prop_map(|pages| {
        pages
            .into_iter()
            .map(|page| page.into_iter().map(String::from).collect())
            .collect()
    })
}

fn arb_target() -> impl Strategy<Value = String> {
    prop_oneof!["alpha", "beta", "gamma", "epsilon"].prop_map(String::from)
}

proptest! {
    /// The scan returns the earliest record with exactly the target name
    #[test]
    fn name_scan_returns_first_match(pages in arb_pages(), target in arb_target()) {
        let collection = PagedItems::new(pages);
        let result = tokio_test::block_on(find_by_name(&LookupContext::new(), &collection, &target));

        let expected = collection.flattened().find(|item| item.name == target).cloned();
        match (result, expected) {
            (Ok(found), Some(expected)) => prop_assert_eq!(found, expected),
            (Err(LookupError::NotFound { key, .. }), None) => prop_assert_eq!(key, target),
            (result, expected) => prop_assert!(false, "got {:?}, expected {:?}", result, expected),
        }
    }

    /// Pages are only fetched up to the one holding the match
    #[test]
    fn name_scan_stops_at_matching_page(pages in arb_pages(), target in arb_target()) {
        let collection = PagedItems::new(pages);
        let _ = tokio_test::block_on(find_by_name(&LookupContext::new(), &collection, &target));

        let expected_calls = collection
            .pages
            .iter()
            .position(|page| page.iter().any(|item| item.name == target))
            .map_or(collection.pages.len(), |index| index + 1);
        prop_assert_eq!(collection.calls(), expected_calls);
    }

    /// Listing yields every record exactly once in API order
    #[test]
    fn list_all_preserves_order(pages in arb_pages()) {
        let collection = PagedItems::new(pages);
        let ctx = LookupContext::new();
        let listed: Vec<Item> = tokio_test::block_on(list_all(&ctx, &collection).try_collect())
            .expect("listing should succeed");

        let expected: Vec<Item> = collection.flattened().cloned().collect();
        prop_assert_eq!(listed, expected);
        prop_assert_eq!(collection.calls(), collection.pages.len());
    }

    /// Lookups by id make a single call and never page
    #[test]
    fn id_lookup_is_one_call(pages in arb_pages()) {
        let collection = PagedItems::new(pages);
        let lookup = Lookup::Id("item-0-0".to_string());
        let _ = tokio_test::block_on(resolve(&LookupContext::new(), &collection, &lookup));
        prop_assert_eq!(collection.calls(), 1);
    }

    /// Any combination other than exactly one non-empty value is rejected
    #[test]
    fn exactly_one_of_accepts_single_value(
        id in prop::option::of("[a-z0-9-]{0,8}"),
        name in prop::option::of("[a-z0-9-]{0,8}"),
    ) {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        let result = Lookup::exactly_one_of("Item", ("id", "name"), id.as_deref(), name.as_deref());
        prop_assert_eq!(result.is_ok(), set(&id) != set(&name));
    }
}

mod offset_tests {
    use super::*;

    proptest! {
        /// Offsets strictly increase and stop once the total is covered
        #[test]
        fn offsets_terminate(total in 0u64..1000) {
            let mut offset = 0u64;
            let mut pages = 0u64;
            loop {
                let returned = total.saturating_sub(offset).min(PAGE_LIMIT) as usize;
                pages += 1;
                match next_offset(offset, returned, Some(total)) {
                    Some(next) => {
                        let next: u64 = next.parse().unwrap();
                        prop_assert!(next > offset);
                        offset = next;
                    }
                    None => break,
                }
            }
            prop_assert!(pages <= total.div_ceil(PAGE_LIMIT).max(1));
        }
    }
}

mod region_tests {
    use super::*;
    use tfibm::config::validate_region;

    proptest! {
        #[test]
        fn valid_regions_accepted(region in "[a-z]{2,6}(-[a-z]{2,6}){0,2}") {
            prop_assert!(validate_region(&region));
        }

        #[test]
        fn regions_with_other_characters_rejected(region in "[a-z]{1,4}[A-Z0-9_ ./][a-z]{0,4}") {
            prop_assert!(!validate_region(&region));
        }

        #[test]
        fn dangling_hyphens_rejected(region in "[a-z]{1,6}") {
            let leading = format!("-{}", region);
            let trailing = format!("{}-", region);
            let doubled = format!("{}--{}", region, region);
            prop_assert!(!validate_region(&leading));
            prop_assert!(!validate_region(&trailing));
            prop_assert!(!validate_region(&doubled));
        }
    }
}
