//! Limit policy
//!
//! Pure decisions about page caps and termination. No I/O.
//! A value of 0 always means "unbounded".

/// Effective page cap: a positive caller cap overrides the table default
pub fn resolve_page_cap(table_default: u32, requested: Option<u32>) -> u32 {
    match requested {
        Some(cap) if cap > 0 => cap,
        _ => table_default,
    }
}

/// True once `max_pages` pages have been fetched
pub fn should_stop_at_page_bound(pages_fetched: u32, max_pages: u32) -> bool {
    max_pages > 0 && pages_fetched >= max_pages
}

/// True once `max_items` items have been fetched, unless the page bound is active
pub fn should_stop_at_item_bound(items_fetched: u32, max_items: u32, max_pages: u32) -> bool {
    max_items > 0 && items_fetched >= max_items && max_pages == 0
}

/// Shrink the item budget after a page.
///
/// Returns the new budget when the budget still exceeds the items fetched so far,
/// otherwise `None` and the budget stays as it was. The budget is never re-expanded.
pub fn next_page_cap(item_budget: u32, items_fetched: u32) -> Option<u32> {
    (item_budget > items_fetched).then(|| item_budget - items_fetched)
}
