pub const QUESTIONS_PER_PAGE: usize = 10;

/// Returns the 1-based `page` of `items`. Pages before the first or past the end are empty.
pub fn paginate<T>(items: &[T], page: i64) -> &[T] {
    let Some(index) = page.checked_sub(1).and_then(|p| usize::try_from(p).ok()) else {
        return &[];
    };
    let Some(start) = index.checked_mul(QUESTIONS_PER_PAGE) else {
        return &[];
    };
    if start >= items.len() {
        return &[];
    }
    let end = (start + QUESTIONS_PER_PAGE).min(items.len());
    &items[start..end]
}
