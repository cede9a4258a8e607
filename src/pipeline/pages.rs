//! Page-selector parsing: `"1-3"`, `"1,2,4"`, `"1-3,5"`.
//!
//! The grammar is a comma-separated list whose items are either a single
//! page number or an inclusive `start-end` range. Order and duplicates are
//! kept as written; bounds are checked later by the scheduler, which knows
//! the document's page count.

use crate::error::PageRangeError;

/// Largest page number accepted; pdfium addresses pages with a `u16` index.
pub const MAX_PAGE_NUMBER: usize = u16::MAX as usize + 1;

/// Parse a page-selector expression into page numbers, in written order.
///
/// An empty (or all-whitespace) expression yields an empty list, which
/// callers treat as "every page".
///
/// # Examples
/// ```
/// use uniai_client::pipeline::pages::parse_page_range;
///
/// assert_eq!(parse_page_range("2-4").unwrap(), vec![2, 3, 4]);
/// assert_eq!(parse_page_range("5,1,5").unwrap(), vec![5, 1, 5]);
/// assert_eq!(parse_page_range("1-2,9").unwrap(), vec![1, 2, 9]);
/// assert!(parse_page_range("1-2-3").is_err());
/// ```
pub fn parse_page_range(expr: &str) -> Result<Vec<usize>, PageRangeError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Ok(Vec::new());
    }

    let mut pages = Vec::new();
    for item in expr.split(',') {
        let item = item.trim();
        if item.contains('-') {
            pages.extend(parse_range_item(item)?);
        } else {
            pages.push(parse_number(item)?);
        }
    }
    Ok(pages)
}

fn parse_range_item(item: &str) -> Result<std::ops::RangeInclusive<usize>, PageRangeError> {
    let parts: Vec<&str> = item.split('-').collect();
    let [start, end] = parts.as_slice() else {
        return Err(PageRangeError::InvalidRange(item.to_string()));
    };

    let start = parse_number(start)?;
    let end = parse_number(end)?;
    if start > end {
        return Err(PageRangeError::ReversedRange { start, end });
    }
    Ok(start..=end)
}

fn parse_number(s: &str) -> Result<usize, PageRangeError> {
    let s = s.trim();
    let page = s
        .parse::<usize>()
        .map_err(|_| PageRangeError::InvalidNumber(s.to_string()))?;
    if page > MAX_PAGE_NUMBER {
        return Err(PageRangeError::PageTooLarge {
            page,
            max: MAX_PAGE_NUMBER,
        });
    }
    Ok(page)
}
