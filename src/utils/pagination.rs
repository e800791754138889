// src/utils/pagination.rs

use serde::Deserialize;

/// Requested page, before it is resolved against the current row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// 1-based page number; values below 1 are treated as 1.
    Number(i64),
    /// Final page, computed from the total at query time.
    Last,
}

impl PageRequest {
    /// Parses `?page=` values. `last` and `-1` mean the final page; anything
    /// unparsable falls back to the first page.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => PageRequest::Number(1),
            Some(v) if v.eq_ignore_ascii_case("last") || v == "-1" => PageRequest::Last,
            Some(v) => PageRequest::Number(v.parse::<i64>().unwrap_or(1).max(1)),
        }
    }

    /// Concrete page number for `total` rows at `per_page` rows per page.
    ///
    /// Numbers past the end collapse to the first empty page after it, so
    /// offsets stay within the row count.
    pub fn resolve(self, total: i64, per_page: i64) -> i64 {
        match self {
            PageRequest::Number(n) => n.clamp(1, page_count(total, per_page) + 1),
            PageRequest::Last => page_count(total, per_page).max(1),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::Number(1)
    }
}

/// Query string for paginated listings (`?page=3`, `?page=last`).
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
}

impl PageParams {
    pub fn request(&self) -> PageRequest {
        PageRequest::parse(self.page.as_deref())
    }
}

fn page_count(total: i64, per_page: i64) -> i64 {
    if per_page <= 0 || total <= 0 {
        0
    } else {
        (total + per_page - 1) / per_page
    }
}

/// One page of an ordered result set plus the numbers needed to navigate it.
///
/// A page past the end is empty rather than an error.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn pages(&self) -> i64 {
        page_count(self.total, self.per_page)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages()
    }

    pub fn prev_num(&self) -> Option<i64> {
        self.has_prev().then(|| self.page - 1)
    }

    pub fn next_num(&self) -> Option<i64> {
        self.has_next().then(|| self.page + 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
        }
    }

    /// Page numbers for a pager widget; `None` marks a gap.
    ///
    /// Shows the first two pages, the last two, and the current page with
    /// two before and five after it.
    pub fn iter_pages(&self) -> Vec<Option<i64>> {
        let (left_edge, left_current, right_current, right_edge) = (2, 2, 5, 2);
        let pages = self.pages();

        let mut out = Vec::new();
        let mut last = 0;
        for num in 1..=pages {
            let near_edge = num <= left_edge || num > pages - right_edge;
            let near_current = num > self.page - left_current - 1 && num < self.page + right_current;
            if near_edge || near_current {
                if last + 1 != num {
                    out.push(None);
                }
                out.push(Some(num));
                last = num;
            }
        }
        out
    }
}

/// Pages an in-memory, already ordered slice.
pub fn paginate_slice<T: Clone>(items: &[T], request: PageRequest, per_page: i64) -> Page<T> {
    let total = items.len() as i64;
    let page = request.resolve(total, per_page);
    let start = ((page - 1) * per_page).min(total) as usize;
    let end = (page * per_page).min(total) as usize;

    Page {
        items: items[start..end].to_vec(),
        page,
        per_page,
        total,
    }
}
