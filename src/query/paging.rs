/// One `LIMIT`/`OFFSET` window of a paginated read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

/// Splits `total` rows into consecutive windows of `page_size` rows, in offset order.
///
/// Yields `ceil(total / page_size)` pages; zero rows yield no page.
pub fn page_windows(
    total: u64,
    page_size: u64,
) -> Result<impl Iterator<Item = Page>, super::Error> {
    if page_size == 0 {
        return Err(super::Error::input("page size must be greater than zero"));
    }

    let pages = total.div_ceil(page_size);
    Ok((0..pages).map(move |idx| Page {
        offset: idx * page_size,
        limit: page_size,
    }))
}
