//! Splitting a rendered table into fixed-height pages.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSlice {
    pub index: usize,
    pub offset: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaginateError {
    #[error("page height must be positive, got {0}")]
    BadPageHeight(f64),
    #[error("content height must be finite and non-negative, got {0}")]
    BadContentHeight(f64),
}

pub fn page_count(content_height: f64, page_height: f64) -> Result<usize, PaginateError> {
    if !(page_height.is_finite() && page_height > 0.0) {
        return Err(PaginateError::BadPageHeight(page_height));
    }
    if !(content_height.is_finite() && content_height >= 0.0) {
        return Err(PaginateError::BadContentHeight(content_height));
    }
    Ok((content_height / page_height).ceil() as usize)
}

/// `ceil(content / page)` slices; the last one carries the remainder.
pub fn paginate(content_height: f64, page_height: f64) -> Result<Vec<PageSlice>, PaginateError> {
    let pages = page_count(content_height, page_height)?;
    Ok((0..pages)
        .map(|index| {
            let offset = index as f64 * page_height;
            PageSlice {
                index,
                offset,
                height: page_height.min(content_height - offset),
            }
        })
        .collect())
}
