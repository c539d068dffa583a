//! Placeholder identifiers for records whose page has not been fetched.
//!
//! A placeholder stands for a logical position `(page, index_in_page)`. The
//! raw form is the signed integer `-(page * base + index)`. Injectivity needs
//! `base > page_size`, which [`MarkerCodec::new`] enforces; every raw value is
//! `<= -base < 0`, so placeholders never meet the non-negative record ids.

use std::fmt;

use super::error::{DecodeError, MarkerError};

/// Raw placeholder as exposed outside the selection store.
pub type Placeholder = i64;

pub const DEFAULT_MARKER_BASE: u64 = 10_000;

/// A pending logical position, minted by [`MarkerCodec::marker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Marker {
    page: u64,
    index: u32,
    raw: Placeholder,
}

impl Marker {
    #[inline]
    pub fn page(self) -> u64 {
        self.page
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    /// Raw signed placeholder for this position.
    #[inline]
    pub fn placeholder(self) -> Placeholder {
        self.raw
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}[{}]", self.page, self.index)
    }
}

#[inline]
pub fn is_placeholder(raw: i64) -> bool {
    raw < 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerCodec {
    base: u64,
    page_size: u32,
    max_page: u64,
}

impl MarkerCodec {
    pub fn new(base: u64, page_size: u32) -> Result<Self, MarkerError> {
        if page_size == 0 {
            return Err(MarkerError::ZeroPageSize);
        }
        if base <= u64::from(page_size) {
            return Err(MarkerError::BaseTooSmall { base, page_size });
        }
        let max_magnitude = i64::MAX as u64;
        let max_page = (max_magnitude - u64::from(page_size - 1)) / base;
        if max_page == 0 {
            return Err(MarkerError::BaseTooLarge { base });
        }
        Ok(Self {
            base,
            page_size,
            max_page,
        })
    }

    pub fn with_default_base(page_size: u32) -> Result<Self, MarkerError> {
        Self::new(DEFAULT_MARKER_BASE, page_size)
    }

    #[inline]
    pub fn base(&self) -> u64 {
        self.base
    }

    #[inline]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Largest page number whose placeholders fit in an `i64`.
    #[inline]
    pub fn max_page(&self) -> u64 {
        self.max_page
    }

    pub fn marker(&self, page: u64, index: u32) -> Result<Marker, MarkerError> {
        if page == 0 {
            return Err(MarkerError::ZeroPage);
        }
        if index >= self.page_size {
            return Err(MarkerError::IndexOutOfRange {
                index,
                page_size: self.page_size,
            });
        }
        if page > self.max_page {
            return Err(MarkerError::PageOutOfRange {
                page,
                max_page: self.max_page,
            });
        }
        // page <= max_page keeps page * base + index within i64::MAX
        let magnitude = page * self.base + u64::from(index);
        Ok(Marker {
            page,
            index,
            raw: -(magnitude as i64),
        })
    }

    pub fn encode(&self, page: u64, index: u32) -> Result<Placeholder, MarkerError> {
        self.marker(page, index).map(Marker::placeholder)
    }

    pub fn decode(&self, raw: Placeholder) -> Result<Marker, DecodeError> {
        if !is_placeholder(raw) {
            return Err(DecodeError::NotAPlaceholder(raw));
        }
        let magnitude = raw.unsigned_abs();
        let page = magnitude / self.base;
        let index = magnitude % self.base;
        if page == 0 {
            return Err(DecodeError::ZeroPage { raw });
        }
        if index >= u64::from(self.page_size) {
            return Err(DecodeError::IndexOutOfRange {
                raw,
                index,
                page_size: self.page_size,
            });
        }
        if page > self.max_page {
            return Err(DecodeError::PageOutOfRange { raw });
        }
        Ok(Marker {
            page,
            // index < page_size
            index: index as u32,
            raw,
        })
    }
}
