use thiserror::Error;

/// Codec construction or marker minting failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkerError {
    #[error("page size must be at least 1")]
    ZeroPageSize,
    #[error("marker base {base} must exceed the page size {page_size}")]
    BaseTooSmall { base: u64, page_size: u32 },
    #[error("marker base {base} leaves no representable page")]
    BaseTooLarge { base: u64 },
    #[error("page numbers start at 1")]
    ZeroPage,
    #[error("index {index} is outside a page of {page_size} records")]
    IndexOutOfRange { index: u32, page_size: u32 },
    #[error("page {page} exceeds the largest encodable page {max_page}")]
    PageOutOfRange { page: u64, max_page: u64 },
}

/// A raw integer did not decode to a placeholder this codec could have produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{0} is not a placeholder")]
    NotAPlaceholder(i64),
    #[error("placeholder {raw} decodes to page 0")]
    ZeroPage { raw: i64 },
    #[error("placeholder {raw} decodes to index {index}, outside a page of {page_size}")]
    IndexOutOfRange { raw: i64, index: u64, page_size: u32 },
    #[error("placeholder {raw} decodes beyond the largest encodable page")]
    PageOutOfRange { raw: i64 },
}

/// A page handed to the store breaks the record id contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("page {page} carries negative record id {id}")]
    NegativeRecordId { page: u64, id: i64 },
}

/// Bulk-selection input was rejected; the selection is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("enter how many records to select")]
    Missing,
    #[error("'{0}' is not a whole number")]
    NotANumber(String),
    #[error("the number of records to select must be positive (got {0})")]
    NonPositive(i64),
    #[error("record position {position} cannot be tracked before its page loads")]
    Unrepresentable { position: u64 },
}
