//! "Select the first N records", across pages that may never have been fetched.

use super::error::ValidationError;
use super::marker::MarkerCodec;
use super::store::SelectionKey;
use crate::model::{Page, locate};

/// Parses the user-entered count for a bulk selection.
///
/// Absent or blank input and non-integers are rejected here; the sign is
/// checked by [`plan_first_n`].
pub fn parse_count(input: Option<&str>) -> Result<i64, ValidationError> {
    let text = input.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(ValidationError::Missing);
    }
    text.parse::<i64>()
        .map_err(|_| ValidationError::NotANumber(text.to_string()))
}

/// Keys for logical positions `1..=min(n, total_records)`.
///
/// Positions on `current_page` become record ids, everything else a marker.
/// Nothing is produced unless the whole plan is valid.
pub fn plan_first_n(
    n: i64,
    total_records: u64,
    codec: &MarkerCodec,
    current_page: &Page,
) -> Result<Vec<SelectionKey>, ValidationError> {
    if n <= 0 {
        return Err(ValidationError::NonPositive(n));
    }
    let effective = n.unsigned_abs().min(total_records);
    let page_size = codec.page_size();
    let mut keys = Vec::with_capacity(usize::try_from(effective).unwrap_or(0));
    for position in 1..=effective {
        let (page, index) = locate(position, page_size);
        let on_current = if page == current_page.number {
            current_page.record_at(index as usize)
        } else {
            None
        };
        let key = match on_current {
            Some(record) => SelectionKey::Record(record.id),
            None => codec
                .marker(page, index)
                .map(SelectionKey::Pending)
                .map_err(|_| ValidationError::Unrepresentable { position })?,
        };
        keys.push(key);
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;

    fn codec() -> MarkerCodec {
        MarkerCodec::new(10_000, 12).unwrap()
    }

    #[test]
    fn parse_count_reports_each_failure() {
        assert_eq!(parse_count(None), Err(ValidationError::Missing));
        assert_eq!(parse_count(Some("  ")), Err(ValidationError::Missing));
        assert_eq!(
            parse_count(Some("ten")),
            Err(ValidationError::NotANumber("ten".into()))
        );
        assert_eq!(
            parse_count(Some("2.5")),
            Err(ValidationError::NotANumber("2.5".into()))
        );
        assert_eq!(parse_count(Some(" 20 ")), Ok(20));
        assert_eq!(parse_count(Some("-5")), Ok(-5));
    }

    #[test]
    fn plan_uses_loaded_records_and_markers_elsewhere() {
        let page1 = Page::new(1, 12, (101..=112).map(Record::new).collect(), 100);
        let keys = plan_first_n(20, 100, &codec(), &page1).unwrap();
        let raw: Vec<i64> = keys.iter().map(|key| key.raw()).collect();
        let mut expected: Vec<i64> = (101..=112).collect();
        expected.extend((0..8).map(|index| -20_000 - index));
        assert_eq!(raw, expected);
    }

    #[test]
    fn plan_on_a_later_page_marks_earlier_positions() {
        let page3 = Page::new(3, 12, (301..=312).map(Record::new).collect(), 100);
        let keys = plan_first_n(26, 100, &codec(), &page3).unwrap();
        assert_eq!(keys.len(), 26);
        assert_eq!(keys.iter().filter(|key| key.is_pending()).count(), 24);
        assert_eq!(keys[24].raw(), 301);
        assert_eq!(keys[25].raw(), 302);
    }

    #[test]
    fn plan_clamps_and_handles_empty_totals() {
        let empty = Page::empty(12);
        assert!(plan_first_n(10, 0, &codec(), &empty).unwrap().is_empty());
        let page1 = Page::new(1, 12, (101..=105).map(Record::new).collect(), 5);
        assert_eq!(plan_first_n(50, 5, &codec(), &page1).unwrap().len(), 5);
    }

    #[test]
    fn plan_rejects_non_positive_counts() {
        let empty = Page::empty(12);
        assert_eq!(
            plan_first_n(0, 10, &codec(), &empty),
            Err(ValidationError::NonPositive(0))
        );
        assert_eq!(
            plan_first_n(i64::MIN, 10, &codec(), &empty),
            Err(ValidationError::NonPositive(i64::MIN))
        );
    }

    #[test]
    fn plan_rejects_positions_beyond_the_codec_range() {
        let codec = MarkerCodec::new(u64::MAX / 4, 2).unwrap();
        let empty = Page::empty(2);
        let total = codec.max_page() * 2 + 1;
        let n = i64::try_from(total).unwrap();
        // one position past the last encodable page; the plan must fail whole
        let result = plan_first_n(n, total, &codec, &empty);
        assert_eq!(
            result,
            Err(ValidationError::Unrepresentable { position: total })
        );
    }
}
