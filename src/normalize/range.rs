use crate::tables::{MeasurementCategory, Tables};
use crate::types::{EntityKind, RawEntity, Span};

use super::measurement::{with_unit, MeasurementParts};

/// A confirmed `<measurement> <joiner> <measurement>` triple, with both
/// endpoints resolved to the same unit family.
#[derive(Debug)]
pub(crate) struct RangeFusion {
    pub first: usize,
    pub indicator: usize,
    pub second: usize,
    pub start_parts: MeasurementParts,
    pub end_parts: MeasurementParts,
    /// Covers both endpoints; used for ID ordering and the Markdown rewrite.
    pub span: Span,
}

/// Joining tokens that confirm a range. The slice is drawn from the Markdown
/// between the endpoint spans, so `between 30 and 37 inches` validates via
/// its interior `and`.
fn is_range_joiner(slice: &str) -> bool {
    matches!(
        slice.trim(),
        "-" | "–" | "—" | "to" | "through" | "and"
    )
}

/// Scan the span-ordered raw stream for consolidatable range triples.
///
/// Returns the fusions plus a list of `(indicator, first_endpoint)` pairs
/// for indicators whose triple failed validation; callers attach those to
/// the first endpoint's canonical entity so no raw entity goes unreferenced.
pub(crate) fn find_range_fusions(
    markdown: &str,
    raws: &[RawEntity],
    meas_parts: &[Option<MeasurementParts>],
    tables: &Tables,
) -> (Vec<RangeFusion>, Vec<(usize, usize)>) {
    let mut fusions = Vec::new();
    let mut orphans = Vec::new();

    for (idx, raw) in raws.iter().enumerate() {
        if raw.kind != EntityKind::RangeIndicator {
            continue;
        }

        // Nearest measurement raws flanking the indicator.
        let first = raws[..idx]
            .iter()
            .rposition(|r| r.kind == EntityKind::Measurement && r.span.end <= raw.span.start);
        let second = raws[idx + 1..]
            .iter()
            .position(|r| r.kind == EntityKind::Measurement && r.span.start >= raw.span.end)
            .map(|off| idx + 1 + off);

        let (Some(first), Some(second)) = (first, second) else {
            if let Some(first) = first {
                orphans.push((idx, first));
            }
            continue;
        };

        match fuse(markdown, raws, meas_parts, tables, first, second) {
            Some((start_parts, end_parts)) => fusions.push(RangeFusion {
                first,
                indicator: idx,
                second,
                start_parts,
                end_parts,
                span: Span::new(raws[first].span.start, raws[second].span.end),
            }),
            None => orphans.push((idx, first)),
        }
    }

    (fusions, orphans)
}

fn fuse(
    markdown: &str,
    raws: &[RawEntity],
    meas_parts: &[Option<MeasurementParts>],
    tables: &Tables,
    first: usize,
    second: usize,
) -> Option<(MeasurementParts, MeasurementParts)> {
    let between = &markdown[raws[first].span.end..raws[second].span.start];
    if !is_range_joiner(between) {
        return None;
    }

    let p1 = meas_parts[first].clone()?;
    let p2 = meas_parts[second].clone()?;

    if p1.category == p2.category {
        return Some((p1, p2));
    }
    // A bare first endpoint inherits the second endpoint's unit
    // (`30-37 inches`: the 30 is inches too).
    if p1.category == MeasurementCategory::Count && !p2.unit.is_empty() {
        let promoted = with_unit(p1.value, &p2.unit, tables)?;
        return Some((promoted, p2));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::StructuredRegexSet;
    use crate::normalize::measurement::parse_measurement;
    use crate::tables::tests::test_tables;

    fn scan(text: &str) -> (Vec<RawEntity>, Vec<Option<MeasurementParts>>) {
        let tables = test_tables();
        let (raws, _) = StructuredRegexSet::build(&tables).unwrap().scan(text, None);
        let parts = raws
            .iter()
            .map(|r| {
                (r.kind == EntityKind::Measurement)
                    .then(|| parse_measurement(&r.text, &tables))
                    .flatten()
            })
            .collect();
        (raws, parts)
    }

    #[test]
    fn hyphen_range_back_propagates_unit() {
        let tables = test_tables();
        let (raws, parts) = scan("30-37 inches");
        let (fusions, orphans) = find_range_fusions("30-37 inches", &raws, &parts, &tables);
        assert!(orphans.is_empty());
        assert_eq!(fusions.len(), 1);
        let f = &fusions[0];
        assert_eq!(f.start_parts.si_value, 0.762);
        assert_eq!(f.end_parts.si_value, 0.9398);
        assert_eq!(f.start_parts.unit, "in");
        assert_eq!(f.span, Span::new(0, 12));
    }

    #[test]
    fn worded_joiners_validate() {
        let tables = test_tables();
        let text = "from 10 to 20 cm wide";
        let (raws, parts) = scan(text);
        let (fusions, _) = find_range_fusions(text, &raws, &parts, &tables);
        assert_eq!(fusions.len(), 1);
        assert_eq!(fusions[0].end_parts.si_value, 0.2);
    }

    #[test]
    fn mismatched_categories_refuse_to_fuse() {
        let tables = test_tables();
        let text = "5 lbs to 3 cm";
        let (raws, parts) = scan(text);
        let (fusions, orphans) = find_range_fusions(text, &raws, &parts, &tables);
        assert!(fusions.is_empty());
        assert_eq!(orphans.len(), 1);
    }
}
