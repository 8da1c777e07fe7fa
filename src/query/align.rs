//! Series alignment utilities
//!
//! Ordered-array search and pairwise, timestamp-aligned merging of two
//! series. Both operate on ascending-timestamp slices; neither allocates
//! beyond its output.

use crate::series::SamplePoint;

/// Locate a sample by exact timestamp
///
/// Standard binary search over the ascending `datapoints` slice: `Ok(index)`
/// on an exact hit, `Err(insertion_point)` otherwise. Delta-over-interval
/// uses the exact-hit case only; no interpolation happens here.
pub fn find_index(points: &[SamplePoint], timestamp: i64) -> Result<usize, usize> {
    points.binary_search_by_key(&timestamp, |point| point.timestamp)
}

/// Convenience wrapper returning the sample on an exact-timestamp hit
pub fn find_at(points: &[SamplePoint], timestamp: i64) -> Option<&SamplePoint> {
    find_index(points, timestamp).ok().map(|index| &points[index])
}

/// Merge two time-ordered series, summing values at shared timestamps
///
/// Single two-pointer pass, O(n+m). A timestamp present in exactly one
/// input passes through unchanged. A timestamp present in both emits the
/// sum of the two values, treating a null on one side as 0, unless both
/// sides are null, in which case the point is dropped.
pub fn merge_sum(a: &[SamplePoint], b: &[SamplePoint]) -> Vec<SamplePoint> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let mut i = 0;
    let mut j = 0;

    while i < a.len() && j < b.len() {
        let left = a[i];
        let right = b[j];
        if left.timestamp < right.timestamp {
            merged.push(left);
            i += 1;
        } else if right.timestamp < left.timestamp {
            merged.push(right);
            j += 1;
        } else {
            if left.value.is_some() || right.value.is_some() {
                let sum = left.value.unwrap_or(0.0) + right.value.unwrap_or(0.0);
                merged.push(SamplePoint::new(Some(sum), left.timestamp));
            }
            i += 1;
            j += 1;
        }
    }

    merged.extend_from_slice(&a[i..]);
    merged.extend_from_slice(&b[j..]);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(values: &[(Option<f64>, i64)]) -> Vec<SamplePoint> {
        values
            .iter()
            .map(|&(value, timestamp)| SamplePoint::new(value, timestamp))
            .collect()
    }

    #[test]
    fn test_find_index_exact_and_missing() {
        let series = points(&[(Some(1.0), 1000), (Some(2.0), 2000), (Some(3.0), 3000)]);

        assert_eq!(find_index(&series, 2000), Ok(1));
        assert_eq!(find_index(&series, 1500), Err(1));
        assert_eq!(find_index(&series, 500), Err(0));
        assert_eq!(find_index(&series, 4000), Err(3));
    }

    #[test]
    fn test_find_at() {
        let series = points(&[(Some(1.0), 1000), (None, 2000)]);

        assert_eq!(find_at(&series, 2000), Some(&SamplePoint::new(None, 2000)));
        assert_eq!(find_at(&series, 1500), None);
    }

    #[test]
    fn test_merge_sum_matched_and_unmatched() {
        let a = points(&[(Some(1.0), 1000), (Some(2.0), 2000)]);
        let b = points(&[(Some(10.0), 1000), (Some(20.0), 3000)]);

        assert_eq!(
            merge_sum(&a, &b),
            points(&[(Some(11.0), 1000), (Some(2.0), 2000), (Some(20.0), 3000)])
        );
    }

    #[test]
    fn test_merge_sum_interleaved() {
        // acc:  1     3     10   12
        // curr: 1  2  3  4  10   12
        let a = points(&[(Some(1.0), 1), (Some(3.0), 3), (Some(10.0), 10), (Some(12.0), 12)]);
        let b = points(&[
            (Some(1.0), 1),
            (Some(2.0), 2),
            (Some(3.0), 3),
            (Some(4.0), 4),
            (Some(10.0), 10),
            (Some(12.0), 12),
        ]);

        assert_eq!(
            merge_sum(&a, &b),
            points(&[
                (Some(2.0), 1),
                (Some(2.0), 2),
                (Some(6.0), 3),
                (Some(4.0), 4),
                (Some(20.0), 10),
                (Some(24.0), 12),
            ])
        );
    }

    #[test]
    fn test_merge_sum_null_handling() {
        let a = points(&[(None, 1000), (Some(5.0), 2000), (None, 3000)]);
        let b = points(&[(Some(1.0), 1000), (None, 2000), (None, 3000)]);

        // One-sided null counts as zero; double null is dropped.
        assert_eq!(
            merge_sum(&a, &b),
            points(&[(Some(1.0), 1000), (Some(5.0), 2000)])
        );
    }

    #[test]
    fn test_merge_sum_empty_side_passes_through() {
        let a = points(&[(Some(1.0), 1000)]);
        assert_eq!(merge_sum(&a, &[]), a);
        assert_eq!(merge_sum(&[], &a), a);
    }
}
