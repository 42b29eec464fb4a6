use crate::services::rows::{BucketMarks, Row};

/// Marks the first and last visible row of every solved-count bucket.
///
/// Buckets are scanned over the whole collection in display order, so
/// `first` and `last` need not be adjacent if ranking interleaves buckets.
pub fn mark_boundaries<H>(rows: &mut [Row<H>], problem_count: usize) {
    for row in rows.iter_mut() {
        row.bucket = BucketMarks::default();
    }

    for solved in 0..=problem_count {
        let in_bucket = |row: &Row<H>| row.is_visible() && row.solved_count == solved;
        let Some(first) = rows.iter().position(in_bucket) else {
            continue;
        };
        // position found one, so rposition cannot miss
        let last = rows.iter().rposition(in_bucket).unwrap_or(first);

        rows[first].bucket.first = true;
        rows[first].bucket.label = Some(solved.to_string());
        rows[last].bucket.last = true;
    }
}
