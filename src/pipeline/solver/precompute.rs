//! Statistics for every contiguous run of prebins
//!
//! The MIP objective needs the IV of each candidate merged bin. Cumulative
//! sums give all of them in O(n^2).

use super::super::binning::{woe_iv, Bin};

/// Candidate bin formed by merging prebins `start..=end`
#[derive(Debug, Clone)]
pub struct CandidateBin {
    pub start: usize,
    pub end: usize,
    pub events: f64,
    pub non_events: f64,
    pub count: f64,
    pub woe: f64,
    pub iv: f64,
}

/// Upper-triangular matrix; `matrix[i][j - i]` is the merge of prebins i..=j
#[allow(clippy::needless_range_loop)]
pub fn candidate_matrix(
    prebins: &[Bin],
    total_events: f64,
    total_non_events: f64,
    smoothing: f64,
) -> Vec<Vec<CandidateBin>> {
    let n = prebins.len();
    let mut matrix = Vec::with_capacity(n);

    for i in 0..n {
        let mut row = Vec::with_capacity(n - i);
        let mut events = 0.0;
        let mut non_events = 0.0;

        for j in i..n {
            events += prebins[j].events;
            non_events += prebins[j].non_events;
            let (woe, iv) = woe_iv(events, non_events, total_events, total_non_events, smoothing);

            row.push(CandidateBin {
                start: i,
                end: j,
                events,
                non_events,
                count: events + non_events,
                woe,
                iv,
            });
        }
        matrix.push(row);
    }

    matrix
}

#[inline]
pub fn candidate(matrix: &[Vec<CandidateBin>], start: usize, end: usize) -> &CandidateBin {
    &matrix[start][end - start]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::binning::BinRange;

    #[test]
    fn test_candidate_matrix_accumulates() {
        let prebins = vec![
            Bin::new(BinRange::Missing, 1.0, 9.0),
            Bin::new(BinRange::Missing, 5.0, 5.0),
            Bin::new(BinRange::Missing, 9.0, 1.0),
        ];
        let matrix = candidate_matrix(&prebins, 15.0, 15.0, 0.5);

        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix[0].len(), 3);
        assert_eq!(matrix[2].len(), 1);

        let whole = candidate(&matrix, 0, 2);
        assert_eq!(whole.events, 15.0);
        assert_eq!(whole.count, 30.0);
        assert!(whole.iv.abs() < 1e-12);

        let first = candidate(&matrix, 0, 0);
        assert!(first.woe < 0.0);
        assert!(candidate(&matrix, 2, 2).woe > 0.0);
    }
}
