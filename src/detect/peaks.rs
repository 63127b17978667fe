use std::fmt;

use ndarray::ArrayView2;

#[derive(Debug)]
pub struct InvalidInputError;

impl fmt::Display for InvalidInputError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "peak search field is empty or contains no finite values")
    }
}

impl std::error::Error for InvalidInputError {}

/// Local maxima of a 2-D field, highest first.
///
/// A cell qualifies when it is finite, at least `threshold_abs`, and not
/// exceeded by any neighbor within a Chebyshev radius of `min_distance`
/// (non-finite neighbors are ignored). Qualifying cells are ranked by value
/// descending with ties broken by row-major index ascending, then thinned so
/// surviving peaks are more than `min_distance` apart (Euclidean), and
/// truncated to `max_count`. A constant field has no peaks. With
/// `exclude_border`, cells within `min_distance` of any edge are dropped.
pub fn find_peaks(
    field: ArrayView2<'_, f64>,
    min_distance: usize,
    max_count: usize,
    exclude_border: bool,
    threshold_abs: f64,
) -> Result<Vec<(usize, usize)>, InvalidInputError> {
    let (rows, cols) = field.dim();
    if rows == 0 || cols == 0 {
        return Err(InvalidInputError);
    }

    let mut finite = field.iter().filter(|v| v.is_finite());
    let Some(&first_finite) = finite.next() else {
        return Err(InvalidInputError);
    };

    // A flat field is all plateau, not peaks.
    if finite.all(|&v| v == first_finite) && field.iter().all(|v| v.is_finite()) {
        return Ok(Vec::new());
    }

    let d = min_distance as isize;
    let mut candidates: Vec<(usize, usize, f64)> = Vec::new();

    for i in 0..rows {
        for j in 0..cols {
            let v = field[[i, j]];
            if !v.is_finite() || v < threshold_abs {
                continue;
            }

            if exclude_border
                && (i < min_distance
                    || j < min_distance
                    || i + min_distance >= rows
                    || j + min_distance >= cols)
            {
                continue;
            }

            if is_window_maximum(&field, i as isize, j as isize, d, v) {
                candidates.push((i, j, v));
            }
        }
    }

    candidates.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .expect("candidate values are finite")
            .then_with(|| (a.0 * cols + a.1).cmp(&(b.0 * cols + b.1)))
    });

    let spacing_sq = (min_distance * min_distance) as f64;
    let mut peaks: Vec<(usize, usize)> = Vec::new();

    for (i, j, _) in candidates {
        let far_enough = peaks.iter().all(|&(pi, pj)| {
            let di = pi as f64 - i as f64;
            let dj = pj as f64 - j as f64;
            di * di + dj * dj > spacing_sq
        });

        if far_enough {
            peaks.push((i, j));
            if peaks.len() == max_count {
                break;
            }
        }
    }

    Ok(peaks)
}

fn is_window_maximum(
    field: &ArrayView2<'_, f64>,
    i: isize,
    j: isize,
    d: isize,
    v: f64,
) -> bool {
    let (rows, cols) = field.dim();

    for ni in (i - d).max(0)..=(i + d).min(rows as isize - 1) {
        for nj in (j - d).max(0)..=(j + d).min(cols as isize - 1) {
            if ni == i && nj == j {
                continue;
            }
            let n = field[[ni as usize, nj as usize]];
            if n.is_finite() && n > v {
                return false;
            }
        }
    }

    true
}
