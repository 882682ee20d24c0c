//! Dense linear algebra for small regression problems
//!
//! The additive forecasting model has at most a few dozen coefficients, so the
//! normal equations are formed explicitly and solved with Gaussian elimination.

use crate::{MathError, Result};

/// Pivots smaller than this (relative to the largest diagonal entry) are treated as zero
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Solve the square system `a * x = b` using Gaussian elimination with partial pivoting
pub fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(format!(
            "Expected a {n}x{n} matrix to match the right-hand side"
        )));
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let scale = a
        .iter()
        .enumerate()
        .map(|(i, row)| row[i].abs())
        .fold(0.0_f64, f64::max)
        .max(1.0);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);

        if a[pivot_row][col].abs() < SINGULAR_TOLERANCE * scale {
            return Err(MathError::CalculationError(format!(
                "Matrix is singular at column {col}"
            )));
        }

        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(MathError::CalculationError(
            "Solution contains non-finite values".to_string(),
        ));
    }

    Ok(x)
}

/// Penalised least squares
///
/// Minimises `||X w - y||^2 + sum_j penalties[j] * w[j]^2` where each row of
/// `design` is one observation. A zero penalty leaves the coefficient
/// unregularised.
pub fn ridge_least_squares(
    design: &[Vec<f64>],
    target: &[f64],
    penalties: &[f64],
) -> Result<Vec<f64>> {
    if design.len() != target.len() {
        return Err(MathError::InvalidInput(format!(
            "Design has {} rows but target has {} values",
            design.len(),
            target.len()
        )));
    }
    if design.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot fit a regression without observations".to_string(),
        ));
    }

    let p = penalties.len();
    if design.iter().any(|row| row.len() != p) {
        return Err(MathError::InvalidInput(format!(
            "Every design row must have {p} columns"
        )));
    }

    let mut gram = vec![vec![0.0; p]; p];
    let mut moment = vec![0.0; p];

    for (row, &y) in design.iter().zip(target) {
        for i in 0..p {
            if row[i] == 0.0 {
                continue;
            }
            moment[i] += row[i] * y;
            for j in i..p {
                gram[i][j] += row[i] * row[j];
            }
        }
    }

    for i in 0..p {
        for j in 0..i {
            gram[i][j] = gram[j][i];
        }
        gram[i][i] += penalties[i];
    }

    solve(gram, moment)
}

/// Evaluate a fitted linear model on one design row
pub fn dot(row: &[f64], coefficients: &[f64]) -> f64 {
    row.iter().zip(coefficients).map(|(x, w)| x * w).sum()
}
