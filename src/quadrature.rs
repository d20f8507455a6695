//! Gauss quadrature rules on the reference domains [-1, 1] and [-1, 1]².
use nalgebra::Point2;
use std::f64::consts::PI;

pub type QuadraturePair1d = (Vec<f64>, Vec<f64>);
pub type QuadraturePair2d = (Vec<f64>, Vec<Point2<f64>>);

/// Evaluates the Legendre polynomial of degree `n` and its derivative at `x`
/// through the three-term recurrence.
fn legendre_value_and_derivative(n: usize, x: f64) -> (f64, f64) {
    let mut p_prev = 1.0;
    let mut p = x;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=n {
        let k = k as f64;
        let p_next = ((2.0 * k - 1.0) * x * p - (k - 1.0) * p_prev) / k;
        p_prev = p;
        p = p_next;
    }
    let dp = (n as f64) * (x * p - p_prev) / (x * x - 1.0);
    (p, dp)
}

/// Creates a Gauss quadrature rule on [-1, 1] with the given number of points.
///
/// The rule integrates polynomials up to degree `2 * num_points - 1` exactly.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss(num_points: usize) -> QuadraturePair1d {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    let m = (n + 1) / 2;
    let mut points = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);

    // Only find the first m roots. The remaining roots follow by symmetry.
    for i in 0..m {
        // Fairly accurate initial guess, then Newton's method
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let (mut p, mut dp) = legendre_value_and_derivative(n, x);
        loop {
            let dx = -p / dp;
            x += dx;
            let (p_new, dp_new) = legendre_value_and_derivative(n, x);
            p = p_new;
            dp = dp_new;
            if dx.abs() <= 1e-15 {
                break;
            }
        }

        let w = 2.0 / ((1.0 - x * x) * dp * dp);
        points.push(x);
        weights.push(w);
    }

    for i in m..n {
        let mirror_idx = n - i - 1;
        points.push(-points[mirror_idx]);
        weights.push(weights[mirror_idx]);
    }

    assert_eq!(points.len(), n);
    (weights, points)
}

/// Creates a tensor-product Gauss rule on [-1, 1]² with
/// `num_points_per_dim`² points.
pub fn tensor_quad(num_points_per_dim: usize) -> QuadraturePair2d {
    let (weights_1d, points_1d) = gauss(num_points_per_dim);

    let n = num_points_per_dim;
    let mut weights = Vec::with_capacity(n * n);
    let mut points = Vec::with_capacity(n * n);
    for j in 0..n {
        for i in 0..n {
            weights.push(weights_1d[i] * weights_1d[j]);
            points.push(Point2::new(points_1d[i], points_1d[j]));
        }
    }
    (weights, points)
}
