//! Shape-preserving piecewise cubic kernels
//!
//! Both kernels are cubic Hermite splines and differ only in how the
//! derivative at each knot is chosen:
//! - Akima: locally weighted slopes, no overshoot on coarse grids
//! - PCHIP: Fritsch-Carlson monotone slopes, never leaves the data range
//!   between two knots

/// Which derivative estimate a spline is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Akima,
    Pchip,
}

impl Kernel {
    /// Build a spline through `(xs[i], ys[i])`
    ///
    /// `xs` must be strictly increasing and both slices the same length (>= 2).
    pub fn fit(self, xs: &[f64], ys: &[f64]) -> HermiteSpline {
        let slopes = match self {
            Kernel::Akima => akima_slopes(xs, ys),
            Kernel::Pchip => pchip_slopes(xs, ys),
        };
        HermiteSpline {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            slopes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HermiteSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    slopes: Vec<f64>,
}

impl HermiteSpline {
    /// Evaluate at `x`; outside the knot range the end segment is extended
    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let i = match self.xs.partition_point(|&knot| knot <= x) {
            0 => 0,
            p if p >= n => n - 2,
            p => p - 1,
        };

        let h = self.xs[i + 1] - self.xs[i];
        let t = (x - self.xs[i]) / h;
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        h00 * self.ys[i]
            + h10 * h * self.slopes[i]
            + h01 * self.ys[i + 1]
            + h11 * h * self.slopes[i + 1]
    }
}

fn secants(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    xs.windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| (y[1] - y[0]) / (x[1] - x[0]))
        .collect()
}

/// Akima derivatives, with the two virtual secants on each side
/// extrapolated linearly from the first/last real ones.
fn akima_slopes(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let inner = secants(xs, ys);
    if n == 2 {
        return vec![inner[0]; 2];
    }

    // m[k + 2] == inner[k]
    let mut m = vec![0.0; n + 3];
    m[2..n + 1].copy_from_slice(&inner);
    m[1] = 2.0 * m[2] - m[3];
    m[0] = 2.0 * m[1] - m[2];
    m[n + 1] = 2.0 * m[n] - m[n - 1];
    m[n + 2] = 2.0 * m[n + 1] - m[n];

    let dm: Vec<f64> = m.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let weight_floor = 1e-9 * dm.iter().cloned().fold(0.0, f64::max);

    (0..n)
        .map(|i| {
            let f1 = dm[i + 2];
            let f2 = dm[i];
            let f12 = f1 + f2;
            if f12 > weight_floor && f12 > 0.0 {
                (f1 * m[i + 1] + f2 * m[i + 2]) / f12
            } else {
                0.5 * (m[i + 1] + m[i + 2])
            }
        })
        .collect()
}

/// Fritsch-Carlson derivatives with the one-sided three-point end rule
fn pchip_slopes(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let delta = secants(xs, ys);
    if n == 2 {
        return vec![delta[0]; 2];
    }

    let mut d = vec![0.0; n];
    for k in 1..n - 1 {
        if delta[k - 1] * delta[k] <= 0.0 {
            d[k] = 0.0;
        } else {
            let w1 = 2.0 * h[k] + h[k - 1];
            let w2 = h[k] + 2.0 * h[k - 1];
            d[k] = (w1 + w2) / (w1 / delta[k - 1] + w2 / delta[k]);
        }
    }
    d[0] = pchip_end_slope(h[0], h[1], delta[0], delta[1]);
    d[n - 1] = pchip_end_slope(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);
    d
}

fn pchip_end_slope(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);
    if sign(d) != sign(m0) {
        0.0
    } else if sign(m0) != sign(m1) && d.abs() > 3.0 * m0.abs() {
        3.0 * m0
    } else {
        d
    }
}

// Unlike f64::signum, zero maps to zero.
fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}
