//! Calibration laws: uncalibrated number → engineering number, and the
//! inverse used when a value is supplied in engineering units.
use alloc::vec::Vec;

use crate::conf::POLYNOMIAL_INVERSION_MAX_ITERATIONS;
use crate::error::CalibrationError;
use crate::schema::{Calibrator, PolynomialTerm, SplinePoint};

/// Apply `calibrator` to an uncalibrated value.
pub fn calibrate(calibrator: &Calibrator, x: f64) -> Result<f64, CalibrationError> {
    match calibrator {
        Calibrator::Polynomial { terms } => Ok(polynomial(terms, x)),
        Calibrator::Spline {
            order,
            extrapolate,
            points,
        } => {
            let points = sorted(points, |p| p.raw);
            spline(&points, *order, *extrapolate, x, |p| (p.raw, p.calibrated))
        }
        Calibrator::MathOperation { .. } => Err(CalibrationError::Unsupported {
            kind: "MathOperation",
        }),
    }
}

/// Find the uncalibrated value that `calibrator` maps onto `y`.
pub fn uncalibrate(calibrator: &Calibrator, y: f64) -> Result<f64, CalibrationError> {
    match calibrator {
        Calibrator::Polynomial { terms } => invert_polynomial(terms, y),
        Calibrator::Spline {
            order,
            extrapolate,
            points,
        } => {
            let points = sorted(points, |p| p.calibrated);
            spline(&points, *order, *extrapolate, y, |p| (p.calibrated, p.raw))
        }
        Calibrator::MathOperation { .. } => Err(CalibrationError::Unsupported {
            kind: "MathOperation",
        }),
    }
}

//==================================================================================POLYNOMIAL
fn polynomial(terms: &[PolynomialTerm], x: f64) -> f64 {
    terms
        .iter()
        .map(|t| t.coefficient * powi(x, t.exponent))
        .sum()
}

fn derivative(terms: &[PolynomialTerm], x: f64) -> f64 {
    terms
        .iter()
        .filter(|t| t.exponent > 0)
        .map(|t| t.coefficient * t.exponent as f64 * powi(x, t.exponent - 1))
        .sum()
}

fn invert_polynomial(terms: &[PolynomialTerm], y: f64) -> Result<f64, CalibrationError> {
    let degree = terms
        .iter()
        .filter(|t| t.coefficient != 0.0)
        .map(|t| t.exponent)
        .max()
        .unwrap_or(0);

    if degree <= 1 {
        let coefficient = |exp| {
            terms
                .iter()
                .filter(|t| t.exponent == exp)
                .map(|t| t.coefficient)
                .sum::<f64>()
        };
        let (a0, a1) = (coefficient(0), coefficient(1));
        if a1 == 0.0 {
            return Err(CalibrationError::NotInvertible { value: y });
        }
        return Ok((y - a0) / a1);
    }

    // Newton iteration starting from the calibrated value itself.
    let mut x = y;
    for _ in 0..POLYNOMIAL_INVERSION_MAX_ITERATIONS {
        let residual = polynomial(terms, x) - y;
        if abs(residual) <= 1e-9 * (1.0 + abs(y)) {
            return Ok(x);
        }
        let slope = derivative(terms, x);
        if slope == 0.0 {
            break;
        }
        x -= residual / slope;
    }
    Err(CalibrationError::NotInvertible { value: y })
}

//==================================================================================SPLINE
fn sorted(points: &[SplinePoint], key: impl Fn(&SplinePoint) -> f64) -> Vec<SplinePoint> {
    let mut points = points.to_vec();
    points.sort_by(|a, b| {
        key(a)
            .partial_cmp(&key(b))
            .unwrap_or(core::cmp::Ordering::Equal)
    });
    points
}

/// Evaluate a piecewise law. `axis` yields (input, output) for a point, so the
/// same walk serves both directions.
fn spline(
    points: &[SplinePoint],
    order: u32,
    extrapolate: bool,
    x: f64,
    axis: impl Fn(&SplinePoint) -> (f64, f64),
) -> Result<f64, CalibrationError> {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (axis(first), axis(last)),
        _ => return Err(CalibrationError::EmptySpline),
    };
    if (x < first.0 || x > last.0) && !extrapolate {
        return Err(CalibrationError::OutsideSpline { value: x });
    }
    if points.len() == 1 {
        return Ok(first.1);
    }

    if order == 0 {
        // Step law: output of the last point at or before `x`.
        let value = points
            .iter()
            .map(&axis)
            .take_while(|(input, _)| *input <= x)
            .last()
            .map_or(first.1, |(_, output)| output);
        return Ok(value);
    }

    let segment = points
        .windows(2)
        .map(|w| (axis(&w[0]), axis(&w[1])))
        .find(|(_, b)| x <= b.0)
        .or_else(|| {
            let n = points.len();
            Some((axis(&points[n - 2]), axis(&points[n - 1])))
        });
    match segment {
        Some(((x0, y0), (x1, y1))) if x1 != x0 => Ok(y0 + (x - x0) * (y1 - y0) / (x1 - x0)),
        Some(((_, y0), _)) => Ok(y0),
        None => Err(CalibrationError::EmptySpline),
    }
}

//==================================================================================FLOAT_HELPERS
pub(crate) fn abs(x: f64) -> f64 {
    if x < 0.0 {
        -x
    } else {
        x
    }
}

fn powi(x: f64, exponent: u32) -> f64 {
    let mut out = 1.0;
    for _ in 0..exponent {
        out *= x;
    }
    out
}
