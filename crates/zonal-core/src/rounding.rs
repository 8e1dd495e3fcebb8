//! Directed rounding on binary64 built from error-free transformations.
//!
//! The host keeps round-to-nearest. Each helper computes the nearest result,
//! recovers the exact rounding error (`two_sum`, fused multiply-add) and only
//! steps one ulp outward when the nearest result lies on the wrong side of the
//! exact value. Exact results are therefore returned untouched.

/// Smallest representable value strictly greater than `x`.
pub fn next_up(x: f64) -> f64 {
    if x.is_nan() || x == f64::INFINITY {
        return x;
    }
    if x == 0.0 {
        return f64::from_bits(1);
    }
    let bits = x.to_bits();
    if x > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

/// Largest representable value strictly smaller than `x`.
pub fn next_down(x: f64) -> f64 {
    -next_up(-x)
}

/// Steps `x` outward by `ulps` representable values toward `+inf`.
pub fn widen_up(mut x: f64, ulps: u32) -> f64 {
    for _ in 0..ulps {
        x = next_up(x);
    }
    x
}

/// Steps `x` outward by `ulps` representable values toward `-inf`.
pub fn widen_down(mut x: f64, ulps: u32) -> f64 {
    for _ in 0..ulps {
        x = next_down(x);
    }
    x
}

/// Knuth's branch-free sum: `a + b == sum + err` exactly.
pub fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let sum = a + b;
    let shifted = sum - a;
    let err = (a - (sum - shifted)) + (b - shifted);
    (sum, err)
}

/// Exact product split: `a * b == product + err`.
pub fn two_prod(a: f64, b: f64) -> (f64, f64) {
    let product = a * b;
    let err = a.mul_add(b, -product);
    (product, err)
}

fn overflow_guard(value: f64, a: f64, b: f64, upward: bool) -> Option<f64> {
    if value.is_finite() {
        return None;
    }
    if value.is_nan() || !a.is_finite() || !b.is_finite() {
        return Some(value);
    }
    // Finite operands overflowed; the exact result is finite.
    Some(match (upward, value > 0.0) {
        (true, true) => value,
        (true, false) => -f64::MAX,
        (false, true) => f64::MAX,
        (false, false) => value,
    })
}

/// `a + b` rounded toward `+inf`.
pub fn add_up(a: f64, b: f64) -> f64 {
    let (sum, err) = two_sum(a, b);
    if let Some(v) = overflow_guard(sum, a, b, true) {
        return v;
    }
    if err > 0.0 {
        next_up(sum)
    } else {
        sum
    }
}

/// `a + b` rounded toward `-inf`.
pub fn add_down(a: f64, b: f64) -> f64 {
    let (sum, err) = two_sum(a, b);
    if let Some(v) = overflow_guard(sum, a, b, false) {
        return v;
    }
    if err < 0.0 {
        next_down(sum)
    } else {
        sum
    }
}

/// `a - b` rounded toward `+inf`.
pub fn sub_up(a: f64, b: f64) -> f64 {
    add_up(a, -b)
}

/// `a - b` rounded toward `-inf`.
pub fn sub_down(a: f64, b: f64) -> f64 {
    add_down(a, -b)
}

/// `a * b` rounded toward `+inf`.
pub fn mul_up(a: f64, b: f64) -> f64 {
    let (product, err) = two_prod(a, b);
    if let Some(v) = overflow_guard(product, a, b, true) {
        return v;
    }
    if err > 0.0 || !err.is_finite() {
        next_up(product)
    } else {
        product
    }
}

/// `a * b` rounded toward `-inf`.
pub fn mul_down(a: f64, b: f64) -> f64 {
    let (product, err) = two_prod(a, b);
    if let Some(v) = overflow_guard(product, a, b, false) {
        return v;
    }
    if err < 0.0 || !err.is_finite() {
        next_down(product)
    } else {
        product
    }
}

/// `a / b` rounded toward `+inf`.
pub fn div_up(a: f64, b: f64) -> f64 {
    let quotient = a / b;
    if let Some(v) = overflow_guard(quotient, a, b, true) {
        return v;
    }
    let remainder = (-quotient).mul_add(b, a);
    if !remainder.is_finite() {
        return next_up(quotient);
    }
    if remainder != 0.0 && (remainder > 0.0) == (b > 0.0) {
        next_up(quotient)
    } else {
        quotient
    }
}

/// `a / b` rounded toward `-inf`.
pub fn div_down(a: f64, b: f64) -> f64 {
    -div_up(-a, b)
}

/// `sqrt(a)` rounded toward `+inf`, for `a >= 0`.
pub fn sqrt_up(a: f64) -> f64 {
    let root = a.sqrt();
    if !root.is_finite() {
        return root;
    }
    let remainder = (-root).mul_add(root, a);
    if remainder > 0.0 {
        next_up(root)
    } else {
        root
    }
}

/// `sqrt(a)` rounded toward `-inf`, for `a >= 0`.
pub fn sqrt_down(a: f64) -> f64 {
    let root = a.sqrt();
    if !root.is_finite() {
        return root;
    }
    let remainder = (-root).mul_add(root, a);
    if remainder < 0.0 {
        next_down(root).max(0.0)
    } else {
        root
    }
}

/// Sum of magnitudes rounded toward `+inf`.
pub fn abs_sum_up(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().fold(0.0, |acc, v| add_up(acc, v.abs()))
}
