//! Exact rational helpers.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

/// Formats a rational the way models write them: integers as `12`,
/// terminating fractions as decimals (`0.46`), everything else as `n/d`.
pub fn format_rational(value: &BigRational) -> String {
    if value.is_integer() {
        return value.numer().to_string();
    }
    let denom = value.denom().clone();
    let mut rest = denom.clone();
    let two = BigInt::from(2);
    let five = BigInt::from(5);
    let (mut twos, mut fives) = (0u32, 0u32);
    while (&rest % &two).is_zero() {
        rest /= &two;
        twos += 1;
    }
    while (&rest % &five).is_zero() {
        rest /= &five;
        fives += 1;
    }
    if !rest.is_one() {
        return format!("{}/{}", value.numer(), denom);
    }
    let digits = twos.max(fives);
    let scale = num_traits::pow(BigInt::from(10), digits as usize);
    let scaled = value.numer() * (&scale / &denom);
    let negative = scaled.is_negative();
    let text = scaled.abs().to_string();
    let width = digits as usize;
    let padded = if text.len() <= width {
        format!("{}{}", "0".repeat(width - text.len() + 1), text)
    } else {
        text
    };
    let (whole, fraction) = padded.split_at(padded.len() - width);
    format!("{}{}.{}", if negative { "-" } else { "" }, whole, fraction)
}

/// Parses `12`, `-0.25` or `3/7`.
pub fn parse_rational(text: &str) -> Option<BigRational> {
    let text = text.trim();
    if let Some((numer, denom)) = text.split_once('/') {
        let numer: BigInt = numer.trim().parse().ok()?;
        let denom: BigInt = denom.trim().parse().ok()?;
        if denom.is_zero() {
            return None;
        }
        return Some(BigRational::new(numer, denom));
    }
    match text.split_once('.') {
        Some((whole, fraction)) => {
            let negative = whole.starts_with('-');
            let digits = format!("{}{}", whole.trim_start_matches('-'), fraction);
            let magnitude: BigInt = digits.parse().ok()?;
            let scale = num_traits::pow(BigInt::from(10), fraction.len());
            let value = BigRational::new(magnitude, scale);
            Some(if negative { -value } else { value })
        }
        None => text.parse::<BigInt>().ok().map(BigRational::from_integer),
    }
}

/// Integer power with a possibly negative exponent. `None` for `0 ^ -k`.
pub fn pow_rational(base: &BigRational, exponent: &BigInt) -> Option<BigRational> {
    if exponent.is_zero() {
        return Some(BigRational::one());
    }
    let magnitude = exponent.abs().to_u64()?;
    let mut result = BigRational::one();
    let mut square = base.clone();
    let mut remaining = magnitude;
    while remaining > 0 {
        if remaining & 1 == 1 {
            result *= &square;
        }
        remaining >>= 1;
        if remaining > 0 {
            square = &square * &square;
        }
    }
    if exponent.is_negative() {
        if result.is_zero() {
            return None;
        }
        result = result.recip();
    }
    Some(result)
}

/// Rounds half away from zero to `places` decimal digits.
pub fn round_to_decimal_places(value: &BigRational, places: u32) -> BigRational {
    let scale = BigRational::from_integer(num_traits::pow(BigInt::from(10), places as usize));
    (value * &scale).round() / scale
}

/// Rounds half away from zero to `digits` significant decimal digits. No
/// value other than zero rounds to zero.
pub fn round_to_significant_digits(value: &BigRational, digits: u32) -> BigRational {
    if value.is_zero() || digits == 0 {
        return value.clone();
    }
    let magnitude = value.abs();
    let bits = magnitude.numer().bits() as f64 - magnitude.denom().bits() as f64;
    // within one of floor(log10 |value|)
    let mut exponent = (bits * std::f64::consts::LOG10_2).floor() as i64;
    while power_of_ten(exponent) > magnitude {
        exponent -= 1;
    }
    while power_of_ten(exponent + 1) <= magnitude {
        exponent += 1;
    }
    let scale = power_of_ten(i64::from(digits) - 1 - exponent);
    (value * &scale).round() / scale
}

fn power_of_ten(exponent: i64) -> BigRational {
    let magnitude = num_traits::pow(BigInt::from(10), exponent.unsigned_abs() as usize);
    if exponent < 0 {
        BigRational::new(BigInt::one(), magnitude)
    } else {
        BigRational::from_integer(magnitude)
    }
}
