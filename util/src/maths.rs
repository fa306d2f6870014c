//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

/// Clamp a value into the inclusive range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T 
where
    T: Float
{
    if value > max {
        max
    }
    else if value < min {
        min
    }
    else {
        value
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Get the signed angular distance from `a` to `b` in degrees.
///
/// The result is the shortest rotation taking `a` onto `b`, in the range
/// `(-180, 180]`, positive for a clockwise (compass increasing) rotation.
pub fn get_ang_dist_360<T>(a: T, b: T) -> T
where
    T: Float
{
    let full = T::from(360.0).unwrap_or_else(T::zero);
    let half = T::from(180.0).unwrap_or_else(T::zero);

    let d = rem_euclid(b - a, full);

    if d > half {
        d - full
    }
    else {
        d
    }
}

/// Arithmetic mean of the given values, `None` if there are none.
pub fn mean<T, I>(values: I) -> Option<T>
where
    T: Float,
    I: IntoIterator<Item = T>
{
    let (sum, count) = values
        .into_iter()
        .fold((T::zero(), 0usize), |(s, c), v| (s + v, c + 1));

    if count == 0 {
        None
    }
    else {
        T::from(count).map(|n| sum / n)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_ang_dist_360() {
        assert_eq!(get_ang_dist_360(10f64, 20f64), 10f64);
        assert_eq!(get_ang_dist_360(20f64, 10f64), -10f64);
        assert_eq!(get_ang_dist_360(350f64, 10f64), 20f64);
        assert_eq!(get_ang_dist_360(10f64, 350f64), -20f64);
        assert_eq!(get_ang_dist_360(0f64, 180f64), 180f64);
        assert_eq!(get_ang_dist_360(0f64, 360f64), 0f64);
    }

    #[test]
    fn test_clamp_and_map() {
        assert_eq!(clamp(150f64, -100f64, 100f64), 100f64);
        assert_eq!(clamp(-150f64, -100f64, 100f64), -100f64);
        assert_eq!(clamp(12f64, -100f64, 100f64), 12f64);

        assert_eq!(lin_map((0f64, 10f64), (0f64, 100f64), 2.5), 25f64);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(vec![40f64, 10f64]), Some(25f64));
        assert_eq!(mean(Vec::<f64>::new()), None);
    }
}
