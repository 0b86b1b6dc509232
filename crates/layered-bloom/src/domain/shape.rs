//! Bloom filter shape: the `(k, m)` pair and its closed-form calculus
//!
//! Formulas:
//! - p = (1 - e^(-kn/m))^k          -- false positive probability
//! - m = ceil(-n*ln(p) / (ln(2)^2)) -- bits for a target probability
//! - k = round((m/n) * ln(2))       -- hash functions for a given load
//! - n = -(m/k) * ln(1 - c/m)       -- items estimated from `c` set bits
//!
//! A `Shape` is only obtainable through the validating constructors, so every
//! value in circulation satisfies `k >= 1` and `1 <= m <= i32::MAX`.

use std::f64::consts::LN_2;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::bit_maps;
use crate::error::FilterError;

/// ln(1 / 2^ln(2)), the denominator of the bit count derivation.
const DENOMINATOR: f64 = -(LN_2 * LN_2);

/// The `(k, m)` parameters governing a Bloom filter.
///
/// Equality and hashing consider the number of bits first, then the number of
/// hash functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ShapeParams", into = "ShapeParams")]
pub struct Shape {
    /// Number of hash functions (k)
    num_hashes: i32,
    /// Number of bits (m)
    num_bits: i32,
}

/// Unvalidated wire form of a [`Shape`].
#[derive(Serialize, Deserialize)]
struct ShapeParams {
    num_hashes: i32,
    num_bits: i32,
}

impl TryFrom<ShapeParams> for Shape {
    type Error = FilterError;

    fn try_from(params: ShapeParams) -> Result<Self, Self::Error> {
        Shape::from_km(params.num_hashes, params.num_bits)
    }
}

impl From<Shape> for ShapeParams {
    fn from(shape: Shape) -> Self {
        Self {
            num_hashes: shape.num_hashes,
            num_bits: shape.num_bits,
        }
    }
}

impl Shape {
    /// Create a shape directly from the number of hash functions and bits.
    ///
    /// # Errors
    /// `InvalidParameter` if `k < 1` or `m < 1`.
    pub fn from_km(num_hashes: i32, num_bits: i32) -> Result<Self, FilterError> {
        check_number_of_hash_functions(num_hashes)?;
        check_number_of_bits(num_bits)?;
        Ok(Self {
            num_hashes,
            num_bits,
        })
    }

    /// Create a shape for `n` expected items in `m` bits.
    ///
    /// The number of hash functions is `round((m/n) * ln 2)`.
    ///
    /// # Errors
    /// `InvalidParameter` if `n < 1`, `m < 1`, the derived `k` is below 1 (the
    /// filter is too small for the load) or the resulting probability is 1.
    pub fn from_nm(num_items: i32, num_bits: i32) -> Result<Self, FilterError> {
        check_number_of_items(num_items)?;
        check_number_of_bits(num_bits)?;
        let num_hashes = calculate_number_of_hash_functions(num_items, num_bits)?;
        let shape = Self {
            num_hashes,
            num_bits,
        };
        check_calculated_probability(shape.probability(num_items)?)?;
        Ok(shape)
    }

    /// Create a shape from all three of `n`, `m` and `k`.
    ///
    /// # Errors
    /// `InvalidParameter` if any value is below 1 or the combination
    /// guarantees saturation (probability of 1 at `n` items).
    pub fn from_nmk(num_items: i32, num_bits: i32, num_hashes: i32) -> Result<Self, FilterError> {
        check_number_of_items(num_items)?;
        check_number_of_bits(num_bits)?;
        check_number_of_hash_functions(num_hashes)?;
        let shape = Self {
            num_hashes,
            num_bits,
        };
        check_calculated_probability(shape.probability(num_items)?)?;
        Ok(shape)
    }

    /// Create the smallest shape holding `n` items at false positive
    /// probability `p`.
    ///
    /// # Errors
    /// `InvalidParameter` if `n < 1`, `p` is not finite or not in `(0, 1)`, or
    /// the derived bit count does not fit in an `i32`.
    pub fn from_np(num_items: i32, probability: f64) -> Result<Self, FilterError> {
        check_number_of_items(num_items)?;
        check_probability(probability)?;

        let m = (f64::from(num_items) * probability.ln() / DENOMINATOR).ceil();
        if m > f64::from(i32::MAX) {
            return Err(FilterError::invalid_parameter(format!(
                "Resulting filter has more than {} bits: {m}",
                i32::MAX
            )));
        }
        let num_bits = m as i32;
        let num_hashes = calculate_number_of_hash_functions(num_items, num_bits)?;
        let shape = Self {
            num_hashes,
            num_bits,
        };
        check_calculated_probability(shape.probability(num_items)?)?;
        Ok(shape)
    }

    /// Create a shape from a target probability, bits and hash functions.
    ///
    /// The number of items reaching `p` is derived as
    /// `n = ceil(m / (-k / ln(1 - e^(ln(p)/k))))` and the shape is rejected
    /// when that load already saturates it.
    ///
    /// # Errors
    /// `InvalidParameter` if `m < 1`, `k < 1`, `p` is not in `(0, 1)` or the
    /// probability at the derived load rounds to 1.
    pub fn from_pmk(probability: f64, num_bits: i32, num_hashes: i32) -> Result<Self, FilterError> {
        check_number_of_bits(num_bits)?;
        check_number_of_hash_functions(num_hashes)?;
        check_probability(probability)?;

        let k = f64::from(num_hashes);
        let n = (f64::from(num_bits) / (-k / (-(probability.ln() / k).exp_m1()).ln())).ceil();

        let shape = Self {
            num_hashes,
            num_bits,
        };
        // Saturating cast: a load beyond i32::MAX is evaluated at i32::MAX.
        check_calculated_probability(shape.probability(n as i32)?)?;
        Ok(shape)
    }

    /// Number of hash functions (k).
    pub fn num_hashes(&self) -> i32 {
        self.num_hashes
    }

    /// Number of bits (m).
    pub fn num_bits(&self) -> i32 {
        self.num_bits
    }

    /// Number of 64-bit words needed to hold `m` bits.
    pub fn num_words(&self) -> usize {
        bit_maps::number_of_bit_maps(self.num_bits)
    }

    /// False positive probability after `n` items: `(1 - e^(-kn/m))^k`.
    ///
    /// # Errors
    /// `InvalidParameter` if `n` is negative.
    pub fn probability(&self, num_items: i32) -> Result<f64, FilterError> {
        if num_items < 0 {
            return Err(FilterError::invalid_parameter(format!(
                "Number of items must be greater than or equal to 0: {num_items}"
            )));
        }
        if num_items == 0 {
            return Ok(0.0);
        }
        let k = f64::from(self.num_hashes);
        let exponent = -k * f64::from(num_items) / f64::from(self.num_bits);
        Ok((-exponent.exp_m1()).powf(k))
    }

    /// Estimate the number of items merged given `c` set bits.
    ///
    /// Returns `+inf` when `c == m` (saturated) and `NaN` when `c` lies outside
    /// `[0, m]`, which can only come from a corrupt cardinality.
    pub fn estimate_n(&self, cardinality: i32) -> f64 {
        if cardinality == self.num_bits {
            return f64::INFINITY;
        }
        if cardinality < 0 {
            return f64::NAN;
        }
        let m = f64::from(self.num_bits);
        -(m / f64::from(self.num_hashes)) * (-f64::from(cardinality) / m).ln_1p()
    }

    /// Estimated item count at which the filter reaches its optimal load.
    pub fn estimate_max_n(&self) -> f64 {
        f64::from(self.num_bits) * LN_2 / f64::from(self.num_hashes)
    }

    /// True when `n` indices stored as 4-byte integers cost no more than the
    /// dense bitmap: `n * 4 <= ceil(m / 64) * 8`.
    pub fn is_sparse(&self, cardinality: i32) -> bool {
        i64::from(cardinality) <= self.num_words() as i64 * 2
    }
}

impl Hash for Shape {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.num_bits.hash(state);
        self.num_hashes.hash(state);
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape[k={} m={}]", self.num_hashes, self.num_bits)
    }
}

fn check_number_of_items(num_items: i32) -> Result<(), FilterError> {
    if num_items < 1 {
        return Err(FilterError::invalid_parameter(format!(
            "Number of items must be greater than 0: {num_items}"
        )));
    }
    Ok(())
}

fn check_number_of_bits(num_bits: i32) -> Result<(), FilterError> {
    if num_bits < 1 {
        return Err(FilterError::invalid_parameter(format!(
            "Number of bits must be greater than 0: {num_bits}"
        )));
    }
    Ok(())
}

fn check_number_of_hash_functions(num_hashes: i32) -> Result<(), FilterError> {
    if num_hashes < 1 {
        return Err(FilterError::invalid_parameter(format!(
            "Number of hash functions must be greater than 0: {num_hashes}"
        )));
    }
    Ok(())
}

fn check_probability(probability: f64) -> Result<(), FilterError> {
    // Written so that NaN fails as well.
    if !(probability > 0.0 && probability < 1.0) {
        return Err(FilterError::invalid_parameter(format!(
            "Probability must be greater than 0 and less than 1: {probability}"
        )));
    }
    Ok(())
}

fn check_calculated_probability(probability: f64) -> Result<(), FilterError> {
    if probability >= 1.0 {
        return Err(FilterError::invalid_parameter(format!(
            "Calculated probability is greater than or equal to 1: {probability}"
        )));
    }
    Ok(())
}

/// `k = round((m/n) * ln 2)`, rejecting filters too small to hold one hash.
fn calculate_number_of_hash_functions(num_items: i32, num_bits: i32) -> Result<i32, FilterError> {
    let k = (LN_2 * f64::from(num_bits) / f64::from(num_items)).round();
    if k < 1.0 {
        return Err(FilterError::invalid_parameter(format!(
            "Filter too small: calculated number of hash functions ({k}) was less than 1"
        )));
    }
    // m <= i32::MAX bounds k by ln(2) * i32::MAX.
    Ok(k as i32)
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;

    use proptest::prelude::*;

    use super::*;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn is_invalid<T: fmt::Debug>(result: Result<T, FilterError>) -> bool {
        matches!(result, Err(FilterError::InvalidParameter(_)))
    }

    /// n = 5, p = 0.100375138, m = 24, k = 3
    fn reference_shape() -> Shape {
        Shape::from_km(3, 24).unwrap()
    }

    #[test]
    fn test_bad_number_of_bits() {
        assert!(is_invalid(Shape::from_km(5, 0)));
        assert!(is_invalid(Shape::from_nm(5, 0)));
        assert!(is_invalid(Shape::from_nmk(5, 0, 7)));
        assert!(is_invalid(Shape::from_pmk(0.035, 0, 7)));
    }

    #[test]
    fn test_bad_number_of_hash_functions() {
        assert!(is_invalid(Shape::from_km(0, 7)));
        assert!(is_invalid(Shape::from_nmk(5, 26, 0)));
        assert!(is_invalid(Shape::from_pmk(0.35, 26, 0)));
        // round(ln 2 / 2) == 0: the filter is too small for two items
        assert!(is_invalid(Shape::from_nm(2, 1)));
    }

    #[test]
    fn test_bad_number_of_items() {
        assert!(is_invalid(Shape::from_nm(0, 24)));
        assert!(is_invalid(Shape::from_nmk(0, 24, 5)));
        assert!(is_invalid(Shape::from_np(0, 0.02)));
    }

    #[test]
    fn test_bad_probability() {
        assert!(is_invalid(Shape::from_nmk(4000, 8, 1)));
        assert!(is_invalid(Shape::from_np(10, 0.0)));
        assert!(is_invalid(Shape::from_np(10, 1.0)));
        assert!(is_invalid(Shape::from_np(10, f64::NAN)));
        assert!(is_invalid(Shape::from_np(10, f64::INFINITY)));
        assert!(is_invalid(Shape::from_np(10, f64::NEG_INFINITY)));
    }

    #[test]
    fn test_from_km() {
        let shape = Shape::from_km(17, 72).unwrap();
        assert_eq!(shape.num_hashes(), 17);
        assert_eq!(shape.num_bits(), 72);
        assert_eq!(shape.num_words(), 2);
    }

    #[test]
    fn test_from_nm() {
        let shape = Shape::from_nm(5, 24).unwrap();

        assert_eq!(shape.num_bits(), 24);
        assert_eq!(shape.num_hashes(), 3);
        let p = shape.probability(5).unwrap();
        assert!((p - 0.100375138).abs() < 1e-6, "Expected p≈0.100375138, got {p}");

        assert!(is_invalid(Shape::from_nm(5, 0)));
        assert!(is_invalid(Shape::from_nm(0, 5)));
    }

    #[test]
    fn test_from_nmk() {
        let shape = Shape::from_nmk(5, 24, 4).unwrap();

        assert_eq!(shape.num_bits(), 24);
        assert_eq!(shape.num_hashes(), 4);
        let p = shape.probability(5).unwrap();
        assert!((p - 0.102194782).abs() < 1e-6, "Expected p≈0.102194782, got {p}");

        assert!(is_invalid(Shape::from_nmk(i32::MAX, i32::MAX, i32::MAX)));
        assert!(is_invalid(Shape::from_nmk(5, 5, 0)));
        assert!(is_invalid(Shape::from_nmk(5, 0, 5)));
        assert!(is_invalid(Shape::from_nmk(0, 5, 5)));
    }

    #[test]
    fn test_from_np() {
        let shape = Shape::from_np(10, 1.0 / 2_000_000.0).unwrap();

        assert_eq!(shape.num_bits(), 302);
        assert_eq!(shape.num_hashes(), 21);

        let next_down_one = f64::from_bits(1.0f64.to_bits() - 1);
        let next_up_zero = f64::from_bits(1);
        assert!(is_invalid(Shape::from_np(i32::MAX, next_down_one)));
        assert!(is_invalid(Shape::from_np(0, 1.0 / 2_000_000.0)));
        assert!(is_invalid(Shape::from_np(5, 0.0)));
        assert!(is_invalid(Shape::from_np(i32::MAX, next_up_zero)));
        // more than i32::MAX bits
        assert!(is_invalid(Shape::from_np(i32::MAX, 0.1)));
    }

    #[test]
    fn test_from_pmk() {
        let shape = Shape::from_pmk(0.1, 24, 3).unwrap();

        assert_eq!(shape.num_bits(), 24);
        assert_eq!(shape.num_hashes(), 3);
        let p = shape.probability(5).unwrap();
        assert!((p - 0.100375138).abs() < 1e-6, "Expected p≈0.100375138, got {p}");

        assert!(is_invalid(Shape::from_pmk(0.0, 5, 5)));
        assert!(is_invalid(Shape::from_pmk(0.5, 0, 5)));
        assert!(is_invalid(Shape::from_pmk(0.5, 5, 0)));
    }

    /// The two ends of the open interval behave differently: the smallest
    /// positive probability derives a load of 0 and is accepted, while the
    /// largest probability below 1 derives a load that saturates the filter.
    #[test]
    fn test_from_pmk_boundaries() {
        let next_down_one = f64::from_bits(1.0f64.to_bits() - 1);
        let next_up_zero = f64::from_bits(1);

        let shape = Shape::from_pmk(next_up_zero, 5, 5).unwrap();
        assert_eq!(shape.probability(i32::MAX).unwrap(), 1.0);

        assert!(is_invalid(Shape::from_pmk(next_down_one, 5, 5)));
        assert!(is_invalid(Shape::from_pmk(next_down_one, i32::MAX, i32::MAX)));
        assert!(is_invalid(Shape::from_pmk(1.0, 5, 5)));
    }

    #[test]
    fn test_estimate_n() {
        let shape = reference_shape();
        for i in 0..24 {
            let c = f64::from(i);
            let expected = -(24.0 / 3.0) * (-c / 24.0).ln_1p();
            assert_eq!(shape.estimate_n(i), expected, "Error on {i}");
        }

        assert_eq!(shape.estimate_n(24), f64::INFINITY);
        assert!(shape.estimate_n(25).is_nan(), "c > m must be reported as NaN");
        assert!(shape.estimate_n(-1).is_nan(), "c < 0 must be reported as NaN");
    }

    #[test]
    fn test_probability() {
        let shape = reference_shape();
        for i in 0..=24 {
            let expected = (-(-3.0 * f64::from(i) / 24.0).exp_m1()).powf(3.0);
            assert_eq!(shape.probability(i).unwrap(), expected, "error at {i}");
        }

        assert_eq!(shape.probability(0).unwrap(), 0.0);
        assert!(is_invalid(shape.probability(-1)));
    }

    #[test]
    fn test_estimate_max_n() {
        let shape = reference_shape();
        let expected = 24.0 * LN_2 / 3.0;
        assert_eq!(shape.estimate_max_n(), expected);
    }

    #[test]
    fn test_is_sparse() {
        for i in 1..=3 {
            let bits = i * 64;
            let shape = Shape::from_km(1, bits).unwrap();
            for n in 0..=bits {
                let expected = n * 4 <= i * 8;
                assert_eq!(shape.is_sparse(n), expected, "n={n} : bits={bits}");
            }
        }
    }

    #[test]
    fn test_equals_and_hash() {
        for (k, m) in [(3, 24), (1, 24), (1, 1), (13, 124), (13, 224)] {
            let shape1 = Shape::from_km(k, m).unwrap();
            assert_eq!(shape1, shape1);
            assert_eq!(hash_of(&shape1), hash_of(&(m, k)), "hash must combine m then k");
            assert_ne!(shape1, Shape::from_km(k, m + 1).unwrap());
            assert_ne!(shape1, Shape::from_km(k + 1, m).unwrap());

            let shape2 = Shape::from_km(k, m).unwrap();
            assert_eq!(shape1, shape2);
            assert_eq!(hash_of(&shape1), hash_of(&shape2));
        }
    }

    #[test]
    fn test_to_string() {
        assert_eq!(Shape::from_km(3, 5).unwrap().to_string(), "Shape[k=3 m=5]");
    }

    #[test]
    fn test_serde_validates() {
        let shape = reference_shape();
        let json = serde_json::to_string(&shape).unwrap();
        assert_eq!(json, r#"{"num_hashes":3,"num_bits":24}"#);

        let restored: Shape = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, shape);

        let invalid = serde_json::from_str::<Shape>(r#"{"num_hashes":0,"num_bits":24}"#);
        assert!(invalid.is_err(), "Deserializing k=0 must fail");
    }

    proptest! {
        #[test]
        fn prop_equal_parameters_give_equal_shapes(k in 1..1000i32, m in 1..100_000i32) {
            let a = Shape::from_km(k, m).unwrap();
            let b = Shape::from_km(k, m).unwrap();
            prop_assert_eq!(a, b);
            prop_assert_eq!(hash_of(&a), hash_of(&b));
            prop_assert_ne!(a, Shape::from_km(k + 1, m).unwrap());
            prop_assert_ne!(a, Shape::from_km(k, m + 1).unwrap());
        }

        #[test]
        fn prop_is_sparse_matches_cost_model(j in 1..64i32, n in 0..10_000i32) {
            let shape = Shape::from_km(1, 64 * j).unwrap();
            let dense_bytes = i64::from(j) * 8;
            prop_assert_eq!(shape.is_sparse(n), i64::from(n) * 4 <= dense_bytes);
        }
    }
}
