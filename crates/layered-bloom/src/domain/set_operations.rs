//! Set operations over bit maps
//!
//! Cardinalities and similarity measures between two filters, computed word
//! by word without materialising the combined filter. Extractors of unequal
//! length are compared as if the shorter one were padded with zero words.

use crate::ports::BitMapExtractor;

fn pair_cardinality(
    first: &dyn BitMapExtractor,
    second: &dyn BitMapExtractor,
    op: fn(u64, u64) -> u64,
) -> i32 {
    let mut count = 0i32;
    first.process_bit_map_pairs(second, &mut |a, b| {
        count += op(a, b).count_ones() as i32;
        true
    });
    count
}

/// Number of enabled bits.
pub fn cardinality(bit_maps: &dyn BitMapExtractor) -> i32 {
    let mut count = 0i32;
    bit_maps.process_bit_maps(&mut |word| {
        count += word.count_ones() as i32;
        true
    });
    count
}

/// Bits enabled in both.
pub fn and_cardinality(first: &dyn BitMapExtractor, second: &dyn BitMapExtractor) -> i32 {
    pair_cardinality(first, second, |a, b| a & b)
}

/// Bits enabled in either.
pub fn or_cardinality(first: &dyn BitMapExtractor, second: &dyn BitMapExtractor) -> i32 {
    pair_cardinality(first, second, |a, b| a | b)
}

/// Bits enabled in exactly one.
pub fn xor_cardinality(first: &dyn BitMapExtractor, second: &dyn BitMapExtractor) -> i32 {
    pair_cardinality(first, second, |a, b| a ^ b)
}

/// Number of positions at which the two bit maps differ.
pub fn hamming_distance(first: &dyn BitMapExtractor, second: &dyn BitMapExtractor) -> i32 {
    xor_cardinality(first, second)
}

/// `|A ∩ B| / |A ∪ B|`, or 0 when the intersection is empty.
pub fn jaccard_similarity(first: &dyn BitMapExtractor, second: &dyn BitMapExtractor) -> f64 {
    let mut intersection = 0i32;
    let mut union = 0i32;
    first.process_bit_map_pairs(second, &mut |a, b| {
        intersection += (a & b).count_ones() as i32;
        union += (a | b).count_ones() as i32;
        true
    });
    if intersection == 0 {
        0.0
    } else {
        f64::from(intersection) / f64::from(union)
    }
}

pub fn jaccard_distance(first: &dyn BitMapExtractor, second: &dyn BitMapExtractor) -> f64 {
    1.0 - jaccard_similarity(first, second)
}

/// `|A ∩ B| / (sqrt|A| * sqrt|B|)`, or 0 when the intersection is empty.
pub fn cosine_similarity(first: &dyn BitMapExtractor, second: &dyn BitMapExtractor) -> f64 {
    let numerator = and_cardinality(first, second);
    if numerator == 0 {
        return 0.0;
    }
    let denominator =
        f64::from(cardinality(first)).sqrt() * f64::from(cardinality(second)).sqrt();
    f64::from(numerator) / denominator
}

pub fn cosine_distance(first: &dyn BitMapExtractor, second: &dyn BitMapExtractor) -> f64 {
    1.0 - cosine_similarity(first, second)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IncrementingHasher, Shape, SimpleBloomFilter};
    use crate::ports::BloomFilter;

    const EPSILON: f64 = 1e-9;

    fn filter(initial: i64) -> SimpleBloomFilter {
        // 17 consecutive bits starting at `initial` out of 72
        let mut filter = SimpleBloomFilter::new(Shape::from_km(17, 72).unwrap());
        filter.merge(&IncrementingHasher::new(initial, 1)).unwrap();
        filter
    }

    #[test]
    fn test_cardinalities() {
        let a = filter(0); // 0..=16
        let b = filter(10); // 10..=26

        assert_eq!(cardinality(&a), 17);
        assert_eq!(and_cardinality(&a, &b), 7);
        assert_eq!(or_cardinality(&a, &b), 27);
        assert_eq!(xor_cardinality(&a, &b), 20);
        assert_eq!(hamming_distance(&a, &b), 20);
    }

    #[test]
    fn test_jaccard() {
        let a = filter(0);
        let b = filter(10);

        assert!((jaccard_similarity(&a, &b) - 7.0 / 27.0).abs() < EPSILON);
        assert!((jaccard_distance(&a, &b) - 20.0 / 27.0).abs() < EPSILON);
        assert_eq!(jaccard_similarity(&a, &a), 1.0);
        assert_eq!(jaccard_similarity(&a, &filter(40)), 0.0, "Disjoint filters");
    }

    #[test]
    fn test_cosine() {
        let a = filter(0);
        let b = filter(10);

        assert!((cosine_similarity(&a, &b) - 7.0 / 17.0).abs() < EPSILON);
        assert!((cosine_distance(&a, &b) - 10.0 / 17.0).abs() < EPSILON);
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < EPSILON);

        let empty = SimpleBloomFilter::new(Shape::from_km(17, 72).unwrap());
        assert_eq!(cosine_similarity(&a, &empty), 0.0, "No division by zero");
        assert_eq!(cosine_distance(&empty, &empty), 1.0);
    }

    #[test]
    fn test_unequal_lengths() {
        let short = vec![0b1011u64];
        let long = vec![0b0011u64, 0b1];

        assert_eq!(and_cardinality(&short, &long), 2);
        assert_eq!(or_cardinality(&short, &long), 4);
        assert_eq!(xor_cardinality(&long, &short), 2);
    }
}
