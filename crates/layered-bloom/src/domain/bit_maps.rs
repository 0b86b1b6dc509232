//! Word arithmetic for bit maps packed into `u64` words
//!
//! Bit `i` lives in word `i / 64` at position `i % 64` (least significant bit
//! first), the same layout `BitVec<u64, Lsb0>` uses for its raw slice.

use crate::error::FilterError;

/// Number of `u64` words needed to hold `num_bits` bits.
pub fn number_of_bit_maps(num_bits: i32) -> usize {
    if num_bits <= 0 {
        return 0;
    }
    (num_bits as usize).div_ceil(64)
}

/// Index of the word holding `bit_index`.
pub fn long_index(bit_index: i32) -> usize {
    (bit_index as usize) >> 6
}

/// Single-bit mask selecting `bit_index` within its word.
pub fn long_bit(bit_index: i32) -> u64 {
    1u64 << (bit_index & 63)
}

/// Whether `bit_index` is set in `bit_maps`. Indices past the end read as unset.
pub fn contains(bit_maps: &[u64], bit_index: i32) -> bool {
    bit_index >= 0
        && bit_maps
            .get(long_index(bit_index))
            .is_some_and(|word| word & long_bit(bit_index) != 0)
}

/// Set `bit_index` in `bit_maps`.
///
/// # Errors
/// `InvalidIndex` if the index is negative or past the last word.
pub fn set(bit_maps: &mut [u64], bit_index: i32) -> Result<(), FilterError> {
    let limit = (bit_maps.len() * 64).min(i32::MAX as usize) as i32;
    if bit_index < 0 {
        return Err(FilterError::index_out_of_range(bit_index, limit));
    }
    match bit_maps.get_mut(long_index(bit_index)) {
        Some(word) => {
            *word |= long_bit(bit_index);
            Ok(())
        }
        None => Err(FilterError::index_out_of_range(bit_index, limit)),
    }
}

/// Ensure `0 <= index < num_bits`.
pub fn check_range(index: i32, num_bits: i32) -> Result<(), FilterError> {
    if index < 0 || index >= num_bits {
        return Err(FilterError::index_out_of_range(index, num_bits));
    }
    Ok(())
}

/// Mask covering the used bits of the final word of an `m`-bit map.
pub fn last_word_mask(num_bits: i32) -> u64 {
    match num_bits & 63 {
        0 => u64::MAX,
        used => (1u64 << used) - 1,
    }
}

/// Treat `dividend` as unsigned and reduce it modulo a positive `divisor`.
pub fn modulo(dividend: u64, divisor: i32) -> i32 {
    (dividend % divisor as u64) as i32
}
