//! Packed pointer/length helpers for the string-return convention.

/// Pack a guest pointer and byte length into the `i64` return convention:
/// high 32 bits = pointer, low 32 bits = length.
pub fn pack(ptr: i32, len: i32) -> i64 {
    ((ptr as u32 as i64) << 32) | (len as u32 as i64)
}

/// Unpack an `i64` return into `(ptr, len)` as unsigned offsets.
pub fn unpack(packed: i64) -> (usize, usize) {
    let ptr = (packed >> 32) as u32 as usize;
    let len = (packed & 0xFFFF_FFFF) as u32 as usize;
    (ptr, len)
}
