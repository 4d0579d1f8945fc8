//! Fixed-width packing for plugin version and unique id.

/// `(major << 16) | (minor << 8) | micro`
pub const fn version(major: u8, minor: u8, micro: u8) -> u32 {
    ((major as u32) << 16) | ((minor as u32) << 8) | micro as u32
}

pub const fn unpack_version(packed: u32) -> (u8, u8, u8) {
    ((packed >> 16) as u8, (packed >> 8) as u8, packed as u8)
}

/// Pack four bytes big-endian into a unique id.
pub const fn cconst(a: u8, b: u8, c: u8, d: u8) -> i64 {
    ((a as i64) << 24) | ((b as i64) << 16) | ((c as i64) << 8) | d as i64
}

/// Unique id from a four character tag such as `"ABCD"`.
///
/// Each character contributes its code truncated to a byte. Returns `None`
/// unless the tag has exactly four characters.
pub fn sconst(tag: &str) -> Option<i64> {
    let mut chars = tag.chars();
    let mut bytes = [0u8; 4];
    for byte in &mut bytes {
        *byte = chars.next()? as u32 as u8;
    }
    if chars.next().is_some() {
        return None;
    }
    Some(cconst(bytes[0], bytes[1], bytes[2], bytes[3]))
}
