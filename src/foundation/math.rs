pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y).min(255) as u8
}

/// Round `v` up to the next multiple of 16; multiples of 16 are returned unchanged.
pub(crate) fn align_up_16(v: u64) -> u64 {
    v.div_ceil(16) * 16
}
