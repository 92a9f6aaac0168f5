#![no_std]

pub mod hertz {
  pub const MHZ: f64 = 1_000_000.0;
  pub const CRYSTAL_13_5_MHZ: f64 = 13.5 * MHZ;
}

pub mod utils {
  use core::num::ParseIntError;

  fn strip_radix(src: &str) -> &str {
    src.strip_prefix("0x")
      .or_else(|| src.strip_prefix("0X"))
      .unwrap_or(src)
  }

  pub fn parse_hex(src: &str) -> core::result::Result<u32, ParseIntError> {
    u32::from_str_radix(strip_radix(src.trim()), 16)
  }
}

pub mod bits {
  /// Shifts `value` right by `shift` (left when negative) and keeps the bits in `mask`.
  /// Mirrors how split register fields place their high bits into a shared byte.
  pub fn field(value: i64, shift: i32, mask: u8) -> u8 {
    let shifted = if shift >= 0 { value >> shift } else { value << -shift };
    (shifted as u8) & mask
  }

  pub fn lo8(value: i64) -> u8 {
    (value & 0xff) as u8
  }

  pub fn byte(value: u32, n: u32) -> u8 {
    ((value >> (n * 8)) & 0xff) as u8
  }

  pub fn merge(old: u8, mask: u8, value: u8) -> u8 {
    (old & !mask) | (value & mask)
  }
}
