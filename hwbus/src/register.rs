use alloc::collections::BTreeMap;
use core::ptr::NonNull;

/// Byte addressable register window. Reads take `&self`, devices with read side
/// effects model them with interior mutability.
pub trait RegisterSpace {
  fn read8(&self, offset: u32) -> u8;
  fn write8(&mut self, val: u8, offset: u32);

  fn read32(&self, offset: u32) -> u32 {
    u32::from_le_bytes([
      self.read8(offset),
      self.read8(offset + 1),
      self.read8(offset + 2),
      self.read8(offset + 3),
    ])
  }

  fn write32(&mut self, val: u32, offset: u32) {
    for (i, b) in val.to_le_bytes().iter().enumerate() {
      self.write8(*b, offset + i as u32);
    }
  }

  /// Read-modify-write of the bits in `mask`. Returns the byte written.
  fn update_field(&mut self, offset: u32, mask: u8, value: u8) -> u8 {
    let new = common::bits::merge(self.read8(offset), mask, value);
    self.write8(new, offset);
    new
  }
}

impl<T: RegisterSpace + ?Sized> RegisterSpace for &mut T {
  fn read8(&self, offset: u32) -> u8 {
    (**self).read8(offset)
  }

  fn write8(&mut self, val: u8, offset: u32) {
    (**self).write8(val, offset)
  }

  fn read32(&self, offset: u32) -> u32 {
    (**self).read32(offset)
  }

  fn write32(&mut self, val: u32, offset: u32) {
    (**self).write32(val, offset)
  }
}

/// Sparse register window, unwritten bytes read as zero.
#[derive(Default, Clone, Debug)]
pub struct Memory(BTreeMap<u32, u8>);

impl Memory {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_written(&self, offset: u32) -> bool {
    self.0.contains_key(&offset)
  }
}

impl RegisterSpace for Memory {
  fn read8(&self, offset: u32) -> u8 {
    self.0.get(&offset).copied().unwrap_or(0)
  }

  fn write8(&mut self, val: u8, offset: u32) {
    self.0.insert(offset, val);
  }
}

/// Volatile access to a mapped register window.
pub struct Mmio {
  base: NonNull<u8>,
  len: usize,
}

impl Mmio {
  /// # Safety
  ///
  /// `base` must point to `len` bytes of mapped device memory (or RAM) that stays
  /// valid and is not aliased for the lifetime of this value. `base` must be
  /// 4-byte aligned, 32-bit accesses are only checked for offset alignment.
  pub unsafe fn new(base: NonNull<u8>, len: usize) -> Self {
    debug_assert!(base.as_ptr() as usize % 4 == 0, "mmio base not aligned");
    Self { base, len }
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  fn at(&self, offset: u32, width: usize) -> *mut u8 {
    let offset = offset as usize;
    assert!(offset + width <= self.len, "mmio access {:#x} out of window", offset);
    assert!(offset % width == 0, "mmio access {:#x} not {}-byte aligned", offset, width);
    // SAFETY: bounds checked above, base valid per `new`
    unsafe { self.base.as_ptr().add(offset) }
  }
}

impl RegisterSpace for Mmio {
  fn read8(&self, offset: u32) -> u8 {
    // SAFETY: in bounds
    unsafe { self.at(offset, 1).read_volatile() }
  }

  fn write8(&mut self, val: u8, offset: u32) {
    // SAFETY: in bounds
    unsafe { self.at(offset, 1).write_volatile(val) }
  }

  fn read32(&self, offset: u32) -> u32 {
    // SAFETY: in bounds and aligned, base aligned per `new`
    unsafe { self.at(offset, 4).cast::<u32>().read_volatile() }
  }

  fn write32(&mut self, val: u32, offset: u32) {
    // SAFETY: in bounds and aligned, base aligned per `new`
    unsafe { self.at(offset, 4).cast::<u32>().write_volatile(val) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use alloc::vec;

  #[test]
  fn memory_is_little_endian() {
    let mut mem = Memory::new();
    mem.write32(0x10001000, 0x68088c);
    assert_eq!(mem.read8(0x68088c), 0x00);
    assert_eq!(mem.read8(0x68088d), 0x10);
    assert_eq!(mem.read8(0x68088f), 0x10);
    assert_eq!(mem.read32(0x68088c), 0x10001000);
    assert!(!mem.is_written(0x680890));
  }

  #[test]
  fn update_field_merges() {
    let mut mem = Memory::new();
    mem.write8(0xe5, 0x6013d5);
    assert_eq!(mem.update_field(0x6013d5, 0x1f, 0x03), 0xe3);
  }

  #[test]
  fn mmio_over_buffer() {
    let mut backing = vec![0u32; 64];
    let base = NonNull::new(backing.as_mut_ptr().cast::<u8>()).unwrap();
    let mut mmio = unsafe { Mmio::new(base, 256) };
    mmio.write32(0x801080, 0x4c);
    mmio.write8(0x20, 0x10);
    assert_eq!(mmio.read32(0x4c), 0x801080);
    assert_eq!(mmio.read8(0x10), 0x20);
    assert_eq!(backing[0x4c / 4], 0x801080);
  }

  #[test]
  #[should_panic]
  fn mmio_rejects_out_of_window() {
    let mut backing = vec![0u32; 4];
    let base = NonNull::new(backing.as_mut_ptr().cast::<u8>()).unwrap();
    let mmio = unsafe { Mmio::new(base, 16) };
    mmio.read32(14);
  }

  #[test]
  #[should_panic(expected = "not 4-byte aligned")]
  fn mmio_rejects_unaligned_word() {
    let mut backing = vec![0u32; 16];
    let base = NonNull::new(backing.as_mut_ptr().cast::<u8>()).unwrap();
    let mut mmio = unsafe { Mmio::new(base, 64) };
    mmio.write32(0xdeadbeef, 1);
  }
}
