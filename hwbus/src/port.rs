use alloc::vec::Vec;

/// x86 I/O port output.
pub trait PortIo {
  fn out8(&mut self, val: u8, port: u16);
}

impl<T: PortIo + ?Sized> PortIo for &mut T {
  fn out8(&mut self, val: u8, port: u16) {
    (**self).out8(val, port)
  }
}

/// Keeps every write, last value per port is what the hardware would latch.
#[derive(Default, Clone, Debug)]
pub struct PortLog(Vec<(u16, u8)>);

impl PortLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn writes(&self) -> &[(u16, u8)] {
    &self.0
  }

  pub fn last(&self, port: u16) -> Option<u8> {
    self.0.iter().rev().find(|(p, _)| *p == port).map(|(_, v)| *v)
  }
}

impl PortIo for PortLog {
  fn out8(&mut self, val: u8, port: u16) {
    self.0.push((port, val));
  }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub struct X86Ports(());

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl X86Ports {
  /// # Safety
  ///
  /// Caller must run with I/O privilege and own the ports it writes.
  pub unsafe fn new() -> Self {
    Self(())
  }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl PortIo for X86Ports {
  fn out8(&mut self, val: u8, port: u16) {
    // SAFETY: privilege guaranteed by `new`
    unsafe {
      core::arch::asm!("out dx, al", in("dx") port, in("al") val, options(nomem, nostack, preserves_flags));
    }
  }
}
