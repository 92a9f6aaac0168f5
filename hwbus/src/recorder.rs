use alloc::{rc::Rc, vec::Vec};
use core::{cell::RefCell, fmt};

use crate::{BusError, PortIo, RegisterSpace, SmBus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
  BusRead { device: u8, reg: u8, value: u8 },
  BusWrite { device: u8, reg: u8, value: u8 },
  BusFailed { device: u8, reg: u8 },
  Read8 { offset: u32, value: u8 },
  Write8 { offset: u32, value: u8 },
  Read32 { offset: u32, value: u32 },
  Write32 { offset: u32, value: u32 },
  Out { port: u16, value: u8 },
}

impl fmt::Display for Transaction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match *self {
      Transaction::BusRead { device, reg, value } => write!(f, "smbus rd   {:02x}:{:02x}    -> {:02x}", device, reg, value),
      Transaction::BusWrite { device, reg, value } => write!(f, "smbus wr   {:02x}:{:02x}    <- {:02x}", device, reg, value),
      Transaction::BusFailed { device, reg } => write!(f, "smbus FAIL {:02x}:{:02x}", device, reg),
      Transaction::Read8 { offset, value } => write!(f, "mmio  rd8  {:06x} -> {:02x}", offset, value),
      Transaction::Write8 { offset, value } => write!(f, "mmio  wr8  {:06x} <- {:02x}", offset, value),
      Transaction::Read32 { offset, value } => write!(f, "mmio  rd32 {:06x} -> {:08x}", offset, value),
      Transaction::Write32 { offset, value } => write!(f, "mmio  wr32 {:06x} <- {:08x}", offset, value),
      Transaction::Out { port, value } => write!(f, "port  out  {:04x}   <- {:02x}", port, value),
    }
  }
}

/// One ordered log shared by every wrapped device, so the interleaving of
/// bus, MMIO and port traffic is preserved.
#[derive(Default, Clone)]
pub struct Recorder {
  log: Rc<RefCell<Vec<Transaction>>>,
}

impl Recorder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn bus<B: SmBus>(&self, inner: B) -> RecordingBus<B> {
    RecordingBus { inner, log: self.log.clone() }
  }

  pub fn regs<R: RegisterSpace>(&self, inner: R) -> RecordingRegs<R> {
    RecordingRegs { inner, log: self.log.clone() }
  }

  pub fn ports<P: PortIo>(&self, inner: P) -> RecordingPorts<P> {
    RecordingPorts { inner, log: self.log.clone() }
  }

  pub fn transactions(&self) -> Vec<Transaction> {
    self.log.borrow().clone()
  }

  pub fn len(&self) -> usize {
    self.log.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.log.borrow().is_empty()
  }

  fn push(log: &RefCell<Vec<Transaction>>, t: Transaction) {
    log.borrow_mut().push(t)
  }
}

pub struct RecordingBus<B> {
  inner: B,
  log: Rc<RefCell<Vec<Transaction>>>,
}

impl<B: SmBus> SmBus for RecordingBus<B> {
  fn read_byte(&mut self, device: u8, reg: u8) -> Result<u8, BusError> {
    let res = self.inner.read_byte(device, reg);
    let t = match res {
      Ok(value) => Transaction::BusRead { device, reg, value },
      Err(_) => Transaction::BusFailed { device, reg },
    };
    Recorder::push(&self.log, t);
    res
  }

  fn write_byte(&mut self, device: u8, reg: u8, value: u8) -> Result<(), BusError> {
    let res = self.inner.write_byte(device, reg, value);
    let t = match res {
      Ok(()) => Transaction::BusWrite { device, reg, value },
      Err(_) => Transaction::BusFailed { device, reg },
    };
    Recorder::push(&self.log, t);
    res
  }
}

pub struct RecordingRegs<R> {
  inner: R,
  log: Rc<RefCell<Vec<Transaction>>>,
}

impl<R: RegisterSpace> RegisterSpace for RecordingRegs<R> {
  fn read8(&self, offset: u32) -> u8 {
    let value = self.inner.read8(offset);
    Recorder::push(&self.log, Transaction::Read8 { offset, value });
    value
  }

  fn write8(&mut self, val: u8, offset: u32) {
    self.inner.write8(val, offset);
    Recorder::push(&self.log, Transaction::Write8 { offset, value: val });
  }

  fn read32(&self, offset: u32) -> u32 {
    let value = self.inner.read32(offset);
    Recorder::push(&self.log, Transaction::Read32 { offset, value });
    value
  }

  fn write32(&mut self, val: u32, offset: u32) {
    self.inner.write32(val, offset);
    Recorder::push(&self.log, Transaction::Write32 { offset, value: val });
  }
}

pub struct RecordingPorts<P> {
  inner: P,
  log: Rc<RefCell<Vec<Transaction>>>,
}

impl<P: PortIo> PortIo for RecordingPorts<P> {
  fn out8(&mut self, val: u8, port: u16) {
    self.inner.out8(val, port);
    Recorder::push(&self.log, Transaction::Out { port, value: val });
  }
}
