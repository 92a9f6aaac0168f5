use std::fmt;

use hwbus::{PortIo, RegisterSpace, SmBus};
use log::trace;

use crate::error::TvOutError;

/*
  Indexed VGA register banks inside the NV register window.

  CRTC        index 0x6013d4  data 0x6013d5
  Sequencer   index 0x0c03c4  data 0x0c03c5
  Graphics    index 0x0c03ce  data 0x0c03cf
  Attribute   index and data share 0x6013c0, a flip-flop picks which one
              a write lands in. Reading 0x6013da resets it to index.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
  Crtc,
  Sequencer,
  Graphics,
  Attribute,
}

impl Bank {
  pub const CRTC_INDEX: u32 = 0x6013d4;
  pub const CRTC_DATA: u32 = 0x6013d5;
  pub const SEQ_INDEX: u32 = 0x0c03c4;
  pub const SEQ_DATA: u32 = 0x0c03c5;
  pub const GR_INDEX: u32 = 0x0c03ce;
  pub const GR_DATA: u32 = 0x0c03cf;
  pub const ATTR: u32 = 0x6013c0;
  pub const INPUT_STATUS_1: u32 = 0x6013da;

  /// (index register, data register)
  pub fn ports(self) -> (u32, u32) {
    match self {
      Bank::Crtc => (Bank::CRTC_INDEX, Bank::CRTC_DATA),
      Bank::Sequencer => (Bank::SEQ_INDEX, Bank::SEQ_DATA),
      Bank::Graphics => (Bank::GR_INDEX, Bank::GR_DATA),
      Bank::Attribute => (Bank::ATTR, Bank::ATTR),
    }
  }

  fn name(self) -> &'static str {
    match self {
      Bank::Crtc => "crtc",
      Bank::Sequencer => "seq",
      Bank::Graphics => "gr",
      Bank::Attribute => "attr",
    }
  }
}

/// One register operation. Updates touch only the bits in `mask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
  BusWrite { device: u8, reg: u8, value: u8 },
  /// Read for its side effect, the encoder uses one to wait for a reset.
  BusRead { device: u8, reg: u8 },
  BusUpdate { device: u8, reg: u8, mask: u8, value: u8 },
  Write32 { offset: u32, value: u32 },
  Write8 { offset: u32, value: u8 },
  Read8 { offset: u32 },
  IndexedWrite { bank: Bank, index: u8, value: u8 },
  IndexedUpdate { bank: Bank, index: u8, mask: u8, value: u8 },
  PortOut { port: u16, value: u8 },
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match *self {
      Step::BusWrite { device, reg, value } => write!(f, "bus   {:02x}:{:02x} = {:02x}", device, reg, value),
      Step::BusRead { device, reg } => write!(f, "bus   {:02x}:{:02x} ?", device, reg),
      Step::BusUpdate { device, reg, mask, value } => write!(f, "bus   {:02x}:{:02x} [{:02x}] = {:02x}", device, reg, mask, value & mask),
      Step::Write32 { offset, value } => write!(f, "mmio  {:06x} = {:08x}", offset, value),
      Step::Write8 { offset, value } => write!(f, "mmio  {:06x} = {:02x} (8)", offset, value),
      Step::Read8 { offset } => write!(f, "mmio  {:06x} ? (8)", offset),
      Step::IndexedWrite { bank, index, value } => write!(f, "{:5} {:02x} = {:02x}", bank.name(), index, value),
      Step::IndexedUpdate { bank, index, mask, value } => write!(f, "{:5} {:02x} [{:02x}] = {:02x}", bank.name(), index, mask, value & mask),
      Step::PortOut { port, value } => write!(f, "port  {:04x} = {:02x}", port, value),
    }
  }
}

/// The hardware one boot sequence drives, owned exclusively for its duration.
pub struct Devices<'a> {
  pub bus: &'a mut dyn SmBus,
  pub regs: &'a mut dyn RegisterSpace,
  pub ports: &'a mut dyn PortIo,
}

impl<'a> Devices<'a> {
  pub fn new(bus: &'a mut dyn SmBus, regs: &'a mut dyn RegisterSpace, ports: &'a mut dyn PortIo) -> Self {
    Self { bus, regs, ports }
  }
}

impl Step {
  pub fn apply(&self, dev: &mut Devices) -> Result<(), TvOutError> {
    trace!("{}", self);
    match *self {
      Step::BusWrite { device, reg, value } => dev.bus.write_byte(device, reg, value)?,
      Step::BusRead { device, reg } => {
        dev.bus.read_byte(device, reg)?;
      }
      Step::BusUpdate { device, reg, mask, value } => {
        dev.bus.update_byte(device, reg, mask, value)?;
      }
      Step::Write32 { offset, value } => dev.regs.write32(value, offset),
      Step::Write8 { offset, value } => dev.regs.write8(value, offset),
      Step::Read8 { offset } => {
        dev.regs.read8(offset);
      }
      Step::IndexedWrite { bank, index, value } => {
        let (index_port, data_port) = bank.ports();
        dev.regs.write8(index, index_port);
        dev.regs.write8(value, data_port);
      }
      Step::IndexedUpdate { bank, index, mask, value } => {
        let (index_port, data_port) = bank.ports();
        dev.regs.write8(index, index_port);
        let old = dev.regs.read8(data_port);
        dev.regs.write8(index, index_port);
        dev.regs.write8(common::bits::merge(old, mask, value), data_port);
      }
      Step::PortOut { port, value } => dev.ports.out8(value, port),
    }
    Ok(())
  }
}

/// An ordered register sequence, built once and applied by [`apply`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
  steps: Vec<Step>,
}

impl Program {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  pub fn push(&mut self, step: Step) -> &mut Self {
    self.steps.push(step);
    self
  }

  pub fn append(&mut self, other: Program) -> &mut Self {
    self.steps.extend(other.steps);
    self
  }

  pub fn bus_write(&mut self, device: u8, reg: u8, value: u8) -> &mut Self {
    self.push(Step::BusWrite { device, reg, value })
  }

  pub fn bus_read(&mut self, device: u8, reg: u8) -> &mut Self {
    self.push(Step::BusRead { device, reg })
  }

  pub fn bus_update(&mut self, device: u8, reg: u8, mask: u8, value: u8) -> &mut Self {
    self.push(Step::BusUpdate { device, reg, mask, value })
  }

  pub fn write32(&mut self, offset: u32, value: u32) -> &mut Self {
    self.push(Step::Write32 { offset, value })
  }

  pub fn write8(&mut self, offset: u32, value: u8) -> &mut Self {
    self.push(Step::Write8 { offset, value })
  }

  pub fn read8(&mut self, offset: u32) -> &mut Self {
    self.push(Step::Read8 { offset })
  }

  pub fn crtc(&mut self, index: u8, value: u8) -> &mut Self {
    self.push(Step::IndexedWrite { bank: Bank::Crtc, index, value })
  }

  pub fn crtc_update(&mut self, index: u8, mask: u8, value: u8) -> &mut Self {
    self.push(Step::IndexedUpdate { bank: Bank::Crtc, index, mask, value })
  }

  pub fn seq(&mut self, index: u8, value: u8) -> &mut Self {
    self.push(Step::IndexedWrite { bank: Bank::Sequencer, index, value })
  }

  pub fn gr(&mut self, index: u8, value: u8) -> &mut Self {
    self.push(Step::IndexedWrite { bank: Bank::Graphics, index, value })
  }

  pub fn attr(&mut self, index: u8, value: u8) -> &mut Self {
    self.push(Step::IndexedWrite { bank: Bank::Attribute, index, value })
  }

  pub fn port(&mut self, port: u16, value: u8) -> &mut Self {
    self.push(Step::PortOut { port, value })
  }
}

impl fmt::Display for Program {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, step) in self.steps.iter().enumerate() {
      writeln!(f, "{:4} {}", i, step)?;
    }
    Ok(())
  }
}

pub fn apply(program: &Program, dev: &mut Devices) -> Result<(), TvOutError> {
  for step in program.steps() {
    step.apply(dev)?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use hwbus::{BusError, Memory, PortLog, Recorder, SimulatedBus, Transaction};

  use super::*;

  #[test]
  fn bus_update_is_read_modify_write() {
    let mut bus = SimulatedBus::new().with_device(0x45);
    bus.preset(0x45, 0x38, 0xd1);
    let (mut regs, mut ports) = (Memory::new(), PortLog::new());
    let mut dev = Devices::new(&mut bus, &mut regs, &mut ports);

    let mut p = Program::new();
    p.bus_update(0x45, 0x38, 0x20, 0x20).bus_update(0x45, 0x38, 0x01, 0x00);
    apply(&p, &mut dev).unwrap();
    assert_eq!(bus.peek(0x45, 0x38), Some(0xf0));
  }

  #[test]
  fn indexed_update_reselects_index() {
    let rec = Recorder::new();
    let mut bus = SimulatedBus::new();
    let mut regs = rec.regs(Memory::new());
    let mut ports = PortLog::new();
    let mut dev = Devices::new(&mut bus, &mut regs, &mut ports);

    let mut p = Program::new();
    p.crtc_update(0x17, 0x80, 0x00);
    apply(&p, &mut dev).unwrap();

    assert_eq!(rec.transactions(), vec![
      Transaction::Write8 { offset: Bank::CRTC_INDEX, value: 0x17 },
      Transaction::Read8 { offset: Bank::CRTC_DATA, value: 0x00 },
      Transaction::Write8 { offset: Bank::CRTC_INDEX, value: 0x17 },
      Transaction::Write8 { offset: Bank::CRTC_DATA, value: 0x00 },
    ]);
  }

  #[test]
  fn stops_at_first_bus_error() {
    let mut bus = SimulatedBus::new();
    let (mut regs, mut ports) = (Memory::new(), PortLog::new());
    let mut dev = Devices::new(&mut bus, &mut regs, &mut ports);

    let mut p = Program::new();
    p.port(0x80d3, 5).bus_write(0x45, 0xba, 0x80).port(0x80d3, 4);
    assert_eq!(apply(&p, &mut dev), Err(TvOutError::Bus(BusError::NoDevice(0x45))));
    assert_eq!(ports.writes(), &[(0x80d3, 5)]);
  }

  #[test]
  fn listing() {
    let mut p = Program::new();
    p.write32(0x680630, 2).crtc(0x1f, 0x57);
    assert_eq!(p.to_string(), "   0 mmio  680630 = 00000002\n   1 crtc  1f = 57\n");
  }
}
