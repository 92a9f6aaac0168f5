//! Host side stand-ins for the box: an NV register window with its VGA banks,
//! and a configuration bus carrying the encoder, the AV pack and the EEPROM.

use std::cell::Cell;

use hwbus::{Memory, PortLog, RegisterSpace, SimulatedBus};

use crate::{
  detect::{AV_PACK_DEVICE, AV_PACK_REG, EEPROM_DEVICE, REGION_REG},
  encoder::ENCODER,
  program::{Bank, Devices},
};

pub struct SimulatedGpu {
  mem: Memory,
  crtc: [u8; 256],
  seq: [u8; 256],
  gr: [u8; 256],
  attr: [u8; 32],
  crtc_index: u8,
  seq_index: u8,
  gr_index: u8,
  attr_index: u8,
  // true when the next attribute write is data
  attr_data: Cell<bool>,
}

impl Default for SimulatedGpu {
  fn default() -> Self {
    Self::new()
  }
}

impl SimulatedGpu {
  pub fn new() -> Self {
    Self {
      mem: Memory::new(),
      crtc: [0; 256],
      seq: [0; 256],
      gr: [0; 256],
      attr: [0; 32],
      crtc_index: 0,
      seq_index: 0,
      gr_index: 0,
      attr_index: 0,
      attr_data: Cell::new(false),
    }
  }

  pub fn crtc(&self, index: u8) -> u8 {
    self.crtc[index as usize]
  }

  pub fn set_crtc(&mut self, index: u8, value: u8) {
    self.crtc[index as usize] = value;
  }

  pub fn seq(&self, index: u8) -> u8 {
    self.seq[index as usize]
  }

  pub fn gr(&self, index: u8) -> u8 {
    self.gr[index as usize]
  }

  pub fn attr(&self, index: u8) -> u8 {
    self.attr[(index & 0x1f) as usize]
  }

  /// Last value written to the attribute index, bit 5 enables the palette.
  pub fn attr_index(&self) -> u8 {
    self.attr_index
  }
}

impl RegisterSpace for SimulatedGpu {
  fn read8(&self, offset: u32) -> u8 {
    match offset {
      Bank::CRTC_INDEX => self.crtc_index,
      Bank::CRTC_DATA => self.crtc[self.crtc_index as usize],
      Bank::SEQ_INDEX => self.seq_index,
      Bank::SEQ_DATA => self.seq[self.seq_index as usize],
      Bank::GR_INDEX => self.gr_index,
      Bank::GR_DATA => self.gr[self.gr_index as usize],
      Bank::ATTR => self.attr_index,
      Bank::INPUT_STATUS_1 => {
        self.attr_data.set(false);
        0
      }
      _ => self.mem.read8(offset),
    }
  }

  fn write8(&mut self, val: u8, offset: u32) {
    match offset {
      Bank::CRTC_INDEX => self.crtc_index = val,
      Bank::CRTC_DATA => self.crtc[self.crtc_index as usize] = val,
      Bank::SEQ_INDEX => self.seq_index = val,
      Bank::SEQ_DATA => self.seq[self.seq_index as usize] = val,
      Bank::GR_INDEX => self.gr_index = val,
      Bank::GR_DATA => self.gr[self.gr_index as usize] = val,
      Bank::ATTR => {
        if self.attr_data.get() {
          self.attr[(self.attr_index & 0x1f) as usize] = val;
        } else {
          self.attr_index = val;
        }
        self.attr_data.set(!self.attr_data.get());
      }
      _ => self.mem.write8(val, offset),
    }
  }
}

/// Everything one boot sequence talks to.
pub struct SimulatedBox {
  pub bus: SimulatedBus,
  pub gpu: SimulatedGpu,
  pub ports: PortLog,
}

impl SimulatedBox {
  pub fn new(av_pack: u8, region: u8) -> Self {
    let mut bus = SimulatedBus::new().with_device(ENCODER);
    bus.preset(AV_PACK_DEVICE, AV_PACK_REG, av_pack);
    bus.preset(EEPROM_DEVICE, REGION_REG, region);
    Self { bus, gpu: SimulatedGpu::new(), ports: PortLog::new() }
  }

  pub fn devices(&mut self) -> Devices<'_> {
    Devices::new(&mut self.bus, &mut self.gpu, &mut self.ports)
  }

  pub fn encoder(&self, reg: u8) -> u8 {
    self.bus.peek(ENCODER, reg).unwrap_or(0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn crtc_bank_is_indexed() {
    let mut gpu = SimulatedGpu::new();
    gpu.write8(0x1f, Bank::CRTC_INDEX);
    gpu.write8(0x57, Bank::CRTC_DATA);
    gpu.write8(0x44, Bank::CRTC_INDEX);
    gpu.write8(0x03, Bank::CRTC_DATA);
    assert_eq!(gpu.crtc(0x1f), 0x57);
    assert_eq!(gpu.crtc(0x44), 0x03);
    gpu.write8(0x1f, Bank::CRTC_INDEX);
    assert_eq!(gpu.read8(Bank::CRTC_DATA), 0x57);
  }

  #[test]
  fn attribute_flip_flop() {
    let mut gpu = SimulatedGpu::new();
    gpu.write8(0x07, Bank::ATTR);
    gpu.read8(Bank::INPUT_STATUS_1);
    gpu.write8(0x10, Bank::ATTR);
    gpu.write8(0x4a, Bank::ATTR);
    gpu.write8(0x11, Bank::ATTR);
    gpu.write8(0x0f, Bank::ATTR);
    assert_eq!(gpu.attr(0x10), 0x4a);
    assert_eq!(gpu.attr(0x11), 0x0f);
    assert_eq!(gpu.attr(0x07), 0x00);
  }

  #[test]
  fn plain_window_elsewhere() {
    let mut gpu = SimulatedGpu::new();
    gpu.write32(0x801080, 0x68084c);
    assert_eq!(gpu.read32(0x68084c), 0x801080);
  }

  #[test]
  fn box_answers_detection() {
    let mut sbox = SimulatedBox::new(6, 0x40);
    let mut dev = sbox.devices();
    assert_eq!(dev.bus.read_byte(AV_PACK_DEVICE, AV_PACK_REG), Ok(6));
    assert_eq!(dev.bus.read_byte(EEPROM_DEVICE, REGION_REG), Ok(0x40));
  }
}
