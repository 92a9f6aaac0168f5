#![allow(dead_code)]

use hwbus::{Recorder, Transaction};
use tvout::{
  boot::{init_display, BootConfig, DisplayState},
  detect::REGION_NTSC,
  error::TvOutError,
  program::Devices,
  sim::SimulatedBox,
};

pub const REGION_PAL: u8 = 0x80;

pub const AV_SCART: u8 = 0;
pub const AV_VGA: u8 = 2;
pub const AV_COMPOSITE: u8 = 6;

pub fn ntsc_box(av_pack: u8) -> SimulatedBox {
  SimulatedBox::new(av_pack, REGION_NTSC)
}

pub fn pal_box(av_pack: u8) -> SimulatedBox {
  SimulatedBox::new(av_pack, REGION_PAL)
}

/// Boots `sbox` with every device access logged in order.
pub fn recorded_boot(sbox: &mut SimulatedBox, config: &BootConfig) -> (Result<DisplayState, TvOutError>, Vec<Transaction>) {
  let rec = Recorder::new();
  let mut bus = rec.bus(&mut sbox.bus);
  let mut regs = rec.regs(&mut sbox.gpu);
  let mut ports = rec.ports(&mut sbox.ports);
  let mut dev = Devices::new(&mut bus, &mut regs, &mut ports);
  let res = init_display(config, &mut dev);
  (res, rec.transactions())
}
