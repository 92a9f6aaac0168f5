use bitflags::bitflags;
use common::{bits::{byte, field, lo8}, hertz::CRYSTAL_13_5_MHZ};
use log::debug;

use crate::{
  blanking::BlankingParameter,
  detect::ConnectorType,
  gpu::nv,
  mode::{ClockRatio, ModeParameter},
  program::Program,
  standard::{LineFamily, VideoStandard},
};

/// Bus address of the TV encoder.
pub const ENCODER: u8 = 0x45;

pub const REG_TIMING: u8 = 0x6c;
pub const REG_PLL_INT: u8 = 0xa0;
pub const REG_MODE: u8 = 0xa2;
pub const REG_CONFIG: u8 = 0xb8;
pub const REG_RESET: u8 = 0xba;
pub const REG_EN_OUT: u8 = 0xc4;

/// Period of the encoder reference crystal.
pub const PLL_BASE_PERIOD: f64 = 1.0 / CRYSTAL_13_5_MHZ;

/*
  Mode register 0xa2, bits 0 and 6 belong to other functions.

  7  bit  0
  ---- ----
  .P.V LS..
     | |||
     | ||+-- SETUP, 7.5 IRE pedestal
     | |+--- 625LINE
     | +---- VSYNC_DUR, 3 line vsync
     +------ PAL_MD
*/
bitflags! {
  pub struct ModeFlags: u8 {
    const SETUP = 1 << 1;
    const LINES625 = 1 << 2;
    const VSYNC_DUR = 1 << 3;
    const PAL_MD = 1 << 5;
  }
}

impl ModeFlags {
  pub const FIELD_MASK: u8 = 0xbe;

  pub fn for_standard(standard: VideoStandard) -> Self {
    match standard {
      VideoStandard::Ntsc => ModeFlags::SETUP | ModeFlags::VSYNC_DUR,
      VideoStandard::Ntsc60 => ModeFlags::VSYNC_DUR,
      VideoStandard::PalBdghi | VideoStandard::PalNc => ModeFlags::PAL_MD | ModeFlags::LINES625,
      VideoStandard::PalN => ModeFlags::PAL_MD | ModeFlags::SETUP | ModeFlags::LINES625 | ModeFlags::VSYNC_DUR,
      VideoStandard::PalM => ModeFlags::PAL_MD | ModeFlags::SETUP | ModeFlags::VSYNC_DUR,
      VideoStandard::Pal60 => ModeFlags::PAL_MD | ModeFlags::VSYNC_DUR,
    }
  }
}

/// Encoder values derived from a solved mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderTiming {
  pub h_clko: u32,
  pub v_activeo: u32,
  pub pll_int: u32,
  pub pll_fract: u32,
  /// PLL output recomputed from the quantized divider.
  pub pll_hz: f64,
  pub burst_start: u32,
  /// Includes the +128 the hardware adds, never below 128.
  pub burst_end: u32,
  pub hsync_width: u32,
  pub subcarrier_increment: u32,
  pub wss_increment: u32,
}

impl EncoderTiming {
  pub fn compute(mode: &ModeParameter) -> Self {
    let params = mode.standard.params();
    let ratio = mode.clk_ratio.value();
    let h_clko = mode.h_clko();

    let pll_ratio = (6.0 * (h_clko as f64 / params.hsync_period) * ratio * PLL_BASE_PERIOD * 65536.0 + 0.5) as u32;
    let pll_int = pll_ratio / 0x10000;
    let pll_fract = pll_ratio - pll_int * 0x10000;
    let pll_hz = (pll_int as f64 + pll_fract as f64 / 65536.0) / (6.0 * PLL_BASE_PERIOD * ratio);

    let samples = |seconds: f64| (seconds * pll_hz + 0.5) as u32;

    let subcarrier_increment =
      ((65536.0 * 65536.0) * (params.burst_hz * params.hsync_period / h_clko as f64) + 0.5) as u32;

    let wss_unit = match mode.standard {
      VideoStandard::Ntsc | VideoStandard::Ntsc60 => 2.234e-6,
      _ => 0.2e-6,
    };
    let wss_increment = (1048576.0 / (wss_unit * pll_hz) + 0.5) as u32;

    let timing = Self {
      h_clko,
      v_activeo: mode.v_activeo(),
      pll_int,
      pll_fract,
      pll_hz,
      burst_start: samples(params.burst_start),
      burst_end: samples(params.burst_end).max(128),
      hsync_width: samples(params.hsync_width),
      subcarrier_increment,
      wss_increment,
    };
    debug!("pll clock frequency={:.3} MHz", pll_hz / 1e6);
    timing
  }
}

fn timing_reset(p: &mut Program) {
  p.bus_update(ENCODER, REG_TIMING, 0x80, 0x80);
}

/// Drives the encoder as an RGB pass-through in pseudo-master mode.
pub fn vga_program(pll_int: u8) -> Program {
  let mut p = Program::new();
  p.bus_write(ENCODER, REG_RESET, 0x80)
    .bus_read(ENCODER, REG_CONFIG)
    .bus_write(ENCODER, REG_PLL_INT, 0x13) // pseudo-master
    .bus_write(ENCODER, 0x2e, 0xad) // HDTV_EN, sync disables, RASTER_SEL 01
    .bus_write(ENCODER, 0x32, 0x48) // DRVS 2, IN_MODE[3]
    .bus_write(ENCODER, 0x3c, 0x80) // MCOMPY
    .bus_write(ENCODER, 0x3e, 0x80) // MCOMPU
    .bus_write(ENCODER, 0x40, 0x80) // MCOMPV
    .bus_write(ENCODER, REG_TIMING, 0x46)
    .bus_write(ENCODER, 0x9c, 0x00)
    .bus_write(ENCODER, 0x9e, 0x00)
    .bus_write(ENCODER, REG_PLL_INT, pll_int)
    .bus_write(ENCODER, REG_RESET, 0x28) // SLAVER, DACDISD
    .bus_write(ENCODER, REG_EN_OUT, 0x01)
    .bus_write(ENCODER, 0xc6, 0x98) // 24 bit RGB multiplexed
    .bus_write(ENCODER, 0xce, 0xe1)
    .bus_write(ENCODER, 0xd6, 0x0c) // RGB / SCART / HDTV out
    .write32(nv::RAMDAC_OUTPUT, 0);
  timing_reset(&mut p);
  p
}

pub fn tv_program(mode: &ModeParameter, blanks: &BlankingParameter, timing: &EncoderTiming, connector: ConnectorType) -> Program {
  let mut p = Program::new();
  let f = |v: i64, shift: i32, mask: u8| field(v, shift, mask);

  p.bus_write(ENCODER, REG_CONFIG, 0x07) // autoconfig 800x600 PAL YCrCb
    .bus_read(ENCODER, REG_CONFIG)
    .bus_write(ENCODER, REG_PLL_INT, 0x13)
    .bus_write(ENCODER, 0x32, 0x28);

  let h_clki = mode.h_clki as i64;
  p.bus_update(ENCODER, 0x8e, 0x07, f(h_clki, 8, 0x07))
    .bus_write(ENCODER, 0x8a, lo8(h_clki));

  let h_clko = timing.h_clko as i64;
  p.bus_update(ENCODER, 0x86, 0x0f, f(h_clko, 8, 0x0f))
    .bus_write(ENCODER, 0x76, lo8(h_clko));

  let v_linesi = mode.v_linesi as i64;
  p.bus_update(ENCODER, 0x38, 0x02, f(v_linesi, 9, 0x02))
    .bus_update(ENCODER, 0x96, 0x03, f(v_linesi, 8, 0x03))
    .bus_write(ENCODER, 0x90, lo8(v_linesi));

  let v_activeo = timing.v_activeo as i64 + match mode.standard.family() {
    LineFamily::Lines525 => 1,
    LineFamily::Lines625 => 2,
  };
  p.bus_update(ENCODER, 0x86, 0x80, f(v_activeo, 1, 0x80))
    .bus_write(ENCODER, 0x84, lo8(v_activeo));

  let h_active = mode.h_active as i64 + 5;
  p.bus_update(ENCODER, 0x86, 0x70, f(h_active, 4, 0x70))
    .bus_write(ENCODER, 0x78, lo8(h_active));

  let v_activei = mode.v_activei as i64;
  p.bus_update(ENCODER, 0x96, 0x0c, f(v_activei, 6, 0x0c))
    .bus_write(ENCODER, 0x94, lo8(v_activei));

  let h_blanki = blanks.h_blanki as i64;
  p.bus_update(ENCODER, 0x38, 0x01, f(h_blanki, 9, 0x01))
    .bus_update(ENCODER, 0x8e, 0x08, f(h_blanki, 5, 0x08))
    .bus_write(ENCODER, 0x8c, lo8(h_blanki));

  let h_blanko = blanks.h_blanko as i64;
  p.bus_update(ENCODER, 0x9a, 0xc0, f(h_blanko, 2, 0xc0))
    .bus_write(ENCODER, 0x80, lo8(h_blanko));

  let vscale = blanks.vscale as i64;
  p.bus_update(ENCODER, 0x9a, 0x3f, f(vscale, 8, 0x3f))
    .bus_write(ENCODER, 0x98, lo8(vscale));

  p.bus_write(ENCODER, 0x82, lo8(blanks.v_blanko as i64))
    .bus_write(ENCODER, 0x92, lo8(blanks.v_blanki as i64));

  p.bus_update(ENCODER, REG_PLL_INT, 0x3f, timing.pll_int as u8)
    .bus_write(ENCODER, 0x9e, byte(timing.pll_fract, 1))
    .bus_write(ENCODER, 0x9c, byte(timing.pll_fract, 0));

  let three_halves = mode.clk_ratio == ClockRatio::ThreeHalves;
  p.bus_update(ENCODER, 0x38, 0x20, if three_halves { 0x20 } else { 0x00 });

  let burst_start = timing.burst_start as i64;
  p.bus_update(ENCODER, 0x38, 0x04, f(burst_start, 6, 0x04))
    .bus_write(ENCODER, 0x7c, lo8(burst_start));

  let burst_end = timing.burst_end as i64 - 128;
  p.bus_update(ENCODER, 0x38, 0x08, f(burst_end, 5, 0x08))
    .bus_write(ENCODER, 0x7e, lo8(burst_end));

  p.bus_write(ENCODER, 0x7a, lo8(timing.hsync_width as i64));

  let sc = timing.subcarrier_increment;
  p.bus_write(ENCODER, 0xae, byte(sc, 0))
    .bus_write(ENCODER, 0xb0, byte(sc, 1))
    .bus_write(ENCODER, 0xb2, byte(sc, 2))
    .bus_write(ENCODER, 0xb4, byte(sc, 3));

  let wss = timing.wss_increment;
  p.bus_write(ENCODER, 0x66, byte(wss, 0))
    .bus_write(ENCODER, 0x68, byte(wss, 1))
    .bus_write(ENCODER, 0x6a, byte(wss, 2) & 0x0f);

  p.bus_update(ENCODER, REG_MODE, ModeFlags::FIELD_MASK, ModeFlags::for_standard(mode.standard).bits());

  connector_routing(&mut p, connector);

  p.bus_write(ENCODER, REG_EN_OUT, 0x01);
  timing_reset(&mut p);
  p
}

/// Output muxing, sync levels and the matching GPU colour space per connector.
fn connector_routing(p: &mut Program, connector: ConnectorType) {
  // timing, brightness, sync amp, burst amp, dac enable, input mode, out mux, out mode, gpu output, border
  let (timing, y_off, sync_amp, burst_amp, dacs, in_mode, mux, out_mode, gpu_out, border) = match connector {
    ConnectorType::Composite | ConnectorType::SVideo => (0x46, 0x00, 0xe5, 0x74, 0x24, 0x9c, 0x19, 0x00, 2, 0x801080),
    ConnectorType::ScartRgb => (0x4e, 0xff, 0xe7, 0x77, 0x20, 0x98, 0xe1, 0x0c, 0, 0),
    ConnectorType::Hdtv => (0x46, 0x00, 0xe5, 0x74, 0x20, 0x9c, 0x21, 0x08, 2, 0x801080),
    ConnectorType::Vga => return,
  };
  p.bus_write(ENCODER, REG_TIMING, timing)
    .bus_write(ENCODER, 0x5a, y_off)
    .bus_write(ENCODER, 0xa4, sync_amp)
    .bus_write(ENCODER, 0xa6, burst_amp)
    .bus_write(ENCODER, REG_RESET, dacs)
    .bus_write(ENCODER, 0xc6, in_mode)
    .bus_write(ENCODER, 0xce, mux)
    .bus_write(ENCODER, 0xd6, out_mode)
    .write32(nv::RAMDAC_OUTPUT, gpu_out)
    .write32(nv::RAMDAC_BORDER, border);
}
