use log::{info, warn};

use crate::{
  blanking::{calc_blankings, BlankingParameter},
  detect::{detect_connector_type, detect_video_standard, ConnectorType},
  encoder::{tv_program, vga_program, EncoderTiming, ENCODER},
  error::TvOutError,
  gpu::{crtc, gpu_program, nv, GpuParameter, VGA_800X600_PLL_INT},
  mode::{Margins, ModeParameter, Overscan, Resolution, VideoMode},
  program::{apply, Bank, Devices, Program},
  solver::find_overscan_values,
  standard::{TvEncoding, VideoStandard},
};

/// ACPI controlled video output enable.
pub const PORT_VIDEO_ENABLE: u16 = 0x80d3;
pub const PORT_ACPI_D8: u16 = 0x80d8;
pub const PORT_ACPI_D6: u16 = 0x80d6;

/// Encoder brightness registers and the values restored after programming.
pub const BRIGHTNESS: [(u8, u8); 3] = [(0xa8, 0x81), (0xaa, 0x49), (0xac, 0x8c)];

const SEQ_INIT: [u8; 5] = [0x03, 0x21, 0x0f, 0x00, 0x06];
const GR_INIT: [u8; 9] = [0x00, 0x00, 0x00, 0x00, 0x00, 0x40, 0x05, 0x0f, 0xff];
const ATTR_TAIL: [u8; 5] = [0x01, 0x4a, 0x0f, 0x00, 0x00];

/// What the boot layer asks for. Unset fields are detected from the hardware.
#[derive(Debug, Clone, PartialEq)]
pub struct BootConfig {
  /// Raw boot menu index, see [`VideoMode`].
  pub video_mode: u8,
  pub standard: Option<VideoStandard>,
  pub connector: Option<ConnectorType>,
  pub overscan: Option<Overscan>,
  pub framebuffer_start: u32,
  pub bits_per_pixel: u32,
}

impl Default for BootConfig {
  fn default() -> Self {
    Self {
      video_mode: VideoMode::Mode800x600.index(),
      standard: None,
      connector: None,
      overscan: None,
      framebuffer_start: 0,
      bits_per_pixel: 32,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TvTiming {
  pub mode: ModeParameter,
  pub blanking: BlankingParameter,
  pub encoder: EncoderTiming,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  Vga,
  Tv(TvTiming),
  /// No timing fits the request; the encoder and GPU timing were left as they were.
  Skipped(TvOutError),
}

/// Handed to the kernel handoff once the display is up.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
  pub resolution: Resolution,
  pub margins: Margins,
  pub standard: VideoStandard,
  pub encoding: TvEncoding,
  pub connector: ConnectorType,
  pub av_pack: u8,
  pub bits_per_pixel: u32,
  pub overscan: Overscan,
  pub framebuffer_start: u32,
  pub brightness: [u8; 3],
  pub outcome: Outcome,
}

impl DisplayState {
  pub fn is_programmed(&self) -> bool {
    !matches!(self.outcome, Outcome::Skipped(_))
  }
}

pub struct OutputPlan {
  pub resolution: Resolution,
  pub margins: Margins,
  pub program: Program,
  pub outcome: Outcome,
}

/// Connector specific programming. Pure, nothing touches the hardware.
pub fn plan_output(
  config: &BootConfig,
  standard: VideoStandard,
  overscan: Overscan,
  connector: ConnectorType,
) -> Result<OutputPlan, TvOutError> {
  if connector == ConnectorType::Vga {
    let gpu = GpuParameter::vga_800x600();
    let mut program = vga_program(VGA_800X600_PLL_INT);
    program.append(gpu_program(&gpu));
    return Ok(OutputPlan {
      resolution: Resolution { width: gpu.xres, height: gpu.yres },
      margins: Margins { x: 20, y: 20 },
      program,
      outcome: Outcome::Vga,
    });
  }

  let mode = VideoMode::try_from(config.video_mode)?;
  let resolution = mode.resolution();
  let mut program = Program::new();
  for (reg, value) in mode.encoder_preset() {
    program.bus_write(ENCODER, *reg, *value);
  }

  let solved = find_overscan_values(resolution.width, resolution.height, overscan, config.bits_per_pixel, standard);
  let outcome = match solved {
    Ok(m) => {
      let blanking = calc_blankings(&m);
      let encoder = EncoderTiming::compute(&m);
      let achieved = m.overscan();
      info!(
        "{} {} on {}: overscan {:.2}% x {:.2}%",
        mode, standard, connector, achieved.horizontal * 100.0, achieved.vertical * 100.0
      );
      program.append(tv_program(&m, &blanking, &encoder, connector));
      program.append(gpu_program(&GpuParameter::for_tv(&m, &blanking)));
      Outcome::Tv(TvTiming { mode: m, blanking, encoder })
    }
    Err(e @ TvOutError::UnsupportedOverscanRequest { .. }) => {
      warn!("display timing not programmed: {}", e);
      Outcome::Skipped(e)
    }
    Err(e) => return Err(e),
  };

  Ok(OutputPlan { resolution, margins: mode.margins(), program, outcome })
}

/// Unlock, park the framebuffer, blank the output and reset the RAMDAC.
pub fn preamble_program(framebuffer_start: u32) -> Program {
  let mut p = Program::new();
  p.crtc(crtc::LOCK, crtc::UNLOCK_KEY)
    .write32(nv::PCRTC_START, framebuffer_start)
    .port(PORT_VIDEO_ENABLE, 5)
    .write32(nv::RAMDAC_FP_DEBUG, 0)
    .write32(nv::RAMDAC_TG_CONTROL, 0)
    .write32(nv::RAMDAC_TG_DEBUG, 0);
  for (i, offset) in nv::RAMDAC_TG_COEFF.iter().enumerate() {
    p.write32(*offset, if i == 0 { 0x10001000 } else { 0x10000000 });
  }
  // no magenta border in RGB
  p.write32(nv::RAMDAC_BORDER, 0)
    .crtc(crtc::UNDERLINE, 0x00)
    .crtc(crtc::MODE, 0xe3)
    .crtc(crtc::REPAINT0, 0x10)
    .crtc(crtc::ARBITRATION0, 0x05)
    .crtc(0x22, 0xff)
    .crtc(0x33, 0x11);
  p
}

/// VGA core bring-up, interrupts, scanout address and the brightness dim/undim.
pub fn common_init_program(framebuffer_start: u32) -> Program {
  let mut p = Program::new();
  // disable palette, then rearm the flip-flop so the attribute table starts on an index
  p.read8(Bank::INPUT_STATUS_1)
    .write8(Bank::ATTR, 0x20)
    .read8(Bank::INPUT_STATUS_1);

  p.crtc(crtc::HEAD_SELECT, 0x03);
  for (i, v) in SEQ_INIT.iter().enumerate() {
    p.seq(i as u8, *v);
  }
  for (i, v) in GR_INIT.iter().enumerate() {
    p.gr(i as u8, *v);
  }
  p.crtc(crtc::HEAD_SELECT, 0x00);

  for i in 0..15u8 {
    p.attr(i, i + 1);
  }
  for (i, v) in ATTR_TAIL.iter().enumerate() {
    p.attr(15 + i as u8, *v);
  }

  p.port(PORT_ACPI_D8, 4).port(PORT_ACPI_D6, 5);

  p.write32(nv::PCRTC_INTR_EN, 1)
    .write32(nv::PCRTC_INTR, 1)
    .write32(nv::PCRTC_INTR_EN, 1)
    .write32(nv::PMC_INTR_EN, 1)
    .write32(nv::PMC_INTR, 1)
    .write32(nv::PMC_INTR_EN, 1);

  p.write32(nv::PCRTC_FB_START, framebuffer_start)
    .write32(nv::PMC_FB_START, framebuffer_start)
    .port(PORT_VIDEO_ENABLE, 4);

  for (reg, _) in BRIGHTNESS {
    p.bus_write(ENCODER, reg, 0);
  }
  // reenable display
  p.seq(0x01, 0x01);
  for (reg, value) in BRIGHTNESS {
    p.bus_write(ENCODER, reg, value);
  }
  p
}

/// Runs the whole display bring-up once.
///
/// Bus failures abort immediately. A mode index outside the table is reported
/// before any register is written. A request the solver cannot meet is not an
/// error: the rest of the sequence still runs and the state says `Skipped`.
pub fn init_display(config: &BootConfig, dev: &mut Devices) -> Result<DisplayState, TvOutError> {
  let standard = match config.standard {
    Some(s) => s,
    None => detect_video_standard(dev.bus)?,
  };
  // read even when overridden, the raw code is reported
  let detected = detect_connector_type(dev.bus)?;
  let av_pack = detected.code;
  let connector = config.connector.unwrap_or(detected.connector);
  let encoding = standard.encoding();
  let overscan = config.overscan.unwrap_or_else(|| Overscan::for_encoding(encoding));
  info!("standard {}, AV pack {:#04x} ({}), mode index {}", standard, av_pack, connector, config.video_mode);

  let plan = plan_output(config, standard, overscan, connector)?;

  apply(&preamble_program(config.framebuffer_start), dev)?;
  apply(&plan.program, dev)?;
  apply(&common_init_program(config.framebuffer_start), dev)?;

  Ok(DisplayState {
    resolution: plan.resolution,
    margins: plan.margins,
    standard,
    encoding,
    connector,
    av_pack,
    bits_per_pixel: config.bits_per_pixel,
    overscan,
    framebuffer_start: config.framebuffer_start,
    brightness: BRIGHTNESS.map(|(_, v)| v),
    outcome: plan.outcome,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::program::Step;

  #[test]
  fn preamble_unlocks_first() {
    let p = preamble_program(0x3c00000);
    assert_eq!(p.steps()[0], Step::IndexedWrite { bank: Bank::Crtc, index: 0x1f, value: 0x57 });
    assert_eq!(p.steps()[1], Step::Write32 { offset: 0x600800, value: 0x3c00000 });
    assert_eq!(p.steps()[2], Step::PortOut { port: 0x80d3, value: 5 });
    assert!(p.steps().contains(&Step::Write32 { offset: 0x68089c, value: 0x10000000 }));
  }

  #[test]
  fn brightness_dims_before_undim() {
    let p = common_init_program(0);
    let writes: Vec<_> = p.steps().iter()
      .filter_map(|s| match s {
        Step::BusWrite { reg, value, .. } => Some((*reg, *value)),
        _ => None,
      })
      .collect();
    assert_eq!(writes, vec![(0xa8, 0), (0xaa, 0), (0xac, 0), (0xa8, 0x81), (0xaa, 0x49), (0xac, 0x8c)]);
  }

  #[test]
  fn attribute_table() {
    let p = common_init_program(0);
    let attrs: Vec<_> = p.steps().iter()
      .filter_map(|s| match s {
        Step::IndexedWrite { bank: Bank::Attribute, index, value } => Some((*index, *value)),
        _ => None,
      })
      .collect();
    assert_eq!(attrs.len(), 20);
    assert_eq!(attrs[0], (0, 0x01));
    assert_eq!(attrs[14], (14, 0x0f));
    assert_eq!(attrs[15], (15, 0x01));
    assert_eq!(attrs[16], (16, 0x4a));
  }

  #[test]
  fn unknown_mode_fails_planning() {
    let config = BootConfig { video_mode: 7, ..BootConfig::default() };
    let res = plan_output(&config, VideoStandard::PalBdghi, Overscan::PAL, ConnectorType::Composite);
    assert!(matches!(res, Err(TvOutError::UnrecognizedModeIndex(7))));
  }

  #[test]
  fn vga_ignores_mode_index() {
    let config = BootConfig { video_mode: 7, ..BootConfig::default() };
    let plan = plan_output(&config, VideoStandard::Ntsc, Overscan::NTSC, ConnectorType::Vga).unwrap();
    assert_eq!(plan.outcome, Outcome::Vga);
    assert_eq!(plan.resolution, Resolution { width: 800, height: 600 });
  }

  #[test]
  fn wide_mode_presets_encoder() {
    let config = BootConfig { video_mode: VideoMode::Mode1024x576.index(), ..BootConfig::default() };
    let plan = plan_output(&config, VideoStandard::PalBdghi, Overscan::PAL, ConnectorType::Composite).unwrap();
    assert_eq!(plan.program.steps()[0], Step::BusWrite { device: ENCODER, reg: 0x60, value: 0xc7 });
    assert!(matches!(plan.outcome, Outcome::Tv(_)));
  }
}
