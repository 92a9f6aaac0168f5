use std::{convert::TryFrom, fmt, str::FromStr};

use crate::{error::TvOutError, standard::{TvEncoding, VideoStandard}};

/// Framebuffer resolutions the TV path can be asked for, by boot menu index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoMode {
  Mode640x480,
  Mode640x576,
  Mode720x576,
  Mode800x600,
  Mode1024x576,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
  pub width: u32,
  pub height: u32,
}

/// Recommended safe-area margins for a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Margins {
  pub x: u32,
  pub y: u32,
}

impl VideoMode {
  pub const ALL: [VideoMode; 5] = [
    VideoMode::Mode640x480,
    VideoMode::Mode640x576,
    VideoMode::Mode720x576,
    VideoMode::Mode800x600,
    VideoMode::Mode1024x576,
  ];

  pub fn index(self) -> u8 {
    self as u8
  }

  pub fn resolution(self) -> Resolution {
    let (width, height) = match self {
      VideoMode::Mode640x480 => (640, 480),
      VideoMode::Mode640x576 => (640, 576),
      VideoMode::Mode720x576 => (720, 576),
      VideoMode::Mode800x600 => (800, 600),
      VideoMode::Mode1024x576 => (1024, 576),
    };
    Resolution { width, height }
  }

  pub fn margins(self) -> Margins {
    match self {
      VideoMode::Mode640x480 => Margins { x: 0, y: 0 },
      VideoMode::Mode640x576 | VideoMode::Mode720x576 => Margins { x: 40, y: 40 },
      VideoMode::Mode800x600 | VideoMode::Mode1024x576 => Margins { x: 20, y: 20 },
    }
  }

  /// Encoder registers written before solving, (register, value).
  pub fn encoder_preset(self) -> &'static [(u8, u8)] {
    match self {
      VideoMode::Mode1024x576 => &[(0x60, 0xc7), (0x62, 0x00), (0x64, 0x00)],
      _ => &[],
    }
  }
}

impl TryFrom<u8> for VideoMode {
  type Error = TvOutError;

  fn try_from(index: u8) -> Result<Self, Self::Error> {
    VideoMode::ALL.get(index as usize)
      .copied()
      .ok_or(TvOutError::UnrecognizedModeIndex(index))
  }
}

impl FromStr for VideoMode {
  type Err = TvOutError;

  /// Accepts `WIDTHxHEIGHT` or a menu index.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if let Ok(index) = s.parse::<u8>() {
      return VideoMode::try_from(index);
    }
    VideoMode::ALL.into_iter()
      .find(|m| m.to_string().eq_ignore_ascii_case(s))
      .ok_or_else(|| TvOutError::UnknownMode(s.to_string()))
  }
}

impl fmt::Display for VideoMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let r = self.resolution();
    write!(f, "{}x{}", r.width, r.height)
  }
}

/// Target overscan ratios, fractions of the analog active picture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overscan {
  pub horizontal: f64,
  pub vertical: f64,
}

impl Overscan {
  pub const NTSC: Overscan = Overscan { horizontal: 0.1511, vertical: 0.1481 };
  pub const PAL: Overscan = Overscan { horizontal: 0.1344, vertical: 0.1424 };

  pub fn for_encoding(encoding: TvEncoding) -> Self {
    match encoding {
      TvEncoding::Ntsc => Overscan::NTSC,
      TvEncoding::Pal => Overscan::PAL,
    }
  }
}

/// 1.0 or 3:2 pixel repetition between encoder input and output clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockRatio {
  Unity,
  ThreeHalves,
}

impl ClockRatio {
  pub const ALL: [ClockRatio; 2] = [ClockRatio::Unity, ClockRatio::ThreeHalves];

  pub fn value(self) -> f64 {
    match self {
      ClockRatio::Unity => 1.0,
      ClockRatio::ThreeHalves => 1.5,
    }
  }
}

/// A solved timing: the request plus the input line count, input clock and clock ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeParameter {
  pub standard: VideoStandard,
  pub h_active: u32,
  pub v_activei: u32,
  pub bpp: u32,
  pub v_linesi: u32,
  pub h_clki: u32,
  pub clk_ratio: ClockRatio,
}

impl ModeParameter {
  /// Encoder output clocks per line.
  pub fn h_clko(&self) -> u32 {
    let tlo = self.standard.params().total_lines_out;
    ((self.v_linesi as f64 * self.h_clki as f64) / (tlo * self.clk_ratio.value()) + 0.5) as u32
  }

  /// Output lines covered by the input picture, rounded up.
  pub fn v_activeo(&self) -> u32 {
    let tlo = self.standard.params().total_lines_out;
    ((self.v_activei as f64 * tlo + self.v_linesi as f64 - 1.0) / self.v_linesi as f64) as u32
  }

  /// Overscan actually achieved by this timing.
  pub fn overscan(&self) -> Overscan {
    let params = self.standard.params();
    let ato = params.active_time_out();
    let horizontal = 1.0 - ((2.0 * self.h_active as f64 / self.h_clko() as f64) / (ato / params.hsync_period));
    let vertical = 1.0 - (self.v_activeo() as f64 / params.active_lines_out as f64);
    Overscan { horizontal, vertical }
  }

  /// |lines * clock - nominal lines * output clock * ratio|
  pub fn rational_error(&self) -> f64 {
    let tlo = self.standard.params().total_lines_out;
    ((self.v_linesi as u64 * self.h_clki as u64) as f64 - tlo * self.h_clko() as f64 * self.clk_ratio.value()).abs()
  }

  pub fn pixel_depth(&self) -> u32 {
    (self.bpp + 1) / 8
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn index_roundtrip() {
    for mode in VideoMode::ALL {
      assert_eq!(VideoMode::try_from(mode.index()), Ok(mode));
    }
    assert_eq!(VideoMode::try_from(5), Err(TvOutError::UnrecognizedModeIndex(5)));
    assert_eq!(VideoMode::try_from(0xff), Err(TvOutError::UnrecognizedModeIndex(0xff)));
  }

  #[test]
  fn parse() {
    assert_eq!("800x600".parse::<VideoMode>(), Ok(VideoMode::Mode800x600));
    assert_eq!("1024X576".parse::<VideoMode>(), Ok(VideoMode::Mode1024x576));
    assert_eq!("2".parse::<VideoMode>(), Ok(VideoMode::Mode720x576));
    assert_eq!("9".parse::<VideoMode>(), Err(TvOutError::UnrecognizedModeIndex(9)));
    assert!(matches!("720x480".parse::<VideoMode>(), Err(TvOutError::UnknownMode(_))));
  }

  #[test]
  fn margins_and_presets() {
    assert_eq!(VideoMode::Mode640x480.margins(), Margins { x: 0, y: 0 });
    assert_eq!(VideoMode::Mode720x576.margins(), Margins { x: 40, y: 40 });
    assert_eq!(VideoMode::Mode1024x576.margins(), Margins { x: 20, y: 20 });
    assert_eq!(VideoMode::Mode1024x576.encoder_preset().len(), 3);
    assert!(VideoMode::Mode800x600.encoder_preset().is_empty());
  }

  #[test]
  fn derived_clocks() {
    let mode = ModeParameter {
      standard: VideoStandard::PalBdghi,
      h_active: 800,
      v_activei: 600,
      bpp: 32,
      v_linesi: 750,
      h_clki: 1420,
      clk_ratio: ClockRatio::ThreeHalves,
    };
    assert_eq!(mode.h_clko(), 2272);
    assert_eq!(mode.v_activeo(), 250);
    assert_eq!(mode.pixel_depth(), 4);
    assert!(mode.rational_error() < 1e-3);
  }
}
