use std::{fmt, str::FromStr};

use phf::phf_map;

use crate::error::TvOutError;

/// Analog output standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VideoStandard {
  Ntsc,
  Ntsc60,
  PalBdghi,
  PalN,
  PalNc,
  PalM,
  Pal60,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFamily {
  Lines525,
  Lines625,
}

/// Region tag handed to later boot stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TvEncoding {
  Ntsc,
  Pal,
}

/// Physical timing of one standard. Times are in seconds, frequencies in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardParams {
  pub burst_hz: f64,
  pub burst_start: f64,
  pub burst_end: f64,
  pub hsync_width: f64,
  pub hsync_period: f64,
  pub active_begin: f64,
  pub image_centre: f64,
  pub blank_begin_to_hsync: f64,
  pub active_lines_out: u32,
  pub total_lines_out: f64,
}

impl StandardParams {
  /// Active part of an output line.
  pub fn active_time_out(&self) -> f64 {
    self.hsync_period - (self.blank_begin_to_hsync + self.active_begin)
  }

  pub fn validate(&self) -> Result<(), TvOutError> {
    let fields = [
      ("burst_hz", self.burst_hz),
      ("burst_start", self.burst_start),
      ("burst_end", self.burst_end),
      ("hsync_width", self.hsync_width),
      ("hsync_period", self.hsync_period),
      ("active_begin", self.active_begin),
      ("image_centre", self.image_centre),
      ("blank_begin_to_hsync", self.blank_begin_to_hsync),
      ("total_lines_out", self.total_lines_out),
    ];
    for (name, v) in fields {
      if !v.is_finite() || v <= 0.0 {
        return Err(TvOutError::InvalidStandardParams(name));
      }
    }
    if self.active_lines_out == 0 || self.active_lines_out as f64 > self.total_lines_out {
      return Err(TvOutError::InvalidStandardParams("active_lines_out"));
    }
    if self.burst_end <= self.burst_start {
      return Err(TvOutError::InvalidStandardParams("burst_end"));
    }
    if self.active_time_out() <= 0.0 {
      return Err(TvOutError::InvalidStandardParams("hsync_period"));
    }
    Ok(())
  }
}

const NTSC: StandardParams = StandardParams {
  burst_hz: 3579545.00,
  burst_start: 0.0000053,
  burst_end: 0.00000782,
  hsync_width: 0.0000047,
  hsync_period: 0.000063555,
  active_begin: 0.0000094,
  image_centre: 0.000035667,
  blank_begin_to_hsync: 0.0000015,
  active_lines_out: 243,
  total_lines_out: 262.5,
};

const NTSC60: StandardParams = StandardParams {
  hsync_period: 0.000064000,
  ..NTSC
};

const PAL_BDGHI: StandardParams = StandardParams {
  burst_hz: 4433618.75,
  burst_start: 0.0000056,
  burst_end: 0.00000785,
  hsync_width: 0.0000047,
  hsync_period: 0.000064000,
  active_begin: 0.0000105,
  image_centre: 0.000036407,
  blank_begin_to_hsync: 0.0000015,
  active_lines_out: 288,
  total_lines_out: 312.5,
};

const PAL_N: StandardParams = StandardParams {
  active_begin: 0.0000094,
  image_centre: 0.000035667,
  ..PAL_BDGHI
};

const PAL_NC: StandardParams = StandardParams {
  burst_hz: 3582056.25,
  burst_end: 0.00000811,
  ..PAL_BDGHI
};

const PAL_M: StandardParams = StandardParams {
  burst_hz: 3575611.88,
  burst_start: 0.0000058,
  burst_end: 0.00000832,
  ..NTSC
};

const PAL60: StandardParams = StandardParams {
  burst_hz: 4433619.49,
  burst_start: 0.0000053,
  burst_end: 0.00000755,
  active_begin: 0.0000105,
  image_centre: 0.000036407,
  ..NTSC
};

static NAMES: phf::Map<&'static str, VideoStandard> = phf_map! {
  "ntsc" => VideoStandard::Ntsc,
  "ntsc-m" => VideoStandard::Ntsc,
  "ntsc60" => VideoStandard::Ntsc60,
  "pal" => VideoStandard::PalBdghi,
  "pal-bdghi" => VideoStandard::PalBdghi,
  "pal-n" => VideoStandard::PalN,
  "pal-nc" => VideoStandard::PalNc,
  "pal-m" => VideoStandard::PalM,
  "pal60" => VideoStandard::Pal60,
};

impl VideoStandard {
  pub const ALL: [VideoStandard; 7] = [
    VideoStandard::Ntsc,
    VideoStandard::Ntsc60,
    VideoStandard::PalBdghi,
    VideoStandard::PalN,
    VideoStandard::PalNc,
    VideoStandard::PalM,
    VideoStandard::Pal60,
  ];

  pub fn params(self) -> &'static StandardParams {
    match self {
      VideoStandard::Ntsc => &NTSC,
      VideoStandard::Ntsc60 => &NTSC60,
      VideoStandard::PalBdghi => &PAL_BDGHI,
      VideoStandard::PalN => &PAL_N,
      VideoStandard::PalNc => &PAL_NC,
      VideoStandard::PalM => &PAL_M,
      VideoStandard::Pal60 => &PAL60,
    }
  }

  pub fn family(self) -> LineFamily {
    match self {
      VideoStandard::Ntsc | VideoStandard::Ntsc60 | VideoStandard::PalM | VideoStandard::Pal60 => LineFamily::Lines525,
      VideoStandard::PalBdghi | VideoStandard::PalN | VideoStandard::PalNc => LineFamily::Lines625,
    }
  }

  pub fn encoding(self) -> TvEncoding {
    match self {
      VideoStandard::Ntsc | VideoStandard::Ntsc60 => TvEncoding::Ntsc,
      _ => TvEncoding::Pal,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      VideoStandard::Ntsc => "NTSC",
      VideoStandard::Ntsc60 => "NTSC60",
      VideoStandard::PalBdghi => "PAL-BDGHI",
      VideoStandard::PalN => "PAL-N",
      VideoStandard::PalNc => "PAL-NC",
      VideoStandard::PalM => "PAL-M",
      VideoStandard::Pal60 => "PAL60",
    }
  }
}

impl fmt::Display for VideoStandard {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for VideoStandard {
  type Err = TvOutError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    NAMES.get(s.trim().to_ascii_lowercase().as_str())
      .copied()
      .ok_or_else(|| TvOutError::UnknownStandard(s.to_string()))
  }
}
