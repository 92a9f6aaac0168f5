use std::{fmt, str::FromStr};

use hwbus::SmBus;
use log::debug;

use crate::{error::TvOutError, standard::VideoStandard};

pub const AV_PACK_DEVICE: u8 = 0x10;
pub const AV_PACK_REG: u8 = 0x04;
pub const EEPROM_DEVICE: u8 = 0x54;
pub const REGION_REG: u8 = 0x5a;
/// EEPROM region byte of an NTSC box.
pub const REGION_NTSC: u8 = 0x40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorType {
  ScartRgb,
  Hdtv,
  Vga,
  SVideo,
  Composite,
}

impl ConnectorType {
  /// Unknown codes fall back to composite.
  pub fn from_av_pack(code: u8) -> Self {
    match code {
      0 => ConnectorType::ScartRgb,
      1 => ConnectorType::Hdtv,
      2 => ConnectorType::Vga,
      4 => ConnectorType::SVideo,
      6 => ConnectorType::Composite,
      _ => ConnectorType::Composite,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      ConnectorType::ScartRgb => "scart",
      ConnectorType::Hdtv => "hdtv",
      ConnectorType::Vga => "vga",
      ConnectorType::SVideo => "svideo",
      ConnectorType::Composite => "composite",
    }
  }
}

impl fmt::Display for ConnectorType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for ConnectorType {
  type Err = TvOutError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "scart" | "scart-rgb" => Ok(ConnectorType::ScartRgb),
      "hdtv" | "component" => Ok(ConnectorType::Hdtv),
      "vga" => Ok(ConnectorType::Vga),
      "svideo" | "s-video" => Ok(ConnectorType::SVideo),
      "composite" => Ok(ConnectorType::Composite),
      _ => Err(TvOutError::UnknownConnector(s.to_string())),
    }
  }
}

/// Raw AV pack code as read from the SMC, and what it decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvPack {
  pub code: u8,
  pub connector: ConnectorType,
}

pub fn detect_connector_type(bus: &mut dyn SmBus) -> Result<AvPack, TvOutError> {
  let code = bus.read_byte(AV_PACK_DEVICE, AV_PACK_REG)?;
  let connector = ConnectorType::from_av_pack(code);
  debug!("AV pack {:#04x}: {}", code, connector);
  Ok(AvPack { code, connector })
}

pub fn standard_from_region(region: u8) -> VideoStandard {
  if region == REGION_NTSC { VideoStandard::Ntsc } else { VideoStandard::PalBdghi }
}

pub fn detect_video_standard(bus: &mut dyn SmBus) -> Result<VideoStandard, TvOutError> {
  let region = bus.read_byte(EEPROM_DEVICE, REGION_REG)?;
  let standard = standard_from_region(region);
  debug!("EEPROM region {:#04x}: {}", region, standard);
  Ok(standard)
}

#[cfg(test)]
mod tests {
  use hwbus::{BusError, SimulatedBus};

  use super::*;

  fn sut(av_pack: u8, region: u8) -> SimulatedBus {
    let mut bus = SimulatedBus::new();
    bus.preset(AV_PACK_DEVICE, AV_PACK_REG, av_pack);
    bus.preset(EEPROM_DEVICE, REGION_REG, region);
    bus
  }

  #[test]
  fn av_pack_codes() {
    let expected = [
      (0, ConnectorType::ScartRgb),
      (1, ConnectorType::Hdtv),
      (2, ConnectorType::Vga),
      (3, ConnectorType::Composite),
      (4, ConnectorType::SVideo),
      (5, ConnectorType::Composite),
      (6, ConnectorType::Composite),
      (7, ConnectorType::Composite),
      (0xff, ConnectorType::Composite),
    ];
    for (code, connector) in expected {
      assert_eq!(detect_connector_type(&mut sut(code, 0)), Ok(AvPack { code, connector }), "code {}", code);
    }
  }

  #[test]
  fn region_sentinel() {
    assert_eq!(detect_video_standard(&mut sut(6, 0x40)), Ok(VideoStandard::Ntsc));
    assert_eq!(detect_video_standard(&mut sut(6, 0x80)), Ok(VideoStandard::PalBdghi));
    assert_eq!(detect_video_standard(&mut sut(6, 0x00)), Ok(VideoStandard::PalBdghi));
  }

  #[test]
  fn detection_is_idempotent() {
    let mut bus = sut(4, 0x40);
    let first = (detect_video_standard(&mut bus), detect_connector_type(&mut bus));
    let second = (detect_video_standard(&mut bus), detect_connector_type(&mut bus));
    assert_eq!(first, second);
  }

  #[test]
  fn missing_eeprom() {
    let mut bus = SimulatedBus::new();
    assert_eq!(detect_video_standard(&mut bus), Err(TvOutError::Bus(BusError::NoDevice(EEPROM_DEVICE))));
  }

  #[test]
  fn parse_connector() {
    assert_eq!("S-Video".parse::<ConnectorType>(), Ok(ConnectorType::SVideo));
    assert!("dvi".parse::<ConnectorType>().is_err());
  }
}
