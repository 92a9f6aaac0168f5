use std::{error::Error, fs, path::Path};

use common::utils::parse_hex;
use log::debug;
use serde::Deserialize;
use tvout::{
  boot::BootConfig,
  detect::{ConnectorType, REGION_NTSC},
  mode::Overscan,
  sim::SimulatedBox,
  standard::VideoStandard,
};

/// Integer written either as a plain number or as a hex string (`"0x40"`, `"3c00000"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Hex {
  Int(u32),
  Str(String),
}

impl Hex {
  pub fn value(&self) -> Result<u32, Box<dyn Error>> {
    match self {
      Hex::Int(v) => Ok(*v),
      Hex::Str(s) => Ok(parse_hex(s)?),
    }
  }

  pub fn byte(&self) -> Result<u8, Box<dyn Error>> {
    Ok(u8::try_from(self.value()?)?)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverscanSpec {
  pub horizontal: f64,
  pub vertical: f64,
}

/// The simulated box a profile boots on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Hardware {
  pub av_pack: Hex,
  pub region: Hex,
}

impl Default for Hardware {
  fn default() -> Self {
    Self { av_pack: Hex::Int(6), region: Hex::Int(REGION_NTSC as u32) }
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
  pub video_mode: Hex,
  pub standard: Option<String>,
  pub connector: Option<String>,
  pub overscan: Option<OverscanSpec>,
  pub framebuffer_start: Hex,
  pub bits_per_pixel: u32,
  pub hardware: Hardware,
}

impl Default for Profile {
  fn default() -> Self {
    let config = BootConfig::default();
    Self {
      video_mode: Hex::Int(config.video_mode as u32),
      standard: None,
      connector: None,
      overscan: None,
      framebuffer_start: Hex::Int(config.framebuffer_start),
      bits_per_pixel: config.bits_per_pixel,
      hardware: Hardware::default(),
    }
  }
}

impl Profile {
  pub fn load(path: &Path) -> Result<Profile, Box<dyn Error>> {
    let f = fs::File::open(path)
      .map_err(|e| format!("could not open profile ({}): {}", path.display(), e))?;
    let profile: Profile = serde_yaml::from_reader(f)?;
    debug!("profile {}: {:?}", path.display(), profile);
    Ok(profile)
  }

  pub fn parse(src: &str) -> Result<Profile, Box<dyn Error>> {
    Ok(serde_yaml::from_str(src)?)
  }

  pub fn boot_config(&self) -> Result<BootConfig, Box<dyn Error>> {
    let standard = self.standard.as_deref().map(str::parse::<VideoStandard>).transpose()?;
    let connector = self.connector.as_deref().map(str::parse::<ConnectorType>).transpose()?;
    Ok(BootConfig {
      video_mode: self.video_mode.byte()?,
      standard,
      connector,
      overscan: self.overscan.map(|o| Overscan { horizontal: o.horizontal, vertical: o.vertical }),
      framebuffer_start: self.framebuffer_start.value()?,
      bits_per_pixel: self.bits_per_pixel,
    })
  }

  pub fn simulated_box(&self) -> Result<SimulatedBox, Box<dyn Error>> {
    Ok(SimulatedBox::new(self.hardware.av_pack.byte()?, self.hardware.region.byte()?))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_profile_is_default_boot() {
    let p = Profile::parse("{}").unwrap();
    assert_eq!(p.boot_config().unwrap(), BootConfig::default());
    assert_eq!(p.hardware.region.byte().unwrap(), REGION_NTSC);
  }

  #[test]
  fn hex_strings() {
    let p = Profile::parse(r#"
video_mode: 4
standard: pal-m
connector: svideo
framebuffer_start: "0x03c00000"
hardware:
  av_pack: "0x04"
  region: "80"
"#).unwrap();
    let config = p.boot_config().unwrap();
    assert_eq!(config.video_mode, 4);
    assert_eq!(config.standard, Some(VideoStandard::PalM));
    assert_eq!(config.connector, Some(ConnectorType::SVideo));
    assert_eq!(config.framebuffer_start, 0x3c00000);
    assert_eq!(p.hardware.av_pack.byte().unwrap(), 4);
    assert_eq!(p.hardware.region.byte().unwrap(), 0x80);
  }

  #[test]
  fn overscan_override() {
    let p = Profile::parse("overscan: { horizontal: 0.1, vertical: 0.12 }").unwrap();
    assert_eq!(p.boot_config().unwrap().overscan, Some(Overscan { horizontal: 0.1, vertical: 0.12 }));
  }

  #[test]
  fn rejects_bad_values() {
    assert!(Profile::parse("standard: secam").unwrap().boot_config().is_err());
    assert!(Profile::parse("video_mode: \"0x100\"").unwrap().boot_config().is_err());
    assert!(Profile::parse("framebuffer_start: \"zz\"").unwrap().boot_config().is_err());
    assert!(Profile::parse("colour: red").is_err());
  }
}
