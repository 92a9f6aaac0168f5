pub use hwbus;

pub mod standard;
pub mod detect;
pub mod mode;
pub mod solver;
pub mod blanking;
pub mod program;
pub mod gpu;
pub mod encoder;
pub mod boot;
pub mod sim;

pub mod error {
  use hwbus::BusError;

  use crate::standard::VideoStandard;

  #[derive(Debug, Clone, PartialEq, Eq)]
  pub enum TvOutError {
    UnsupportedOverscanRequest { standard: VideoStandard, width: u32, height: u32 },
    UnrecognizedModeIndex(u8),
    InvalidOverscan,
    InvalidStandardParams(&'static str),
    UnknownStandard(String),
    UnknownConnector(String),
    UnknownMode(String),
    Bus(BusError),
  }

  impl std::error::Error for TvOutError {}

  impl std::fmt::Display for TvOutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      match self {
        TvOutError::UnsupportedOverscanRequest { standard, width, height } =>
          write!(f, "no timing solution for {}x{} on {}", width, height, standard),
        TvOutError::Bus(e) => write!(f, "bus: {}", e),
        _ => write!(f, "{:?}", self),
      }
    }
  }

  impl From<BusError> for TvOutError {
    fn from(e: BusError) -> Self {
      TvOutError::Bus(e)
    }
  }
}
