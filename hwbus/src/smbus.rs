use alloc::collections::BTreeMap;
use core::fmt;

/// Serial configuration bus, one byte per transaction at (device, register).
pub trait SmBus {
  fn read_byte(&mut self, device: u8, reg: u8) -> Result<u8, BusError>;
  fn write_byte(&mut self, device: u8, reg: u8, value: u8) -> Result<(), BusError>;

  /// Word form used by boot firmware: register in the high byte, value in the low byte.
  fn transmit_word(&mut self, device: u8, word: u16) -> Result<(), BusError> {
    self.write_byte(device, (word >> 8) as u8, word as u8)
  }

  /// Read-modify-write of the bits in `mask`. Returns the byte written.
  fn update_byte(&mut self, device: u8, reg: u8, mask: u8, value: u8) -> Result<u8, BusError> {
    let old = self.read_byte(device, reg)?;
    let new = common::bits::merge(old, mask, value);
    self.write_byte(device, reg, new)?;
    Ok(new)
  }
}

impl<T: SmBus + ?Sized> SmBus for &mut T {
  fn read_byte(&mut self, device: u8, reg: u8) -> Result<u8, BusError> {
    (**self).read_byte(device, reg)
  }

  fn write_byte(&mut self, device: u8, reg: u8, value: u8) -> Result<(), BusError> {
    (**self).write_byte(device, reg, value)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
  NoDevice(u8),
  Nack { device: u8, reg: u8 },
}

impl fmt::Display for BusError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BusError::NoDevice(device) => write!(f, "no device answering at {:#04x}", device),
      BusError::Nack { device, reg } => write!(f, "device {:#04x} did not ack register {:#04x}", device, reg),
    }
  }
}

#[cfg(feature = "std")]
impl std::error::Error for BusError {}

/// In-memory bus. Every attached device is a flat 256 byte register file.
#[derive(Default, Clone)]
pub struct SimulatedBus {
  devices: BTreeMap<u8, [u8; 256]>,
}

impl SimulatedBus {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn attach(&mut self, device: u8) -> &mut Self {
    self.devices.entry(device).or_insert([0; 256]);
    self
  }

  pub fn with_device(mut self, device: u8) -> Self {
    self.attach(device);
    self
  }

  /// Presets a register, attaching the device if needed.
  pub fn preset(&mut self, device: u8, reg: u8, value: u8) {
    self.devices.entry(device).or_insert([0; 256])[reg as usize] = value;
  }

  pub fn peek(&self, device: u8, reg: u8) -> Option<u8> {
    self.devices.get(&device).map(|regs| regs[reg as usize])
  }

  pub fn registers(&self, device: u8) -> Option<&[u8; 256]> {
    self.devices.get(&device)
  }
}

impl SmBus for SimulatedBus {
  fn read_byte(&mut self, device: u8, reg: u8) -> Result<u8, BusError> {
    self.peek(device, reg).ok_or(BusError::NoDevice(device))
  }

  fn write_byte(&mut self, device: u8, reg: u8, value: u8) -> Result<(), BusError> {
    let regs = self.devices.get_mut(&device).ok_or(BusError::NoDevice(device))?;
    regs[reg as usize] = value;
    Ok(())
  }
}
