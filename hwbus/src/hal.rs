//! Adapter from an `embedded-hal` blocking I2C master to [`SmBus`].

use embedded_hal::blocking::i2c::{Write, WriteRead};

use crate::{BusError, SmBus};

pub struct I2cBus<I>(I);

impl<I> I2cBus<I> {
  pub fn new(i2c: I) -> Self {
    Self(i2c)
  }

  pub fn release(self) -> I {
    self.0
  }
}

impl<I, E> SmBus for I2cBus<I>
where
  I: Write<Error = E> + WriteRead<Error = E>,
{
  fn read_byte(&mut self, device: u8, reg: u8) -> Result<u8, BusError> {
    let mut buf = [0u8; 1];
    self.0.write_read(device, &[reg], &mut buf)
      .map_err(|_| BusError::Nack { device, reg })?;
    Ok(buf[0])
  }

  fn write_byte(&mut self, device: u8, reg: u8, value: u8) -> Result<(), BusError> {
    self.0.write(device, &[reg, value])
      .map_err(|_| BusError::Nack { device, reg })
  }
}
