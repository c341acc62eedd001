// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::interface::RegisterInterface;
use crate::register::Register;
use crate::Error;
use embedded_hal::spi::{Operation, SpiDevice};

/// Register access over an [`SpiDevice`], which asserts chip select for each transaction.
///
/// The device arbitrates the bus per transaction, so claiming always succeeds. Owning the
/// device (e.g. an exclusive device) is what keeps other traffic out of a whole operation.
pub struct SpiInterface<SPI> {
    spi: SPI,
}

impl<SPI> SpiInterface<SPI>
where
    SPI: SpiDevice,
{
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    pub fn destroy(self) -> SPI {
        self.spi
    }
}

impl<SPI> RegisterInterface for SpiInterface<SPI>
where
    SPI: SpiDevice,
{
    type Error = SPI::Error;

    fn claim(&mut self) -> Result<(), Error<Self::Error>> {
        Ok(())
    }

    fn release(&mut self) {}

    fn read_register(&mut self, register: Register) -> Result<u8, Self::Error> {
        let mut data = [0u8];
        self.spi.transaction(&mut [
            Operation::Write(&[register.read_command()]),
            Operation::Read(&mut data),
        ])?;
        Ok(data[0])
    }

    fn write_register(&mut self, register: Register, value: u8) -> Result<(), Self::Error> {
        self.spi.write(&[register.write_command(), value])
    }
}
