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

pub mod shared_bus;
pub mod spi_device;

use crate::register::Register;
use crate::Error;

pub use shared_bus::{SharedSpiInterface, SpiBusError};
pub use spi_device::SpiInterface;

/// Bus access used by the driver. One logical operation is always bracketed by
/// [`claim`](RegisterInterface::claim) and [`release`](RegisterInterface::release), with one
/// framed transaction per register in between.
pub trait RegisterInterface {
    type Error;

    /// Take exclusive use of the bus. Returns [`Error::BusBusy`] if another user holds it.
    fn claim(&mut self) -> Result<(), Error<Self::Error>>;

    /// Give the bus back. Must be safe to call after a failed register access.
    fn release(&mut self);

    /// Send the register's read command and return the single data byte clocked back.
    fn read_register(&mut self, register: Register) -> Result<u8, Self::Error>;

    /// Send the register's write command followed by `value` in one 16 bit frame.
    fn write_register(&mut self, register: Register, value: u8) -> Result<(), Self::Error>;
}
