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
use core::cell::{RefCell, RefMut};
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiBusError<SpiE, PinE> {
    Spi(SpiE),
    ChipSelect(PinE),
    /// A register was accessed without claiming the bus first.
    NotClaimed,
}

/// Register access over an [`SpiBus`] shared with other devices through a [`RefCell`].
///
/// Claiming borrows the bus for the whole operation so nothing else on the bus can run
/// between register frames. Chip select is driven by this interface around every frame.
pub struct SharedSpiInterface<'a, BUS, CS> {
    bus: &'a RefCell<BUS>,
    claimed: Option<RefMut<'a, BUS>>,
    cs: CS,
}

impl<'a, BUS, CS> SharedSpiInterface<'a, BUS, CS>
where
    BUS: SpiBus,
    CS: OutputPin,
{
    /// Drives chip select inactive. Fails with [`Error::BusUnavailable`] if the pin can't be driven.
    pub fn new(
        bus: &'a RefCell<BUS>,
        mut cs: CS,
    ) -> Result<Self, Error<SpiBusError<BUS::Error, CS::Error>>> {
        if cs.set_high().is_err() {
            error!("DS1347 chip select could not be driven");
            return Err(Error::BusUnavailable);
        }
        Ok(Self {
            bus,
            claimed: None,
            cs,
        })
    }

    /// Drops any outstanding claim and returns the chip select pin.
    pub fn destroy(self) -> CS {
        self.cs
    }

    fn framed<R>(
        &mut self,
        transfer: impl FnOnce(&mut BUS) -> Result<R, BUS::Error>,
    ) -> Result<R, SpiBusError<BUS::Error, CS::Error>> {
        let bus = self.claimed.as_deref_mut().ok_or(SpiBusError::NotClaimed)?;
        self.cs.set_low().map_err(SpiBusError::ChipSelect)?;

        let result = transfer(&mut *bus).and_then(|value| bus.flush().map(|()| value));

        // Deselect even when the transfer failed.
        let deselect = self.cs.set_high();
        let value = result.map_err(SpiBusError::Spi)?;
        deselect.map_err(SpiBusError::ChipSelect)?;
        Ok(value)
    }
}

impl<BUS, CS> RegisterInterface for SharedSpiInterface<'_, BUS, CS>
where
    BUS: SpiBus,
    CS: OutputPin,
{
    type Error = SpiBusError<BUS::Error, CS::Error>;

    fn claim(&mut self) -> Result<(), Error<Self::Error>> {
        if self.claimed.is_none() {
            let bus = self.bus.try_borrow_mut().map_err(|_| Error::BusBusy)?;
            self.claimed = Some(bus);
        }
        Ok(())
    }

    fn release(&mut self) {
        self.claimed = None;
    }

    fn read_register(&mut self, register: Register) -> Result<u8, Self::Error> {
        self.framed(|bus| {
            let mut data = [0u8];
            bus.write(&[register.read_command()])?;
            bus.read(&mut data)?;
            Ok(data[0])
        })
    }

    fn write_register(&mut self, register: Register, value: u8) -> Result<(), Self::Error> {
        self.framed(|bus| bus.write(&[register.write_command(), value]))
    }
}
