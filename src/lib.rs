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

//! Driver for the Maxim DS1347 SPI real-time clock.
//!
//! The driver only moves calendar time in and out of the timekeeping registers and clears the
//! configuration registers on reset. Alarms and burst access are not supported.
//!
//! ```ignore
//! let mut rtc = Ds1347::new(SpiInterface::new(spi_device));
//! rtc.reset_device()?;
//! rtc.set_time(&CalendarTime { year: 2024, month: 2, day: 29, weekday: 4, ..Default::default() })?;
//! let now = rtc.get_time()?;
//! ```
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

mod calendar_time;
pub mod interface;
mod register;

pub use calendar_time::{CalendarTime, Field, MAX_YEAR};
pub use interface::{RegisterInterface, SharedSpiInterface, SpiBusError, SpiInterface};
pub use register::{bcd_to_bin, bin_to_bcd, Register};
pub use rtcc::{DateTimeAccess, NaiveDateTime};

use embedded_hal::spi::{Mode, MODE_3};

/// SPI mode the bus must be configured with for the DS1347.
pub const SPI_MODE: Mode = MODE_3;

/// SPI clock the bus should be configured with for the DS1347.
pub const SPI_FREQUENCY_HZ: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The bus handle could not be set up.
    BusUnavailable,
    /// Exclusive access to the bus could not be obtained. Nothing was transferred.
    BusBusy,
    /// Transport error from the underlying bus.
    Bus(E),
    /// A calendar field is out of range for its register. Nothing was transferred.
    InvalidInputData(Field),
    /// The registers do not hold a valid calendar date.
    InvalidDeviceState,
}

pub struct Ds1347<DI> {
    iface: DI,
}

impl<DI> Ds1347<DI>
where
    DI: RegisterInterface,
{
    pub fn new(iface: DI) -> Self {
        Self { iface }
    }

    /// Give back the interface.
    pub fn destroy(self) -> DI {
        self.iface
    }

    /// Read the current time, one register at a time.
    ///
    /// Register contents are decoded without validation.
    pub fn get_time(&mut self) -> Result<CalendarTime, Error<DI::Error>> {
        let raw = self.with_claimed_bus(|iface| {
            let mut raw = [0u8; Register::TIME_SEQUENCE.len()];
            for (register, value) in Register::TIME_SEQUENCE.into_iter().zip(raw.iter_mut()) {
                *value = iface.read_register(register)?;
                trace!("DS1347 read {:#x} = {:#x}", register.address(), *value);
            }
            Ok(raw)
        })?;

        let time = CalendarTime::from_registers(&raw);
        debug!(
            "DS1347 time {}-{}-{} {}:{}:{}",
            time.year,
            time.month,
            time.day,
            time.hour,
            time.minute,
            time.second
        );
        Ok(time)
    }

    /// Write `time` to the timekeeping registers.
    ///
    /// All fields are validated and encoded before the bus is claimed. The registers are then
    /// written one by one with no rollback: if a write fails the registers before it keep their
    /// new value and the rest are left untouched.
    pub fn set_time(&mut self, time: &CalendarTime) -> Result<(), Error<DI::Error>> {
        let raw = time.to_registers().map_err(|field| {
            warn!("DS1347 refusing out of range time field");
            Error::InvalidInputData(field)
        })?;

        self.with_claimed_bus(|iface| {
            for (register, value) in Register::TIME_SEQUENCE.into_iter().zip(raw) {
                trace!("DS1347 write {:#x} = {:#x}", register.address(), value);
                iface.write_register(register, value)?;
            }
            Ok(())
        })?;

        debug!(
            "DS1347 time set to {}-{}-{} {}:{}:{}",
            time.year,
            time.month,
            time.day,
            time.hour,
            time.minute,
            time.second
        );
        Ok(())
    }

    /// Clear write protection, disable the alarm, enable the oscillator and turn off the
    /// glitch filter.
    pub fn reset_device(&mut self) -> Result<(), Error<DI::Error>> {
        self.with_claimed_bus(|iface| {
            for register in Register::RESET_SEQUENCE {
                trace!("DS1347 clear {:#x}", register.address());
                iface.write_register(register, 0x00)?;
            }
            Ok(())
        })?;
        debug!("DS1347 reset");
        Ok(())
    }

    fn with_claimed_bus<R>(
        &mut self,
        operation: impl FnOnce(&mut DI) -> Result<R, DI::Error>,
    ) -> Result<R, Error<DI::Error>> {
        if let Err(e) = self.iface.claim() {
            warn!("DS1347 unable to claim bus");
            return Err(e);
        }

        let result = operation(&mut self.iface);
        self.iface.release();

        result.map_err(|e| {
            error!("DS1347 bus transfer failed");
            Error::Bus(e)
        })
    }
}

impl<DI> DateTimeAccess for Ds1347<DI>
where
    DI: RegisterInterface,
{
    type Error = Error<DI::Error>;

    fn datetime(&mut self) -> Result<NaiveDateTime, Self::Error> {
        let time = self.get_time()?;
        NaiveDateTime::try_from(&time).map_err(|_| Error::InvalidDeviceState)
    }

    fn set_datetime(&mut self, datetime: &NaiveDateTime) -> Result<(), Self::Error> {
        let time = CalendarTime::try_from(datetime).map_err(Error::InvalidInputData)?;
        self.set_time(&time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum BusEvent {
        Claim,
        Release,
        Read(Register),
        Write(Register, u8),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct TransferFailed;

    /// Device fake recording every bus event, with optional claim and transfer failures.
    struct RecordingInterface {
        registers: [u8; 0x40],
        events: Vec<BusEvent>,
        busy: bool,
        fail_on_transfer: Option<usize>,
        transfers: usize,
    }

    impl RecordingInterface {
        fn new() -> Self {
            Self {
                registers: [0; 0x40],
                events: Vec::new(),
                busy: false,
                fail_on_transfer: None,
                transfers: 0,
            }
        }

        fn with_time_registers(raw: [u8; 8]) -> Self {
            let mut iface = Self::new();
            for (register, value) in Register::TIME_SEQUENCE.into_iter().zip(raw) {
                iface.registers[register.address() as usize] = value;
            }
            iface
        }

        fn transfer(&mut self) -> Result<(), TransferFailed> {
            let index = self.transfers;
            self.transfers += 1;
            if self.fail_on_transfer == Some(index) {
                return Err(TransferFailed);
            }
            Ok(())
        }

        fn register_events(&self) -> Vec<BusEvent> {
            self.events
                .iter()
                .copied()
                .filter(|event| !matches!(event, BusEvent::Claim | BusEvent::Release))
                .collect()
        }
    }

    impl RegisterInterface for RecordingInterface {
        type Error = TransferFailed;

        fn claim(&mut self) -> Result<(), Error<Self::Error>> {
            if self.busy {
                return Err(Error::BusBusy);
            }
            self.events.push(BusEvent::Claim);
            Ok(())
        }

        fn release(&mut self) {
            self.events.push(BusEvent::Release);
        }

        fn read_register(&mut self, register: Register) -> Result<u8, Self::Error> {
            self.transfer()?;
            self.events.push(BusEvent::Read(register));
            Ok(self.registers[register.address() as usize])
        }

        fn write_register(&mut self, register: Register, value: u8) -> Result<(), Self::Error> {
            self.transfer()?;
            self.events.push(BusEvent::Write(register, value));
            self.registers[register.address() as usize] = value;
            Ok(())
        }
    }

    fn leap_day_2024() -> CalendarTime {
        CalendarTime {
            second: 30,
            minute: 45,
            hour: 13,
            day: 29,
            month: 2,
            year: 2024,
            weekday: 4,
            ..Default::default()
        }
    }

    #[test]
    fn get_time_reads_each_time_register_once_in_order() {
        let iface = RecordingInterface::with_time_registers([0x30, 0x45, 0x13, 0x29, 0x02, 0x20, 0x24, 0x05]);
        let mut rtc = Ds1347::new(iface);

        assert_eq!(rtc.get_time().unwrap(), leap_day_2024());

        let iface = rtc.destroy();
        let mut expected = vec![BusEvent::Claim];
        expected.extend(Register::TIME_SEQUENCE.map(BusEvent::Read));
        expected.push(BusEvent::Release);
        assert_eq!(iface.events, expected);
    }

    #[test]
    fn set_time_writes_each_time_register_once_in_order() {
        let mut rtc = Ds1347::new(RecordingInterface::new());

        rtc.set_time(&leap_day_2024()).unwrap();

        let iface = rtc.destroy();
        assert_eq!(
            iface.events,
            vec![
                BusEvent::Claim,
                BusEvent::Write(Register::Seconds, 0x30),
                BusEvent::Write(Register::Minutes, 0x45),
                BusEvent::Write(Register::Hours, 0x13),
                BusEvent::Write(Register::Date, 0x29),
                BusEvent::Write(Register::Month, 0x02),
                BusEvent::Write(Register::Century, 0x20),
                BusEvent::Write(Register::Year, 0x24),
                BusEvent::Write(Register::Day, 0x05),
                BusEvent::Release,
            ]
        );
    }

    #[test]
    fn time_read_back_matches_time_written() {
        let mut rtc = Ds1347::new(RecordingInterface::new());
        for weekday in [0, 6] {
            let time = CalendarTime { weekday, ..leap_day_2024() };
            rtc.set_time(&time).unwrap();
            assert_eq!(rtc.get_time().unwrap(), time);
        }
    }

    #[test]
    fn reset_clears_configuration_registers_regardless_of_state() {
        let mut iface = RecordingInterface::new();
        iface.registers[Register::Control.address() as usize] = 0x80;
        iface.registers[Register::Status.address() as usize] = 0xA0;
        let mut rtc = Ds1347::new(iface);

        rtc.reset_device().unwrap();

        let iface = rtc.destroy();
        assert_eq!(
            iface.events,
            vec![
                BusEvent::Claim,
                BusEvent::Write(Register::Control, 0x00),
                BusEvent::Write(Register::AlarmConfig, 0x00),
                BusEvent::Write(Register::Status, 0x00),
                BusEvent::Release,
            ]
        );
    }

    #[test]
    fn busy_bus_fails_every_operation_without_transfers() {
        let mut iface = RecordingInterface::new();
        iface.busy = true;
        let mut rtc = Ds1347::new(iface);

        assert_eq!(rtc.get_time(), Err(Error::BusBusy));
        assert_eq!(rtc.set_time(&leap_day_2024()), Err(Error::BusBusy));
        assert_eq!(rtc.reset_device(), Err(Error::BusBusy));

        let iface = rtc.destroy();
        assert!(iface.events.is_empty());
        assert_eq!(iface.transfers, 0);
    }

    #[test]
    fn failed_write_leaves_earlier_registers_written_and_skips_the_rest() {
        let mut iface = RecordingInterface::new();
        iface.fail_on_transfer = Some(3);
        let mut rtc = Ds1347::new(iface);

        assert_eq!(rtc.set_time(&leap_day_2024()), Err(Error::Bus(TransferFailed)));

        let iface = rtc.destroy();
        assert_eq!(
            iface.register_events(),
            vec![
                BusEvent::Write(Register::Seconds, 0x30),
                BusEvent::Write(Register::Minutes, 0x45),
                BusEvent::Write(Register::Hours, 0x13),
            ]
        );
        assert_eq!(iface.events.last(), Some(&BusEvent::Release));
    }

    #[test]
    fn failed_read_releases_the_bus() {
        let mut iface = RecordingInterface::new();
        iface.fail_on_transfer = Some(5);
        let mut rtc = Ds1347::new(iface);

        assert_eq!(rtc.get_time(), Err(Error::Bus(TransferFailed)));

        let iface = rtc.destroy();
        assert_eq!(iface.register_events().len(), 5);
        assert_eq!(iface.events.last(), Some(&BusEvent::Release));
    }

    #[test]
    fn failed_reset_is_reported() {
        let mut iface = RecordingInterface::new();
        iface.fail_on_transfer = Some(1);
        let mut rtc = Ds1347::new(iface);

        assert_eq!(rtc.reset_device(), Err(Error::Bus(TransferFailed)));

        let iface = rtc.destroy();
        assert_eq!(
            iface.register_events(),
            vec![BusEvent::Write(Register::Control, 0x00)]
        );
    }

    #[test]
    fn out_of_range_time_is_rejected_before_claiming() {
        let mut rtc = Ds1347::new(RecordingInterface::new());

        let time = CalendarTime { month: 13, ..leap_day_2024() };
        assert_eq!(rtc.set_time(&time), Err(Error::InvalidInputData(Field::Month)));

        assert!(rtc.destroy().events.is_empty());
    }

    #[test]
    fn datetime_access_round_trips_through_chrono() {
        let mut rtc = Ds1347::new(RecordingInterface::new());
        let datetime = NaiveDate::from_ymd_opt(2099, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();

        rtc.set_datetime(&datetime).unwrap();

        assert_eq!(rtc.datetime().unwrap(), datetime);
        // 2099-12-31 is a Thursday.
        let iface = rtc.destroy();
        assert_eq!(iface.registers[Register::Day.address() as usize], 0x05);
    }

    #[test]
    fn datetime_reports_impossible_register_contents() {
        // 30 February
        let iface = RecordingInterface::with_time_registers([0x00, 0x00, 0x00, 0x30, 0x02, 0x20, 0x24, 0x01]);
        let mut rtc = Ds1347::new(iface);

        assert_eq!(rtc.datetime(), Err(Error::InvalidDeviceState));
    }

    #[test]
    fn set_datetime_rejects_years_beyond_the_century_register() {
        let mut rtc = Ds1347::new(RecordingInterface::new());
        let datetime = NaiveDate::from_ymd_opt(10_000, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        assert_eq!(
            rtc.set_datetime(&datetime),
            Err(Error::InvalidInputData(Field::Year))
        );
        assert!(rtc.destroy().events.is_empty());
    }

    #[test]
    fn get_time_over_spi_device_sets_read_flag_on_every_address() {
        let responses = [0x30, 0x45, 0x13, 0x29, 0x02, 0x20, 0x24, 0x05];
        let mut expectations = Vec::new();
        for (register, response) in Register::TIME_SEQUENCE.into_iter().zip(responses) {
            expectations.extend([
                SpiTransaction::transaction_start(),
                SpiTransaction::write_vec(vec![register.address() | 0x80]),
                SpiTransaction::read_vec(vec![response]),
                SpiTransaction::transaction_end(),
            ]);
        }
        let mut rtc = Ds1347::new(SpiInterface::new(SpiMock::new(&expectations)));

        assert_eq!(rtc.get_time().unwrap(), leap_day_2024());

        rtc.destroy().destroy().done();
    }

    #[test]
    fn set_time_over_spi_device_sends_sixteen_bit_frames() {
        let frames = [
            [0x01, 0x30],
            [0x03, 0x45],
            [0x05, 0x13],
            [0x07, 0x29],
            [0x09, 0x02],
            [0x13, 0x20],
            [0x0D, 0x24],
            [0x0B, 0x05],
        ];
        let mut expectations = Vec::new();
        for frame in frames {
            expectations.extend([
                SpiTransaction::transaction_start(),
                SpiTransaction::write_vec(frame.to_vec()),
                SpiTransaction::transaction_end(),
            ]);
        }
        let mut rtc = Ds1347::new(SpiInterface::new(SpiMock::new(&expectations)));

        rtc.set_time(&leap_day_2024()).unwrap();

        rtc.destroy().destroy().done();
    }

    #[test]
    fn reset_over_spi_device_writes_zero_to_three_registers() {
        let mut expectations = Vec::new();
        for address in [0x0F, 0x15, 0x17] {
            expectations.extend([
                SpiTransaction::transaction_start(),
                SpiTransaction::write_vec(vec![address, 0x00]),
                SpiTransaction::transaction_end(),
            ]);
        }
        let mut rtc = Ds1347::new(SpiInterface::new(SpiMock::new(&expectations)));

        rtc.reset_device().unwrap();

        rtc.destroy().destroy().done();
    }
}
