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

//! DS1347 register map and the BCD codec used by the timekeeping registers.

/// Bit 7 of the address byte selects a read when set, a write when clear.
const READ_FLAG: u8 = 0x80;

/// Registers used by this driver. Alarm and burst registers are not supported.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    Seconds = 0x01,
    Minutes = 0x03,
    Hours = 0x05,
    Date = 0x07,
    Month = 0x09,
    Day = 0x0B,
    Year = 0x0D,
    /// Write-protect bit lives here.
    Control = 0x0F,
    Century = 0x13,
    AlarmConfig = 0x15,
    /// Oscillator enable and glitch filter.
    Status = 0x17,
}

impl Register {
    /// Order in which the timekeeping registers are read and written.
    pub const TIME_SEQUENCE: [Register; 8] = [
        Register::Seconds,
        Register::Minutes,
        Register::Hours,
        Register::Date,
        Register::Month,
        Register::Century,
        Register::Year,
        Register::Day,
    ];

    /// Configuration registers cleared by a device reset, in write order.
    pub const RESET_SEQUENCE: [Register; 3] =
        [Register::Control, Register::AlarmConfig, Register::Status];

    pub const fn address(self) -> u8 {
        self as u8
    }

    /// Command byte for a single register read.
    pub const fn read_command(self) -> u8 {
        self.address() | READ_FLAG
    }

    /// Command byte for a single register write.
    pub const fn write_command(self) -> u8 {
        self.address() & !READ_FLAG
    }
}

/// Convert a binary value in `0..=99` to packed BCD. Values above 99 are not representable
/// and must be rejected by the caller.
pub const fn bin_to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Convert packed BCD to binary. Digits are not range checked, `0x0F` decodes to 15.
pub const fn bcd_to_bin(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}
