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

use crate::register::{bcd_to_bin, bin_to_bcd, Register};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Largest year the century and year registers can hold together.
pub const MAX_YEAR: u16 = 9999;

/// Broken-down calendar time as exchanged with the clock.
///
/// `weekday` counts from 0 (Sunday) while the device stores it from 1. `year_day` and
/// `is_dst` are not kept by the device and are always zero/false when read back.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarTime {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    /// Day of the month, 1-31.
    pub day: u8,
    /// 1-12.
    pub month: u8,
    /// Absolute year, e.g. 2024.
    pub year: u16,
    pub weekday: u8,
    pub year_day: u16,
    pub is_dst: bool,
}

/// The calendar field that failed validation or conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
    Weekday,
}

impl CalendarTime {
    /// Check every field fits the register that stores it. Day of month is only checked
    /// against 1-31, the device does not care whether the month actually has that many days.
    pub fn validate(&self) -> Result<(), Field> {
        self.validate_time_of_day()?;
        if !(1..=31).contains(&self.day) {
            return Err(Field::Day);
        }
        if !(1..=12).contains(&self.month) {
            return Err(Field::Month);
        }
        if self.year > MAX_YEAR {
            return Err(Field::Year);
        }
        if self.weekday > 6 {
            return Err(Field::Weekday);
        }
        Ok(())
    }

    fn validate_time_of_day(&self) -> Result<(), Field> {
        if self.second > 59 {
            return Err(Field::Second);
        }
        if self.minute > 59 {
            return Err(Field::Minute);
        }
        if self.hour > 23 {
            return Err(Field::Hour);
        }
        Ok(())
    }

    /// BCD register image in [`Register::TIME_SEQUENCE`] order.
    pub fn to_registers(&self) -> Result<[u8; Register::TIME_SEQUENCE.len()], Field> {
        self.validate()?;
        let century = (self.year / 100) as u8;
        let year_in_century = (self.year % 100) as u8;
        Ok([
            self.second,
            self.minute,
            self.hour,
            self.day,
            self.month,
            century,
            year_in_century,
            self.weekday + 1,
        ]
        .map(bin_to_bcd))
    }

    /// Decode a register image read in [`Register::TIME_SEQUENCE`] order. Nothing is
    /// validated; a day register of zero wraps the weekday to 255.
    pub fn from_registers(raw: &[u8; Register::TIME_SEQUENCE.len()]) -> Self {
        let [second, minute, hour, day, month, century, year, weekday] = raw.map(bcd_to_bin);
        Self {
            second,
            minute,
            hour,
            day,
            month,
            year: u16::from(century) * 100 + u16::from(year),
            weekday: weekday.wrapping_sub(1),
            year_day: 0,
            is_dst: false,
        }
    }
}

impl TryFrom<&CalendarTime> for NaiveDateTime {
    type Error = Field;

    /// The weekday field is ignored, chrono derives it from the date.
    fn try_from(time: &CalendarTime) -> Result<Self, Self::Error> {
        time.validate_time_of_day()?;
        if !(1..=12).contains(&time.month) {
            return Err(Field::Month);
        }
        NaiveDate::from_ymd_opt(
            i32::from(time.year),
            u32::from(time.month),
            u32::from(time.day),
        )
        .ok_or(Field::Day)?
        .and_hms_opt(
            u32::from(time.hour),
            u32::from(time.minute),
            u32::from(time.second),
        )
        .ok_or(Field::Second)
    }
}

impl TryFrom<&NaiveDateTime> for CalendarTime {
    type Error = Field;

    fn try_from(datetime: &NaiveDateTime) -> Result<Self, Self::Error> {
        let year = u16::try_from(datetime.year())
            .ok()
            .filter(|year| *year <= MAX_YEAR)
            .ok_or(Field::Year)?;
        Ok(Self {
            second: datetime.second() as u8,
            minute: datetime.minute() as u8,
            hour: datetime.hour() as u8,
            day: datetime.day() as u8,
            month: datetime.month() as u8,
            year,
            weekday: datetime.weekday().num_days_from_sunday() as u8,
            year_day: 0,
            is_dst: false,
        })
    }
}
