// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! BIOS attribute shape validation.
//!
//! The standard string-info and integer-info checks applied before an
//! attribute is admitted to the registry. Pure functions over the parsed
//! descriptor fields.

use crate::error::{Error, Result};

// BIOS string encodings (DSP0247 Table 6).
pub const STRING_TYPE_UNKNOWN: u8 = 0x00;
pub const STRING_TYPE_ASCII: u8 = 0x01;
pub const STRING_TYPE_HEX: u8 = 0x02;
pub const STRING_TYPE_UTF_8: u8 = 0x03;
pub const STRING_TYPE_UTF_16LE: u8 = 0x04;
pub const STRING_TYPE_UTF_16BE: u8 = 0x05;
pub const STRING_TYPE_VENDOR: u8 = 0xff;

/// Descriptor name -> encoding code.
pub const STRING_TYPE_NAMES: &[(&str, u8)] = &[
    ("Unknown", STRING_TYPE_UNKNOWN),
    ("ASCII", STRING_TYPE_ASCII),
    ("Hex", STRING_TYPE_HEX),
    ("UTF-8", STRING_TYPE_UTF_8),
    ("UTF-16LE", STRING_TYPE_UTF_16LE),
    ("UTF-16BE", STRING_TYPE_UTF_16BE),
    ("Vendor Specific", STRING_TYPE_VENDOR),
];

/// Resolve a descriptor's `string_type` name.
pub fn string_type_from_name(name: &str) -> Result<u8> {
    STRING_TYPE_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, t)| *t)
        .ok_or_else(|| Error::InvalidData(format!("unknown string type {:?}", name)))
}

/// Validated shape of a string attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringInfo {
    pub string_type: u8,
    pub min_length: u16,
    pub max_length: u16,
    pub default_length: u16,
    pub default_string: String,
}

/// Standard PLDM BIOS string-info check.
pub fn check_string_info(info: &StringInfo) -> Result<()> {
    if info.string_type > STRING_TYPE_UTF_16BE && info.string_type != STRING_TYPE_VENDOR {
        return Err(Error::InvalidData(format!(
            "invalid string type {:#04x}",
            info.string_type
        )));
    }
    if info.min_length > info.max_length {
        return Err(Error::InvalidData(format!(
            "minimum length {} exceeds maximum {}",
            info.min_length, info.max_length
        )));
    }
    if info.default_length as usize != info.default_string.len() {
        return Err(Error::InvalidData(format!(
            "default length {} disagrees with default string of {} bytes",
            info.default_length,
            info.default_string.len()
        )));
    }
    if info.default_length < info.min_length || info.default_length > info.max_length {
        return Err(Error::InvalidData(format!(
            "default length {} outside {}..={}",
            info.default_length, info.min_length, info.max_length
        )));
    }
    Ok(())
}

/// Validated shape of an integer attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerInfo {
    pub lower_bound: u64,
    pub upper_bound: u64,
    pub scalar_increment: u32,
    pub default_value: u64,
}

/// Standard PLDM BIOS integer-info check.
///
/// `scalar_increment` must be non-zero and divide both the bound span and
/// the default's distance from the lower bound.
pub fn check_integer_info(info: &IntegerInfo) -> Result<()> {
    if info.lower_bound > info.upper_bound {
        return Err(Error::InvalidData(format!(
            "lower bound {} exceeds upper bound {}",
            info.lower_bound, info.upper_bound
        )));
    }
    if info.scalar_increment == 0 {
        return Err(Error::InvalidData(
            "scalar increment must be non-zero".to_string(),
        ));
    }
    let span = info.upper_bound - info.lower_bound;
    if span % u64::from(info.scalar_increment) != 0 {
        return Err(Error::InvalidData(format!(
            "scalar increment {} does not divide bound span {}",
            info.scalar_increment, span
        )));
    }
    if info.default_value < info.lower_bound || info.default_value > info.upper_bound {
        return Err(Error::InvalidData(format!(
            "default value {} outside {}..={}",
            info.default_value, info.lower_bound, info.upper_bound
        )));
    }
    if (info.default_value - info.lower_bound) % u64::from(info.scalar_increment) != 0 {
        return Err(Error::InvalidData(format!(
            "default value {} not aligned to scalar increment {}",
            info.default_value, info.scalar_increment
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_info() -> StringInfo {
        StringInfo {
            string_type: STRING_TYPE_ASCII,
            min_length: 1,
            max_length: 100,
            default_length: 4,
            default_string: "data".to_string(),
        }
    }

    #[test]
    fn test_string_info_ok() {
        assert!(check_string_info(&string_info()).is_ok());
    }

    #[test]
    fn test_string_info_bad_type() {
        let mut info = string_info();
        info.string_type = 0x06;
        assert!(check_string_info(&info).is_err());
        info.string_type = STRING_TYPE_VENDOR;
        assert!(check_string_info(&info).is_ok());
    }

    #[test]
    fn test_string_info_length_violations() {
        let mut info = string_info();
        info.min_length = 200;
        assert!(check_string_info(&info).is_err());

        let mut info = string_info();
        info.default_length = 3; // "data" is 4 bytes
        assert!(check_string_info(&info).is_err());

        let mut info = string_info();
        info.max_length = 3;
        assert!(check_string_info(&info).is_err());
    }

    #[test]
    fn test_string_type_names() {
        assert_eq!(string_type_from_name("ASCII").unwrap(), STRING_TYPE_ASCII);
        assert_eq!(
            string_type_from_name("Vendor Specific").unwrap(),
            STRING_TYPE_VENDOR
        );
        assert!(string_type_from_name("EBCDIC").is_err());
    }

    fn integer_info() -> IntegerInfo {
        IntegerInfo {
            lower_bound: 0,
            upper_bound: 100,
            scalar_increment: 5,
            default_value: 50,
        }
    }

    #[test]
    fn test_integer_info_ok() {
        assert!(check_integer_info(&integer_info()).is_ok());
    }

    #[test]
    fn test_integer_info_violations() {
        let mut info = integer_info();
        info.lower_bound = 200;
        assert!(check_integer_info(&info).is_err());

        let mut info = integer_info();
        info.scalar_increment = 0;
        assert!(check_integer_info(&info).is_err());

        // 7 does not divide 100
        let mut info = integer_info();
        info.scalar_increment = 7;
        assert!(check_integer_info(&info).is_err());

        let mut info = integer_info();
        info.default_value = 101;
        assert!(check_integer_info(&info).is_err());

        // 52 is not reachable from 0 in steps of 5
        let mut info = integer_info();
        info.default_value = 52;
        assert!(check_integer_info(&info).is_err());
    }
}
