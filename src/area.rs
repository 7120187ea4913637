//! Memory area definitions for the S7 protocol.
//!
//! This module defines the [`Area`] enum which represents the addressable
//! memory regions of S7-family PLCs. Each area has a fixed wire code and
//! specific access capabilities.
//!
//! # Memory Areas Overview
//!
//! | Area | Description | Byte Access | Bit Access | DB Number |
//! |------|-------------|:-----------:|:----------:|:---------:|
//! | PE | Process inputs | ✓ | ✓ | ✗ |
//! | PA | Process outputs | ✓ | ✓ | ✗ |
//! | MK | Flags (markers) | ✓ | ✓ | ✗ |
//! | DB | Data blocks | ✓ | ✓ | ✓ |
//! | DI | Instance data blocks / system data | ✓ | ✓ | ✓ |
//! | P | Direct peripheral access | ✓ | ✓ | ✗ |
//! | CT | Counters (16-bit values) | ✓ | ✗ | ✗ |
//! | TM | Timers (16-bit values) | ✓ | ✗ | ✗ |
//!
//! # Example
//!
//! ```
//! use s7comm::Area;
//!
//! // Check if an area supports bit access
//! assert!(Area::Flag.supports_bit_access());
//! assert!(!Area::Counter.supports_bit_access());
//!
//! // Display the area name
//! assert_eq!(Area::DataBlock.to_string(), "DB");
//! ```

use crate::error::{Result, S7Error};

/// Addressable memory areas of an S7 PLC.
///
/// Each area maps to the one-byte code used in read/write request items.
/// Counters and timers hold 16-bit values addressed by number rather than
/// by byte; they do not support bit access, and byte-oriented transfers on
/// them must cover whole 2-byte entries.
///
/// # Example
///
/// ```
/// use s7comm::Area;
///
/// let areas = [Area::Input, Area::Output, Area::Flag, Area::DataBlock];
/// for area in areas {
///     println!("{}: bit access = {}", area, area.supports_bit_access());
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    /// Direct peripheral access (bypasses the process image).
    DirectPeripheral,
    /// Process inputs (PE).
    Input,
    /// Process outputs (PA).
    Output,
    /// Flags, also called markers (MK).
    Flag,
    /// Numbered data blocks (DB).
    DataBlock,
    /// Instance data blocks / system data (DI).
    InstanceDataBlock,
    /// S7 counters, one 16-bit value per counter number.
    Counter,
    /// S7 timers, one 16-bit value per timer number.
    Timer,
}

impl Area {
    /// Returns the wire code used in request items for this area.
    pub(crate) fn code(self) -> u8 {
        match self {
            Area::DirectPeripheral => 0x80,
            Area::Input => 0x81,
            Area::Output => 0x82,
            Area::Flag => 0x83,
            Area::DataBlock => 0x84,
            Area::InstanceDataBlock => 0x85,
            Area::Counter => 0x1C,
            Area::Timer => 0x1D,
        }
    }

    /// Returns whether request items for this area carry a DB number.
    ///
    /// Only data-block and instance-data-block addressing uses the DB number
    /// field; every other area encodes it as zero.
    pub(crate) fn uses_db_number(self) -> bool {
        matches!(self, Area::DataBlock | Area::InstanceDataBlock)
    }

    /// Returns whether this memory area supports bit access.
    ///
    /// # Example
    ///
    /// ```
    /// use s7comm::Area;
    ///
    /// assert!(Area::DataBlock.supports_bit_access());
    /// assert!(!Area::Timer.supports_bit_access());
    /// ```
    pub fn supports_bit_access(self) -> bool {
        !matches!(self, Area::Counter | Area::Timer)
    }

    /// Validates a DB number against this area.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::InvalidParameter` if a nonzero DB number is given
    /// for an area that does not use one.
    pub(crate) fn check_db_number(self, db_number: u16) -> Result<()> {
        if db_number != 0 && !self.uses_db_number() {
            return Err(S7Error::invalid_parameter(
                "db_number",
                format!("area {} does not address data blocks", self),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Area::DirectPeripheral => write!(f, "P"),
            Area::Input => write!(f, "PE"),
            Area::Output => write!(f, "PA"),
            Area::Flag => write!(f, "MK"),
            Area::DataBlock => write!(f, "DB"),
            Area::InstanceDataBlock => write!(f, "DI"),
            Area::Counter => write!(f, "CT"),
            Area::Timer => write!(f, "TM"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_codes() {
        assert_eq!(Area::DirectPeripheral.code(), 0x80);
        assert_eq!(Area::Input.code(), 0x81);
        assert_eq!(Area::Output.code(), 0x82);
        assert_eq!(Area::Flag.code(), 0x83);
        assert_eq!(Area::DataBlock.code(), 0x84);
        assert_eq!(Area::InstanceDataBlock.code(), 0x85);
        assert_eq!(Area::Counter.code(), 0x1C);
        assert_eq!(Area::Timer.code(), 0x1D);
    }

    #[test]
    fn test_uses_db_number() {
        assert!(Area::DataBlock.uses_db_number());
        assert!(Area::InstanceDataBlock.uses_db_number());
        assert!(!Area::Flag.uses_db_number());
        assert!(!Area::Input.uses_db_number());
        assert!(!Area::Counter.uses_db_number());
    }

    #[test]
    fn test_supports_bit_access() {
        assert!(Area::DirectPeripheral.supports_bit_access());
        assert!(Area::Input.supports_bit_access());
        assert!(Area::Output.supports_bit_access());
        assert!(Area::Flag.supports_bit_access());
        assert!(Area::DataBlock.supports_bit_access());
        assert!(!Area::Counter.supports_bit_access());
        assert!(!Area::Timer.supports_bit_access());
    }

    #[test]
    fn test_check_db_number() {
        assert!(Area::DataBlock.check_db_number(18).is_ok());
        assert!(Area::Flag.check_db_number(0).is_ok());
        assert!(Area::Flag.check_db_number(1).is_err());
        assert!(Area::Counter.check_db_number(5).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Area::Input.to_string(), "PE");
        assert_eq!(Area::Output.to_string(), "PA");
        assert_eq!(Area::Flag.to_string(), "MK");
        assert_eq!(Area::DataBlock.to_string(), "DB");
        assert_eq!(Area::InstanceDataBlock.to_string(), "DI");
        assert_eq!(Area::Counter.to_string(), "CT");
        assert_eq!(Area::Timer.to_string(), "TM");
    }
}
