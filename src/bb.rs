//! Bit banding
//!
//! Support for the manipulation of peripheral registers through bit-banding.
//! Not all peripherals are mapped to the bit-banding alias region, the peripheral bit-band region
//! is from `0x4000_0000` to `0x400F_FFFF`. Bit-banding allows the manipulation of individual bits
//! atomically.
//!
//! Every bit of a word in the bit-band region is expanded to a full word in the alias region:
//!
//! ```text
//! alias = 0x4200_0000 + (address - 0x4000_0000) * 32 + bit * 4
//! ```
//!
//! [`to_alias`] and [`from_alias`] are exact inverses for every word aligned register in the
//! region and every bit `0..32`.

use crate::bus;

// Start address of the peripheral memory region capable of being addressed by bit-banding
pub const PERI_ADDRESS_START: usize = 0x4000_0000;
pub const PERI_ADDRESS_END: usize = 0x400F_FFFF;

pub const PERI_BIT_BAND_BASE: usize = 0x4200_0000;
pub const PERI_BIT_BAND_END: usize = 0x43FF_FFFF;

/// Returns the alias word of `bit` in the register at `address`.
///
/// `address` must be a word aligned register inside the peripheral bit-band region and `bit`
/// must be below 32. Only debug builds check this.
#[inline(always)]
pub const fn to_alias(address: usize, bit: u8) -> usize {
    debug_assert!(address >= PERI_ADDRESS_START && address <= PERI_ADDRESS_END);
    debug_assert!(bit < 32);

    PERI_BIT_BAND_BASE + (address - PERI_ADDRESS_START) * 32 + 4 * bit as usize
}

/// Returns the register address and bit index an alias word maps to.
///
/// The inverse of [`to_alias`]. `alias` must lie in the alias window; an address outside of it
/// yields a meaningless result rather than a failure.
#[inline(always)]
pub const fn from_alias(alias: usize) -> (usize, u8) {
    let offset = alias.wrapping_sub(PERI_BIT_BAND_BASE);
    let address = PERI_ADDRESS_START.wrapping_add((offset >> 7) << 2);
    (address, ((offset >> 2) & 0x1F) as u8)
}

/// Clears the bit on the provided register without modifying other bits.
///
/// # Safety
///
/// Some registers have reserved bits which should not be modified.
#[inline]
pub unsafe fn clear<T>(register: *const T, bit: u8) {
    write(register, bit, false);
}

/// Sets the bit on the provided register without modifying other bits.
///
/// # Safety
///
/// Some registers have reserved bits which should not be modified.
#[inline]
pub unsafe fn set<T>(register: *const T, bit: u8) {
    write(register, bit, true);
}

/// Sets or clears the bit on the provided register without modifying other bits.
///
/// # Safety
///
/// Some registers have reserved bits which should not be modified.
#[inline]
pub unsafe fn write<T>(register: *const T, bit: u8, set: bool) {
    let addr = bus::address(register);
    bus::store_alias(to_alias(addr, bit), u32::from(set));
}

/// Reads a single bit of the provided register through its alias word.
///
/// # Safety
///
/// `register` must point to a register inside the peripheral bit-band region.
#[inline]
pub unsafe fn read<T>(register: *const T, bit: u8) -> bool {
    let addr = bus::address(register);
    bus::load_alias(to_alias(addr, bit)) & 1 != 0
}
