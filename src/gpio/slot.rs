//! Pin identity
//!
//! A [`Slot`] is the bit-band alias word of one pin's bit in a data register. Since the alias
//! is a linear map of the register address, the alias alone tells which port and which pin it
//! belongs to: [`Slot::owner`] recovers both without the caller carrying them along.
//!
//! Slots are only built from a port and a pin number, so an alias that points anywhere but a
//! data register cannot reach the lookup.

use core::fmt;
use core::marker::PhantomData;

use super::{Gpio, BLOCK_SIZE, IDR, ODR};
use crate::{bb, bus};

mod sealed {
    pub trait Sealed {}
}

/// Data register a slot points into
pub trait DataReg: sealed::Sealed {
    /// Register offset inside the port block
    const OFFSET: usize;
}

/// Input data register (type state)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Idr;

/// Output data register (type state)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Odr;

impl sealed::Sealed for Idr {}
impl sealed::Sealed for Odr {}

impl DataReg for Idr {
    const OFFSET: usize = IDR;
}

impl DataReg for Odr {
    const OFFSET: usize = ODR;
}

/// Port base address and pin number owning `alias`. Meaningless unless `alias` is the alias
/// word of a bit in a port's data register.
#[inline(always)]
const fn lookup(alias: usize) -> (usize, u8) {
    let (address, bit) = bb::from_alias(alias);
    (address & !(BLOCK_SIZE - 1), bit)
}

/// Alias word of one pin in data register `D`
pub struct Slot<D: DataReg> {
    alias: usize,
    _reg: PhantomData<D>,
}

impl<D: DataReg> Slot<D> {
    /// Slot of pin `n` of `gpio`
    pub const fn new(gpio: Gpio, n: u8) -> Self {
        assert!(n < 16);
        Self {
            alias: bb::to_alias(gpio.base() + D::OFFSET, n),
            _reg: PhantomData,
        }
    }

    #[inline(always)]
    pub const fn alias(self) -> usize {
        self.alias
    }

    /// Port and pin number of this slot
    #[inline(always)]
    pub const fn owner(self) -> (Gpio, u8) {
        let (base, n) = lookup(self.alias);
        (Gpio::at(base), n)
    }

    #[inline(always)]
    pub fn get(self) -> bool {
        // NOTE(unsafe) the alias was built from a data register of a port
        unsafe { bus::load_alias(self.alias) != 0 }
    }
}

impl Slot<Odr> {
    /// Single bit store to the output latch
    #[inline(always)]
    pub fn set(self, high: bool) {
        // NOTE(unsafe) the alias was built from the output register of a port
        unsafe { bus::store_alias(self.alias, u32::from(high)) }
    }
}

impl<D: DataReg> Clone for Slot<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: DataReg> Copy for Slot<D> {}

impl<D: DataReg> PartialEq for Slot<D> {
    fn eq(&self, other: &Self) -> bool {
        self.alias == other.alias
    }
}

impl<D: DataReg> Eq for Slot<D> {}

impl<D: DataReg> fmt::Debug for Slot<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({:#010x})", self.alias)
    }
}

#[cfg(feature = "defmt")]
impl<D: DataReg> defmt::Format for Slot<D> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Slot({=usize:#x})", self.alias);
    }
}
