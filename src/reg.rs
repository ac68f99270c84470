//! Register cells
//!
//! A [`Reg`] is one 32-bit word of a peripheral register block. Its access type state decides
//! at compile time whether it can be read, written, or modified.

use core::marker::PhantomData;

use vcell::VolatileCell;

use crate::bus;

/// Read-only access (type state)
pub struct R;
/// Write-only access (type state)
pub struct W;
/// Read-write access (type state)
pub struct RW;

/// Marker trait for access modes that can be read
pub trait Readable {}
impl Readable for R {}
impl Readable for RW {}

/// Marker trait for access modes that can be written
pub trait Writable {}
impl Writable for W {}
impl Writable for RW {}

/// A memory mapped 32-bit register
#[repr(transparent)]
pub struct Reg<A> {
    bits: VolatileCell<u32>,
    _access: PhantomData<A>,
}

impl<A> Reg<A> {
    /// Returns a raw pointer to the register
    #[inline(always)]
    pub fn as_ptr(&self) -> *mut u32 {
        self.bits.as_ptr()
    }

    /// Returns the bus address of the register
    #[inline(always)]
    pub fn address(&self) -> usize {
        bus::address(self.as_ptr())
    }
}

impl<A: Readable> Reg<A> {
    #[inline(always)]
    pub fn read(&self) -> u32 {
        bus::load(&self.bits)
    }
}

impl<A: Writable> Reg<A> {
    #[inline(always)]
    pub fn write(&self, bits: u32) {
        bus::store(&self.bits, bits)
    }
}

impl Reg<RW> {
    /// Read-modify-write. Not atomic, an interrupt between the read and the write that
    /// changes the same register loses its update.
    #[inline(always)]
    pub fn modify(&self, f: impl FnOnce(u32) -> u32) {
        self.write(f(self.read()))
    }
}
