//! Peripheral bus access
//!
//! Every register and alias access of this crate goes through this module. On bare-metal
//! targets the registers are accessed in place with volatile loads and stores. Hosted builds
//! run against [`sim`], an in-memory model of the GPIO ports, so the register logic can be
//! exercised by unit tests.

#[cfg(target_os = "none")]
mod mmio {
    use core::ptr;
    use vcell::VolatileCell;

    #[inline(always)]
    pub fn block<T>(address: usize) -> *const T {
        address as *const T
    }

    #[inline(always)]
    pub fn address<T>(ptr: *const T) -> usize {
        ptr as usize
    }

    #[inline(always)]
    pub fn load(cell: &VolatileCell<u32>) -> u32 {
        cell.get()
    }

    #[inline(always)]
    pub fn store(cell: &VolatileCell<u32>, bits: u32) {
        cell.set(bits)
    }

    #[inline(always)]
    pub unsafe fn load_alias(alias: usize) -> u32 {
        ptr::read_volatile(alias as *const u32)
    }

    #[inline(always)]
    pub unsafe fn store_alias(alias: usize, bits: u32) {
        ptr::write_volatile(alias as *mut u32, bits)
    }
}

#[cfg(target_os = "none")]
pub(crate) use mmio::{address, block, load, load_alias, store, store_alias};

#[cfg(not(target_os = "none"))]
pub mod sim;

#[cfg(not(target_os = "none"))]
pub(crate) use sim::{address, block, load, load_alias, store, store_alias};
