//! # Bit-banded GPIO for STM32 Cortex-M3/M4 parts
//!
//! Register level access to the GPIO ports of STM32 parts with the `MODER` / `OTYPER` /
//! `OSPEEDR` / `PUPDR` / `BSRR` register map (F2, F4, L1...), using the Cortex-M bit-band
//! alias region for single bit accesses.
//!
//! Bit-banding maps every bit of the peripheral region `0x4000_0000..=0x400F_FFFF` to a word
//! of its own in `0x4200_0000..=0x43FF_FFFF`. A store to that word changes exactly one bit,
//! performed by the bus as one indivisible read-modify-write. This crate uses it for:
//!
//! - one bit register fields ([`field::Bit`]), the output latch and the input level of a pin
//! - pin identity: a [`gpio::Pin`] is nothing but the alias word of its data bit, the port and
//!   the pin number are recovered from it ([`gpio::Slot::owner`])
//!
//! Multi-pin output changes go through the port's set/reset register ([`gpio::Gpio::set_reset`]),
//! which is glitch free as well.
//!
//! # Usage
//!
//! Describe the board's pins as constants and configure them at start-up:
//!
//! ```rust
//! use stm32_bitband_gpio::gpio::{AltFn, Alternate, Config, Input, Output, Pin, Pull, Speed};
//! use stm32_bitband_gpio::gpio::{GPIOA, GPIOC};
//!
//! const LED: Pin<Output> = Pin::new(GPIOA, 5);
//! const BUTTON: Pin<Input> = Pin::new(GPIOC, 13);
//! const TX: Pin<Alternate<Output>> = Pin::new(GPIOA, 2);
//!
//! LED.configure(&Config::output()).unwrap();
//! BUTTON.configure(&Config::input().pull(Pull::Up)).unwrap();
//! TX.configure(&Config::alternate(AltFn::AF7).speed(Speed::Fast)).unwrap();
//!
//! if BUTTON.is_high() {
//!     LED.set_high();
//! }
//! assert!(LED.is_set_high());
//! ```
//!
//! On hosted targets every register access lands in an in-memory model of the ports
//! (`bus::sim`), which is what the example above runs against.
//!
//! # Logging
//!
//! With the `defmt` feature, configuration and lock failures are logged at `warn` level and
//! public types implement `defmt::Format`.

#![cfg_attr(not(test), no_std)]

#[cfg(target_os = "none")]
use cortex_m as _;

use embedded_hal as hal;

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        defmt::warn!($s $(, $x)*);
        #[cfg(not(feature = "defmt"))]
        let _ = ($(&$x),*);
    }};
}

macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        defmt::trace!($s $(, $x)*);
        #[cfg(not(feature = "defmt"))]
        let _ = ($(&$x),*);
    }};
}

pub mod bb;
pub mod bus;
pub mod field;
pub mod gpio;
pub mod prelude;
pub mod reg;
