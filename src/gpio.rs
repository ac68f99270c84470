//! # General Purpose I/Os
//!
//! The GPIO pins are organised into ports of 16 pins, [`GPIOA`], [`GPIOB`]... Every port has
//! the same [`RegisterBlock`] at its own base address. Each register holds one field per pin:
//!
//! | Offset | Register  | Field per pin                              |
//! |--------|-----------|--------------------------------------------|
//! | `0x00` | `MODER`   | 2 bit [`Mode`]                             |
//! | `0x04` | `OTYPER`  | 1 bit [`OutputType`], 16 reserved bits      |
//! | `0x08` | `OSPEEDR` | 2 bit [`Speed`]                            |
//! | `0x0C` | `PUPDR`   | 2 bit [`Pull`]                             |
//! | `0x10` | `IDR`     | 1 bit input level, 16 reserved bits         |
//! | `0x14` | `ODR`     | 1 bit output latch, 16 reserved bits        |
//! | `0x18` | `BSRR`    | 1 bit set, then 1 bit reset                 |
//! | `0x1C` | `LCKR`    | 1 bit lock, key bit, 15 reserved bits       |
//! | `0x20` | `AFRL/H`  | 4 bit [`AltFn`], pins 0-7 then 8-15         |
//!
//! ## Pins
//!
//! A [`Pin`] is a plain `Copy` value naming a port, a pin number and a role ([`Input`],
//! [`Output`], [`Alternate<Input>`], [`Alternate<Output>`]). It holds nothing but the bit-band
//! alias word of its bit in `IDR` (input roles) or `ODR` (output roles); the port and pin
//! number are recovered from that address when needed. Pins are built in `const` context, so
//! a board describes its pins as a table of constants:
//!
//! ```rust
//! use stm32_bitband_gpio::gpio::{Config, Input, Output, Pin, Pull, Speed, GPIOA, GPIOC};
//!
//! const LED: Pin<Output> = Pin::new(GPIOA, 5);
//! const BUTTON: Pin<Input> = Pin::new(GPIOC, 13);
//!
//! LED.configure(&Config::output().speed(Speed::Low)).unwrap();
//! BUTTON.configure(&Config::input().pull(Pull::Up)).unwrap();
//!
//! LED.set_high();
//! assert!(LED.is_set_high());
//! assert!(BUTTON.is_high());
//! ```
//!
//! ## Writing outputs
//!
//! There are two ways to drive an output pin:
//!
//! - [`Pin::set_high`], [`Pin::set_low`] and [`Pin::set_state`] write the port's set/reset
//!   register. Each store only names the bit it changes, so pins of the same port can be
//!   driven from the main program and from interrupt handlers without glitches.
//!   **Use these when an interrupt handler may drive the pin.**
//! - [`Pin::toggle`] reads the output latch, then stores through the set/reset register. The
//!   store cannot disturb other pins, but the read and the store are two accesses: when two
//!   contexts toggle the same pin, one toggle can be lost.
//! - [`Pin::write`] stores directly to the pin's `ODR` alias word. It is a single bus
//!   transaction but relies on the bit-band read-modify-write; keep it to pins that are only
//!   driven from one context.
//!
//! ## Configuring
//!
//! [`Pin::configure`] writes output type, mode, speed, pull and alternate function, in that
//! order. It is not transactional: when a field is rejected the fields before it stay
//! written and the error names the step that failed.

use core::fmt;
use core::marker::PhantomData;

use bitflags::bitflags;

use crate::bus;
use crate::field::{self, field_value, Bit, Bits16, Bits2, Bits4, Reserved15, Reserved16};
use crate::reg::{Reg, R, RW, W};

pub mod board;
mod hal_02;
mod hal_1;
mod slot;

pub use slot::{DataReg, Idr, Odr, Slot};

/// Size of the address range decoded by one port
pub const BLOCK_SIZE: usize = 0x400;

pub const MODER: usize = 0x00;
pub const OTYPER: usize = 0x04;
pub const OSPEEDR: usize = 0x08;
pub const PUPDR: usize = 0x0C;
pub const IDR: usize = 0x10;
pub const ODR: usize = 0x14;
pub const BSRR: usize = 0x18;
pub const LCKR: usize = 0x1C;
pub const AFRL: usize = 0x20;
pub const AFRH: usize = 0x24;

/// Lock key bit of `LCKR`
pub const LCKK: u32 = 1 << 16;

/// Register block of one GPIO port
///
/// Reserved spans, which are never written with anything but zero:
///
/// - `OTYPER`, `IDR`, `ODR`: bits `16..32` ([`RegisterBlock::RESERVED_HIGH_HALF`])
/// - `LCKR`: bits `17..32`, above the lock key ([`RegisterBlock::RESERVED_LOCK`])
#[repr(C)]
pub struct RegisterBlock {
    pub(crate) moder: Reg<RW>,
    pub(crate) otyper: Reg<RW>,
    pub(crate) ospeedr: Reg<RW>,
    pub(crate) pupdr: Reg<RW>,
    pub(crate) idr: Reg<R>,
    pub(crate) odr: Reg<RW>,
    pub(crate) bsrr: Reg<W>,
    pub(crate) lckr: Reg<RW>,
    pub(crate) afr: [Reg<RW>; 2],
}

// The layout must match the hardware register map exactly
const _: () = {
    use core::mem::{offset_of, size_of};

    assert!(offset_of!(RegisterBlock, moder) == MODER);
    assert!(offset_of!(RegisterBlock, otyper) == OTYPER);
    assert!(offset_of!(RegisterBlock, ospeedr) == OSPEEDR);
    assert!(offset_of!(RegisterBlock, pupdr) == PUPDR);
    assert!(offset_of!(RegisterBlock, idr) == IDR);
    assert!(offset_of!(RegisterBlock, odr) == ODR);
    assert!(offset_of!(RegisterBlock, bsrr) == BSRR);
    assert!(offset_of!(RegisterBlock, lckr) == LCKR);
    assert!(offset_of!(RegisterBlock, afr) == AFRL);
    assert!(offset_of!(RegisterBlock, afr) + size_of::<Reg<RW>>() == AFRH);
    assert!(size_of::<RegisterBlock>() == AFRH + 4);
};

/// Reserved bits of the register at `offset`
pub(crate) const fn reserved_bits(offset: usize) -> u32 {
    match offset {
        OTYPER | IDR | ODR => RegisterBlock::RESERVED_HIGH_HALF,
        LCKR => RegisterBlock::RESERVED_LOCK,
        _ => 0,
    }
}

impl RegisterBlock {
    /// Upper half of `OTYPER`, `IDR` and `ODR`
    pub const RESERVED_HIGH_HALF: u32 = Reserved16::mask(16);
    /// `LCKR` above the lock key
    pub const RESERVED_LOCK: u32 = Reserved15::mask(17);

    #[inline(always)]
    pub fn mode(&self, pin: u8) -> Bits2<'_, RW, Mode> {
        debug_assert!(pin < 16);
        Bits2::new(&self.moder, 2 * pin)
    }

    #[inline(always)]
    pub fn output_type(&self, pin: u8) -> Bit<'_, RW, OutputType> {
        debug_assert!(pin < 16);
        Bit::new(&self.otyper, pin)
    }

    #[inline(always)]
    pub fn speed(&self, pin: u8) -> Bits2<'_, RW, Speed> {
        debug_assert!(pin < 16);
        Bits2::new(&self.ospeedr, 2 * pin)
    }

    #[inline(always)]
    pub fn pull(&self, pin: u8) -> Bits2<'_, RW, Pull> {
        debug_assert!(pin < 16);
        Bits2::new(&self.pupdr, 2 * pin)
    }

    /// Input level of one pin
    #[inline(always)]
    pub fn input(&self, pin: u8) -> Bit<'_, R> {
        debug_assert!(pin < 16);
        Bit::new(&self.idr, pin)
    }

    /// Input levels of the whole port
    #[inline(always)]
    pub fn input_port(&self) -> Bits16<'_, R> {
        Bits16::new(&self.idr, 0)
    }

    /// Output latch of one pin
    #[inline(always)]
    pub fn output(&self, pin: u8) -> Bit<'_, RW> {
        debug_assert!(pin < 16);
        Bit::new(&self.odr, pin)
    }

    /// Output latches of the whole port. Writing is one store, reading back and writing is not
    /// atomic.
    #[inline(always)]
    pub fn output_port(&self) -> Bits16<'_, RW> {
        Bits16::new(&self.odr, 0)
    }

    /// Set bit of one pin, writing `true` drives the pin high
    #[inline(always)]
    pub fn set_bit(&self, pin: u8) -> Bit<'_, W> {
        debug_assert!(pin < 16);
        Bit::new(&self.bsrr, pin)
    }

    /// Reset bit of one pin, writing `true` drives the pin low
    #[inline(always)]
    pub fn reset_bit(&self, pin: u8) -> Bit<'_, W> {
        debug_assert!(pin < 16);
        Bit::new(&self.bsrr, 16 + pin)
    }

    /// Whole-word store to the set/reset register. Bits `0..16` set, bits `16..32` reset;
    /// zero bits leave their pin alone.
    #[inline(always)]
    pub fn set_reset(&self, bits: u32) {
        self.bsrr.write(bits)
    }

    #[inline(always)]
    pub fn lock_bit(&self, pin: u8) -> Bit<'_, RW> {
        debug_assert!(pin < 16);
        Bit::new(&self.lckr, pin)
    }

    /// Lock key. Reads `true` once a lock sequence has completed, until the next reset.
    #[inline(always)]
    pub fn lock_key(&self) -> Bit<'_, RW> {
        Bit::new(&self.lckr, 16)
    }

    /// Whole-word store to `LCKR`, one step of the lock key sequence
    #[inline(always)]
    pub(crate) fn write_lock(&self, bits: u32) {
        debug_assert_eq!(bits & reserved_bits(LCKR), 0);
        self.lckr.write(bits)
    }

    #[inline(always)]
    pub fn alternate(&self, pin: u8) -> Bits4<'_, RW, AltFn> {
        debug_assert!(pin < 16);
        Bits4::new(&self.afr[usize::from(pin / 8)], 4 * (pin % 8))
    }
}

field_value! {
    /// Pin mode
    pub enum Mode {
        Input = 0b00,
        Output = 0b01,
        /// Routed to a peripheral
        Alternate = 0b10,
        Analog = 0b11,
    }
}

field_value! {
    /// Output driver
    pub enum OutputType {
        PushPull = 0,
        OpenDrain = 1,
    }
}

field_value! {
    /// Output slew rate
    pub enum Speed {
        Low = 0b00,
        Medium = 0b01,
        Fast = 0b10,
        High = 0b11,
    }
}

field_value! {
    /// Pull resistor. Code `0b11` is reserved.
    pub enum Pull {
        Floating = 0b00,
        Up = 0b01,
        Down = 0b10,
    }
}

field_value! {
    /// Alternate function selector
    pub enum AltFn {
        AF0 = 0,
        AF1 = 1,
        AF2 = 2,
        AF3 = 3,
        AF4 = 4,
        AF5 = 5,
        AF6 = 6,
        AF7 = 7,
        AF8 = 8,
        AF9 = 9,
        AF10 = 10,
        AF11 = 11,
        AF12 = 12,
        AF13 = 13,
        AF14 = 14,
        AF15 = 15,
    }
}

bitflags! {
    /// Set of pins of one port
    pub struct Pins: u16 {
        const P0 = 1 << 0;
        const P1 = 1 << 1;
        const P2 = 1 << 2;
        const P3 = 1 << 3;
        const P4 = 1 << 4;
        const P5 = 1 << 5;
        const P6 = 1 << 6;
        const P7 = 1 << 7;
        const P8 = 1 << 8;
        const P9 = 1 << 9;
        const P10 = 1 << 10;
        const P11 = 1 << 11;
        const P12 = 1 << 12;
        const P13 = 1 << 13;
        const P14 = 1 << 14;
        const P15 = 1 << 15;
    }
}

impl Pins {
    /// The single pin `n`, `n` must be below 16
    #[inline]
    pub const fn pin(n: u8) -> Self {
        assert!(n < 16);
        Self::from_bits_truncate(1 << n)
    }
}

/// GPIO error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// A configuration step was rejected. The steps before it stay written.
    InvalidField {
        setting: Setting,
        cause: field::Error,
    },
    /// The lock key sequence did not latch
    Lock,
}

/// Configuration steps, in the order [`Pin::configure`] applies them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Setting {
    OutputType,
    Mode,
    Speed,
    Pull,
    AlternateFunction,
}

impl Setting {
    #[inline(always)]
    fn check(self, result: Result<(), field::Error>) -> Result<(), Error> {
        result.map_err(|cause| Error::InvalidField {
            setting: self,
            cause,
        })
    }
}

/// A GPIO port, identified by the base address of its register block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gpio {
    base: usize,
}

pub const GPIOA: Gpio = Gpio::at(0x4002_0000);
pub const GPIOB: Gpio = Gpio::at(0x4002_0400);
pub const GPIOC: Gpio = Gpio::at(0x4002_0800);
pub const GPIOD: Gpio = Gpio::at(0x4002_0C00);
pub const GPIOE: Gpio = Gpio::at(0x4002_1000);
pub const GPIOF: Gpio = Gpio::at(0x4002_1400);
pub const GPIOG: Gpio = Gpio::at(0x4002_1800);
pub const GPIOH: Gpio = Gpio::at(0x4002_1C00);
pub const GPIOI: Gpio = Gpio::at(0x4002_2000);

impl Gpio {
    pub(crate) const fn at(base: usize) -> Self {
        assert!(base % BLOCK_SIZE == 0);
        Self { base }
    }

    #[inline(always)]
    pub const fn base(self) -> usize {
        self.base
    }

    /// Port number, `0` for `GPIOA`
    #[inline(always)]
    pub const fn port_id(self) -> u8 {
        (self.base.wrapping_sub(GPIOA.base) / BLOCK_SIZE) as u8
    }

    #[inline(always)]
    pub fn registers(self) -> &'static RegisterBlock {
        // NOTE(unsafe) the port's register block lives at `base` for the whole program
        unsafe { &*bus::block(self.base) }
    }

    /// Pin `n` of this port in role `MODE`
    #[inline(always)]
    pub const fn pin<MODE: Role>(self, n: u8) -> Pin<MODE> {
        Pin::new(self, n)
    }

    /// Input levels of all pins
    #[inline]
    pub fn read_port(self) -> u16 {
        self.registers().input_port().get()
    }

    /// Output latches of all pins
    #[inline]
    pub fn read_output_port(self) -> u16 {
        self.registers().output_port().get()
    }

    /// Replaces all output latches with one store
    #[inline]
    pub fn write_port(self, bits: u16) {
        self.registers().odr.write(u32::from(bits))
    }

    /// Drives `set` high and `reset` low with one atomic store. A pin in both sets ends up
    /// high.
    #[inline]
    pub fn set_reset(self, set: Pins, reset: Pins) {
        self.registers()
            .set_reset(u32::from(set.bits()) | (u32::from(reset.bits()) << 16))
    }

    /// Freezes the configuration of `pins` until the next reset.
    pub fn lock(self, pins: Pins) -> Result<(), Error> {
        let rb = self.registers();
        let pins = u32::from(pins.bits());

        // The key sequence must not be interleaved with other LCKR writes
        let locked = critical_section::with(|_| {
            rb.write_lock(LCKK | pins);
            rb.write_lock(pins);
            rb.write_lock(LCKK | pins);
            let _ = rb.lckr.read();
            rb.lock_key().get()
        });

        if locked {
            trace!("{} locked {=u32:#x}", self, pins);
            Ok(())
        } else {
            warn!("{} lock sequence failed", self);
            Err(Error::Lock)
        }
    }

    /// Whether a lock sequence has completed on this port
    #[inline]
    pub fn is_locked(self) -> bool {
        self.registers().lock_key().get()
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Pin role (type state). Decides which data register the pin's slot points into.
pub trait Role: sealed::Sealed {
    type Data: DataReg;
}

/// Input role (type state)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Input;

/// Output role (type state)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Output;

/// Alternate function role (type state), `Alternate<Input>` or `Alternate<Output>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alternate<DIR> {
    _dir: PhantomData<DIR>,
}

impl sealed::Sealed for Input {}
impl sealed::Sealed for Output {}
impl sealed::Sealed for Alternate<Input> {}
impl sealed::Sealed for Alternate<Output> {}

impl Role for Input {
    type Data = Idr;
}
impl Role for Output {
    type Data = Odr;
}
impl Role for Alternate<Input> {
    type Data = Idr;
}
impl Role for Alternate<Output> {
    type Data = Odr;
}

/// Digital output pin state
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinState {
    High,
    Low,
}

impl From<bool> for PinState {
    fn from(high: bool) -> Self {
        if high {
            PinState::High
        } else {
            PinState::Low
        }
    }
}

pub trait PinExt {
    type Mode;
    /// Return pin number
    fn pin_id(&self) -> u8;
    /// Return port number
    fn port_id(&self) -> u8;
}

/// Pin configuration
///
/// Holds raw field codes, so a table entry with a code the hardware does not define is
/// reported by [`Pin::configure`] instead of being truncated. The `const` builders only
/// produce valid codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub mode: u8,
    pub output_type: u8,
    pub speed: u8,
    pub pull: u8,
    /// Alternate function selector, `0` when the pin has none
    pub alternate: u8,
}

impl Config {
    /// Configuration from raw field codes
    pub const fn raw(mode: u8, output_type: u8, speed: u8, pull: u8, alternate: u8) -> Self {
        Self {
            mode,
            output_type,
            speed,
            pull,
            alternate,
        }
    }

    const fn with_mode(mode: Mode) -> Self {
        Self::raw(
            mode as u8,
            OutputType::PushPull as u8,
            Speed::Low as u8,
            Pull::Floating as u8,
            AltFn::AF0 as u8,
        )
    }

    /// Floating input
    pub const fn input() -> Self {
        Self::with_mode(Mode::Input)
    }

    /// Push-pull output, low speed
    pub const fn output() -> Self {
        Self::with_mode(Mode::Output)
    }

    /// Push-pull alternate function `af`, low speed
    pub const fn alternate(af: AltFn) -> Self {
        let mut config = Self::with_mode(Mode::Alternate);
        config.alternate = af as u8;
        config
    }

    pub const fn analog() -> Self {
        Self::with_mode(Mode::Analog)
    }

    pub const fn output_type(mut self, output_type: OutputType) -> Self {
        self.output_type = output_type as u8;
        self
    }

    pub const fn speed(mut self, speed: Speed) -> Self {
        self.speed = speed as u8;
        self
    }

    pub const fn pull(mut self, pull: Pull) -> Self {
        self.pull = pull as u8;
        self
    }
}

/// GPIO pin
///
/// - `MODE` is the pin role: [`Input`], [`Output`], [`Alternate<Input>`] or
///   [`Alternate<Output>`].
pub struct Pin<MODE: Role> {
    slot: Slot<MODE::Data>,
    _mode: PhantomData<MODE>,
}

impl<MODE: Role> Clone for Pin<MODE> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<MODE: Role> Copy for Pin<MODE> {}

impl<MODE: Role> PartialEq for Pin<MODE> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl<MODE: Role> Eq for Pin<MODE> {}

impl<MODE: Role> fmt::Debug for Pin<MODE> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!(
            "P{}{}",
            char::from(b'A'.wrapping_add(self.port_id())),
            self.pin_id(),
        ))
    }
}

#[cfg(feature = "defmt")]
impl<MODE: Role> defmt::Format for Pin<MODE> {
    fn format(&self, f: defmt::Formatter) {
        let port = char::from(b'A'.wrapping_add(self.port_id()));
        defmt::write!(f, "P{=char}{=u8}", port, self.pin_id());
    }
}

impl<MODE: Role> PinExt for Pin<MODE> {
    type Mode = MODE;

    #[inline(always)]
    fn pin_id(&self) -> u8 {
        self.slot.owner().1
    }
    #[inline(always)]
    fn port_id(&self) -> u8 {
        self.slot.owner().0.port_id()
    }
}

impl<MODE: Role> Pin<MODE> {
    /// Pin `n` of `gpio`. `n` must be below 16, checked when evaluated in `const` context.
    pub const fn new(gpio: Gpio, n: u8) -> Self {
        Self {
            slot: Slot::new(gpio, n),
            _mode: PhantomData,
        }
    }

    /// The alias word this pin is identified by
    #[inline(always)]
    pub const fn slot(&self) -> Slot<MODE::Data> {
        self.slot
    }

    #[inline(always)]
    pub const fn gpio(&self) -> Gpio {
        self.slot.owner().0
    }

    /// Applies `config`: output type, mode, speed, pull, then alternate function.
    ///
    /// Stops at the first rejected field and reports it, without undoing the fields already
    /// written. Runs in a critical section, so the register updates do not race with interrupt
    /// handlers touching the same port.
    pub fn configure(&self, config: &Config) -> Result<(), Error> {
        let (gpio, n) = self.slot.owner();
        let rb = gpio.registers();

        let result = critical_section::with(|_| {
            Setting::OutputType.check(rb.output_type(n).set(config.output_type))?;
            Setting::Mode.check(rb.mode(n).set(config.mode))?;
            Setting::Speed.check(rb.speed(n).set(config.speed))?;
            Setting::Pull.check(rb.pull(n).set(config.pull))?;
            Setting::AlternateFunction.check(rb.alternate(n).set(config.alternate))
        });

        match result {
            Ok(()) => Ok(()),
            Err(error) => {
                warn!("{} pin {=u8}: {}", gpio, n, error);
                Err(error)
            }
        }
    }

    /// Input level of the pad
    #[inline(always)]
    pub fn is_high(&self) -> bool {
        if <MODE::Data as DataReg>::OFFSET == IDR {
            self.slot.get()
        } else {
            let (gpio, n) = self.slot.owner();
            gpio.registers().input(n).get()
        }
    }

    #[inline(always)]
    pub fn is_low(&self) -> bool {
        !self.is_high()
    }
}

impl<MODE: Role<Data = Odr>> Pin<MODE> {
    /// Output latch, what the pin was last told to drive
    #[inline(always)]
    pub fn is_set_high(&self) -> bool {
        self.slot.get()
    }

    #[inline(always)]
    pub fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }

    #[inline(always)]
    pub fn get_state(&self) -> PinState {
        PinState::from(self.is_set_high())
    }
}

impl Pin<Output> {
    /// Drives the pin high through the set/reset register. Safe to use from interrupt
    /// handlers.
    #[inline(always)]
    pub fn set_high(&self) {
        let (gpio, n) = self.slot.owner();
        // NOTE atomic write to a stateless register
        gpio.registers().set_reset(1 << n)
    }

    /// Drives the pin low through the set/reset register. Safe to use from interrupt
    /// handlers.
    #[inline(always)]
    pub fn set_low(&self) {
        let (gpio, n) = self.slot.owner();
        // NOTE atomic write to a stateless register
        gpio.registers().set_reset(1 << (16 + n))
    }

    #[inline(always)]
    pub fn set_state(&self, state: PinState) {
        match state {
            PinState::High => self.set_high(),
            PinState::Low => self.set_low(),
        }
    }

    /// Flips the output latch. Not atomic: the latch is read, then set or reset, so
    /// concurrent toggles of the same pin can cancel out.
    #[inline(always)]
    pub fn toggle(&self) {
        if self.is_set_low() {
            self.set_high()
        } else {
            self.set_low()
        }
    }

    /// Stores `state` directly to the pin's `ODR` alias word. Single context use only, prefer
    /// [`Pin::set_state`] when an interrupt handler may drive the same pin.
    #[inline(always)]
    pub fn write(&self, state: PinState) {
        self.slot.set(state == PinState::High)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::sim;

    const LED: Pin<Output> = Pin::new(GPIOA, 5);
    const BUTTON: Pin<Input> = Pin::new(GPIOC, 13);
    const TX: Pin<Alternate<Output>> = Pin::new(GPIOA, 9);
    const RX: Pin<Alternate<Input>> = Pin::new(GPIOA, 10);

    fn snapshot(gpio: Gpio) -> [u32; 9] {
        let rb = gpio.registers();
        [
            rb.moder.read(),
            rb.otyper.read(),
            rb.ospeedr.read(),
            rb.pupdr.read(),
            rb.idr.read(),
            rb.odr.read(),
            rb.lckr.read(),
            rb.afr[0].read(),
            rb.afr[1].read(),
        ]
    }

    #[test]
    fn push_pull_output_end_to_end() {
        let _sim = sim::session();

        LED.configure(&Config::output()).unwrap();
        let rb = GPIOA.registers();
        assert_eq!(rb.mode(5).read(), Some(Mode::Output));
        assert_eq!(rb.output_type(5).read(), Some(OutputType::PushPull));
        assert_eq!(rb.speed(5).read(), Some(Speed::Low));
        assert_eq!(rb.pull(5).read(), Some(Pull::Floating));
        assert_eq!(rb.alternate(5).read(), Some(AltFn::AF0));

        LED.set_high();
        assert!(LED.is_set_high());
        assert!(LED.is_high());
        LED.set_low();
        assert!(LED.is_set_low());
        assert!(LED.is_low());
    }

    #[test]
    fn set_then_reset_ends_low() {
        let _sim = sim::session();
        LED.configure(&Config::output()).unwrap();

        for _ in 0..3 {
            LED.set_state(PinState::High);
            assert_eq!(LED.get_state(), PinState::High);
            LED.set_state(PinState::Low);
            assert_eq!(LED.get_state(), PinState::Low);
        }
        assert_eq!(GPIOA.read_output_port(), 0);
    }

    #[test]
    fn direct_alias_write() {
        let _sim = sim::session();
        LED.configure(&Config::output()).unwrap();
        GPIOA.write_port(0b1000_0000_0000_0001);

        LED.write(PinState::High);
        assert!(LED.is_set_high());
        assert_eq!(GPIOA.read_output_port(), 0b1000_0000_0010_0001);
        LED.write(PinState::Low);
        assert_eq!(GPIOA.read_output_port(), 0b1000_0000_0000_0001);
    }

    #[test]
    fn toggle_flips_the_latch() {
        let _sim = sim::session();
        LED.toggle();
        assert!(LED.is_set_high());
        LED.toggle();
        assert!(LED.is_set_low());
    }

    #[test]
    fn configure_twice_is_configure_once() {
        let _sim = sim::session();
        let config = Config::raw(
            Mode::Output as u8,
            OutputType::PushPull as u8,
            Speed::Low as u8,
            Pull::Floating as u8,
            0,
        );
        GPIOA.registers().moder.write(0x5A5A_5A5A);

        LED.configure(&config).unwrap();
        let once = snapshot(GPIOA);
        LED.configure(&config).unwrap();
        assert_eq!(snapshot(GPIOA), once);
    }

    #[test]
    fn configure_is_not_transactional() {
        let _sim = sim::session();
        let rb = GPIOB.registers();
        let pin: Pin<Output> = GPIOB.pin(7);

        let config = Config::output()
            .output_type(OutputType::OpenDrain)
            .speed(Speed::High);
        let bad_pull = Config { pull: 0b11, ..config };
        assert_eq!(
            pin.configure(&bad_pull),
            Err(Error::InvalidField {
                setting: Setting::Pull,
                cause: field::Error::Undefined,
            })
        );
        // Earlier steps stay written, the rejected one and the ones after it never happen
        assert_eq!(rb.output_type(7).read(), Some(OutputType::OpenDrain));
        assert_eq!(rb.mode(7).read(), Some(Mode::Output));
        assert_eq!(rb.speed(7).read(), Some(Speed::High));
        assert_eq!(rb.pull(7).read(), Some(Pull::Floating));

        let bad_mode = Config { mode: 4, ..Config::input() };
        assert_eq!(
            pin.configure(&bad_mode),
            Err(Error::InvalidField {
                setting: Setting::Mode,
                cause: field::Error::Overflow,
            })
        );
        assert_eq!(rb.output_type(7).read(), Some(OutputType::PushPull));
        assert_eq!(rb.mode(7).read(), Some(Mode::Output));

        let bad_af = Config { alternate: 16, ..Config::alternate(AltFn::AF7) };
        assert!(matches!(
            pin.configure(&bad_af),
            Err(Error::InvalidField {
                setting: Setting::AlternateFunction,
                ..
            })
        ));
        assert_eq!(rb.mode(7).read(), Some(Mode::Alternate));
        assert_eq!(rb.alternate(7).read(), Some(AltFn::AF0));
    }

    #[test]
    fn input_reads_the_pad() {
        let _sim = sim::session();

        BUTTON.configure(&Config::input().pull(Pull::Up)).unwrap();
        assert!(BUTTON.is_high());
        sim::drive(GPIOC, 13, false);
        assert!(BUTTON.is_low());
        sim::release(GPIOC, 13);

        BUTTON.configure(&Config::input().pull(Pull::Down)).unwrap();
        assert!(BUTTON.is_low());
        sim::drive(GPIOC, 13, true);
        assert!(BUTTON.is_high());
        assert_eq!(GPIOC.read_port(), 1 << 13);
    }

    #[test]
    fn open_drain_releases_the_line() {
        let _sim = sim::session();
        let pin: Pin<Output> = GPIOD.pin(2);
        pin.configure(&Config::output().output_type(OutputType::OpenDrain).pull(Pull::Up))
            .unwrap();

        pin.set_low();
        assert!(pin.is_low());
        pin.set_high();
        assert!(pin.is_high());
        sim::drive(GPIOD, 2, false);
        assert!(pin.is_set_high());
        assert!(pin.is_low());
    }

    #[test]
    fn alternate_pins() {
        let _sim = sim::session();
        TX.configure(&Config::alternate(AltFn::AF7)).unwrap();
        RX.configure(&Config::alternate(AltFn::AF7).pull(Pull::Up)).unwrap();

        let rb = GPIOA.registers();
        assert_eq!(rb.mode(9).read(), Some(Mode::Alternate));
        assert_eq!(rb.alternate(9).read(), Some(AltFn::AF7));
        assert_eq!(rb.alternate(10).read(), Some(AltFn::AF7));
        assert_eq!(rb.afr[1].read(), 0x770);
        assert!(RX.is_high());
        assert!(TX.is_set_low());
    }

    #[test]
    fn pin_identity() {
        assert_eq!(LED.pin_id(), 5);
        assert_eq!(LED.port_id(), 0);
        assert_eq!(BUTTON.pin_id(), 13);
        assert_eq!(BUTTON.port_id(), 2);
        assert_eq!(BUTTON.gpio(), GPIOC);
        assert_eq!(GPIOI.port_id(), 8);
        assert!(LED == Pin::new(GPIOA, 5));
    }

    #[test]
    fn multi_pin_set_reset() {
        let _sim = sim::session();
        GPIOE.write_port(0x00FF);

        GPIOE.set_reset(Pins::P8 | Pins::P9, Pins::P0 | Pins::P1);
        assert_eq!(GPIOE.read_output_port(), 0x03FC);
        GPIOE.set_reset(Pins::pin(3), Pins::pin(3));
        assert_eq!(GPIOE.read_output_port(), 0x03FC);
        GPIOE.set_reset(Pins::empty(), Pins::all());
        assert_eq!(GPIOE.read_output_port(), 0);
    }

    #[test]
    fn single_pin_sets() {
        for n in 0..16 {
            assert_eq!(Pins::pin(n).bits(), 1 << n);
        }
        assert_eq!(Pins::pin(15), Pins::P15);
    }

    #[test]
    #[should_panic]
    fn single_pin_set_past_the_port() {
        let _ = Pins::pin(core::hint::black_box(16));
    }

    #[test]
    fn reserved_spans() {
        assert_eq!(reserved_bits(OTYPER), 0xFFFF_0000);
        assert_eq!(reserved_bits(IDR), 0xFFFF_0000);
        assert_eq!(reserved_bits(ODR), 0xFFFF_0000);
        assert_eq!(reserved_bits(LCKR), 0xFFFE_0000);
        assert_eq!(reserved_bits(LCKR) & (LCKK | 0xFFFF), 0);
        for offset in [MODER, OSPEEDR, PUPDR, BSRR, AFRL, AFRH] {
            assert_eq!(reserved_bits(offset), 0);
        }
    }

    #[test]
    fn failed_lock_is_reported() {
        let _sim = sim::session();
        let pin: Pin<Output> = GPIOF.pin(6);
        pin.configure(&Config::output()).unwrap();

        sim::jam_lock(GPIOF);
        assert_eq!(GPIOF.lock(Pins::P6), Err(Error::Lock));
        assert!(!GPIOF.is_locked());
        pin.configure(&Config::analog()).unwrap();
        assert_eq!(GPIOF.registers().mode(6).read(), Some(Mode::Analog));

        GPIOF.lock(Pins::P6).unwrap();
        assert!(GPIOF.is_locked());
    }

    #[test]
    fn lock_freezes_configuration() {
        let _sim = sim::session();
        let locked: Pin<Output> = GPIOF.pin(3);
        let free: Pin<Output> = GPIOF.pin(4);
        locked.configure(&Config::output()).unwrap();

        assert!(!GPIOF.is_locked());
        GPIOF.lock(Pins::P3).unwrap();
        assert!(GPIOF.is_locked());
        assert!(GPIOF.registers().lock_bit(3).get());
        assert!(!GPIOF.registers().lock_bit(4).get());

        locked.configure(&Config::analog()).unwrap();
        free.configure(&Config::analog()).unwrap();
        let rb = GPIOF.registers();
        assert_eq!(rb.mode(3).read(), Some(Mode::Output));
        assert_eq!(rb.mode(4).read(), Some(Mode::Analog));

        // Output data is not part of the lock
        locked.set_high();
        assert!(locked.is_set_high());
    }

    #[test]
    fn concurrent_writers_keep_their_pins() {
        use std::thread;

        let _sim = sim::session();
        let main: Pin<Output> = GPIOG.pin(0);
        let irq: Pin<Output> = GPIOG.pin(1);
        let direct: Pin<Output> = GPIOG.pin(2);
        for pin in [main, irq, direct] {
            pin.configure(&Config::output()).unwrap();
        }

        let writers = [
            thread::spawn(move || {
                for i in 0..20_000 {
                    main.set_state(PinState::from(i % 2 == 0));
                    assert_eq!(main.is_set_high(), i % 2 == 0);
                }
            }),
            thread::spawn(move || {
                for i in 0..20_000 {
                    irq.set_state(PinState::from(i % 3 == 0));
                    assert_eq!(irq.is_set_high(), i % 3 == 0);
                }
            }),
            thread::spawn(move || {
                for i in 0..20_000 {
                    direct.write(PinState::from(i % 5 == 0));
                    assert_eq!(direct.is_set_high(), i % 5 == 0);
                }
            }),
        ];
        for writer in writers {
            writer.join().unwrap();
        }

        // Last iterations: 19_999 is odd, not a multiple of 3, not a multiple of 5
        assert_eq!(GPIOG.read_output_port(), 0);
        main.set_high();
        direct.write(PinState::High);
        assert_eq!(GPIOG.read_output_port(), 0b101);
    }
}
