//! Register fields
//!
//! A field is a fixed-width group of bits inside a register. Fields come in the widths the GPIO
//! register map uses:
//!
//! - [`Bit`]: 1 bit, read and written through its bit-band alias word. A store touches only
//!   that bit and the bus performs it atomically, so it can be used from interrupt handlers.
//! - [`Bits2`], [`Bits4`], [`Bits16`]: wider fields, written with a read-modify-write of the
//!   whole register. These writes are **not** atomic: use them while no interrupt handler
//!   writes the same register, e.g. during start-up configuration, or inside a critical
//!   section.
//! - [`Reserved`]: bits the hardware reserves. They only take up room in the register.
//!
//! Raw writes (`set`) are checked against the field width and, for enumerated fields, the
//! codes the field defines. A rejected write leaves the field untouched.
//!
//! Write access is part of the field type, a read-only field has no setter:
//!
//! ```compile_fail
//! use stm32_bitband_gpio::gpio::GPIOA;
//!
//! GPIOA.registers().input(0).write(true);
//! ```

use core::marker::PhantomData;

use crate::bb;
use crate::reg::{Readable, Reg, Writable, RW};

/// Field write error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// Value is wider than the field
    Overflow,
    /// Value fits in the field but is not one of its defined codes
    Undefined,
}

/// Value stored in a register field
pub trait FieldValue: Copy {
    /// Decodes raw field bits, `None` for codes the field does not define
    fn from_bits(bits: u32) -> Option<Self>;
    /// Encodes the value as raw field bits
    fn into_bits(self) -> u32;
}

impl FieldValue for bool {
    #[inline(always)]
    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }
    }
    #[inline(always)]
    fn into_bits(self) -> u32 {
        u32::from(self)
    }
}

impl FieldValue for u8 {
    #[inline(always)]
    fn from_bits(bits: u32) -> Option<Self> {
        u8::try_from(bits).ok()
    }
    #[inline(always)]
    fn into_bits(self) -> u32 {
        u32::from(self)
    }
}

impl FieldValue for u16 {
    #[inline(always)]
    fn from_bits(bits: u32) -> Option<Self> {
        u16::try_from(bits).ok()
    }
    #[inline(always)]
    fn into_bits(self) -> u32 {
        u32::from(self)
    }
}

/// Declares a field-less enum whose discriminants are the codes of a register field
macro_rules! field_value {
    (
        $(#[$attr:meta])*
        pub enum $Enum:ident {
            $(
                $(#[$vattr:meta])*
                $Variant:ident = $bits:literal,
            )+
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub enum $Enum {
            $(
                $(#[$vattr])*
                $Variant = $bits,
            )+
        }

        impl $crate::field::FieldValue for $Enum {
            #[inline(always)]
            fn from_bits(bits: u32) -> Option<Self> {
                match bits {
                    $($bits => Some(Self::$Variant),)+
                    _ => None,
                }
            }
            #[inline(always)]
            fn into_bits(self) -> u32 {
                self as u32
            }
        }
    };
}
pub(crate) use field_value;

/// Checks raw bits against the field width and the codes `V` defines
#[inline(always)]
fn check<V: FieldValue>(bits: u32, width: u8) -> Result<V, Error> {
    if bits >> width != 0 {
        return Err(Error::Overflow);
    }
    V::from_bits(bits).ok_or(Error::Undefined)
}

/// Single bit field, accessed through the bit-band alias
pub struct Bit<'a, A, V = bool> {
    reg: &'a Reg<A>,
    bit: u8,
    _value: PhantomData<V>,
}

impl<'a, A, V> Bit<'a, A, V> {
    pub const WIDTH: u8 = 1;

    #[inline(always)]
    pub(crate) fn new(reg: &'a Reg<A>, bit: u8) -> Self {
        debug_assert!(bit < 32);
        Self {
            reg,
            bit,
            _value: PhantomData,
        }
    }

    /// Alias word of this bit
    #[inline(always)]
    pub fn alias(&self) -> usize {
        bb::to_alias(self.reg.address(), self.bit)
    }
}

impl<A: Readable, V: FieldValue> Bit<'_, A, V> {
    #[inline(always)]
    pub fn get(&self) -> bool {
        // NOTE(unsafe) the register lives in the bit-band region
        unsafe { bb::read(self.reg.as_ptr(), self.bit) }
    }

    /// Reads the bit as `V`, `None` if `V` does not define the current code
    #[inline(always)]
    pub fn read(&self) -> Option<V> {
        V::from_bits(u32::from(self.get()))
    }
}

impl<A: Writable, V: FieldValue> Bit<'_, A, V> {
    /// Writes raw bits, rejecting anything but a code `V` defines
    #[inline]
    pub fn set(&self, bits: u8) -> Result<(), Error> {
        let value: V = check(u32::from(bits), Self::WIDTH)?;
        self.write(value);
        Ok(())
    }

    /// Atomic single bit store
    #[inline(always)]
    pub fn write(&self, value: V) {
        // NOTE(unsafe) single bit store through the alias, sibling bits are untouched
        unsafe { bb::write(self.reg.as_ptr(), self.bit, value.into_bits() != 0) }
    }
}

macro_rules! field {
    ($(#[$attr:meta])* $Field:ident, $width:literal, $raw:ty) => {
        $(#[$attr])*
        pub struct $Field<'a, A, V = $raw> {
            reg: &'a Reg<A>,
            shift: u8,
            _value: PhantomData<V>,
        }

        impl<'a, A, V> $Field<'a, A, V> {
            pub const WIDTH: u8 = $width;
            const MASK: u32 = (1 << $width) - 1;

            #[inline(always)]
            pub(crate) fn new(reg: &'a Reg<A>, shift: u8) -> Self {
                debug_assert!(shift as u32 + $width <= 32);
                Self {
                    reg,
                    shift,
                    _value: PhantomData,
                }
            }
        }

        impl<A: Readable, V: FieldValue> $Field<'_, A, V> {
            /// Raw field bits
            #[inline(always)]
            pub fn get(&self) -> $raw {
                ((self.reg.read() >> self.shift) & Self::MASK) as $raw
            }

            /// Reads the field as `V`, `None` if `V` does not define the current code
            #[inline(always)]
            pub fn read(&self) -> Option<V> {
                V::from_bits(u32::from(self.get()))
            }
        }

        impl<V: FieldValue> $Field<'_, RW, V> {
            /// Writes raw bits, rejecting values wider than the field and codes `V` does
            /// not define.
            ///
            /// Read-modify-write, not atomic.
            #[inline]
            pub fn set(&self, bits: $raw) -> Result<(), Error> {
                let value: V = check(u32::from(bits), Self::WIDTH)?;
                self.write(value);
                Ok(())
            }

            /// Read-modify-write, not atomic.
            #[inline]
            pub fn write(&self, value: V) {
                let shift = self.shift;
                let bits = (value.into_bits() & Self::MASK) << shift;
                self.reg.modify(|r| (r & !(Self::MASK << shift)) | bits);
            }
        }
    };
}

field!(
    /// Two bit field
    Bits2, 2, u8
);
field!(
    /// Four bit field
    Bits4, 4, u8
);
field!(
    /// Sixteen bit field
    Bits16, 16, u16
);

/// Reserved bits, never read or written
pub struct Reserved<const WIDTH: u8>;

impl<const WIDTH: u8> Reserved<WIDTH> {
    /// Register bits taken up when placed at `shift`
    pub const fn mask(shift: u8) -> u32 {
        (((1u64 << WIDTH) - 1) as u32) << shift
    }
}

pub type Reserved15 = Reserved<15>;
pub type Reserved16 = Reserved<16>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::sim;
    use crate::gpio::{AltFn, Mode, Pull, GPIOA, GPIOB, GPIOD, GPIOE};

    field_value! {
        /// Four bit field with gaps in its codes
        pub enum Sparse {
            A = 0,
            B = 3,
            C = 9,
        }
    }

    #[test]
    fn check_width_and_codes() {
        assert_eq!(check::<u8>(3, 2), Ok(3));
        assert_eq!(check::<u8>(4, 2), Err(Error::Overflow));
        assert_eq!(check::<Pull>(3, 2), Err(Error::Undefined));
        assert_eq!(check::<Sparse>(9, 4), Ok(Sparse::C));
        assert_eq!(check::<Sparse>(10, 4), Err(Error::Undefined));
        assert_eq!(check::<bool>(2, 1), Err(Error::Overflow));
    }

    #[test]
    fn reserved_masks() {
        assert_eq!(Reserved16::mask(16), 0xFFFF_0000);
        assert_eq!(Reserved15::mask(17), 0xFFFE_0000);
    }

    #[test]
    fn bit_round_trip_keeps_siblings() {
        let _sim = sim::session();
        let rb = GPIOA.registers();
        rb.otyper.write(0xA5A5);

        for bit in 0..16 {
            let field = rb.output_type(bit);
            let before = rb.otyper.read();
            for value in [true, false, true] {
                field.set(u8::from(value)).unwrap();
                assert_eq!(Bit::<_, bool>::new(&rb.otyper, bit).get(), value);
                assert_eq!(rb.otyper.read() & !(1 << bit), before & !(1 << bit));
            }
        }
    }

    #[test]
    fn two_bit_round_trip_keeps_siblings() {
        let _sim = sim::session();
        let rb = GPIOB.registers();
        rb.moder.write(0x1B1B_1B1B);

        for pin in 0..16 {
            let field = rb.mode(pin);
            let mask = 0b11 << (2 * pin);
            let siblings = rb.moder.read() & !mask;
            for value in 0..4 {
                field.set(value).unwrap();
                assert_eq!(field.get(), value);
                assert_eq!(rb.moder.read() & !mask, siblings);
            }
        }
        assert_eq!(rb.mode(0).read(), Some(Mode::Analog));
    }

    #[test]
    fn four_bit_round_trip_keeps_siblings() {
        let _sim = sim::session();
        let rb = GPIOD.registers();
        rb.afr[0].write(0x7654_3210);
        rb.afr[1].write(0xFEDC_BA98);

        for pin in 0..16 {
            let field = rb.alternate(pin);
            let afrl = rb.afr[0].read();
            let afrh = rb.afr[1].read();
            for value in 0..16 {
                field.set(value).unwrap();
                assert_eq!(field.get(), value);
                assert_eq!(field.read().map(|af| af as u8), Some(value));
            }
            field.write(AltFn::AF0);
            let (reg, other, before, other_before) = if pin < 8 {
                (&rb.afr[0], &rb.afr[1], afrl, afrh)
            } else {
                (&rb.afr[1], &rb.afr[0], afrh, afrl)
            };
            let mask = 0xF << (4 * (pin % 8));
            assert_eq!(reg.read() & !mask, before & !mask);
            assert_eq!(other.read(), other_before);
        }
    }

    #[test]
    fn sixteen_bit_round_trip() {
        let _sim = sim::session();
        let rb = GPIOE.registers();
        let port = rb.output_port();

        for value in 0..=u16::MAX {
            port.set(value).unwrap();
            assert_eq!(port.get(), value);
        }
    }

    #[test]
    fn rejected_writes_leave_the_field() {
        let _sim = sim::session();
        let rb = GPIOA.registers();

        rb.pull(6).write(Pull::Down);
        assert_eq!(rb.pull(6).set(0b11), Err(Error::Undefined));
        assert_eq!(rb.pull(6).read(), Some(Pull::Down));

        rb.mode(2).write(Mode::Output);
        assert_eq!(rb.mode(2).set(4), Err(Error::Overflow));
        assert_eq!(rb.mode(2).read(), Some(Mode::Output));

        assert_eq!(rb.output_type(1).set(2), Err(Error::Overflow));
        assert_eq!(rb.output_type(1).get(), false);

        let sparse = Bits4::<_, Sparse>::new(&rb.afr[0], 8);
        sparse.write(Sparse::B);
        for code in [1, 2, 4, 8, 10, 15] {
            assert_eq!(sparse.set(code), Err(Error::Undefined));
            assert_eq!(sparse.read(), Some(Sparse::B));
        }
        assert_eq!(sparse.set(16), Err(Error::Overflow));
        assert_eq!(sparse.set(9), Ok(()));
        assert_eq!(sparse.get(), 9);
    }
}
