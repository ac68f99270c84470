//! Board pin tables
//!
//! A board describes its pins once, as `const` [`Def`]s pairing a pin with its configuration.
//! What a pin can do follows from its role:
//!
//! | Role                | [`Init`] | [`Get`]       | [`Set`] |
//! |---------------------|----------|---------------|---------|
//! | `Input`             | yes      | input level   |         |
//! | `Alternate<Input>`  | yes      | input level   |         |
//! | `Output`            | yes      | output latch  | yes     |
//! | `Alternate<Output>` | yes      | output latch  |         |
//!
//! Start-up code brings the whole table up with [`init_all`]:
//!
//! ```rust
//! use stm32_bitband_gpio::gpio::board::{init_all, Def, Get, Set};
//! use stm32_bitband_gpio::gpio::{
//!     AltFn, Alternate, Config, Input, Output, Pin, Pull, GPIOA, GPIOC,
//! };
//!
//! const LED: Def<Output> = Def::output(Pin::new(GPIOA, 5), Config::output());
//! const BUTTON: Def<Input> = Def::input(Pin::new(GPIOC, 13), Config::input().pull(Pull::Up));
//! const TX: Def<Alternate<Output>> =
//!     Def::alternate_output(Pin::new(GPIOA, 2), Config::alternate(AltFn::AF7));
//!
//! init_all(&[&LED, &BUTTON, &TX]).unwrap();
//! LED.set(BUTTON.get());
//! assert!(LED.get());
//! ```

use super::{Alternate, Config, Error, Input, Output, Pin, PinState, Role};

/// Pin set up
pub trait Init {
    fn init(&self) -> Result<(), Error>;
}

/// Pin level
pub trait Get {
    fn get(&self) -> bool;
}

/// Pin drive, through the set/reset register
pub trait Set: Get {
    fn set(&self, high: bool);
}

/// Table entry: a pin and the configuration it is brought up with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Def<MODE: Role> {
    pub pin: Pin<MODE>,
    pub config: Config,
}

impl<MODE: Role> Def<MODE> {
    pub const fn new(pin: Pin<MODE>, config: Config) -> Self {
        Self { pin, config }
    }
}

impl Def<Input> {
    pub const fn input(pin: Pin<Input>, config: Config) -> Self {
        Self::new(pin, config)
    }
}

impl Def<Output> {
    pub const fn output(pin: Pin<Output>, config: Config) -> Self {
        Self::new(pin, config)
    }
}

impl Def<Alternate<Input>> {
    pub const fn alternate_input(pin: Pin<Alternate<Input>>, config: Config) -> Self {
        Self::new(pin, config)
    }
}

impl Def<Alternate<Output>> {
    pub const fn alternate_output(pin: Pin<Alternate<Output>>, config: Config) -> Self {
        Self::new(pin, config)
    }
}

impl<MODE: Role> Init for Def<MODE> {
    #[inline]
    fn init(&self) -> Result<(), Error> {
        self.pin.configure(&self.config)
    }
}

macro_rules! get {
    ($($MODE:ty => $get:ident,)+) => {
        $(
            impl Get for Def<$MODE> {
                #[inline(always)]
                fn get(&self) -> bool {
                    self.pin.$get()
                }
            }
        )+
    };
}

get! {
    Input => is_high,
    Alternate<Input> => is_high,
    Output => is_set_high,
    Alternate<Output> => is_set_high,
}

impl Set for Def<Output> {
    #[inline(always)]
    fn set(&self, high: bool) {
        self.pin.set_state(PinState::from(high))
    }
}

/// Configures every pin of `table`, in order. Stops at the first pin that fails.
pub fn init_all(table: &[&dyn Init]) -> Result<(), Error> {
    table.iter().try_for_each(|def| def.init())
}
