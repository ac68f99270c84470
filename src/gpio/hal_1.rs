use core::convert::Infallible;

use super::{Input, Output, Pin, Role};

pub use embedded_hal::digital::PinState;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};

impl From<PinState> for super::PinState {
    fn from(state: PinState) -> Self {
        match state {
            PinState::Low => super::PinState::Low,
            PinState::High => super::PinState::High,
        }
    }
}

impl<MODE: Role> ErrorType for Pin<MODE> {
    type Error = Infallible;
}

impl OutputPin for Pin<Output> {
    #[inline]
    fn set_high(&mut self) -> Result<(), Self::Error> {
        (*self).set_high();
        Ok(())
    }
    #[inline]
    fn set_low(&mut self) -> Result<(), Self::Error> {
        (*self).set_low();
        Ok(())
    }
    #[inline]
    fn set_state(&mut self, state: PinState) -> Result<(), Self::Error> {
        (*self).set_state(state.into());
        Ok(())
    }
}

impl StatefulOutputPin for Pin<Output> {
    #[inline]
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok((*self).is_set_high())
    }
    #[inline]
    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok((*self).is_set_low())
    }
    #[inline]
    fn toggle(&mut self) -> Result<(), Self::Error> {
        (*self).toggle();
        Ok(())
    }
}

impl InputPin for Pin<Input> {
    #[inline]
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok((*self).is_high())
    }

    #[inline]
    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok((*self).is_low())
    }
}

// Output pins read back the pad, an open-drain line may be held low from outside
impl InputPin for Pin<Output> {
    #[inline]
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok((*self).is_high())
    }

    #[inline]
    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok((*self).is_low())
    }
}
