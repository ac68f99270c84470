pub use crate::gpio::board::Get as _stm32_hal_gpio_board_Get;
pub use crate::gpio::board::Init as _stm32_hal_gpio_board_Init;
pub use crate::gpio::board::Set as _stm32_hal_gpio_board_Set;
pub use crate::gpio::PinExt as _stm32_hal_gpio_PinExt;
pub use crate::hal::digital::InputPin as _embedded_hal_digital_InputPin;
pub use crate::hal::digital::OutputPin as _embedded_hal_digital_OutputPin;
pub use crate::hal::digital::StatefulOutputPin as _embedded_hal_digital_StatefulOutputPin;
