//! In-memory model of the GPIO ports
//!
//! Hosted builds have no peripheral bus, so register accesses land here. The model covers
//! what software can observe of a port:
//!
//! - an alias word decodes to one bit of its target word and is applied with a single atomic
//!   read-modify-write, the way the bus matrix does it
//! - `BSRR` stores set and clear `ODR` bits in one step (set wins), `BSRR` reads as zero
//! - `IDR` follows the pad: output pins loop back `ODR`, other pins see what [`drive`] put on
//!   them or their pull resistor
//! - reserved bits never change
//! - the `LCKR` key sequence freezes the configuration bits of the locked pins
//!
//! Every register reads zero after [`reset`].

use core::sync::atomic::{AtomicU32, Ordering};

use vcell::VolatileCell;

use crate::bb;
use crate::gpio::{self, Gpio, Mode, OutputType, Pull, BLOCK_SIZE, GPIOA};

const START: usize = GPIOA.base();
const PORTS: usize = 9;
const WORDS: usize = PORTS * BLOCK_SIZE / 4;

struct Port {
    /// Key sequence step in bits 16.., pins of the pending lock in bits 0..16
    key: AtomicU32,
    /// Levels in bits 0..16, mask of externally driven pins in bits 16..32
    pads: AtomicU32,
    /// Non-zero while the next key sequence is set to fail
    jam: AtomicU32,
}

struct Space {
    words: [AtomicU32; WORDS],
    ports: [Port; PORTS],
}

#[allow(clippy::declare_interior_mutable_const)]
const ZERO: AtomicU32 = AtomicU32::new(0);
#[allow(clippy::declare_interior_mutable_const)]
const IDLE: Port = Port {
    key: ZERO,
    pads: ZERO,
    jam: ZERO,
};

static SPACE: Space = Space {
    words: [ZERO; WORDS],
    ports: [IDLE; PORTS],
};

/// Returns the port index and register offset of a simulated register address
fn locate(address: usize) -> (usize, usize) {
    assert!(
        (START..START + WORDS * 4).contains(&address) && address % 4 == 0,
        "{:#010x} is not a simulated GPIO register",
        address
    );
    let offset = address - START;
    (offset / BLOCK_SIZE, offset % BLOCK_SIZE)
}

fn word(address: usize) -> &'static AtomicU32 {
    locate(address);
    &SPACE.words[(address - START) / 4]
}

fn register(index: usize, offset: usize) -> u32 {
    SPACE.words[(index * BLOCK_SIZE + offset) / 4].load(Ordering::SeqCst)
}

fn port_index(gpio: Gpio) -> usize {
    let index = (gpio.base() - START) / BLOCK_SIZE;
    assert!(index < PORTS, "{:?} is not simulated", gpio);
    index
}

pub(crate) fn block<T>(address: usize) -> *const T {
    (word(address) as *const AtomicU32).cast()
}

pub(crate) fn address<T>(ptr: *const T) -> usize {
    let offset = (ptr as usize).wrapping_sub(SPACE.words.as_ptr() as usize);
    assert!(
        offset < WORDS * 4,
        "pointer outside of the simulated peripheral space"
    );
    START + offset
}

pub(crate) fn load(cell: &VolatileCell<u32>) -> u32 {
    read(address(cell.as_ptr()))
}

pub(crate) fn store(cell: &VolatileCell<u32>, bits: u32) {
    write(address(cell.as_ptr()), bits)
}

pub(crate) unsafe fn load_alias(alias: usize) -> u32 {
    let (address, bit) = bb::from_alias(alias);
    (read(address) >> bit) & 1
}

pub(crate) unsafe fn store_alias(alias: usize, bits: u32) {
    let (address, bit) = bb::from_alias(alias);
    let apply = |word: u32| {
        if bits & 1 != 0 {
            word | (1 << bit)
        } else {
            word & !(1 << bit)
        }
    };
    match locate(address).1 {
        // Registers with side effects see the whole word written back
        gpio::IDR | gpio::BSRR | gpio::LCKR => write(address, apply(read(address))),
        _ => update(address, apply),
    }
}

fn read(address: usize) -> u32 {
    let (index, offset) = locate(address);
    match offset {
        gpio::IDR => input(index),
        gpio::BSRR => 0,
        _ => word(address).load(Ordering::SeqCst),
    }
}

fn write(address: usize, bits: u32) {
    let (index, offset) = locate(address);
    match offset {
        gpio::IDR => {}
        gpio::BSRR => {
            let set = bits & 0xFFFF;
            let reset = (bits >> 16) & !set;
            update(address - gpio::BSRR + gpio::ODR, |odr| (odr & !reset) | set);
        }
        gpio::LCKR => key(index, address, bits),
        _ => update(address, |_| bits),
    }
}

/// Atomically replaces a register, keeping its reserved and frozen bits
fn update(address: usize, f: impl Fn(u32) -> u32) {
    let (index, offset) = locate(address);
    let keep = gpio::reserved_bits(offset) | frozen(index, offset);
    let _ = word(address).fetch_update(Ordering::SeqCst, Ordering::SeqCst, |old| {
        Some((f(old) & !keep) | (old & keep))
    });
}

/// Configuration bits of the pins frozen by a completed lock sequence
fn frozen(index: usize, offset: usize) -> u32 {
    let lckr = register(index, gpio::LCKR);
    if lckr & gpio::LCKK == 0 {
        return 0;
    }
    let pins = lckr & 0xFFFF;
    match offset {
        gpio::MODER | gpio::OSPEEDR | gpio::PUPDR => spread(pins, 2),
        gpio::OTYPER => pins,
        gpio::AFRL => spread(pins & 0xFF, 4),
        gpio::AFRH => spread(pins >> 8, 4),
        _ => 0,
    }
}

/// Expands a pin mask to the bits of `width` wide per-pin fields
fn spread(pins: u32, width: u32) -> u32 {
    (0..32 / width)
        .filter(|n| pins & (1 << n) != 0)
        .fold(0, |mask, n| mask | (((1 << width) - 1) << (n * width)))
}

/// `LCKR` write: key 1, key 0, key 1 with the same pins latches the lock
fn key(index: usize, address: usize, bits: u32) {
    let lckr = word(address);
    if lckr.load(Ordering::SeqCst) & gpio::LCKK != 0 {
        return;
    }

    let state = &SPACE.ports[index].key;
    let pins = bits & 0xFFFF;
    let pending = state.load(Ordering::SeqCst);
    let (step, same) = (pending >> 16, pending & 0xFFFF == pins);
    let next = match (step, bits & gpio::LCKK != 0) {
        (1, false) if same => 2,
        (2, true) if same => 3,
        (_, true) => 1,
        _ => 0,
    };

    let jammed = next == 3 && SPACE.ports[index].jam.swap(0, Ordering::SeqCst) != 0;
    if jammed {
        lckr.store(pins, Ordering::SeqCst);
        state.store(0, Ordering::SeqCst);
    } else if next == 3 {
        lckr.store(pins | gpio::LCKK, Ordering::SeqCst);
        state.store(0, Ordering::SeqCst);
    } else {
        lckr.store(pins, Ordering::SeqCst);
        state.store((next << 16) | pins, Ordering::SeqCst);
    }
}

fn input(index: usize) -> u32 {
    let moder = register(index, gpio::MODER);
    let otyper = register(index, gpio::OTYPER);
    let pupdr = register(index, gpio::PUPDR);
    let odr = register(index, gpio::ODR);
    let pads = SPACE.ports[index].pads.load(Ordering::SeqCst);

    (0..16).fold(0, |idr, n| {
        let mode = (moder >> (2 * n)) & 0b11;
        let open_drain = (otyper >> n) & 1 == OutputType::OpenDrain as u32;
        let driving = mode == Mode::Output as u32 && (!open_drain || (odr >> n) & 1 == 0);
        let level = if driving {
            (odr >> n) & 1
        } else if mode == Mode::Analog as u32 {
            0
        } else if (pads >> (16 + n)) & 1 != 0 {
            (pads >> n) & 1
        } else {
            u32::from((pupdr >> (2 * n)) & 0b11 == Pull::Up as u32)
        };
        idr | (level << n)
    })
}

/// Drives pin `n` of `gpio` from outside of the chip.
pub fn drive(gpio: Gpio, n: u8, high: bool) {
    let pads = &SPACE.ports[port_index(gpio)].pads;
    let _ = pads.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |pads| {
        let level = u32::from(high) << n;
        Some((pads & !(1 << n)) | level | (1 << (16 + n)))
    });
}

/// Stops driving pin `n` of `gpio`, it then follows its pull resistor.
pub fn release(gpio: Gpio, n: u8) {
    let pads = &SPACE.ports[port_index(gpio)].pads;
    pads.fetch_and(!((1 << n) | (1 << (16 + n))), Ordering::SeqCst);
}

/// Makes the next `LCKR` key sequence on `gpio` end without latching, as when another
/// `LCKR` write lands in the middle of it.
pub fn jam_lock(gpio: Gpio) {
    SPACE.ports[port_index(gpio)].jam.store(1, Ordering::SeqCst);
}

/// Returns every simulated port to its reset state.
pub fn reset() {
    for word in SPACE.words.iter() {
        word.store(0, Ordering::SeqCst);
    }
    for port in SPACE.ports.iter() {
        port.key.store(0, Ordering::SeqCst);
        port.pads.store(0, Ordering::SeqCst);
        port.jam.store(0, Ordering::SeqCst);
    }
}

/// Serialises the tests sharing the model and resets it.
#[cfg(test)]
pub(crate) fn session() -> std::sync::MutexGuard<'static, ()> {
    static SESSION: std::sync::Mutex<()> = std::sync::Mutex::new(());

    let guard = SESSION.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    reset();
    guard
}
