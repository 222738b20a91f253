use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::digital::OutputPin;
use embedded_hal_nb::serial;

use crate::esp01::{Esp01, Esp01Listener};

/// Global slot for an [`Esp01`] shared between the super-loop and interrupts.
pub type GlobalEsp01<S, RST, L = ()> = Mutex<RefCell<Option<Esp01<S, RST, L>>>>;

/// Creates an empty global slot for an `Esp01`.
///
/// # Returns
/// * An empty mutex-protected cell, usable in a `static` initializer
///
/// # Example
/// ```rust
/// use roverlink::timer::{GlobalEsp01, global_esp01_init};
/// # type Uart = embedded_hal_mock::eh1::serial::Mock<u8>;
/// # type ResetPin = embedded_hal_mock::eh1::digital::Mock;
///
/// static MODEM: GlobalEsp01<Uart, ResetPin> = global_esp01_init();
/// ```
pub const fn global_esp01_init<S, RST, L>() -> GlobalEsp01<S, RST, L> {
    Mutex::new(RefCell::new(None))
}

/// Moves a new driver into the global slot, replacing any previous one.
///
/// # Arguments
/// * `global` - The slot created by [`global_esp01_init`]
/// * `serial` - UART transmit side
/// * `reset` - CH_PD/reset line
/// * `listener` - Event sink
pub fn global_esp01_setup<S, RST, L>(
    global: &'static GlobalEsp01<S, RST, L>,
    serial: S,
    reset: RST,
    listener: L,
) where
    S: serial::Write<u8>,
    RST: OutputPin,
    L: Esp01Listener,
{
    critical_section::with(|cs| {
        let _ = global.borrow(cs).replace(Some(Esp01::new(serial, reset, listener)));
    });
}

/// Advances the driver's timeouts. Call from a 10 ms timer interrupt.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIM3() {
///     global_esp01_tick(&MODEM);
/// }
/// ```
pub fn global_esp01_tick<S, RST, L>(global: &'static GlobalEsp01<S, RST, L>)
where
    S: serial::Write<u8>,
    RST: OutputPin,
    L: Esp01Listener,
{
    critical_section::with(|cs| {
        if let Some(modem) = global.borrow(cs).borrow_mut().as_mut() {
            modem.timeout_10ms();
        }
    });
}

/// Queues a byte received from the modem. Call from the UART receive interrupt.
pub fn global_esp01_receive<S, RST, L>(global: &'static GlobalEsp01<S, RST, L>, byte: u8)
where
    S: serial::Write<u8>,
    RST: OutputPin,
    L: Esp01Listener,
{
    critical_section::with(|cs| {
        if let Some(modem) = global.borrow(cs).borrow_mut().as_mut() {
            modem.receive(byte);
        }
    });
}

/// Runs one [`Esp01::task`] pass inside a critical section. Call from the super-loop.
///
/// # Notes
/// - Interrupts are held off for one pass; a pass writes at most one byte to the UART.
pub fn global_esp01_task<S, RST, L>(global: &'static GlobalEsp01<S, RST, L>)
where
    S: serial::Write<u8>,
    RST: OutputPin,
    L: Esp01Listener,
{
    critical_section::with(|cs| {
        if let Some(modem) = global.borrow(cs).borrow_mut().as_mut() {
            modem.task();
        }
    });
}

/// Runs `f` with the driver, or returns `None` if [`global_esp01_setup`] has not run yet.
///
/// # Example
/// ```rust,ignore
/// let sent = with_global_esp01(&MODEM, |modem| modem.send(b"hello"));
/// ```
pub fn with_global_esp01<S, RST, L, R>(
    global: &'static GlobalEsp01<S, RST, L>,
    f: impl FnOnce(&mut Esp01<S, RST, L>) -> R,
) -> Option<R> {
    critical_section::with(|cs| global.borrow(cs).borrow_mut().as_mut().map(f))
}
