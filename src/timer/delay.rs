use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal_nb::serial;

use crate::esp01::{Esp01, Esp01Listener};
use crate::timer::TICK_MS;

/// Runs a blocking super-loop around an `Esp01`.
///
/// The task runs every millisecond and the 10 ms tick every tenth pass. The driver's
/// receive side still has to be fed, e.g. from a UART interrupt or from `idle`.
///
/// # Arguments
/// - `modem`: The driver.
/// - `delay`: A delay provider implementing `DelayNs`, typically from the HAL.
/// - `idle`: Called once per pass with the driver, for polling the UART and other work.
///
/// # Example
/// ```rust,ignore
/// run_esp01_loop(&mut modem, &mut delay, |modem| {
///     while let Ok(byte) = uart.read() {
///         modem.receive(byte);
///     }
/// });
/// ```
///
/// # Notes
/// - This loop never returns; see [`run_esp01_passes`] for a bounded version.
/// - Time spent in `idle` stretches the tick, so keep it short.
pub fn run_esp01_loop<S, RST, L, D>(
    modem: &mut Esp01<S, RST, L>,
    delay: &mut D,
    mut idle: impl FnMut(&mut Esp01<S, RST, L>),
) -> !
where
    S: serial::Write<u8>,
    RST: OutputPin,
    L: Esp01Listener,
    D: DelayNs,
{
    let mut pass = 0;
    loop {
        pass = step(modem, delay, &mut idle, pass);
    }
}

/// Runs `passes` iterations of the loop of [`run_esp01_loop`], then returns.
pub fn run_esp01_passes<S, RST, L, D>(
    modem: &mut Esp01<S, RST, L>,
    delay: &mut D,
    mut idle: impl FnMut(&mut Esp01<S, RST, L>),
    passes: u32,
) where
    S: serial::Write<u8>,
    RST: OutputPin,
    L: Esp01Listener,
    D: DelayNs,
{
    let mut pass = 0;
    for _ in 0..passes {
        pass = step(modem, delay, &mut idle, pass);
    }
}

fn step<S, RST, L, D>(
    modem: &mut Esp01<S, RST, L>,
    delay: &mut D,
    idle: &mut impl FnMut(&mut Esp01<S, RST, L>),
    pass: u32,
) -> u32
where
    S: serial::Write<u8>,
    RST: OutputPin,
    L: Esp01Listener,
    D: DelayNs,
{
    idle(modem);
    modem.task();
    delay.delay_ms(1);
    let pass = pass + 1;
    if pass == TICK_MS {
        modem.timeout_10ms();
        0
    } else {
        pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::esp01::{AtState, ConnectionState, Mode};
    use crate::testing::FakeSerial;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::Mock as PinMock;

    #[test]
    fn test_passes_drive_startup_timeout() {
        let mut modem = Esp01::new(FakeSerial::default(), PinMock::new(&[]), ());
        let mut delay = NoopDelay::new();
        let mut fed = false;
        run_esp01_passes(
            &mut modem,
            &mut delay,
            |m| {
                if !fed && m.at_state() == AtState::WaitingIp {
                    for &b in b"WIFI GOT IP\r\n" {
                        m.receive(b);
                    }
                    fed = true;
                }
            },
            20,
        );
        assert_eq!(modem.wifi_state(), ConnectionState::Connected);
        assert_eq!(modem.mode(), Mode::Client);
        modem.reset.done();
    }
}
