//! Tick arithmetic and scheduling helpers.
//!
//! Every timeout in this crate is a down-counter decremented by a periodic 10 ms tick
//! (`Esp01::timeout_10ms`). Nothing reads a wall clock; the integrator must call the tick
//! entry point at a stable cadence. Two ways of doing that are provided:
//!
//! - `timer-isr` feature: the driver lives in a `critical_section::Mutex` global, the
//!   timer interrupt calls [`global_esp01_tick`] (or the [`tick_esp01_timer!`] macro) and
//!   the UART interrupt calls [`global_esp01_receive`].
//! - `delay-loop` feature: [`run_esp01_loop`] runs a blocking super-loop that calls the
//!   task every millisecond and the tick every tenth pass.
//!
//! | Period | Ticks |
//! |--------|-------|
//! |  20 ms |     2 |
//! |   1 s  |   100 |
//! |   5 s  |   500 |

#[cfg(feature = "delay-loop")]
mod delay;
#[cfg_attr(feature = "delay-loop", allow(unused_imports))]
#[cfg(feature = "delay-loop")]
pub use delay::*;

#[cfg(feature = "timer-isr")]
mod isr;
#[cfg_attr(feature = "timer-isr", allow(unused_imports))]
#[cfg(feature = "timer-isr")]
pub use isr::*;

#[cfg(feature = "timer-isr")]
mod macros;

/// Period of the timeout tick, in milliseconds.
pub const TICK_MS: u32 = 10;

/// Converts a duration in milliseconds to whole 10 ms ticks, rounding up.
///
/// Saturates at `u16::MAX` ticks (just under 11 minutes).
pub const fn ms_to_ticks(ms: u32) -> u16 {
    let ticks = ms.div_ceil(TICK_MS);
    if ticks > u16::MAX as u32 {
        u16::MAX
    } else {
        ticks as u16
    }
}

/// Converts a tick count back to milliseconds.
pub const fn ticks_to_ms(ticks: u16) -> u32 {
    ticks as u32 * TICK_MS
}
