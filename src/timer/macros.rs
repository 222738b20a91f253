/// Declares a static global `ESP01` driver slot protected by a `critical_section` mutex.
///
/// # Arguments
/// - `$serial`: The concrete UART type (must implement `embedded_hal_nb::serial::Write<u8>`)
/// - `$reset`: The concrete reset pin type (must implement `OutputPin`)
/// - `$listener`: Optional listener type, `()` when omitted
///
/// # Example
/// ```rust
/// # type Uart = embedded_hal_mock::eh1::serial::Mock<u8>;
/// # type ResetPin = embedded_hal_mock::eh1::digital::Mock;
/// roverlink::init_esp01!(Uart, ResetPin);
/// ```
#[macro_export]
macro_rules! init_esp01 {
    ( $serial:ty, $reset:ty ) => {
        $crate::init_esp01!($serial, $reset, ());
    };
    ( $serial:ty, $reset:ty, $listener:ty ) => {
        pub static ESP01: $crate::timer::GlobalEsp01<$serial, $reset, $listener> =
            $crate::timer::global_esp01_init();
    };
}

/// Advances the timeouts of the global `ESP01` driver.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIM3() {
///     tick_esp01_timer!();
/// }
/// ```
///
/// # Notes
/// - Assumes `ESP01` was declared with `init_esp01!`.
/// - Does nothing until the driver has been set up with `global_esp01_setup`.
#[macro_export]
macro_rules! tick_esp01_timer {
    () => {
        $crate::timer::global_esp01_tick(&ESP01)
    };
}
