//! Test doubles shared by the unit tests.

use core::convert::Infallible;

use embedded_hal_nb::serial::{ErrorType, Write};

/// Serial port that records every byte written to it.
///
/// With a `budget`, only that many more bytes are accepted before `WouldBlock`.
#[derive(Debug, Default)]
pub(crate) struct FakeSerial {
    pub(crate) written: Vec<u8>,
    pub(crate) budget: Option<usize>,
}

impl FakeSerial {
    pub(crate) fn with_budget(budget: usize) -> Self {
        Self {
            written: Vec::new(),
            budget: Some(budget),
        }
    }

    pub(crate) fn text(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }
}

impl ErrorType for FakeSerial {
    type Error = Infallible;
}

impl Write<u8> for FakeSerial {
    fn write(&mut self, word: u8) -> nb::Result<(), Infallible> {
        match self.budget.as_mut() {
            Some(0) => return Err(nb::Error::WouldBlock),
            Some(left) => *left -= 1,
            None => {}
        }
        self.written.push(word);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Infallible> {
        Ok(())
    }
}
