//! Moving-average filters for the rover's sensors.
//!
//! A [`MovingAverage`] keeps the last `WINDOW` samples of `CH` channels in a circular
//! buffer together with a running sum per channel, so each new sample costs one
//! subtraction and one addition. `WINDOW` must be a power of two: the average is the sum
//! shifted right by `log2(WINDOW)`, which is checked when the filter is created.
//!
//! Until `WINDOW` samples have been pushed the missing slots count as zero, which makes
//! the output ramp up from zero after power-on.
//!
//! [`AdcFilter`] and [`ImuFilter`] are the two shapes used by the firmware.

use crate::consts::{ADC_CHANNELS, ADC_WINDOW, IMU_AXES, IMU_WINDOW};

/// Running average of `CH` channels over the last `WINDOW` samples.
#[derive(Debug, Clone)]
pub struct MovingAverage<const CH: usize, const WINDOW: usize> {
    samples: [[i32; CH]; WINDOW],
    sums: [i32; CH],
    index: usize,
}

impl<const CH: usize, const WINDOW: usize> MovingAverage<CH, WINDOW> {
    const SHIFT: u32 = {
        assert!(WINDOW.is_power_of_two(), "window must be a power of two");
        WINDOW.trailing_zeros()
    };

    /// Creates a filter with every slot at zero.
    pub const fn new() -> Self {
        let _ = Self::SHIFT;
        Self {
            samples: [[0; CH]; WINDOW],
            sums: [0; CH],
            index: 0,
        }
    }

    /// Replaces the oldest sample of every channel.
    ///
    /// # Arguments
    /// * `sample` - One value per channel
    pub fn push(&mut self, sample: [i32; CH]) {
        let slot = &mut self.samples[self.index];
        for ((sum, old), new) in self.sums.iter_mut().zip(slot.iter_mut()).zip(sample) {
            *sum = *sum - *old + new;
            *old = new;
        }
        self.index = (self.index + 1) & (WINDOW - 1);
    }

    /// Averaged value of `channel`, or `None` if there is no such channel.
    pub fn average(&self, channel: usize) -> Option<i32> {
        self.sums.get(channel).map(|sum| sum >> Self::SHIFT)
    }

    /// Averaged value of every channel.
    pub fn averages(&self) -> [i32; CH] {
        self.sums.map(|sum| sum >> Self::SHIFT)
    }

    /// Zeroes every slot.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl<const CH: usize, const WINDOW: usize> Default for MovingAverage<CH, WINDOW> {
    fn default() -> Self {
        Self::new()
    }
}

/// Filter for the nine 12-bit analog channels, averaged over 32 scans.
#[derive(Debug, Clone, Default)]
pub struct AdcFilter {
    inner: MovingAverage<ADC_CHANNELS, ADC_WINDOW>,
}

impl AdcFilter {
    /// Creates an empty filter.
    pub const fn new() -> Self {
        Self {
            inner: MovingAverage::new(),
        }
    }

    /// Adds one scan of raw conversions.
    pub fn push(&mut self, raw: &[u16; ADC_CHANNELS]) {
        self.inner.push(raw.map(i32::from));
    }

    /// Filtered value of `channel`.
    pub fn value(&self, channel: usize) -> Option<u16> {
        self.inner.average(channel).map(clamp_u16)
    }

    /// Filtered value of every channel.
    pub fn values(&self) -> [u16; ADC_CHANNELS] {
        self.inner.averages().map(clamp_u16)
    }
}

/// Filter for a six-axis IMU: accelerometer X/Y/Z then gyroscope X/Y/Z.
#[derive(Debug, Clone, Default)]
pub struct ImuFilter<const WINDOW: usize = IMU_WINDOW> {
    inner: MovingAverage<IMU_AXES, WINDOW>,
}

impl<const WINDOW: usize> ImuFilter<WINDOW> {
    /// Creates an empty filter.
    pub const fn new() -> Self {
        Self {
            inner: MovingAverage::new(),
        }
    }

    /// Adds one reading.
    pub fn push(&mut self, accel: [i16; 3], gyro: [i16; 3]) {
        let [ax, ay, az] = accel.map(i32::from);
        let [gx, gy, gz] = gyro.map(i32::from);
        self.inner.push([ax, ay, az, gx, gy, gz]);
    }

    /// Filtered accelerometer axes.
    pub fn accel(&self) -> [i16; 3] {
        let a = self.inner.averages();
        [a[0], a[1], a[2]].map(clamp_i16)
    }

    /// Filtered gyroscope axes.
    pub fn gyro(&self) -> [i16; 3] {
        let a = self.inner.averages();
        [a[3], a[4], a[5]].map(clamp_i16)
    }
}

fn clamp_u16(value: i32) -> u16 {
    value.clamp(0, i32::from(u16::MAX)) as u16
}

fn clamp_i16(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}
