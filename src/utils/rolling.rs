// src/utils/rolling.rs
use std::collections::VecDeque;

/// Trailing arithmetic mean over the last `window` bars with a minimum of
/// one observation.
///
/// During warm-up the mean is taken over however many bars exist. Missing
/// bars occupy a slot in the window but do not contribute to the mean, and
/// the mean reported at a missing bar is itself `None`.
#[derive(Debug, Clone)]
pub struct RollingMean {
    window: usize,
    buf: VecDeque<Option<f64>>,
    sum: f64,
    count: usize,
}

impl RollingMean {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            buf: VecDeque::with_capacity(window),
            sum: 0.0,
            count: 0,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn update(&mut self, value: Option<f64>) -> Option<f64> {
        if self.window == 0 {
            return None;
        }

        self.buf.push_back(value);
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
        while self.buf.len() > self.window {
            if let Some(Some(front)) = self.buf.pop_front() {
                self.sum -= front;
                self.count -= 1;
            }
        }
        if self.count == 0 {
            // drop accumulated rounding error once the window is empty
            self.sum = 0.0;
        }

        value.map(|_| self.sum / self.count as f64)
    }
}
