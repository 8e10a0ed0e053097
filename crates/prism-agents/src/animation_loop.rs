// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-frame callback registration for hosts that own the display loop.

/// A frame callback receiving the host context and a timestamp in
/// milliseconds.
pub type FrameCallback<C> = Box<dyn FnMut(&mut C, f64)>;

/// Forwards display refreshes to a callback while running.
///
/// The host calls [`tick`](Self::tick) once per refresh; nothing runs until
/// both a callback is set and [`start`](Self::start) was called.
/// [`stop`](Self::stop) is the only way to cancel.
pub struct AnimationLoop<C> {
    callback: Option<FrameCallback<C>>,
    running: bool,
    frames: u64,
    last_timestamp: Option<f64>,
}

impl<C> Default for AnimationLoop<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> AnimationLoop<C> {
    /// Creates a stopped loop without a callback.
    pub fn new() -> Self {
        Self {
            callback: None,
            running: false,
            frames: 0,
            last_timestamp: None,
        }
    }

    /// Replaces the callback.
    pub fn set_callback(&mut self, callback: impl FnMut(&mut C, f64) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Removes the callback, which pauses the loop without stopping it.
    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    /// Starts forwarding ticks. A no-op when already running.
    pub fn start(&mut self) {
        if !self.running {
            log::debug!("AnimationLoop: started");
            self.running = true;
            self.last_timestamp = None;
        }
    }

    /// Stops forwarding ticks.
    pub fn stop(&mut self) {
        if self.running {
            log::debug!("AnimationLoop: stopped after {} frames", self.frames);
            self.running = false;
        }
    }

    /// Whether [`start`](Self::start) was called without a later stop.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Frames forwarded so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Milliseconds from the latest forwarded tick to `timestamp`, 0 before
    /// the first one.
    pub fn delta(&self, timestamp: f64) -> f64 {
        self.last_timestamp.map_or(0.0, |last| timestamp - last)
    }

    /// Forwards one display refresh. Returns `true` when the callback ran.
    pub fn tick(&mut self, context: &mut C, timestamp: f64) -> bool {
        if !self.running {
            return false;
        }
        let Some(callback) = self.callback.as_mut() else {
            return false;
        };
        callback(context, timestamp);
        self.frames += 1;
        self.last_timestamp = Some(timestamp);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_only_run_while_started() {
        let mut animation: AnimationLoop<Vec<f64>> = AnimationLoop::new();
        let mut seen = Vec::new();
        animation.set_callback(|seen: &mut Vec<f64>, t| seen.push(t));

        assert!(!animation.tick(&mut seen, 0.0));
        animation.start();
        assert!(animation.tick(&mut seen, 16.0));
        assert!(animation.tick(&mut seen, 32.0));
        animation.stop();
        assert!(!animation.tick(&mut seen, 48.0));

        assert_eq!(seen, vec![16.0, 32.0]);
        assert_eq!(animation.frames(), 2);
    }

    #[test]
    fn test_missing_callback_pauses() {
        let mut animation: AnimationLoop<u32> = AnimationLoop::new();
        let mut count = 0;
        animation.start();
        assert!(!animation.tick(&mut count, 0.0));

        animation.set_callback(|count: &mut u32, _| *count += 1);
        assert!(animation.tick(&mut count, 1.0));
        animation.clear_callback();
        assert!(!animation.tick(&mut count, 2.0));
        assert!(animation.is_running());
        assert_eq!(count, 1);
    }

    #[test]
    fn test_delta_since_last_tick() {
        let mut animation: AnimationLoop<()> = AnimationLoop::new();
        animation.set_callback(|_, _| {});
        animation.start();
        assert_eq!(animation.delta(10.0), 0.0);
        animation.tick(&mut (), 10.0);
        assert_eq!(animation.delta(26.5), 16.5);

        animation.stop();
        animation.start();
        assert_eq!(animation.delta(100.0), 0.0);
    }
}
