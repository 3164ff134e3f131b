//! Audio Frequency Shift Keying (AFSK) implementation
//!
//! Binary AFSK with a continuous-phase modulator and a non-coherent
//! demodulator that recovers symbol timing on its own. Mark (`1`) and space
//! (`0`) tones default to 2000 Hz and 1200 Hz at 600 baud.
//!
//! The demodulator runs a sliding single-bin DFT at each tone over one
//! symbol of samples. Tone purity, the larger tone energy over the total
//! window energy, peaks when the window lines up with a whole symbol, so
//! averaging purity over candidate sampling phases finds the symbol clock.

use crate::common::{DemodEvent, Demodulator, Flow, ModulationConfig, Modulator, SignalQuality};
use crate::{ModemError, Result};
use cosbit_core::protocol::{BAUD, MARK_HZ, SPACE_HZ};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use tracing::debug;

/// AFSK configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AfskConfig {
    pub mark_frequency: f64,  // Frequency for '1' bits
    pub space_frequency: f64, // Frequency for '0' bits
    pub baud_rate: f64,
    /// Peak output amplitude, full scale 1.0
    pub amplitude: f32,
}

impl Default for AfskConfig {
    fn default() -> Self {
        Self {
            mark_frequency: MARK_HZ,
            space_frequency: SPACE_HZ,
            baud_rate: BAUD,
            amplitude: 0.5,
        }
    }
}

impl AfskConfig {
    /// Check the tones against a sample rate
    pub fn validate(&self, sample_rate: f64) -> Result<ModulationConfig> {
        let config = ModulationConfig::new(sample_rate, self.baud_rate)?;
        let nyquist = sample_rate / 2.0;
        for tone in [self.mark_frequency, self.space_frequency] {
            if !(tone.is_finite() && tone > 0.0 && tone < nyquist) {
                return Err(ModemError::InvalidParameters {
                    msg: format!("Tone {} Hz outside 0..{} Hz", tone, nyquist),
                });
            }
        }
        if self.mark_frequency == self.space_frequency {
            return Err(ModemError::InvalidParameters {
                msg: "Mark and space tones must differ".to_string(),
            });
        }
        if !(self.amplitude > 0.0 && self.amplitude <= 1.0) {
            return Err(ModemError::InvalidParameters {
                msg: format!("Amplitude must be in (0, 1], got {}", self.amplitude),
            });
        }
        Ok(config)
    }
}

/// Continuous-phase AFSK modulator
///
/// Symbol `i` (counted from the last reset) ends at sample
/// `round((i + 1) · sps)`, so a fractional samples-per-symbol never drifts.
/// The phase accumulator carries across symbols and across calls.
pub struct AfskModulator {
    config: ModulationConfig,
    afsk_config: AfskConfig,
    phase: f64,
    symbols: u64,
    samples: u64,
}

impl AfskModulator {
    /// Create a new AFSK modulator
    pub fn new(sample_rate: f64, afsk_config: AfskConfig) -> Result<Self> {
        let config = afsk_config.validate(sample_rate)?;
        Ok(Self {
            config,
            afsk_config,
            phase: 0.0,
            symbols: 0,
            samples: 0,
        })
    }

    pub fn config(&self) -> &AfskConfig {
        &self.afsk_config
    }

    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }
}

impl Modulator for AfskModulator {
    fn modulate(&mut self, bits: &[bool], output: &mut Vec<f32>) -> Result<()> {
        let sps = self.config.samples_per_symbol();
        let amplitude = self.afsk_config.amplitude as f64;
        output.reserve((bits.len() as f64 * sps).ceil() as usize);

        for &bit in bits {
            let frequency = if bit {
                self.afsk_config.mark_frequency
            } else {
                self.afsk_config.space_frequency
            };
            let step = TAU * frequency / self.config.sample_rate;

            self.symbols += 1;
            let end = (self.symbols as f64 * sps).round() as u64;
            while self.samples < end {
                output.push((amplitude * self.phase.sin()) as f32);
                self.phase += step;
                if self.phase >= TAU {
                    self.phase -= TAU;
                }
                self.samples += 1;
            }
        }

        Ok(())
    }

    fn samples_per_symbol(&self) -> f64 {
        self.config.samples_per_symbol()
    }

    fn symbol_rate(&self) -> f64 {
        self.afsk_config.baud_rate
    }

    fn reset(&mut self) {
        self.phase = 0.0;
        self.symbols = 0;
        self.samples = 0;
    }
}

/// Timing recovery and lock parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemodConfig {
    /// Candidate sampling phases per symbol
    pub phase_bins: usize,
    /// Weight of history in the per-phase purity average
    pub timing_smoothing: f64,
    /// Floor for the lock threshold (raised to `4/N` for short windows)
    pub lock_threshold: f64,
    /// Required `(best - opposite) / best` contrast between phase bins
    pub lock_contrast: f64,
    /// Symbols observed before a lock is considered
    pub acquire_symbols: usize,
    /// Consecutive symbols the best phase must stay put
    pub stable_symbols: usize,
    /// Consecutive weak symbols before lock is dropped
    pub lock_hold_symbols: usize,
    /// How much stronger another phase must be to force a re-sync
    pub resync_ratio: f64,
}

impl Default for DemodConfig {
    fn default() -> Self {
        Self {
            phase_bins: 16,
            timing_smoothing: 0.85,
            lock_threshold: 0.15,
            lock_contrast: 0.5,
            acquire_symbols: 8,
            stable_symbols: 4,
            lock_hold_symbols: 128,
            resync_ratio: 1.5,
        }
    }
}

impl DemodConfig {
    fn validate(&self) -> Result<()> {
        if self.phase_bins < 4 || self.phase_bins % 2 != 0 {
            return Err(ModemError::InvalidParameters {
                msg: format!("phase_bins must be even and >= 4, got {}", self.phase_bins),
            });
        }
        if !(0.0..1.0).contains(&self.timing_smoothing) {
            return Err(ModemError::InvalidParameters {
                msg: format!("timing_smoothing must be in [0, 1), got {}", self.timing_smoothing),
            });
        }
        if !(self.lock_threshold > 0.0 && self.lock_threshold <= 1.0) {
            return Err(ModemError::InvalidParameters {
                msg: format!("lock_threshold must be in (0, 1], got {}", self.lock_threshold),
            });
        }
        if !(0.0..=1.0).contains(&self.lock_contrast) {
            return Err(ModemError::InvalidParameters {
                msg: format!("lock_contrast must be in [0, 1], got {}", self.lock_contrast),
            });
        }
        if self.stable_symbols == 0 || self.lock_hold_symbols == 0 {
            return Err(ModemError::InvalidParameters {
                msg: "stable_symbols and lock_hold_symbols must be positive".to_string(),
            });
        }
        if !(self.resync_ratio.is_finite() && self.resync_ratio >= 1.0) {
            return Err(ModemError::InvalidParameters {
                msg: format!("resync_ratio must be >= 1, got {}", self.resync_ratio),
            });
        }
        Ok(())
    }
}

/// Sliding single-bin DFT over a ring of `N` samples
#[derive(Debug, Clone)]
struct ToneCorrelator {
    step: f64,
    phase: f64,
    re: Vec<f64>,
    im: Vec<f64>,
    sum_re: f64,
    sum_im: f64,
}

impl ToneCorrelator {
    fn new(frequency: f64, sample_rate: f64, window: usize) -> Self {
        Self {
            step: TAU * frequency / sample_rate,
            phase: 0.0,
            re: vec![0.0; window],
            im: vec![0.0; window],
            sum_re: 0.0,
            sum_im: 0.0,
        }
    }

    #[inline]
    fn push(&mut self, x: f64, slot: usize) {
        let re = x * self.phase.cos();
        let im = -x * self.phase.sin();
        self.sum_re += re - self.re[slot];
        self.sum_im += im - self.im[slot];
        self.re[slot] = re;
        self.im[slot] = im;
        self.phase += self.step;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
    }

    /// Rebuild the running sums from the ring
    fn resum(&mut self) {
        self.sum_re = self.re.iter().sum();
        self.sum_im = self.im.iter().sum();
    }

    #[inline]
    fn energy(&self) -> f64 {
        self.sum_re * self.sum_re + self.sum_im * self.sum_im
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Lock {
    /// Sampling instant within the symbol clock, in samples
    target: f64,
    bin: usize,
}

/// Per-session demodulator state
#[derive(Debug, Clone)]
pub struct DemodState {
    mark: ToneCorrelator,
    space: ToneCorrelator,
    power: Vec<f64>,
    power_sum: f64,
    slot: usize,
    filled: usize,

    clock: f64,
    bin_average: Vec<f64>,
    bin_sum: Vec<f64>,
    bin_count: Vec<u32>,
    symbols: usize,
    stable: usize,
    previous_best: Option<usize>,

    lock: Option<Lock>,
    weak_run: usize,
    confidence: f64,
}

impl DemodState {
    fn new(sample_rate: f64, afsk: &AfskConfig, window: usize, bins: usize) -> Self {
        Self {
            mark: ToneCorrelator::new(afsk.mark_frequency, sample_rate, window),
            space: ToneCorrelator::new(afsk.space_frequency, sample_rate, window),
            power: vec![0.0; window],
            power_sum: 0.0,
            slot: 0,
            filled: 0,
            clock: 0.0,
            bin_average: vec![0.0; bins],
            bin_sum: vec![0.0; bins],
            bin_count: vec![0; bins],
            symbols: 0,
            stable: 0,
            previous_best: None,
            lock: None,
            weak_run: 0,
            confidence: 0.0,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// Forget timing history and return to acquisition
    fn drop_lock(&mut self) {
        self.lock = None;
        self.symbols = 0;
        self.stable = 0;
        self.weak_run = 0;
        self.bin_average.fill(0.0);
    }
}

/// AFSK demodulator with symbol timing recovery
pub struct AfskDemodulator {
    config: ModulationConfig,
    afsk_config: AfskConfig,
    demod_config: DemodConfig,
    window: usize,
    lock_threshold: f64,
    weak_threshold: f64,
}

impl AfskDemodulator {
    /// Create a new AFSK demodulator
    pub fn new(sample_rate: f64, afsk_config: AfskConfig, demod_config: DemodConfig) -> Result<Self> {
        let config = afsk_config.validate(sample_rate)?;
        demod_config.validate()?;

        let window = config.samples_per_symbol().floor() as usize;
        if window < 4 {
            return Err(ModemError::InvalidParameters {
                msg: format!("{} samples per symbol is too few to demodulate", window),
            });
        }
        // Short windows have a higher purity floor on noise
        let lock_threshold = demod_config.lock_threshold.max(4.0 / window as f64);

        Ok(Self {
            config,
            afsk_config,
            demod_config,
            window,
            lock_threshold,
            weak_threshold: lock_threshold / 2.0,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    /// Correlation window length in samples
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn lock_threshold(&self) -> f64 {
        self.lock_threshold
    }

    fn bin_of(&self, clock: f64) -> usize {
        let bins = self.demod_config.phase_bins;
        let width = self.config.samples_per_symbol() / bins as f64;
        ((clock / width) as usize).min(bins - 1)
    }

    /// Sampling instant for a phase bin, refined by a parabola through its neighbours
    fn lock_target(&self, state: &DemodState, best: usize) -> f64 {
        let bins = self.demod_config.phase_bins;
        let sps = self.config.samples_per_symbol();
        let left = state.bin_average[(best + bins - 1) % bins];
        let centre = state.bin_average[best];
        let right = state.bin_average[(best + 1) % bins];

        let curvature = left - 2.0 * centre + right;
        let delta = if curvature < 0.0 {
            (0.5 * (left - right) / curvature).clamp(-0.5, 0.5)
        } else {
            0.0
        };
        ((best as f64 + 0.5 + delta) * sps / bins as f64).rem_euclid(sps)
    }

    /// Fold the finished symbol into the timing averages and update lock
    fn end_of_symbol(&self, state: &mut DemodState, sink: &mut dyn FnMut(DemodEvent) -> Flow) {
        let bins = self.demod_config.phase_bins;
        let alpha = self.demod_config.timing_smoothing;
        for k in 0..bins {
            if state.bin_count[k] > 0 {
                let mean = state.bin_sum[k] / state.bin_count[k] as f64;
                state.bin_average[k] = alpha * state.bin_average[k] + (1.0 - alpha) * mean;
            }
            state.bin_sum[k] = 0.0;
            state.bin_count[k] = 0;
        }
        state.symbols += 1;

        let best = state
            .bin_average
            .iter()
            .enumerate()
            .fold(0, |best, (k, &v)| if v > state.bin_average[best] { k } else { best });
        let top = state.bin_average[best];
        let opposite = state.bin_average[(best + bins / 2) % bins];
        let strong = top >= self.lock_threshold
            && (top - opposite) >= self.demod_config.lock_contrast * top;
        let near = state
            .previous_best
            .map_or(false, |prev| circular_distance(best, prev, bins) <= 1);
        state.stable = match (strong, near) {
            (true, true) => state.stable + 1,
            (true, false) => 1,
            (false, _) => 0,
        };
        state.previous_best = Some(best);

        match state.lock {
            None => {
                if state.symbols >= self.demod_config.acquire_symbols
                    && state.stable >= self.demod_config.stable_symbols
                {
                    let target = self.lock_target(state, best);
                    state.lock = Some(Lock { target, bin: best });
                    state.weak_run = 0;
                    state.confidence = top;
                    debug!(bin = best, target, purity = top, "AFSK timing acquired");
                    sink(DemodEvent::LockAcquired { timing_offset: target });
                }
            }
            Some(lock) => {
                if circular_distance(best, lock.bin, bins) >= 2
                    && state.stable >= self.demod_config.stable_symbols
                    && top > self.demod_config.resync_ratio * state.bin_average[lock.bin]
                {
                    let target = self.lock_target(state, best);
                    state.lock = Some(Lock { target, bin: best });
                    state.weak_run = 0;
                    debug!(from = lock.bin, to = best, "AFSK timing re-synced");
                    sink(DemodEvent::LockLost);
                    sink(DemodEvent::LockAcquired { timing_offset: target });
                }
            }
        }
    }
}

fn circular_distance(a: usize, b: usize, n: usize) -> usize {
    let d = (a + n - b) % n;
    d.min(n - d)
}

impl Demodulator for AfskDemodulator {
    type State = DemodState;

    fn new_state(&self) -> DemodState {
        DemodState::new(
            self.config.sample_rate,
            &self.afsk_config,
            self.window,
            self.demod_config.phase_bins,
        )
    }

    fn process(
        &self,
        state: &mut DemodState,
        samples: &[f32],
        sink: &mut dyn FnMut(DemodEvent) -> Flow,
    ) {
        let n = self.window;
        let sps = self.config.samples_per_symbol();

        for &sample in samples {
            let x = sample as f64;
            let slot = state.slot;
            state.mark.push(x, slot);
            state.space.push(x, slot);
            let p = x * x;
            state.power_sum += p - state.power[slot];
            state.power[slot] = p;

            state.slot = (slot + 1) % n;
            if state.slot == 0 {
                // Bound rounding drift in the running sums
                state.mark.resum();
                state.space.resum();
                state.power_sum = state.power.iter().sum();
            }
            if state.filled < n {
                state.filled += 1;
            }

            let mark = state.mark.energy();
            let space = state.space.energy();
            let purity = if state.filled < n || state.power_sum <= 1e-12 {
                0.0
            } else {
                (mark.max(space) / (0.5 * n as f64 * state.power_sum)).min(1.0)
            };

            let previous = state.clock;
            state.clock += 1.0;
            let wrapped = state.clock >= sps;
            if wrapped {
                state.clock -= sps;
            }
            let bin = self.bin_of(state.clock);
            state.bin_sum[bin] += purity;
            state.bin_count[bin] += 1;

            if let Some(lock) = state.lock {
                let crossed = if wrapped {
                    lock.target > previous || lock.target <= state.clock
                } else {
                    previous < lock.target && lock.target <= state.clock
                };
                if crossed {
                    state.confidence = 0.75 * state.confidence + 0.25 * purity;
                    if purity < self.weak_threshold {
                        state.weak_run += 1;
                    } else {
                        state.weak_run = 0;
                    }

                    let flow = sink(DemodEvent::Bit {
                        value: mark > space,
                        confidence: purity as f32,
                    });

                    if flow == Flow::Resync {
                        state.drop_lock();
                    } else if state.weak_run >= self.demod_config.lock_hold_symbols {
                        debug!(weak = state.weak_run, "AFSK lock lost");
                        state.drop_lock();
                        sink(DemodEvent::LockLost);
                    }
                }
            }

            if wrapped {
                self.end_of_symbol(state, sink);
            }
        }
    }

    fn signal_quality(&self, state: &DemodState) -> SignalQuality {
        let confidence = state.confidence.clamp(0.0, 1.0);
        let snr_db = if confidence <= 0.0 {
            -60.0
        } else if confidence >= 1.0 {
            60.0
        } else {
            (10.0 * (confidence / (1.0 - confidence)).log10()).clamp(-60.0, 60.0)
        };
        SignalQuality {
            locked: state.is_locked(),
            confidence: confidence as f32,
            timing_offset_samples: state.lock.map_or(0.0, |lock| lock.target),
            snr_db,
        }
    }

    fn reset(&self, state: &mut DemodState) {
        *state = self.new_state();
    }
}
