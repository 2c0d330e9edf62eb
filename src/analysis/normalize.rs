//! Scaling of magnitude spectra into the 0–255 display range, with temporal
//! smoothing of both the scale and the bins.

/// Upper bound of normalized bin values
pub const OUTPUT_CEILING: f32 = 255.0;

/// Weight kept by the running maximum on every update
const MAX_DECAY: f32 = 0.9;

/// Running maximum right after a reset
const INITIAL_SMOOTHED_MAX: f32 = 1.0;

#[derive(Clone, Debug, PartialEq)]
pub struct SmoothingState {
    smoothed_bins: Vec<f32>,
    smoothed_max: f32,
}

impl SmoothingState {
    pub fn new(num_bins: usize) -> Self {
        Self {
            smoothed_bins: vec![0.0; num_bins],
            smoothed_max: INITIAL_SMOOTHED_MAX,
        }
    }

    pub fn reset(&mut self) {
        self.smoothed_bins.fill(0.0);
        self.smoothed_max = INITIAL_SMOOTHED_MAX;
    }

    pub fn bins(&self) -> &[f32] {
        &self.smoothed_bins
    }

    pub fn smoothed_max(&self) -> f32 {
        self.smoothed_max
    }

    pub fn num_bins(&self) -> usize {
        self.smoothed_bins.len()
    }

    /// Fold this call's maximum into the running one and return the scale
    /// that maps it to `OUTPUT_CEILING` (0 while the running maximum is 0).
    fn update_scale(&mut self, max_magnitude: f32) -> f32 {
        self.smoothed_max = self.smoothed_max * MAX_DECAY + max_magnitude * (1.0 - MAX_DECAY);
        if self.smoothed_max > 0.0 {
            OUTPUT_CEILING / self.smoothed_max
        } else {
            0.0
        }
    }

    /// `s = floor(s·factor + v·(1 − factor))` per bin; `values` receives `s`.
    pub fn blend(&mut self, values: &mut [f32], factor: f32) {
        let take = 1.0 - factor;
        for (smoothed, v) in self.smoothed_bins.iter_mut().zip(values.iter_mut()) {
            *smoothed = (*smoothed * factor + *v * take).floor();
            *v = *smoothed;
        }
    }
}

#[derive(Clone, Debug)]
pub struct Normalizer {
    smoothing_factor: f32,
    state: SmoothingState,
}

impl Normalizer {
    pub fn new(num_bins: usize, smoothing_factor: f32) -> Self {
        Self {
            smoothing_factor: smoothing_factor.clamp(0.0, 1.0),
            state: SmoothingState::new(num_bins),
        }
    }

    pub fn smoothing_factor(&self) -> f32 {
        self.smoothing_factor
    }

    pub fn set_smoothing_factor(&mut self, factor: f32) {
        self.smoothing_factor = factor.clamp(0.0, 1.0);
    }

    pub fn state(&self) -> &SmoothingState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    pub fn resize(&mut self, num_bins: usize) {
        self.state = SmoothingState::new(num_bins);
    }

    /// Scale `magnitudes` to `[0, 255]`, smooth, and write the result to `out`.
    pub fn process(&mut self, magnitudes: &[f32], out: &mut [f32]) {
        debug_assert_eq!(magnitudes.len(), self.state.num_bins());
        debug_assert_eq!(out.len(), self.state.num_bins());

        let max_magnitude = magnitudes
            .iter()
            .copied()
            .filter(|m| m.is_finite())
            .fold(0.0f32, f32::max);
        let scale = self.state.update_scale(max_magnitude);

        for (o, &m) in out.iter_mut().zip(magnitudes) {
            *o = if m.is_finite() {
                (m * scale).floor().clamp(0.0, OUTPUT_CEILING)
            } else {
                0.0
            };
        }
        self.state.blend(out, self.smoothing_factor);
    }
}

/// Number of calls after which a constant input of at most `OUTPUT_CEILING`
/// is reproduced within `epsilon` (plus the one unit lost to flooring).
pub fn convergence_steps(smoothing_factor: f32, epsilon: f32) -> usize {
    let keep = smoothing_factor.clamp(0.0, 1.0);
    if keep == 0.0 {
        return 1;
    }
    if keep >= 1.0 || epsilon <= 0.0 {
        return usize::MAX;
    }
    // Error shrinks by `keep` per call: CEILING · keepⁿ ≤ ε
    ((epsilon / OUTPUT_CEILING).ln() / keep.ln()).ceil().max(1.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_yields_zeros_not_nan() {
        let mut normalizer = Normalizer::new(8, 0.3);
        let mut out = vec![1.0; 8];
        for _ in 0..500 {
            normalizer.process(&[0.0; 8], &mut out);
        }
        assert!(out.iter().all(|&v| v == 0.0));
        assert!(normalizer.state().smoothed_max().is_finite());
    }

    #[test]
    fn zero_smoothed_max_gives_zero_scale() {
        let mut normalizer = Normalizer::new(4, 0.0);
        normalizer.state.smoothed_max = 0.0;
        let mut out = vec![0.0; 4];
        normalizer.process(&[0.0; 4], &mut out);
        assert_eq!(out, vec![0.0; 4]);
    }

    #[test]
    fn output_stays_within_bounds() {
        let mut normalizer = Normalizer::new(6, 0.3);
        let mut out = vec![0.0; 6];
        let inputs: [[f32; 6]; 4] = [
            [1e9, 0.0, 5.0, 1e-9, 3.0, 2.0],
            [0.0; 6],
            [f32::INFINITY, 1.0, f32::NAN, 2.0, 3.0, 4.0],
            [1e-3, 2e-3, 0.0, 0.5, 1e4, 7.0],
        ];
        for input in inputs.iter().cycle().take(40) {
            normalizer.process(input, &mut out);
            for &v in &out {
                assert!((0.0..=OUTPUT_CEILING).contains(&v), "{}", v);
                assert_eq!(v, v.floor());
            }
        }
    }

    #[test]
    fn scale_follows_smoothed_maximum() {
        let mut normalizer = Normalizer::new(2, 0.0);
        let mut out = vec![0.0; 2];
        normalizer.process(&[10.0, 5.0], &mut out);
        // smoothed max = 0.9 + 1.0 = 1.9, so both bins saturate
        assert!((normalizer.state().smoothed_max() - 1.9).abs() < 1e-6);
        assert_eq!(out, vec![255.0, 255.0]);

        for _ in 0..200 {
            normalizer.process(&[10.0, 5.0], &mut out);
        }
        assert!((normalizer.state().smoothed_max() - 10.0).abs() < 1e-3);
        assert!(out[0] >= 254.0);
        assert!((out[1] - 127.0).abs() <= 1.0);
    }

    #[test]
    fn smoothing_blends_previous_frame() {
        let mut normalizer = Normalizer::new(1, 0.3);
        normalizer.state.smoothed_max = 100.0;
        let mut out = vec![0.0];
        // max 95 -> value floor(50 * 255 / 95) = 134, blended floor(134 * 0.7) = 93
        normalizer.process(&[50.0], &mut out);
        assert_eq!(out[0], 93.0);

        // max 90.5 -> value 140, blended floor(93 * 0.3 + 140 * 0.7) = 125
        normalizer.process(&[50.0], &mut out);
        assert_eq!(out[0], 125.0);
    }

    #[test]
    fn constant_input_converges() {
        let alpha = 0.3;
        let epsilon = 0.5;
        let steps = convergence_steps(alpha, epsilon);
        assert!(steps < 10);

        let mut state = SmoothingState::new(4);
        let mut values = vec![0.0; 4];
        for _ in 0..steps {
            values.fill(200.0);
            state.blend(&mut values, alpha);
        }
        for &v in state.bins() {
            assert!((200.0 - v).abs() <= epsilon + 1.0, "{}", v);
        }
    }

    #[test]
    fn zero_factor_disables_temporal_smoothing() {
        let mut normalizer = Normalizer::new(3, 0.0);
        normalizer.state.smoothed_max = 10.0;
        let mut out = vec![0.0; 3];
        normalizer.process(&[10.0, 5.0, 0.0], &mut out);
        assert_eq!(out, vec![255.0, 127.0, 0.0]);
        normalizer.process(&[0.0, 0.0, 0.0], &mut out);
        assert_eq!(out, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut normalizer = Normalizer::new(2, 0.5);
        let mut out = vec![0.0; 2];
        normalizer.process(&[3.0, 4.0], &mut out);
        normalizer.reset();
        assert_eq!(normalizer.state(), &SmoothingState::new(2));
    }
}
