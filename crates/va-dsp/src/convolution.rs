//! Uniform-block partitioned convolution.
//!
//! Grounded on the donor engine's `ITAUPConvolution` / `ITAVABinauralClusteringDirection`
//! pairing: each principal direction (§4.5) drives two of these, one per ear,
//! convolving the cluster's scratch buffer against the direction's HRIR. The
//! host's audio block length `B` is fixed for the renderer's lifetime, so
//! partitioning is uniform at that block size (no non-uniform/low-latency
//! scheme is needed — the renderer already operates one block at a time).
//!
//! Filter exchange (`set_ir_crossfaded`) does not glitch: the old and new
//! filter are both convolved for one block and the outputs cosine-square
//! crossfaded, matching §4.5 step 2.c's `min(B, 32)`-sample crossfade.

use std::sync::Arc;

use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use va_core::Sample;

/// One FFT'd IR partition (a `block_size`-sample segment of a filter, padded
/// to `2*block_size` before transforming so the overlap-save product doesn't
/// alias).
#[derive(Clone)]
struct Partition {
    spectrum: Vec<Complex<f64>>,
}

/// A single filter (IR), split into `block_size`-sized partitions, each
/// pre-transformed to the frequency domain.
#[derive(Clone, Default)]
pub struct FilterBank {
    partitions: Vec<Partition>,
}

impl FilterBank {
    fn build(ir: &[Sample], block_size: usize, fft: &Arc<dyn RealToComplex<f64>>) -> Self {
        let partitions = ir
            .chunks(block_size)
            .map(|chunk| {
                let mut padded = vec![0.0f64; block_size * 2];
                for (dst, src) in padded.iter_mut().zip(chunk.iter()) {
                    *dst = *src as f64;
                }
                let mut spectrum = vec![Complex::new(0.0, 0.0); block_size + 1];
                fft.process(&mut padded, &mut spectrum).expect("fixed-size real FFT");
                Partition { spectrum }
            })
            .collect();
        Self { partitions }
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

/// Raised-cosine-squared crossfade gains for `progress` in `[0, 1]`:
/// `(outgoing_gain, incoming_gain)`.
fn cos2_crossfade_gain(progress: f64) -> (f64, f64) {
    let angle = progress.clamp(0.0, 1.0) * std::f64::consts::FRAC_PI_2;
    let out_gain = angle.cos() * angle.cos();
    let in_gain = angle.sin() * angle.sin();
    (out_gain, in_gain)
}

/// Single-channel uniform-block partitioned convolver with glitch-free filter
/// exchange.
pub struct PartitionedConvolver {
    block_size: usize,
    forward: Arc<dyn RealToComplex<f64>>,
    inverse: Arc<dyn ComplexToReal<f64>>,
    /// Frequency-domain history of the last input blocks, most recent first.
    input_history: Vec<Vec<Complex<f64>>>,
    active: FilterBank,
    pending: Option<(FilterBank, usize, usize)>, // (bank, crossfade_len, elapsed)
}

impl PartitionedConvolver {
    pub fn new(block_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(block_size * 2);
        let inverse = planner.plan_fft_inverse(block_size * 2);
        Self {
            block_size,
            forward,
            inverse,
            input_history: Vec::new(),
            active: FilterBank::default(),
            pending: None,
        }
    }

    /// Replace the active filter immediately (used for the very first load,
    /// before any audio has been produced for this direction).
    pub fn load_ir(&mut self, ir: &[Sample]) {
        self.active = FilterBank::build(ir, self.block_size, &self.forward);
        self.input_history.clear();
        self.pending = None;
    }

    /// Swap to a new filter, crossfading the old and new outputs over
    /// `crossfade_len` samples (caller passes `min(B, 32)` per §4.5).
    pub fn set_ir_crossfaded(&mut self, ir: &[Sample], crossfade_len: usize) {
        if self.active.is_empty() {
            self.load_ir(ir);
            return;
        }
        let bank = FilterBank::build(ir, self.block_size, &self.forward);
        self.pending = Some((bank, crossfade_len.min(self.block_size).max(1), 0));
    }

    /// Convolve one input block, returning `block_size` output samples.
    /// Internally performs one overlap-save FFT convolution per active
    /// filter (one or two when mid-crossfade).
    pub fn process_block(&mut self, input: &[Sample]) -> Vec<Sample> {
        debug_assert_eq!(input.len(), self.block_size);

        let mut padded = vec![0.0f64; self.block_size * 2];
        for (dst, src) in padded.iter_mut().zip(input.iter()) {
            *dst = *src as f64;
        }
        let mut spectrum = vec![Complex::new(0.0, 0.0); self.block_size + 1];
        self.forward.process(&mut padded, &mut spectrum).expect("fixed-size real FFT");
        self.input_history.insert(0, spectrum);

        let active_out = self.sum_partitions(&self.active);

        let output = if let Some((bank, len, elapsed)) = self.pending.take() {
            let pending_out = self.sum_partitions(&bank);
            let mut out = vec![0.0 as Sample; self.block_size];
            for (i, o) in out.iter_mut().enumerate() {
                let progress = (elapsed + i) as f64 / len as f64;
                let (old_gain, new_gain) = cos2_crossfade_gain(progress);
                *o = (active_out[i] as f64 * old_gain + pending_out[i] as f64 * new_gain) as Sample;
            }
            let new_elapsed = elapsed + self.block_size;
            if new_elapsed >= len {
                self.active = bank;
            } else {
                self.pending = Some((bank, len, new_elapsed));
            }
            out
        } else {
            active_out
        };

        let max_partitions = self
            .pending
            .as_ref()
            .map(|(bank, _, _)| bank.partitions.len())
            .unwrap_or(0)
            .max(self.active.partitions.len())
            .max(1);
        self.input_history.truncate(max_partitions);

        output
    }

    fn sum_partitions(&self, bank: &FilterBank) -> Vec<Sample> {
        if bank.is_empty() || self.input_history.is_empty() {
            return vec![0.0; self.block_size];
        }
        let mut accum = vec![Complex::new(0.0, 0.0); self.block_size + 1];
        for (history, partition) in self.input_history.iter().zip(bank.partitions.iter()) {
            for (a, (h, p)) in accum.iter_mut().zip(history.iter().zip(partition.spectrum.iter())) {
                *a += h * p;
            }
        }
        let mut time = vec![0.0f64; self.block_size * 2];
        self.inverse.process(&mut accum, &mut time).expect("fixed-size inverse real FFT");
        let scale = 1.0 / (self.block_size * 2) as f64;
        // Overlap-save: the second half of the IFFT output is the valid,
        // non-circularly-aliased convolution result for this block.
        time[self.block_size..]
            .iter()
            .map(|v| (v * scale) as Sample)
            .collect()
    }

    pub fn reset(&mut self) {
        self.input_history.clear();
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_ir_passes_input_through() {
        let block = 8;
        let mut conv = PartitionedConvolver::new(block);
        let mut ir = vec![0.0 as Sample; block];
        ir[0] = 1.0;
        conv.load_ir(&ir);

        let input = [1.0, 0.5, -0.25, 0.75, 1.0, -1.0, 0.3, 0.0];
        let out = conv.process_block(&input);
        for (a, b) in out.iter().zip(input.iter()) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn crossfade_settles_on_new_filter() {
        let block = 16;
        let mut conv = PartitionedConvolver::new(block);
        let mut ir_a = vec![0.0 as Sample; block];
        ir_a[0] = 1.0;
        conv.load_ir(&ir_a);

        let mut ir_b = vec![0.0 as Sample; block];
        ir_b[0] = 0.5;
        conv.set_ir_crossfaded(&ir_b, 16);

        let input = vec![1.0 as Sample; block];
        let _during = conv.process_block(&input);
        let settled = conv.process_block(&input);
        assert!((settled[0] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn silence_in_gives_silence_out() {
        let block = 32;
        let mut conv = PartitionedConvolver::new(block);
        let ir = vec![0.3 as Sample; block * 3];
        conv.load_ir(&ir);
        let input = vec![0.0 as Sample; block];
        let out = conv.process_block(&input);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
