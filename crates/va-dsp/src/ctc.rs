//! Regularized crosstalk-cancellation filter design (§4.6 N-channel CTC).
//!
//! Grounded on the classic Bauck/Cooper transaural inversion: invert the
//! 2xN acoustic plant (one path per ear per loudspeaker) subject to Tikhonov
//! regularization so the listener's left ear hears only the left program
//! signal and the right only the right, even though every loudspeaker leaks
//! into both ears. The plant is the analytic rigid-sphere model
//! [`SphericalHeadModel`] already uses for the clustering renderer's ITD/ILD
//! (§4.5) rather than a measured HRTF — this workspace carries no HRTF
//! database a true crosstalk path could be drawn from, and the donor engine's
//! CTC falls back to the same spherical-head plant when no measured set is
//! loaded.

use std::sync::Arc;

use realfft::{ComplexToReal, RealFftPlanner};
use rustfft::num_complex::Complex;

use va_core::{Sample, Vec3};

use crate::itd::SphericalHeadModel;

/// A two-input (binaural program), `N`-output (loudspeaker) CTC filter bank,
/// one FIR per (output, input) pair (§4.6 "CTC filter bank").
#[derive(Debug, Clone)]
pub struct CtcFilterBank {
    pub num_outputs: usize,
    pub taps_len: usize,
    /// `filters[output][input]`, `input` in `{0 = left, 1 = right}`.
    filters: Vec<[Vec<Sample>; 2]>,
}

impl CtcFilterBank {
    pub fn filter(&self, output: usize, input: usize) -> &[Sample] {
        &self.filters[output][input]
    }
}

/// Design a CTC filter bank for a listener at the local-frame origin of
/// `speaker_positions` (§4.6 "given N loudspeaker poses and a head-tracked
/// listener, compute an N-channel CTC filter bank").
///
/// `beta` is the Tikhonov regularization (larger = gentler inversion, less
/// gain at ill-conditioned frequencies); `sweet_spot_widening` scales `beta`
/// further to trade cancellation depth for off-axis robustness.
pub fn design_ctc_filters(
    block_size: usize,
    sample_rate: f64,
    head_model: &SphericalHeadModel,
    speaker_positions: &[Vec3],
    beta: f64,
    sweet_spot_widening: f64,
) -> CtcFilterBank {
    let num_outputs = speaker_positions.len().max(1);
    let fft_len = block_size * 2;
    let num_bins = block_size + 1;
    let effective_beta = beta.max(0.0) * (1.0 + sweet_spot_widening.max(0.0));

    let mut planner = RealFftPlanner::<f64>::new();
    let inverse: Arc<dyn ComplexToReal<f64>> = planner.plan_fft_inverse(fft_len);

    // filter_spectra[output][ear][bin]
    let mut filter_spectra: Vec<[Vec<Complex<f64>>; 2]> =
        (0..num_outputs).map(|_| [vec![Complex::new(0.0, 0.0); num_bins], vec![Complex::new(0.0, 0.0); num_bins]]).collect();

    for bin in 0..num_bins {
        let freq = bin as f64 * sample_rate / fft_len as f64;
        let omega = 2.0 * std::f64::consts::PI * freq;

        // G: one [left, right] column per loudspeaker.
        let g: Vec<[Complex<f64>; 2]> = speaker_positions
            .iter()
            .map(|pos| {
                let delay = head_model.ear_delay(*pos, 1.0);
                let left = Complex::from_polar(delay.gain, -omega * delay.left_seconds);
                let right = Complex::from_polar(delay.gain, -omega * delay.right_seconds);
                [left, right]
            })
            .collect();

        // G G^H + beta*I: 2x2 Hermitian.
        let mut a = Complex::new(effective_beta, 0.0);
        let mut d = Complex::new(effective_beta, 0.0);
        let mut b = Complex::new(0.0, 0.0);
        for col in &g {
            a += col[0] * col[0].conj();
            d += col[1] * col[1].conj();
            b += col[0] * col[1].conj();
        }
        let det = a * d - b * b.conj();
        let inv = if det.norm() > 1e-18 {
            [[d / det, -b / det], [-b.conj() / det, a / det]]
        } else {
            [[Complex::new(0.0, 0.0); 2]; 2]
        };

        // W = G^H * inv(GG^H + beta*I): num_outputs x 2.
        for (s, col) in g.iter().enumerate() {
            let gh = [col[0].conj(), col[1].conj()];
            filter_spectra[s][0][bin] = gh[0] * inv[0][0] + gh[1] * inv[1][0];
            filter_spectra[s][1][bin] = gh[0] * inv[0][1] + gh[1] * inv[1][1];
        }
    }

    let half = block_size / 2;
    let denom = (block_size.max(2) - 1) as f64;
    let filters: Vec<[Vec<Sample>; 2]> = filter_spectra
        .into_iter()
        .map(|per_ear| {
            let columns = per_ear.map(|mut spectrum| {
                let mut time = vec![0.0f64; fft_len];
                inverse.process(&mut spectrum, &mut time).expect("fixed-size inverse real FFT");
                let scale = 1.0 / fft_len as f64;
                let mut taps = vec![0.0 as Sample; block_size];
                for (i, tap) in taps.iter_mut().enumerate() {
                    // Causal shift by half a block plus a Hann taper, so the
                    // (generally non-causal, infinite-support) ideal inverse
                    // truncates to a usable `block_size`-tap FIR.
                    let src_index = (i + fft_len - half) % fft_len;
                    let window = 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / denom).cos();
                    *tap = (time[src_index] * scale * window) as Sample;
                }
                taps
            });
            columns
        })
        .collect();

    CtcFilterBank { num_outputs, taps_len: block_size, filters }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_speaker_bank_has_one_filter_pair_per_speaker() {
        let head = SphericalHeadModel::new(0.09, 343.0);
        let speakers = [Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, -1.0)];
        let bank = design_ctc_filters(64, 48000.0, &head, &speakers, 0.01, 0.0);
        assert_eq!(bank.num_outputs, 2);
        assert_eq!(bank.filter(0, 0).len(), 64);
        assert_eq!(bank.filter(1, 1).len(), 64);
    }

    #[test]
    fn higher_regularization_does_not_blow_up_filter_energy() {
        let head = SphericalHeadModel::new(0.09, 343.0);
        let speakers = [Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, -1.0)];
        let loose = design_ctc_filters(64, 48000.0, &head, &speakers, 1e-6, 0.0);
        let tight = design_ctc_filters(64, 48000.0, &head, &speakers, 1.0, 0.0);

        let energy = |bank: &CtcFilterBank| -> f64 {
            (0..bank.num_outputs).flat_map(|s| [0, 1].map(|e| bank.filter(s, e))).flatten().map(|&x| (x as f64).powi(2)).sum()
        };

        assert!(energy(&tight) < energy(&loose));
    }
}
