//! Non-linear pitch (NLP) estimator.
//!
//! Squares the newest samples, notch-filters and lowpass-filters them,
//! decimates into a 512-point FFT, and searches for the fundamental
//! period via a global peak search followed by sub-multiple tracking
//! (a crude but effective defense against octave errors).

use crate::consts::{
    FFT_SIZE, FS, M_PITCH, N_SAMP, NLP_COEFF, NLP_CNLP, NLP_DEC, NLP_MIN_BIN, NLP_NTAP, P_MAX,
    P_MIN,
};
use crate::tables::{NLP_COSW, NLP_FIR};
use microfft::Complex32;

#[derive(Debug, Clone)]
pub struct NlpEstimator {
    sq: [f32; M_PITCH],
    mem_x: f32,
    mem_y: f32,
    fir_mem: [f32; NLP_NTAP],
    prev_f0: i32,
}

impl NlpEstimator {
    pub const fn new() -> Self {
        Self {
            sq: [0.0; M_PITCH],
            mem_x: 0.0,
            mem_y: 0.0,
            fir_mem: [0.0; NLP_NTAP],
            prev_f0: 3, // matches the reference's implicit zero-initialized first-call bin*stride
        }
    }

    /// `sn` is the encoder's full 320-sample sliding analysis buffer;
    /// only its newest `N_SAMP` samples are squared/filtered per call,
    /// with `sq`'s own history sliding in lockstep.
    pub fn estimate_pitch_period(&mut self, sn: &[f32; M_PITCH]) -> i32 {
        let base = M_PITCH - N_SAMP;

        for i in base..M_PITCH {
            self.sq[i] = sn[i] * sn[i];
        }

        for i in base..M_PITCH {
            let notch = (self.sq[i] - self.mem_x) + NLP_COEFF * self.mem_y;
            self.mem_x = self.sq[i];
            self.mem_y = notch;
            self.sq[i] = notch + 1.0;
        }

        for i in base..M_PITCH {
            for j in 0..(NLP_NTAP - 1) {
                self.fir_mem[j] = self.fir_mem[j + 1];
            }
            self.fir_mem[NLP_NTAP - 1] = self.sq[i];

            let mut acc = 0.0f32;
            for j in 0..NLP_NTAP {
                acc += self.fir_mem[j] * NLP_FIR[j];
            }
            self.sq[i] = acc;
        }

        let mut fw_input = [Complex32 { re: 0.0, im: 0.0 }; FFT_SIZE];
        for i in 0..(M_PITCH / NLP_DEC) {
            fw_input[i] = Complex32 {
                re: self.sq[NLP_DEC * i] * NLP_COSW[i],
                im: 0.0,
            };
        }

        let spectrum = microfft::complex::cfft_512(&mut fw_input);
        let mut fw = [0.0f32; FFT_SIZE];
        for (dst, c) in fw.iter_mut().zip(spectrum.iter()) {
            *dst = c.re * c.re + c.im * c.im;
        }

        let lo = (FFT_SIZE * NLP_DEC) / (P_MAX as usize);
        let hi = (FFT_SIZE * NLP_DEC) / (P_MIN as usize);
        let mut gmax = 0.0f32;
        let mut gmax_bin = lo;
        for i in lo..=hi {
            if fw[i] > gmax {
                gmax = fw[i];
                gmax_bin = i;
            }
        }

        let f0 = self.post_process_sub_multiples(&fw, gmax, gmax_bin);
        self.prev_f0 = f0;

        for i in 0..base {
            self.sq[i] = self.sq[N_SAMP + i];
        }

        (FS as i32) / f0
    }

    fn post_process_sub_multiples(&self, fw: &[f32; FFT_SIZE], gmax: f32, gmax_bin: usize) -> i32 {
        let mut cmax_bin = gmax_bin;
        let prev_f0_bin = (self.prev_f0 * (FFT_SIZE * NLP_DEC) as i32) / FS as i32;

        let mut mult = 2usize;
        while gmax_bin / mult >= NLP_MIN_BIN {
            let b = gmax_bin / mult;
            let mut bmin = (0.8 * b as f32) as usize;
            let bmax = (1.2 * b as f32) as usize;
            if bmin < NLP_MIN_BIN {
                bmin = NLP_MIN_BIN;
            }

            let thresh = if prev_f0_bin as usize > bmin && (prev_f0_bin as usize) < bmax {
                NLP_CNLP * gmax * 0.5
            } else {
                NLP_CNLP * gmax
            };

            let mut lmax = 0.0f32;
            let mut lmax_bin = bmin;
            for i in bmin..=bmax.min(FFT_SIZE - 2) {
                if fw[i] > lmax {
                    lmax = fw[i];
                    lmax_bin = i;
                }
            }

            if lmax > thresh && lmax > fw[lmax_bin - 1] && lmax > fw[lmax_bin + 1] {
                #[cfg(feature = "debug-logging")]
                log::trace!(
                    "nlp: sub-multiple 1/{mult} adopted, bin {gmax_bin} -> {lmax_bin}"
                );
                cmax_bin = lmax_bin;
            }

            mult += 1;
        }

        cmax_bin as i32 * (FS as i32 / (FFT_SIZE * NLP_DEC) as i32)
    }
}

impl Default for NlpEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::TAU;

    #[test]
    fn tracks_a_pure_tone_pitch_period() {
        let mut nlp = NlpEstimator::new();
        let freq_hz = 150.0f32;
        let mut sn = [0.0f32; M_PITCH];
        let mut period = 0;
        for frame in 0..6 {
            for i in 0..M_PITCH {
                let t = ((frame * N_SAMP) as f32 - (M_PITCH - N_SAMP) as f32 + i as f32) / FS;
                sn[i] = 8000.0 * libm::sinf(TAU * freq_hz * t);
            }
            period = nlp.estimate_pitch_period(&sn);
        }
        let expected_period = (FS / freq_hz) as i32;
        assert!(
            (period - expected_period).abs() <= 6,
            "{period} vs {expected_period}"
        );
    }
}
