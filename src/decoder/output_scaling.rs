use crate::common::complex::Scaler;

const PCM_SCALE: Scaler = 1.0 / 32768.0;

/// Convert the 16 bit scale synthesis output to normalised floating point samples
///
/// # Arguments
///
/// * `samples` - Output of the overlap-add stage, nominally in the range -32768..32767
/// * `normalised` - Samples in the range -1.0..1.0 (not clipped)
pub fn normalise(samples: &[Scaler], normalised: &mut [f32]) {
    for (to, from) in normalised.iter_mut().zip(samples) {
        *to = *from * PCM_SCALE;
    }
}

/// Convert from floating point to signed integer by rounding to the
/// nearest integer value then clipping to max and min of a 16 bit integer
///
/// # Arguments
///
/// * `samples` - Normalised floating point samples
/// * `samples_clip` - 16 bit integer output samples rounded and clipped
pub fn scale_and_round(samples: &[f32], samples_clip: &mut [i16]) {
    for (to, from) in samples_clip.iter_mut().zip(samples) {
        let scaled = *from * 32768.;
        let tmp = if scaled > 0. {
            (scaled + 0.5) as i32
        } else {
            (scaled - 0.5) as i32
        };

        *to = tmp.min(32767).max(-32768) as i16;
    }
}

/// Interleave planar channels into rounded and clipped 16 bit samples
///
/// # Arguments
///
/// * `channels` - Normalised planar samples, all the same length
/// * `interleaved` - Output of at least `channels.len() * channels[0].len()` samples
pub fn interleave_i16(channels: &[&[f32]], interleaved: &mut [i16]) {
    let num_channels = channels.len();
    if num_channels == 0 {
        return;
    }

    let mut clipped = [0i16; 1];
    for (channel_index, channel) in channels.iter().enumerate() {
        for (sample_index, sample) in channel.iter().enumerate() {
            if let Some(to) = interleaved.get_mut(sample_index * num_channels + channel_index) {
                scale_and_round(core::slice::from_ref(sample), &mut clipped);
                *to = clipped[0];
            }
        }
    }
}
