use image::GrayImage;

/// Per-frame motion score: number of fully foreground mask pixels
pub type MotionScore = u64;

/// Reduces a foreground mask to a motion score
pub struct NoiseMeter;

impl NoiseMeter {
    /// Intensity histogram of a single-channel mask
    pub fn histogram(mask: &GrayImage) -> [u64; 256] {
        let mut histogram = [0u64; 256];
        for pixel in mask.pixels() {
            histogram[pixel[0] as usize] += 1;
        }
        histogram
    }

    /// Count of pixels at maximum intensity (255)
    pub fn score(mask: &GrayImage) -> MotionScore {
        Self::histogram(mask)[u8::MAX as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_empty_mask_scores_zero() {
        let mask = GrayImage::new(640, 480);
        assert_eq!(NoiseMeter::score(&mask), 0);
    }

    #[test]
    fn test_only_full_intensity_counts() {
        let mut mask = GrayImage::new(10, 10);
        mask.put_pixel(0, 0, Luma([255]));
        mask.put_pixel(1, 0, Luma([255]));
        mask.put_pixel(2, 0, Luma([254]));
        mask.put_pixel(3, 0, Luma([127]));

        assert_eq!(NoiseMeter::score(&mask), 2);

        let histogram = NoiseMeter::histogram(&mask);
        assert_eq!(histogram[0], 96);
        assert_eq!(histogram[254], 1);
        assert_eq!(histogram.iter().sum::<u64>(), 100);
    }

    #[test]
    fn test_score_is_deterministic() {
        let mask = GrayImage::from_fn(32, 32, |x, y| {
            Luma([if (x + y) % 3 == 0 { 255 } else { 0 }])
        });
        assert_eq!(NoiseMeter::score(&mask), NoiseMeter::score(&mask));
    }
}
