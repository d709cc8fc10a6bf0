use ndarray::Array4;

use crate::config::Layout;
use crate::error::ModelError;

#[cfg(feature = "menoh")]
pub mod menoh;

/// Pooled embedding of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Features(Vec<f32>);

impl Features {
    pub fn new(values: Vec<f32>) -> Self {
        Features(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Pretrained image network returning its pooled penultimate layer.
pub trait FeatureExtractor {
    fn extract(&mut self, image: &Array4<f32>) -> Result<Features, ModelError>;
}

/// Pretrained caption model scoring the next token.
pub trait SequenceModel {
    /// Returns a distribution over vocabulary ids for the token following
    /// `sequence`, a left-padded window of ids.
    fn predict(&mut self, features: &Features, sequence: &[usize]) -> Result<Vec<f32>, ModelError>;
}

/// Copies a (1, H, W, C) image into a graph input buffer laid out as `layout`.
pub fn fill_input(
    model: &'static str,
    dst: &mut [f32],
    dims: &[usize],
    image: &Array4<f32>,
    layout: Layout,
) -> Result<(), ModelError> {
    if dst.len() != image.len() {
        return Err(ModelError::ShapeMismatch {
            model,
            expected: dims.to_vec(),
            got: image.shape().to_vec(),
        });
    }
    let view = match layout {
        // (1, H, W, C) -> (1, C, H, W)
        Layout::Nchw => image.view().permuted_axes([0, 3, 1, 2]),
        Layout::Nhwc => image.view(),
    };
    for (d, &src) in dst.iter_mut().zip(view.iter()) {
        *d = src;
    }
    Ok(())
}

/// Copies a single batch row into a graph input buffer of the same length.
pub fn fill_row<I>(
    model: &'static str,
    dst: &mut [f32],
    dims: &[usize],
    values: I,
) -> Result<(), ModelError>
where
    I: ExactSizeIterator<Item = f32>,
{
    if dst.len() != values.len() {
        return Err(ModelError::ShapeMismatch {
            model,
            expected: dims.to_vec(),
            got: vec![1, values.len()],
        });
    }
    for (d, v) in dst.iter_mut().zip(values) {
        *d = v;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // value encodes its position: 100 * y + 10 * x + c
    fn image() -> Array4<f32> {
        Array4::from_shape_fn((1, 2, 2, 3), |(_, y, x, c)| (100 * y + 10 * x + c) as f32)
    }

    #[test]
    fn test_fill_input_nchw_is_channel_major() {
        let mut dst = vec![0.0; 12];
        fill_input("extractor", &mut dst, &[1, 3, 2, 2], &image(), Layout::Nchw).unwrap();
        assert_eq!(
            dst,
            vec![
                0.0, 10.0, 100.0, 110.0, // c = 0
                1.0, 11.0, 101.0, 111.0, // c = 1
                2.0, 12.0, 102.0, 112.0, // c = 2
            ]
        );
    }

    #[test]
    fn test_fill_input_nhwc_keeps_order() {
        let mut dst = vec![0.0; 12];
        fill_input("extractor", &mut dst, &[1, 2, 2, 3], &image(), Layout::Nhwc).unwrap();
        assert_eq!(
            dst,
            vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0, 100.0, 101.0, 102.0, 110.0, 111.0, 112.0]
        );
    }

    #[test]
    fn test_fill_input_length_mismatch() {
        let mut dst = vec![7.0; 27];
        match fill_input("extractor", &mut dst, &[1, 3, 3, 3], &image(), Layout::Nchw) {
            Err(ModelError::ShapeMismatch {
                model,
                expected,
                got,
            }) => {
                assert_eq!(model, "extractor");
                assert_eq!(expected, vec![1, 3, 3, 3]);
                assert_eq!(got, vec![1, 2, 2, 3]);
            }
            other => panic!("Expected ShapeMismatch, got {:?}", other),
        }
        assert!(dst.iter().all(|&v| v == 7.0));
    }

    #[test]
    fn test_fill_row_converts_ids() {
        let mut dst = vec![0.0; 4];
        let ids = [0usize, 0, 1, 9];
        fill_row("sequence model", &mut dst, &[1, 4], ids.iter().map(|&id| id as f32)).unwrap();
        assert_eq!(dst, vec![0.0, 0.0, 1.0, 9.0]);
    }

    #[test]
    fn test_fill_row_length_mismatch() {
        let mut dst = vec![0.0; 2048];
        let features = Features::new(vec![0.5; 1536]);
        match fill_row("sequence model", &mut dst, &[1, 2048], features.as_slice().iter().copied()) {
            Err(ModelError::ShapeMismatch { expected, got, .. }) => {
                assert_eq!(expected, vec![1, 2048]);
                assert_eq!(got, vec![1, 1536]);
            }
            other => panic!("Expected ShapeMismatch, got {:?}", other),
        }
    }
}
