/*
 * Copyright © 2025, United States Government, as represented by the Administrator of 
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “EOSAT” software is licensed under the Apache License, Version 2.0 (the "License"); 
 * you may not use this file except in compliance with the License. You may obtain a copy 
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! per pixel cloud detection on multi-band Sentinel-2 rasters. The pixel classifier is abstracted as a
//! [`CloudClassifier`] so that we can plug in different models (or test doubles). Probability maps are
//! smoothed by a normalized disk convolution, thresholded and dilated to get binary cloud masks

use std::path::Path;
use ndarray::{Array1, Array2, Array3, Array4, ArrayView2, ArrayViewD, Axis, Ix1, Ix2};
use ort::{inputs, session::Session, value::TensorRef};
use tracing::debug;

use crate::{config::CloudDetectorConfig, errors::{Result, invalid_dimensions, op_failed}};

/// something that computes per pixel cloud probabilities [0..1] from band values
pub trait CloudClassifier {
    /// `pixels` is a (n_pixels, n_bands) array, the result has to have n_pixels elements
    fn pixel_probabilities (&mut self, pixels: ArrayView2<f32>)->Result<Array1<f32>>;
}

/// a CloudClassifier that runs an ONNX model with (n_pixels,n_bands) f32 input. The model output can
/// be either a (n_pixels) or (n_pixels,1) probability vector or a (n_pixels,2) [clear,cloud] matrix
pub struct OnnxCloudClassifier {
    session: Session,
    input_name: String,
    output_name: String,
}

impl OnnxCloudClassifier {
    pub fn new (model_path: impl AsRef<Path>, input_name: &str, output_name: &str)->Result<Self> {
        let session = Session::builder()?.commit_from_file( model_path.as_ref())?;
        Ok( OnnxCloudClassifier{ session, input_name: input_name.to_string(), output_name: output_name.to_string() } )
    }

    pub fn from_config (config: &CloudDetectorConfig)->Result<Self> {
        Self::new( &config.model_path, &config.input_name, &config.output_name)
    }
}

impl CloudClassifier for OnnxCloudClassifier {
    fn pixel_probabilities (&mut self, pixels: ArrayView2<f32>)->Result<Array1<f32>> {
        let input = pixels.as_standard_layout().into_owned();
        let outputs = self.session.run( inputs![ self.input_name.as_str() => TensorRef::from_array_view( &input)? ])?;
        let output = outputs.get( self.output_name.as_str())
            .ok_or_else( || op_failed!("model has no output {}", self.output_name))?;

        cloud_column( output.try_extract_array::<f32>()?, pixels.nrows())
    }
}

fn cloud_column (probs: ArrayViewD<f32>, n_pixels: usize)->Result<Array1<f32>> {
    let shape = probs.shape().to_vec();
    let probs = match shape.as_slice() {
        [n] if *n == n_pixels => probs.into_dimensionality::<Ix1>()?.to_owned(),
        [n,1] if *n == n_pixels => probs.into_dimensionality::<Ix2>()?.column(0).to_owned(),
        [n,2] if *n == n_pixels => probs.into_dimensionality::<Ix2>()?.column(1).to_owned(),
        _ => return Err( invalid_dimensions!("unexpected classifier output shape {:?} for {} pixels", shape, n_pixels))
    };
    Ok(probs)
}

/// the cloud detector that turns (t,h,w,bands) band series into cloud probabilities and masks
pub struct CloudDetector<C: CloudClassifier> {
    classifier: C,
    threshold: f32,
    average_over: usize,
    dilation_size: usize,
}

impl <C: CloudClassifier> CloudDetector<C> {
    pub fn new (classifier: C, threshold: f32, average_over: usize, dilation_size: usize)->Self {
        CloudDetector { classifier, threshold, average_over, dilation_size }
    }

    pub fn with_config (classifier: C, config: &CloudDetectorConfig)->Self {
        Self::new( classifier, config.threshold, config.average_over, config.dilation_size)
    }

    pub fn classifier (&self)->&C { &self.classifier }

    /// the (t,h,w) cloud probabilities for a (t,h,w,bands) series, one classifier run per date
    pub fn get_cloud_probability_maps (&mut self, bands: &Array4<f32>)->Result<Array3<f32>> {
        let (t,h,w,c) = bands.dim();
        let mut probs = Array3::<f32>::zeros( (t,h,w));

        for (i, raster) in bands.axis_iter( Axis(0)).enumerate() {
            let pixels = raster.as_standard_layout().into_owned().into_shape_with_order( (h*w, c))?;
            let p = self.classifier.pixel_probabilities( pixels.view())?;
            if p.len() != h*w {
                return Err( invalid_dimensions!("classifier returned {} probabilities for {} pixels", p.len(), h*w))
            }
            probs.index_axis_mut( Axis(0), i).assign( &p.into_shape_with_order( (h,w))?);
            debug!("classified date {}/{}", i+1, t);
        }

        Ok(probs)
    }

    /// the (t,h,w) binary cloud masks (1: cloud) for a (t,h,w,bands) series
    pub fn get_cloud_masks (&mut self, bands: &Array4<f32>)->Result<Array3<u8>> {
        let probs = self.get_cloud_probability_maps( bands)?;
        Ok( self.get_mask_from_prob( &probs) )
    }

    /// smooth, threshold and dilate probability maps
    pub fn get_mask_from_prob (&self, probs: &Array3<f32>)->Array3<u8> {
        let mut masks = Array3::<u8>::zeros( probs.dim());
        let kernel = (self.average_over > 0).then( || normalized_disk( self.average_over));
        let dilation = (self.dilation_size > 0).then( || disk( self.dilation_size));

        for (prob, mut mask) in probs.axis_iter( Axis(0)).zip( masks.axis_iter_mut( Axis(0))) {
            let smoothed = match &kernel {
                Some(k) => convolve_reflect( prob, k.view()),
                None => prob.to_owned()
            };
            let thresholded = smoothed.mapv( |p| (p > self.threshold) as u8);
            match &dilation {
                Some(d) => mask.assign( &binary_dilation( thresholded.view(), d.view())),
                None => mask.assign( &thresholded)
            }
        }
        masks
    }
}

/// a (2r+1,2r+1) disk shaped structuring element with 1.0 inside (x² + y² <= r²) and 0.0 outside
pub fn disk (radius: usize)->Array2<f32> {
    let r = radius as isize;
    Array2::from_shape_fn( (2*radius+1, 2*radius+1), |(i,j)| {
        let (dy,dx) = (i as isize - r, j as isize - r);
        if dx*dx + dy*dy <= r*r { 1.0 } else { 0.0 }
    })
}

/// a disk kernel that sums up to 1
pub fn normalized_disk (radius: usize)->Array2<f32> {
    let d = disk( radius);
    let sum = d.sum();
    d / sum
}

/// mirror index i into [0..n) including the edge pixel (`fedcba|abcdef|fedcba`)
#[inline]
fn reflect (i: isize, n: usize)->usize {
    let n = n as isize;
    let m = i.rem_euclid( 2*n);
    (if m < n { m } else { 2*n - 1 - m }) as usize
}

/// 2D correlation of img with an odd sized kernel, borders are reflected
pub fn convolve_reflect (img: ArrayView2<f32>, kernel: ArrayView2<f32>)->Array2<f32> {
    let (h,w) = img.dim();
    let (kh,kw) = kernel.dim();
    let (ry,rx) = ((kh/2) as isize, (kw/2) as isize);

    if h == 0 || w == 0 { return img.to_owned() }

    Array2::from_shape_fn( (h,w), |(y,x)| {
        let mut acc = 0.0f32;
        for ((ky,kx), k) in kernel.indexed_iter() {
            if *k != 0.0 {
                let sy = reflect( y as isize + ky as isize - ry, h);
                let sx = reflect( x as isize + kx as isize - rx, w);
                acc += k * img[[sy,sx]];
            }
        }
        acc
    })
}

/// binary dilation of a 0/1 mask with a symmetric structuring element. Pixels outside the mask count as 0
pub fn binary_dilation (mask: ArrayView2<u8>, selem: ArrayView2<f32>)->Array2<u8> {
    let (h,w) = mask.dim();
    let (kh,kw) = selem.dim();
    let (ry,rx) = ((kh/2) as isize, (kw/2) as isize);

    Array2::from_shape_fn( (h,w), |(y,x)| {
        let hit = selem.indexed_iter().any( |((ky,kx),k)| {
            if *k == 0.0 { return false }
            let sy = y as isize + ky as isize - ry;
            let sx = x as isize + kx as isize - rx;
            sy >= 0 && sx >= 0 && (sy as usize) < h && (sx as usize) < w && mask[[sy as usize, sx as usize]] != 0
        });
        hit as u8
    })
}
