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

//! pixel wise operations on mask series: upscaling coarse cloud masks to true color resolution,
//! aligning them with the true color rasters, off-image detection and cloud frequency aggregation

use ndarray::{Array2, Array3, Array4, ArrayView2, ArrayView3, Axis, Zip, s};
use image::GrayImage;

use crate::errors::{Result, invalid_dimensions};

/// the channel value of saturated pixels, i.e. pixels for which the service has no data
pub const SATURATION_VALUE: u8 = 255;

/// block replicate each pixel into a `scale x scale` square (Kronecker product with a ones block)
pub fn upscale_mask (mask: ArrayView2<u8>, scale: usize)->Array2<u8> {
    let (h,w) = mask.dim();
    Array2::from_shape_fn( (h*scale, w*scale), |(i,j)| mask[[i/scale, j/scale]])
}

/// upscale each (h,w) mask of a (t,h,w) series
pub fn upscale_masks (masks: &Array3<u8>, scale: usize)->Result<Array3<u8>> {
    if scale == 0 {
        return Err( invalid_dimensions!("upscale factor has to be >= 1"))
    }
    let (t,h,w) = masks.dim();
    let mut upscaled = Array3::<u8>::zeros( (t, h*scale, w*scale));
    for (mask, mut up) in masks.axis_iter( Axis(0)).zip( upscaled.axis_iter_mut( Axis(0))) {
        up.assign( &upscale_mask( mask, scale));
    }
    Ok(upscaled)
}

/// crop a (t,H,W) series to (t,h,w), keeping the last `h` rows and the first `w` columns. Since the cloud
/// bbox is extended to the north and east this anchors the masks at the south west corner of the true
/// color bbox, which is an approximation (the service might round differently)
pub fn crop_bottom_left (masks: &Array3<u8>, h: usize, w: usize)->Result<Array3<u8>> {
    let (_,mh,mw) = masks.dim();
    if mh < h || mw < w {
        return Err( invalid_dimensions!("mask {}x{} smaller than image {}x{}", mh, mw, h, w))
    }
    Ok( masks.slice( s![.., mh-h.., ..w]).to_owned() )
}

/// a pixel is off-image if all its channels are saturated
pub fn off_image_mask (rgb: ArrayView3<u8>)->Array2<bool> {
    rgb.map_axis( Axis(2), |px| px.iter().all( |&v| v == SATURATION_VALUE))
}

/// the (t,h,w) off-image masks of a (t,h,w,c) true color series
pub fn off_image_masks (true_color: &Array4<u8>)->Array3<bool> {
    true_color.map_axis( Axis(3), |px| px.iter().all( |&v| v == SATURATION_VALUE))
}

/// number of dates at which each pixel is off-image
pub fn off_image_count (off_image: &Array3<bool>)->Array2<usize> {
    off_image.map_axis( Axis(0), |v| v.iter().filter( |&&b| b).count())
}

/// number of dates at which each pixel is on-image and detected as cloud
pub fn cloud_count (cloud_masks: &Array3<u8>, off_image: &Array3<bool>)->Result<Array2<usize>> {
    if cloud_masks.dim() != off_image.dim() {
        return Err( invalid_dimensions!("cloud masks {:?} do not match images {:?}", cloud_masks.dim(), off_image.dim()))
    }
    let (_,h,w) = cloud_masks.dim();
    let mut count = Array2::<usize>::zeros( (h,w));
    for (cloud, off) in cloud_masks.axis_iter( Axis(0)).zip( off_image.axis_iter( Axis(0))) {
        Zip::from( &mut count).and( &cloud).and( &off).for_each( |n, &c, &o| {
            if c != 0 && !o { *n += 1 }
        });
    }
    Ok(count)
}

/// the ratio of cloud detections and on-image dates per pixel. This is NaN for pixels that are never on-image
pub fn cloud_frequency (cloud_count: &Array2<usize>, off_image_count: &Array2<usize>, n_dates: usize)->Array2<f64> {
    Zip::from( cloud_count).and( off_image_count).map_collect( |&clouds, &off| {
        let on_image = n_dates.saturating_sub( off);
        if on_image > 0 { clouds as f64 / on_image as f64 } else { f64::NAN }
    })
}

/// grayscale preview of a frequency map (white: always cloudy). Undefined pixels are black
pub fn frequency_to_gray_image (frequency: &Array2<f64>)->GrayImage {
    let (h,w) = frequency.dim();
    GrayImage::from_fn( w as u32, h as u32, |x,y| {
        let f = frequency[[y as usize, x as usize]];
        let v = if f.is_nan() { 0 } else { (f.clamp( 0.0, 1.0) * 255.0).round() as u8 };
        image::Luma([v])
    })
}
