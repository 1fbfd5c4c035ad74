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
#![allow(unused)]

use ndarray::{Array1, Array2, Array3, Array4, ArrayView2, array, s};
use eosat_cloud::{
    EosatCloudError, Result,
    cloud::{CloudClassifier, CloudDetector, binary_dilation, convolve_reflect, disk, normalized_disk},
};

// run with "cargo test --test test_cloud -- --nocapture"

/// uses band 1 as cloud probability
struct BandClassifier;

impl CloudClassifier for BandClassifier {
    fn pixel_probabilities (&mut self, pixels: ArrayView2<f32>)->Result<Array1<f32>> {
        Ok( pixels.column(1).to_owned() )
    }
}

/// returns one probability too few
struct BrokenClassifier;

impl CloudClassifier for BrokenClassifier {
    fn pixel_probabilities (&mut self, pixels: ArrayView2<f32>)->Result<Array1<f32>> {
        Ok( Array1::zeros( pixels.nrows() - 1) )
    }
}

#[test]
fn test_disk() {
    assert_eq!( disk(0), array![[1.0f32]]);
    assert_eq!( disk(1), array![[0.0f32, 1.0, 0.0], [1.0, 1.0, 1.0], [0.0, 1.0, 0.0]]);

    let d = disk(2);
    assert_eq!( d.dim(), (5,5));
    assert_eq!( d.sum(), 13.0);

    let d = disk(4);
    assert_eq!( d.sum(), 49.0);

    assert!( (normalized_disk(4).sum() - 1.0).abs() < 1e-5);
}

#[test]
fn test_convolve_reflect() {
    let img = Array2::<f32>::from_elem( (7,5), 0.7);
    let res = convolve_reflect( img.view(), normalized_disk(3).view());
    assert!( res.iter().all( |v| (v - 0.7).abs() < 1e-5));

    // reflected border: for a 1x1 image every neighbor is the pixel itself
    let img = array![[0.3f32]];
    let res = convolve_reflect( img.view(), normalized_disk(2).view());
    assert!( (res[[0,0]] - 0.3).abs() < 1e-6);

    // edge pixel is mirrored including itself (cba|abc)
    let img = array![[1.0f32, 0.0, 0.0]];
    let kernel = array![[1.0f32, 1.0, 1.0]];
    let res = convolve_reflect( img.view(), kernel.view());
    assert_eq!( res, array![[2.0f32, 1.0, 0.0]]);
}

#[test]
fn test_binary_dilation() {
    let mut mask = Array2::<u8>::zeros( (5,5));
    mask[[2,2]] = 1;
    let dilated = binary_dilation( mask.view(), disk(1).view());
    let expected = array![
        [0u8, 0, 0, 0, 0],
        [0,   0, 1, 0, 0],
        [0,   1, 1, 1, 0],
        [0,   0, 1, 0, 0],
        [0,   0, 0, 0, 0],
    ];
    assert_eq!( dilated, expected);

    let mut mask = Array2::<u8>::zeros( (3,3));
    mask[[0,0]] = 1;
    let dilated = binary_dilation( mask.view(), disk(1).view());
    assert_eq!( dilated.sum(), 3);
}

#[test]
fn test_mask_from_prob() {
    let detector = CloudDetector::new( BandClassifier, 0.4, 0, 0);
    let probs = Array3::from_shape_vec( (1,1,3), vec![0.39f32, 0.4, 0.41]).unwrap();
    let masks = detector.get_mask_from_prob( &probs);
    assert_eq!( masks.slice( s![0,..,..]), array![[0u8, 0, 1]]);

    let detector = CloudDetector::new( BandClassifier, 0.4, 0, 1);
    let mut probs = Array3::<f32>::zeros( (2,5,5));
    probs[[1,2,2]] = 0.9;
    let masks = detector.get_mask_from_prob( &probs);
    assert_eq!( masks.slice( s![0,..,..]).sum(), 0);
    assert_eq!( masks.slice( s![1,..,..]).sum(), 5);

    // averaging over a radius 1 disk spreads a single 1.0 to 0.2, which is below threshold
    let detector = CloudDetector::new( BandClassifier, 0.4, 1, 0);
    let mut probs = Array3::<f32>::zeros( (1,5,5));
    probs[[0,2,2]] = 1.0;
    assert_eq!( detector.get_mask_from_prob( &probs).sum(), 0);
}

#[test]
fn test_cloud_masks() {
    let mut bands = Array4::<f32>::zeros( (2,3,4,10));
    bands[[0,1,2,1]] = 0.8;
    bands.slice_mut( s![1,..,..,1]).fill( 0.6);

    let mut detector = CloudDetector::new( BandClassifier, 0.4, 0, 0);
    let probs = detector.get_cloud_probability_maps( &bands).unwrap();
    assert_eq!( probs.dim(), (2,3,4));
    assert_eq!( probs[[0,1,2]], 0.8);

    let masks = detector.get_cloud_masks( &bands).unwrap();
    assert_eq!( masks.dim(), (2,3,4));
    assert_eq!( masks.slice( s![0,..,..]).sum(), 1);
    assert_eq!( masks[[0,1,2]], 1);
    assert!( masks.slice( s![1,..,..]).iter().all( |&m| m == 1));

    let mut detector = CloudDetector::new( BrokenClassifier, 0.4, 0, 0);
    assert!( matches!( detector.get_cloud_masks( &bands), Err(EosatCloudError::InvalidDimensions(_))));
}
