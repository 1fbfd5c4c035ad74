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

use ndarray::{Array2, Array3, Array4, array, s};
use eosat_cloud::{
    EosatCloudError,
    mask::{cloud_count, cloud_frequency, crop_bottom_left, frequency_to_gray_image, off_image_count, off_image_mask,
           off_image_masks, upscale_mask, upscale_masks},
};

// run with "cargo test --test test_mask -- --nocapture"

#[test]
fn test_upscale() {
    let mask = array![[1u8, 0, 1], [0, 1, 0]];
    let up = upscale_mask( mask.view(), 3);

    assert_eq!( up.dim(), (6,9));
    for ((i,j),v) in up.indexed_iter() {
        assert_eq!( *v, mask[[i/3, j/3]]);
    }
    assert_eq!( upscale_mask( mask.view(), 1), mask);

    let masks = Array3::<u8>::ones( (2,2,3));
    assert!( matches!( upscale_masks( &masks, 0), Err(EosatCloudError::InvalidDimensions(_))));
}

#[test]
fn test_upscale_crop_shape() {
    let (h,w) = (13, 17);
    for k in 1..=6 {
        // the coarse bands cover a slightly larger area than the image
        let (ch,cw) = (h/k + 1, w/k + 1);
        let masks = Array3::<u8>::zeros( (3,ch,cw));
        let up = upscale_masks( &masks, k).unwrap();
        let cropped = crop_bottom_left( &up, h, w).unwrap();
        println!("k={k}: {:?} -> {:?} -> {:?}", masks.dim(), up.dim(), cropped.dim());
        assert_eq!( cropped.dim(), (3,h,w));
    }
}

#[test]
fn test_crop_bottom_left() {
    let masks = Array3::from_shape_fn( (1,4,4), |(_,i,j)| (i*4 + j) as u8);
    let cropped = crop_bottom_left( &masks, 2, 3).unwrap();
    assert_eq!( cropped.slice( s![0,..,..]), array![[8u8, 9, 10], [12, 13, 14]]);

    assert!( matches!( crop_bottom_left( &masks, 5, 3), Err(EosatCloudError::InvalidDimensions(_))));
    assert!( crop_bottom_left( &masks, 2, 5).is_err());
}

#[test]
fn test_off_image() {
    let mut rgb = Array3::<u8>::from_elem( (2,2,3), 255);
    rgb[[0,1,2]] = 254;
    rgb[[1,0,0]] = 0;

    let off = off_image_mask( rgb.view());
    assert_eq!( off, array![[true, false], [false, true]]);

    let mut tc = Array4::<u8>::from_elem( (3,2,2,3), 255);
    tc.slice_mut( s![0,..,..,..]).fill(100);
    tc[[1,0,0,1]] = 7;

    let offs = off_image_masks( &tc);
    assert_eq!( offs.dim(), (3,2,2));
    let count = off_image_count( &offs);
    assert_eq!( count, array![[1usize, 2], [2, 2]]);
    assert!( count.iter().all( |&n| n <= 3));
}

#[test]
fn test_cloud_frequency() {
    // date 0: all on-image, cloud at (0,0)
    // date 1: (0,0) off-image, clouds everywhere
    // date 2: (1,1) off-image
    let mut tc = Array4::<u8>::from_elem( (3,2,2,3), 50);
    tc.slice_mut( s![1,0,0,..]).fill(255);
    tc.slice_mut( s![2,1,1,..]).fill(255);

    let mut clouds = Array3::<u8>::zeros( (3,2,2));
    clouds[[0,0,0]] = 1;
    clouds.slice_mut( s![1,..,..]).fill(1);

    let off = off_image_masks( &tc);
    let off_count = off_image_count( &off);
    let counts = cloud_count( &clouds, &off).unwrap();
    assert_eq!( counts, array![[1usize, 1], [1, 1]]);

    let freq = cloud_frequency( &counts, &off_count, 3);
    println!("frequency: {freq:?}");
    assert_eq!( freq[[0,0]], 0.5);
    assert!( (freq[[0,1]] - 1.0/3.0).abs() < 1e-12);
    assert_eq!( freq[[1,1]], 0.5);
    assert!( freq.iter().all( |f| (0.0..=1.0).contains(f)));

    assert!( matches!( cloud_count( &clouds.slice(s![..2,..,..]).to_owned(), &off), Err(EosatCloudError::InvalidDimensions(_))));
}

#[test]
fn test_never_on_image() {
    let tc = Array4::<u8>::from_elem( (2,1,2,3), 255);
    let clouds = Array3::<u8>::ones( (2,1,2));

    let off = off_image_masks( &tc);
    let counts = cloud_count( &clouds, &off).unwrap();
    let freq = cloud_frequency( &counts, &off_image_count( &off), 2);
    assert!( freq.iter().all( |f| f.is_nan()));
}

#[test]
fn test_gray_image() {
    let freq = array![[0.0, 0.5, 1.0], [f64::NAN, 0.25, 1.0]];
    let img = frequency_to_gray_image( &freq);
    assert_eq!( img.dimensions(), (3,2));
    assert_eq!( img.get_pixel(1,0).0, [128]);
    assert_eq!( img.get_pixel(0,1).0, [0]);
    assert_eq!( img.get_pixel(2,1).0, [255]);
}
