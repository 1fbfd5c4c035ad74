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

use std::cell::Cell;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use ndarray::{Array1, Array3, ArrayView2, s};
use eosat_common::BoundingBox;
use eosat_cloud::{
    CloudSaturation, CloudSaturationConfig, CloudSaturationData, EosatCloudError, Result,
    cloud::CloudClassifier,
    request::{ImageFormat, TRUE_COLOR_LAYER, WcsRequest},
    series::{Raster, RasterSeries},
    service::{ImageryProvider, load_data},
};

// run with "cargo test --test test_saturation -- --nocapture"

// true color is 4x4, bands are 3x3 at scale 2. Upscaled masks are 6x6, of which we keep rows 2..6 and columns 0..4
const H: usize = 4;
const W: usize = 4;
const SCALE: usize = 2;

fn utc (d: u32)->DateTime<Utc> { Utc.with_ymd_and_hms( 2019, 1, d, 10, 0, 0).unwrap() }

/// three dates:
///   0: cloud free everywhere
///   1: off-image everywhere (the classifier still reports clouds)
///   2: cloud at coarse pixel (2,1), which is fine rows 2..4, columns 2..4
struct MockProvider {
    dates: Vec<DateTime<Utc>>,
    true_color: Vec<Array3<u8>>,
    bands: Vec<Array3<f32>>,
    index: Vec<Array3<f32>>,
    n_rasters: Cell<usize>,
}

impl MockProvider {
    fn new ()->Self {
        let dates = vec![ utc(1), utc(3), utc(5) ];

        let true_color = vec![
            Array3::from_elem( (H,W,3), 100),
            Array3::from_elem( (H,W,3), 255),
            Array3::from_elem( (H,W,3), 100),
        ];

        let mut bands = vec![ Array3::<f32>::zeros( (3,3,10)); 3];
        bands[0].slice_mut( s![..,..,0]).fill( 1.0);
        bands[1].slice_mut( s![..,..,1]).fill( 1.0);
        bands[2].slice_mut( s![..,..,0]).fill( 1.0);
        bands[2][[2,1,1]] = 1.0;

        let index = (0..3).map( |t| Array3::from_shape_fn( (H,W,1), |(x,y,_)| (t*10 + x) as f32)).collect();

        MockProvider { dates, true_color, bands, index, n_rasters: Cell::new(0) }
    }

    fn date_index (&self, date: &DateTime<Utc>)->Result<usize> {
        self.dates.iter().position( |d| d == date).ok_or_else( || EosatCloudError::NoData( format!("no raster for {date}")))
    }
}

impl ImageryProvider for MockProvider {
    fn get_dates (&self, request: &WcsRequest)->Result<Vec<DateTime<Utc>>> {
        Ok( self.dates.clone() )
    }

    fn get_raster (&self, request: &WcsRequest, date: &DateTime<Utc>, redownload: bool)->Result<Raster> {
        self.n_rasters.set( self.n_rasters.get() + 1);
        let i = self.date_index( date)?;

        match (request.format, request.layer.as_str()) {
            (ImageFormat::Png, _) => Ok( Raster::U8( self.true_color[i].clone())),
            (ImageFormat::Tiff32f, TRUE_COLOR_LAYER) => Ok( Raster::F32( self.bands[i].clone())),
            (ImageFormat::Tiff32f, _) => Ok( Raster::F32( self.index[i].clone())),
        }
    }
}

/// uses band 1 as cloud probability
struct BandClassifier;

impl CloudClassifier for BandClassifier {
    fn pixel_probabilities (&mut self, pixels: ArrayView2<f32>)->Result<Array1<f32>> {
        Ok( pixels.column(1).to_owned() )
    }
}

fn test_config ()->CloudSaturationConfig {
    let bbox = BoundingBox::new( 14.45, 45.95, 14.55, 46.05);
    let date = |d| NaiveDate::from_ymd_opt( 2019, 1, d).unwrap();
    let mut config = CloudSaturationConfig::new( bbox, date(1), Some(date(5)));
    config.cloud_scale = SCALE;
    config.detector.average_over = 0;
    config.detector.dilation_size = 0;
    config
}

fn cloud_saturation ()->CloudSaturation<MockProvider,BandClassifier> {
    CloudSaturation::new( test_config(), MockProvider::new(), BandClassifier).unwrap()
}

#[test]
fn test_load_data() {
    let cs = cloud_saturation();
    let (tc, bands, dates) = cs.load_data().unwrap();
    assert_eq!( dates.len(), 3);
    assert_eq!( tc.data.dim(), (3,H,W,3));
    assert_eq!( bands.data.dim(), (3,3,3,10));
    assert_eq!( tc.dates, dates);
    assert_eq!( bands.dates, dates);
}

#[test]
fn test_cloud_saturation_mask() {
    let mut cs = cloud_saturation();
    let data = cs.get_cloud_saturation_mask().unwrap();

    assert_eq!( data.dim(), (H,W));
    assert_eq!( data.n_dates(), 3);
    assert_eq!( data.cloud_masks.dim(), (3,H,W));
    assert_eq!( data.row_offset, 2);
    assert!( data.off_image_count.iter().all( |&n| n == 1));

    // cloud free at (0,0): no detection on the two on-image dates
    assert_eq!( data.frequency[[0,0]], 0.0 / (3 - 1) as f64);
    // cloudy on date 2 at (3,3), the off-image date 1 does not count
    assert_eq!( data.frequency[[3,3]], 0.5);
    assert_eq!( data.frequency[[2,2]], 0.5);
    assert_eq!( data.frequency[[3,1]], 0.0);
    assert!( data.frequency.iter().all( |f| (0.0..=1.0).contains(f)));

    // date 1 masks are all cloud, but off-image
    assert!( data.cloud_masks.slice( s![1,..,..]).iter().all( |&m| m == 1));
}

#[test]
fn test_memoization() {
    let mut cs = cloud_saturation();
    assert!( !cs.is_computed());

    cs.data().unwrap();
    let n = cs.provider().n_rasters.get();
    assert_eq!( n, 6);
    assert!( cs.is_computed());

    cs.data().unwrap();
    cs.get_cloud_filter( 0, 0).unwrap();
    assert_eq!( cs.provider().n_rasters.get(), n);

    cs.get_cloud_saturation_mask().unwrap();
    assert_eq!( cs.provider().n_rasters.get(), 2*n);

    cs.invalidate();
    assert!( !cs.is_computed());
    cs.data().unwrap();
    assert_eq!( cs.provider().n_rasters.get(), 3*n);
}

#[test]
fn test_date_indices() {
    let mut cs = cloud_saturation();
    let data = cs.data().unwrap();

    assert_eq!( data.coarse_pixel( 0, 0).unwrap(), (1,0));
    assert_eq!( data.coarse_pixel( 3, 3).unwrap(), (2,1));

    assert_eq!( data.image_date_indices( 0, 0).unwrap(), vec![0,2]);
    assert_eq!( data.cloud_free_date_indices( 0, 0).unwrap(), vec![0,2]);
    assert_eq!( data.cloudy_date_indices( 3, 3).unwrap(), vec![1,2]);
    assert_eq!( data.valid_date_indices( 3, 3).unwrap(), vec![0]);

    assert!( matches!( data.image_date_indices( H, 0), Err(EosatCloudError::InvalidPixel(_))));
    assert!( matches!( data.cloud_free_date_indices( 0, W), Err(EosatCloudError::InvalidPixel(_))));
}

#[test]
fn test_filter_index_timeseries() {
    let mut cs = cloud_saturation();
    let index = cs.get_full_index_timeseries( "NDVI").unwrap();
    assert_eq!( index.dim(), (3,H,W));

    let (values, dates) = cs.filter_index_timeseries( &index, 0, 0).unwrap();
    assert_eq!( values, vec![0.0, 20.0]);
    assert_eq!( dates, vec![ utc(1), utc(5) ]);

    let (values, dates) = cs.filter_index_timeseries( &index, 3, 3).unwrap();
    assert_eq!( values, vec![3.0]);
    assert_eq!( dates, vec![ utc(1) ]);

    assert_eq!( cs.get_cloud_filter( 0, 0).unwrap(), vec![1]);
    assert_eq!( cs.get_cloud_filter( 3, 3).unwrap(), vec![1,2]);

    assert!( cs.filter_index_timeseries( &index, H, 0).is_err());
    assert!( cs.filter_index_timeseries( &index.slice( s![..2,..,..]).to_owned(), 0, 0).is_err());
}

#[test]
fn test_filter_properties() {
    let mut cs = cloud_saturation();
    let index = cs.get_full_index_timeseries( "NDVI").unwrap();
    let data = cs.data().unwrap();

    for x in 0..H {
        for y in 0..W {
            let image = data.image_date_indices( x, y).unwrap();
            let cloud_free = data.cloud_free_date_indices( x, y).unwrap();
            let (values, dates) = data.filter_timeseries( &index, x, y).unwrap();

            assert_eq!( values.len(), dates.len());
            assert!( values.len() <= image.len().min( cloud_free.len()));
            for date in &dates {
                let i = data.dates.iter().position( |d| d == date).unwrap();
                assert!( image.contains( &i) && cloud_free.contains( &i));
            }
            assert!( dates.windows(2).all( |w| w[0] < w[1]));
        }
    }
}

#[test]
fn test_compute_mismatch() {
    let provider = MockProvider::new();
    let cs = cloud_saturation();
    let (tc, bands, dates) = cs.load_data().unwrap();
    let coarse = Array3::<u8>::zeros( (2,3,3));
    assert!( CloudSaturationData::compute( tc, bands, dates, &coarse, SCALE).is_err());
}

#[test]
fn test_invalid_config() {
    let mut config = test_config();
    config.cloud_scale = 0;
    assert!( CloudSaturation::new( config, MockProvider::new(), BandClassifier).is_err());
}
