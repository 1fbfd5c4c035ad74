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

use chrono::{DateTime,Utc};
use ndarray::{Array2, Array3, Axis};
use tracing::{debug,info};

use crate::{
    cloud::{CloudClassifier, CloudDetector},
    config::CloudSaturationConfig,
    errors::{EosatCloudError, Result, invalid_dimensions, op_failed},
    mask::{cloud_count, cloud_frequency, crop_bottom_left, off_image_count, off_image_masks, upscale_masks},
    request::{WcsRequest, create_index_request, create_requests},
    series::RasterSeries,
    service::{ImageryProvider, load_data, load_f32_series},
};

/// the result of a cloud saturation computation, which is kept by `CloudSaturation` until it is invalidated.
/// Pixel coordinates are (x: row, y: column) at true color resolution
#[derive(Debug,Clone)]
pub struct CloudSaturationData {
    /// (h,w) ratio of cloudy to on-image dates per pixel, NaN if a pixel is never on-image
    pub frequency: Array2<f64>,
    pub true_color: RasterSeries<u8>,
    /// the coarse resolution cloud detection bands
    pub bands: RasterSeries<f32>,
    pub dates: Vec<DateTime<Utc>>,
    /// (t,h,w) 0/1 cloud masks at true color resolution
    pub cloud_masks: Array3<u8>,
    /// (t,h,w) true if the pixel has no image data at that date
    pub off_image: Array3<bool>,
    pub off_image_count: Array2<usize>,
    /// bands to true color resolution factor
    pub scale: usize,
    /// number of upscaled mask rows that were cropped at the top
    pub row_offset: usize,
}

impl CloudSaturationData {

    /// aggregate the coarse (t,h',w') cloud masks for the given true color and bands series
    pub fn compute (true_color: RasterSeries<u8>, bands: RasterSeries<f32>, dates: Vec<DateTime<Utc>>,
                    coarse_masks: &Array3<u8>, scale: usize)->Result<Self>
    {
        let n_dates = dates.len();
        if true_color.len() != n_dates || bands.len() != n_dates || coarse_masks.len_of( Axis(0)) != n_dates {
            return Err( invalid_dimensions!("series lengths do not match {} dates", n_dates))
        }

        let (h,w,_) = true_color.raster_dim();
        let upscaled = upscale_masks( coarse_masks, scale)?;
        let row_offset = upscaled.len_of( Axis(1)).saturating_sub( h);
        let cloud_masks = crop_bottom_left( &upscaled, h, w)?;
        debug!("upscaled cloud masks to {:?} (row offset {})", cloud_masks.dim(), row_offset);

        let off_image = off_image_masks( &true_color.data);
        let off_image_count = off_image_count( &off_image);
        let cloud_count = cloud_count( &cloud_masks, &off_image)?;
        let frequency = cloud_frequency( &cloud_count, &off_image_count, n_dates);

        Ok( CloudSaturationData { frequency, true_color, bands, dates, cloud_masks, off_image, off_image_count, scale, row_offset } )
    }

    /// (h,w) at true color resolution
    pub fn dim (&self)->(usize,usize) { self.frequency.dim() }

    pub fn n_dates (&self)->usize { self.dates.len() }

    fn check_pixel (&self, x: usize, y: usize)->Result<()> {
        let (h,w) = self.dim();
        if x >= h || y >= w {
            Err( EosatCloudError::InvalidPixel( format!("({x},{y}) outside of {h}x{w} image")))
        } else {
            Ok(())
        }
    }

    /// map a true color pixel to the bands grid the cloud masks were upscaled from
    pub fn coarse_pixel (&self, x: usize, y: usize)->Result<(usize,usize)> {
        self.check_pixel( x, y)?;
        let (cx,cy) = ((x + self.row_offset) / self.scale, y / self.scale);
        let (bh,bw,_) = self.bands.raster_dim();
        if cx >= bh || cy >= bw {
            return Err( EosatCloudError::InvalidPixel( format!("({x},{y}) maps to ({cx},{cy}) outside of {bh}x{bw} bands")))
        }
        Ok( (cx,cy) )
    }

    /// indices of dates with a non-zero reference band value at the pixel
    pub fn image_date_indices (&self, x: usize, y: usize)->Result<Vec<usize>> {
        let (cx,cy) = self.coarse_pixel( x, y)?;
        let bands = &self.bands.data;
        Ok( (0..self.n_dates()).filter( |&t| bands[[t,cx,cy,0]] != 0.0).collect() )
    }

    /// indices of dates at which the pixel is not flagged as cloud
    pub fn cloud_free_date_indices (&self, x: usize, y: usize)->Result<Vec<usize>> {
        self.check_pixel( x, y)?;
        Ok( (0..self.n_dates()).filter( |&t| self.cloud_masks[[t,x,y]] == 0).collect() )
    }

    /// indices of dates at which the pixel is flagged as cloud
    pub fn cloudy_date_indices (&self, x: usize, y: usize)->Result<Vec<usize>> {
        self.check_pixel( x, y)?;
        Ok( (0..self.n_dates()).filter( |&t| self.cloud_masks[[t,x,y]] != 0).collect() )
    }

    /// ascending indices of dates that have image data and no cloud at the pixel
    pub fn valid_date_indices (&self, x: usize, y: usize)->Result<Vec<usize>> {
        let cloud_free = self.cloud_free_date_indices( x, y)?;
        let image = self.image_date_indices( x, y)?;
        Ok( cloud_free.into_iter().filter( |t| image.binary_search(t).is_ok()).collect() )
    }

    /// filter a (t,h,w) series that is aligned with our dates down to the valid dates of the pixel
    pub fn filter_timeseries (&self, series: &Array3<f32>, x: usize, y: usize)->Result<(Vec<f32>,Vec<DateTime<Utc>>)> {
        let (t,h,w) = series.dim();
        if t != self.n_dates() {
            return Err( invalid_dimensions!("series has {} dates, expected {}", t, self.n_dates()))
        }
        if x >= h || y >= w {
            return Err( EosatCloudError::InvalidPixel( format!("({x},{y}) outside of {h}x{w} series")))
        }

        let idxs = self.valid_date_indices( x, y)?;
        let values = idxs.iter().map( |&i| series[[i,x,y]]).collect();
        let dates = idxs.iter().map( |&i| self.dates[i]).collect();
        Ok( (values, dates) )
    }
}

/// the cloud saturation estimator for a single configuration. Downloaded imagery and computed cloud masks
/// are memoized on the first query that needs them and are never invalidated automatically
pub struct CloudSaturation<P: ImageryProvider, C: CloudClassifier> {
    config: CloudSaturationConfig,
    provider: P,
    detector: CloudDetector<C>,
    memo: Option<CloudSaturationData>,
}

impl <P: ImageryProvider, C: CloudClassifier> CloudSaturation<P,C> {

    pub fn new (config: CloudSaturationConfig, provider: P, classifier: C)->Result<Self> {
        config.check()?;
        let detector = CloudDetector::with_config( classifier, &config.detector);
        Ok( CloudSaturation { config, provider, detector, memo: None } )
    }

    pub fn config (&self)->&CloudSaturationConfig { &self.config }

    pub fn provider (&self)->&P { &self.provider }

    /// the (true color, bands) requests for our config
    pub fn create_requests (&self)->(WcsRequest,WcsRequest) {
        create_requests( &self.config)
    }

    /// execute our requests, retrieving (true color, bands, dates)
    pub fn load_data (&self)->Result<(RasterSeries<u8>, RasterSeries<f32>, Vec<DateTime<Utc>>)> {
        let (true_color_request, bands_request) = self.create_requests();
        load_data( &self.provider, &true_color_request, &bands_request, self.config.redownload)
    }

    /// (re)compute the cloud saturation data and memoize it
    pub fn get_cloud_saturation_mask (&mut self)->Result<&CloudSaturationData> {
        let (true_color, bands, dates) = self.load_data()?;

        let coarse_masks = self.detector.get_cloud_masks( &bands.data)?;
        info!("computed {} cloud masks", coarse_masks.len_of( Axis(0)));

        let data = CloudSaturationData::compute( true_color, bands, dates, &coarse_masks, self.config.cloud_scale)?;
        Ok( self.memo.insert( data) )
    }

    /// the memoized cloud saturation data, computing it if we don't have it yet
    pub fn data (&mut self)->Result<&CloudSaturationData> {
        if self.memo.is_none() {
            self.get_cloud_saturation_mask()?;
        }
        self.memo.as_ref().ok_or_else( || op_failed!("no cloud saturation data"))
    }

    pub fn is_computed (&self)->bool { self.memo.is_some() }

    /// drop memoized data so that the next query recomputes it
    pub fn invalidate (&mut self) { self.memo = None }

    /// the (t,h,w) values of a single band index layer (e.g. "NDVI") for the dates of our saturation data
    pub fn get_full_index_timeseries (&mut self, layer: &str)->Result<Array3<f32>> {
        let dates = self.data()?.dates.clone();
        let request = create_index_request( &self.config, layer);
        let series = load_f32_series( &self.provider, &request, &dates, self.config.redownload)?;
        info!("retrieved {} {} rasters", series.len(), layer);

        Ok( series.data.index_axis( Axis(3), 0).to_owned() )
    }

    /// filter the index series of a pixel down to dates that have image data and no clouds
    pub fn filter_index_timeseries (&mut self, index: &Array3<f32>, x: usize, y: usize)->Result<(Vec<f32>,Vec<DateTime<Utc>>)> {
        self.data()?.filter_timeseries( index, x, y)
    }

    /// the date indices at which the pixel is cloudy
    pub fn get_cloud_filter (&mut self, x: usize, y: usize)->Result<Vec<usize>> {
        self.data()?.cloudy_date_indices( x, y)
    }
}
