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

use std::time::Duration;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime,Utc};
use serde::{Deserialize,Serialize};
use sha2::{Digest, Sha256};
use eosat_common::{BoundingBox, datetime::{to_iso_string,to_compact_string}, net::Query};

use crate::config::CloudSaturationConfig;

pub const TRUE_COLOR_LAYER: &str = "TRUE_COLOR";

/// the Sentinel-2 bands the pixel cloud classifier expects, in this order
pub const CLOUD_BANDS_SCRIPT: &str = "return [B01,B02,B04,B05,B08,B8A,B09,B10,B11,B12]";
pub const N_CLOUD_BANDS: usize = 10;

/// we enlarge the bands bounding box (east and north) so that we don't lose a row/column when the service rounds
/// the coarser cloud resolution. This is not precise, see `mask::crop_bottom_left`
pub const CLOUD_BBOX_MARGIN: f64 = 0.001;

#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,Serialize,Deserialize)]
pub enum ImageFormat {
    /// 8 bit RGB(A) PNG
    Png,
    /// 32 bit float TIFF with arbitrary number of samples per pixel
    Tiff32f,
}

impl ImageFormat {
    pub fn mime_type (&self)->&'static str {
        match *self {
            ImageFormat::Png => "image/png",
            ImageFormat::Tiff32f => "image/tiff;depth=32f",
        }
    }

    pub fn file_extension (&self)->&'static str {
        match *self {
            ImageFormat::Png => "png",
            ImageFormat::Tiff32f => "tiff",
        }
    }
}

/// a WCS GetCoverage request for a time series of rasters. Concrete requests are created per acquisition date
/// from `query_params(..)`
#[derive(Debug,Clone,PartialEq)]
pub struct WcsRequest {
    pub layer: String,
    pub bbox: BoundingBox<f64>,
    pub time_range: (DateTime<Utc>,DateTime<Utc>),
    /// resolution in meters
    pub res: (f64,f64),
    pub format: ImageFormat,
    pub evalscript: Option<String>,
    pub show_logo: bool,
}

impl WcsRequest {
    pub fn new (layer: &str, bbox: BoundingBox<f64>, time_range: (DateTime<Utc>,DateTime<Utc>), res: (f64,f64), format: ImageFormat)->Self {
        WcsRequest { layer: layer.to_string(), bbox, time_range, res, format, evalscript: None, show_logo: false }
    }

    pub fn with_evalscript (mut self, script: &str)->Self {
        self.evalscript = Some(script.to_string());
        self
    }

    /// OGC EPSG:4326 uses lat/lon axis order
    pub fn bbox_param (&self)->String {
        let b = &self.bbox;
        format!("{},{},{},{}", b.south, b.west, b.north, b.east)
    }

    pub fn res_params (&self)->(String,String) {
        (format!("{}m", self.res.0), format!("{}m", self.res.1))
    }

    /// the WCS GetCoverage query parameters for a single acquisition date
    pub fn query_params (&self, date: &DateTime<Utc>, max_cc: f64)->Query {
        let date = to_iso_string(date);
        let (resx,resy) = self.res_params();

        let mut query: Query = vec![
            ("SERVICE", "wcs".to_string()),
            ("REQUEST", "GetCoverage".to_string()),
            ("VERSION", "1.1.2".to_string()),
            ("COVERAGE", self.layer.clone()),
            ("BBOX", self.bbox_param()),
            ("CRS", "EPSG:4326".to_string()),
            ("FORMAT", self.format.mime_type().to_string()),
            ("TIME", format!("{date}/{date}")),
            ("RESX", resx),
            ("RESY", resy),
            ("MAXCC", format!("{:.1}", max_cc * 100.0)),
            ("SHOWLOGO", self.show_logo.to_string()),
        ];
        if let Some(script) = &self.evalscript {
            query.push( ("EVALSCRIPT", BASE64.encode( script.as_bytes())));
        }

        query
    }

    /// the WFS GetFeature query parameters to obtain Sentinel-2 tiles (acquisitions) covering our bbox and time range
    pub fn wfs_query_params (&self, max_features: usize, offset: usize)->Query {
        let (start,end) = &self.time_range;
        vec![
            ("SERVICE", "wfs".to_string()),
            ("REQUEST", "GetFeature".to_string()),
            ("VERSION", "2.0.0".to_string()),
            ("TYPENAMES", "S2.TILE".to_string()),
            ("BBOX", self.bbox_param()),
            ("SRSNAME", "EPSG:4326".to_string()),
            ("TIME", format!("{}/{}", to_iso_string(start), to_iso_string(end))),
            ("OUTPUTFORMAT", "application/json".to_string()),
            ("MAXFEATURES", max_features.to_string()),
            ("FEATURE_OFFSET", offset.to_string()),
        ]
    }

    /// the request parameters that determine the content of cached rasters, in a fixed textual form.
    /// Coordinates and resolutions are rounded to 6 decimals
    pub fn cache_key (&self)->String {
        let b = &self.bbox;
        format!("{}|{:.6},{:.6},{:.6},{:.6}|{:.6},{:.6}|{}|{}|{}",
            self.layer, b.west, b.south, b.east, b.north, self.res.0, self.res.1,
            self.format.mime_type(), self.evalscript.as_deref().unwrap_or(""), self.show_logo)
    }

    /// a human readable name for the cache folder of this request. Requests with the same parameters
    /// share their cached rasters, and the name does not change between builds or platforms
    pub fn cache_name (&self)->String {
        let digest = Sha256::digest( self.cache_key().as_bytes());
        let hash: String = digest[..8].iter().map( |b| format!("{b:02x}")).collect();

        format!("{}_{}_{}", self.layer.to_lowercase(), self.format.file_extension(), hash)
    }

    /// the filename of the cached raster for a given date
    pub fn cache_filename (&self, date: &DateTime<Utc>)->String {
        format!("{}.{}", to_compact_string(date), self.format.file_extension())
    }
}

/// create the (true color, cloud bands) request pair for a cloud saturation config
pub fn create_requests (config: &CloudSaturationConfig)->(WcsRequest,WcsRequest) {
    let time_range = config.time_range();

    let true_color_request = WcsRequest::new( TRUE_COLOR_LAYER, config.bbox, time_range, config.res, ImageFormat::Png);

    // larger widths are much slower to retrieve and classify, hence the coarser cloud resolution
    let cloud_bbox = config.bbox.extended_north_east( CLOUD_BBOX_MARGIN, CLOUD_BBOX_MARGIN);
    let bands_request = WcsRequest::new( TRUE_COLOR_LAYER, cloud_bbox, time_range, config.cloud_res(), ImageFormat::Tiff32f)
        .with_evalscript( CLOUD_BANDS_SCRIPT);

    (true_color_request, bands_request)
}

/// create a request for a (single band) index layer such as NDVI at true color bbox and resolution
pub fn create_index_request (config: &CloudSaturationConfig, layer: &str)->WcsRequest {
    WcsRequest::new( layer, config.bbox, config.time_range(), config.res, ImageFormat::Tiff32f)
}

/// sort and filter acquisition dates. Equal timestamps are always merged, and if a time_difference is given
/// we also drop acquisitions that are not more than time_difference after the last date we kept
pub fn filter_dates (mut dates: Vec<DateTime<Utc>>, time_difference: Option<Duration>)->Vec<DateTime<Utc>> {
    dates.sort();
    dates.dedup();

    if let Some(dt) = time_difference.and_then( |d| chrono::TimeDelta::from_std(d).ok()) {
        let mut filtered: Vec<DateTime<Utc>> = Vec::with_capacity( dates.len());
        for date in dates {
            match filtered.last() {
                Some(last) if date - *last <= dt => {}
                _ => filtered.push(date)
            }
        }
        filtered
    } else {
        dates
    }
}
