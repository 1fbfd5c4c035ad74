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

use std::{env, path::PathBuf, time::Duration};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize,Serialize};
use eosat_common::{BoundingBox, datetime::{self, secs, start_of_day, end_of_day}};
use eosat_build::{deserialize_expand_path, pkg_cache_dir};

use crate::errors::{EosatCloudError, Result};

/// the cloud saturation configuration: which area and time range we analyze, at which resolution,
/// where downloaded imagery is cached and how we talk to the imagery service and cloud detector.
/// This is not supposed to change once a `CloudSaturation` got created from it
#[derive(Clone,Serialize,Deserialize,Debug)]
pub struct CloudSaturationConfig {
    /// WGS84 degrees
    pub bbox: BoundingBox<f64>,

    /// first acquisition date to consider (e.g. "2014-12-01")
    #[serde(default="default_start_date")]
    pub start_date: NaiveDate,

    /// last acquisition date to consider. If not set we use the current date
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    /// true color resolution in meters (x,y)
    #[serde(default="default_res")]
    pub res: (f64,f64),

    /// the cloud detection bands are retrieved at `cloud_scale` times the true color resolution
    #[serde(default="default_cloud_scale")]
    pub cloud_scale: usize,

    /// where downloaded imagery is stored
    #[serde(default="default_data_folder", deserialize_with="deserialize_expand_path")]
    pub data_folder: PathBuf,

    /// download imagery even if we already have it in the data_folder
    #[serde(default)]
    pub redownload: bool,

    #[serde(default)]
    pub service: SentinelHubConfig,

    #[serde(default)]
    pub detector: CloudDetectorConfig,
}

fn default_start_date()->NaiveDate { NaiveDate::from_ymd_opt( 2014, 12, 1).unwrap_or( NaiveDate::MIN) }
fn default_res()->(f64,f64) { (10.0, 10.0) }
fn default_cloud_scale()->usize { 6 }
fn default_data_folder()->PathBuf { pkg_cache_dir!().join("data") }

impl CloudSaturationConfig {
    pub fn new (bbox: BoundingBox<f64>, start_date: NaiveDate, end_date: Option<NaiveDate>)->Self {
        CloudSaturationConfig {
            bbox, start_date, end_date,
            res: default_res(),
            cloud_scale: default_cloud_scale(),
            data_folder: default_data_folder(),
            redownload: false,
            service: SentinelHubConfig::default(),
            detector: CloudDetectorConfig::default(),
        }
    }

    pub fn end_date (&self)->NaiveDate {
        self.end_date.unwrap_or_else( datetime::today)
    }

    /// the inclusive UTC time range covering all of start_date and end_date
    pub fn time_range (&self)->(DateTime<Utc>,DateTime<Utc>) {
        (start_of_day( &self.start_date), end_of_day( &self.end_date()))
    }

    /// the resolution at which we retrieve cloud detection bands
    pub fn cloud_res (&self)->(f64,f64) {
        let scale = self.cloud_scale as f64;
        (self.res.0 * scale, self.res.1 * scale)
    }

    pub fn check (&self)->Result<()> {
        let bbox = &self.bbox;
        if !(bbox.west < bbox.east && bbox.south < bbox.north) {
            return Err( EosatCloudError::InvalidConfig( format!("empty bounding box {bbox:?}")))
        }
        if self.start_date > self.end_date() {
            return Err( EosatCloudError::InvalidConfig( format!("start date {} after end date {}", self.start_date, self.end_date())))
        }
        if self.cloud_scale < 1 {
            return Err( EosatCloudError::InvalidConfig( "cloud_scale has to be >= 1".into()))
        }
        if !(self.res.0 > 0.0 && self.res.1 > 0.0) {
            return Err( EosatCloudError::InvalidConfig( format!("invalid resolution {:?}", self.res)))
        }
        Ok(())
    }
}

/// Sentinel Hub OGC service parameters
#[derive(Clone,Serialize,Deserialize,Debug)]
#[serde(default)]
pub struct SentinelHubConfig {
    /// the configuration instance id. Values starting with '$' are looked up as environment variables
    pub instance_id: String,

    /// base URL of the WCS service (instance id is appended)
    pub wcs_url: String,

    /// base URL of the WFS service we use to obtain acquisition dates (instance id is appended)
    pub wfs_url: String,

    /// maximum cloud coverage of tiles to retrieve [0..1]
    pub max_cc: f64,

    /// acquisitions that are closer than this are treated as the same date. If not set we keep all distinct timestamps
    pub time_difference: Option<Duration>,

    /// WFS page size
    pub max_features: usize,

    /// HTTP request timeout
    pub timeout: Duration,
}

impl Default for SentinelHubConfig {
    fn default() -> Self {
        SentinelHubConfig {
            instance_id: "$SH_INSTANCE_ID".to_string(),
            wcs_url: "https://services.sentinel-hub.com/ogc/wcs".to_string(),
            wfs_url: "https://services.sentinel-hub.com/ogc/wfs".to_string(),
            max_cc: 1.0,
            time_difference: None,
            max_features: 100,
            timeout: secs(120),
        }
    }
}

impl SentinelHubConfig {
    pub fn instance_id (&self)->Result<String> {
        if let Some(var) = self.instance_id.strip_prefix('$') {
            env::var(var).map_err( |_| EosatCloudError::InvalidConfig( format!("no Sentinel Hub instance id in env var {var}")))
        } else {
            Ok( self.instance_id.clone() )
        }
    }
}

/// per-pixel cloud detector parameters (the classifier model and the post-processing of its probabilities)
#[derive(Clone,Serialize,Deserialize,Debug)]
#[serde(default)]
pub struct CloudDetectorConfig {
    /// cloud probability threshold
    pub threshold: f32,

    /// radius of the disk over which probabilities are averaged (0: no averaging)
    pub average_over: usize,

    /// radius of the disk used to dilate cloud masks (0: no dilation)
    pub dilation_size: usize,

    /// the ONNX model file of the pixel classifier
    #[serde(deserialize_with="deserialize_expand_path")]
    pub model_path: PathBuf,

    /// model input name, which is fed with (n_pixels, n_bands) f32 rows
    pub input_name: String,

    /// model output name for the cloud probabilities
    pub output_name: String,
}

impl Default for CloudDetectorConfig {
    fn default() -> Self {
        CloudDetectorConfig {
            threshold: 0.4,
            average_over: 4,
            dilation_size: 2,
            model_path: PathBuf::from("models/pixel_s2_cloud_detector.onnx"),
            input_name: "float_input".to_string(),
            output_name: "probabilities".to_string(),
        }
    }
}
