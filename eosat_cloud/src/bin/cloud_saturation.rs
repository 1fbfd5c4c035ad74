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

use std::path::{Path,PathBuf};
use anyhow::{Result,anyhow};
use ndarray_npy::write_npy;
use tracing::info;

use eosat_build::load_config_path;
use eosat_common::{check_cli, define_cli, init_tracing, fs::ensure_writable_dir, datetime::to_iso_string};
use eosat_cloud::{
    load_config, CloudSaturation, CloudSaturationConfig,
    cloud::OnnxCloudClassifier, mask::frequency_to_gray_image, service::SentinelHubProvider,
};

define_cli! { ARGS [about="cloud_saturation - compute Sentinel-2 cloud frequency for a bounding box and time range"] =
    redownload: bool [help="download imagery even if it is already cached", long],
    output_dir: String [help="directory where to store cloud_frequency.{npy,png}", long, short, default_value="."],
    pixel: Option<String> [help="optional 'x,y' pixel (row,column) for which to print the filtered index time series", long, short],
    index: String [help="index layer to filter for --pixel", long, default_value="NDVI"],
    config: Option<String> [help="path of RON config file (default: cloud_saturation.ron resource)"]
}

fn main()->Result<()> {
    check_cli!(ARGS);
    init_tracing();
    eosat_build::set_bin_context!();

    let mut config: CloudSaturationConfig = if let Some(path) = &ARGS.config {
        load_config_path( path)?
    } else {
        load_config( "cloud_saturation.ron")?
    };
    if ARGS.redownload { config.redownload = true }

    let out_dir = PathBuf::from( &ARGS.output_dir);
    ensure_writable_dir( &out_dir)?;

    let provider = SentinelHubProvider::new( &config.service, &config.data_folder)?;
    let classifier = OnnxCloudClassifier::from_config( &config.detector)?;
    let mut cloud_saturation = CloudSaturation::new( config, provider, classifier)?;

    {
        let data = cloud_saturation.get_cloud_saturation_mask()?;
        let (h,w) = data.dim();
        info!("cloud frequency for {} dates at {}x{} pixels", data.n_dates(), h, w);

        write_npy( out_dir.join("cloud_frequency.npy"), &data.frequency)?;
        frequency_to_gray_image( &data.frequency).save( out_dir.join("cloud_frequency.png"))?;
        info!("saved cloud frequency to {:?}", out_dir);
    }

    if let Some(pixel) = &ARGS.pixel {
        let (x,y) = parse_pixel( pixel)?;
        let index = cloud_saturation.get_full_index_timeseries( &ARGS.index)?;
        let (values,dates) = cloud_saturation.filter_index_timeseries( &index, x, y)?;

        println!("{} at pixel ({},{}), {} valid dates:", ARGS.index, x, y, values.len());
        for (date,value) in dates.iter().zip( values.iter()) {
            println!("  {}  {:.4}", to_iso_string( date), value);
        }
    }

    Ok(())
}

fn parse_pixel (s: &str)->Result<(usize,usize)> {
    let (x,y) = s.split_once(',').ok_or_else( || anyhow!("pixel has to be 'x,y': {s}"))?;
    Ok( (x.trim().parse()?, y.trim().parse()?) )
}
