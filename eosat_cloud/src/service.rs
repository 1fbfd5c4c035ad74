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

use std::{collections::BTreeSet, path::{Path,PathBuf}};
use chrono::{DateTime,NaiveDateTime,Utc};
use ndarray::Array3;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug,info};
use eosat_common::{fs::{ensure_dir, filepath_contents, is_non_empty_file, set_accessed}, net::{download_url, get_json}};

use crate::{
    config::SentinelHubConfig,
    errors::{EosatCloudError, Result, op_failed},
    request::{WcsRequest, filter_dates},
    series::{Raster, RasterSeries},
};

/// the abstract imagery retrieval service. Implementations are blocking, errors are passed on to the caller
pub trait ImageryProvider {
    /// the acquisition dates for the bbox and time range of a request, in ascending order
    fn get_dates (&self, request: &WcsRequest)->Result<Vec<DateTime<Utc>>>;

    /// the raster of a request for a single acquisition date. Implementations that cache rasters should
    /// bypass their cache if `redownload` is set
    fn get_raster (&self, request: &WcsRequest, date: &DateTime<Utc>, redownload: bool)->Result<Raster>;
}

/// retrieve the 8 bit rasters of a request for the given dates
pub fn load_u8_series (provider: &impl ImageryProvider, request: &WcsRequest, dates: &[DateTime<Utc>], redownload: bool)->Result<RasterSeries<u8>> {
    let rasters = dates.iter()
        .map( |date| provider.get_raster( request, date, redownload).and_then( Raster::into_u8))
        .collect::<Result<Vec<Array3<u8>>>>()?;
    RasterSeries::stack( dates.to_vec(), rasters)
}

/// retrieve the f32 rasters of a request for the given dates
pub fn load_f32_series (provider: &impl ImageryProvider, request: &WcsRequest, dates: &[DateTime<Utc>], redownload: bool)->Result<RasterSeries<f32>> {
    let rasters = dates.iter()
        .map( |date| provider.get_raster( request, date, redownload).and_then( Raster::into_f32))
        .collect::<Result<Vec<Array3<f32>>>>()?;
    RasterSeries::stack( dates.to_vec(), rasters)
}

/// execute the true color and bands requests for the acquisition dates of the true color request.
/// Both series use the same dates so that they stay aligned
pub fn load_data (provider: &impl ImageryProvider, true_color_request: &WcsRequest, bands_request: &WcsRequest, redownload: bool)
    -> Result<(RasterSeries<u8>, RasterSeries<f32>, Vec<DateTime<Utc>>)>
{
    let dates = provider.get_dates( true_color_request)?;
    if dates.is_empty() {
        return Err( EosatCloudError::NoData( format!("no acquisitions for {:?}", true_color_request.time_range)))
    }
    info!("found {} acquisition dates", dates.len());

    let true_color = load_u8_series( provider, true_color_request, &dates, redownload)?;
    info!("saved true color");

    let bands = load_f32_series( provider, bands_request, &dates, redownload)?;
    info!("saved bands");

    Ok( (true_color, bands, dates) )
}

/* #region Sentinel Hub OGC implementation ****************************************************************/

/// the (relevant) part of a WFS GetFeature GeoJSON response
#[derive(Deserialize,Debug)]
pub struct WfsFeatureCollection {
    pub features: Vec<WfsFeature>,
}

#[derive(Deserialize,Debug)]
pub struct WfsFeature {
    pub properties: WfsTileProperties,
}

#[derive(Deserialize,Debug)]
pub struct WfsTileProperties {
    /// e.g. "2017-12-01"
    pub date: String,
    /// e.g. "10:27:26" (might have fractional seconds)
    pub time: String,
}

impl WfsTileProperties {
    pub fn acquisition_time (&self)->Result<DateTime<Utc>> {
        let time = self.time.split('.').next().unwrap_or( self.time.as_str());
        let s = format!("{}T{}", self.date, time);
        NaiveDateTime::parse_from_str( &s, "%Y-%m-%dT%H:%M:%S")
            .map( |dt| dt.and_utc())
            .map_err( |e| op_failed!("invalid tile acquisition time {s}: {e}"))
    }
}

/// upper bound for WFS pages we request for a single time range
pub const MAX_WFS_PAGES: usize = 100;

/// collect the acquisition times of a paged WFS query. `fetch_page` gets the feature offset of the next page.
/// Paging stops at the first short page, at a page that does not add a new acquisition time (servers that
/// ignore the offset), or after `MAX_WFS_PAGES`. Returned dates are sorted and unique
pub fn collect_paged_dates<F> (page_size: usize, mut fetch_page: F)->Result<Vec<DateTime<Utc>>>
    where F: FnMut(usize)->Result<WfsFeatureCollection>
{
    let page_size = page_size.max(1);
    let mut dates: BTreeSet<DateTime<Utc>> = BTreeSet::new();
    let mut offset = 0;

    for _ in 0..MAX_WFS_PAGES {
        let page = fetch_page( offset)?;
        let n = page.features.len();
        let n_dates = dates.len();

        for feature in &page.features {
            dates.insert( feature.properties.acquisition_time()?);
        }
        debug!("WFS page at offset {offset} has {n} tiles, {} new dates", dates.len() - n_dates);

        if n < page_size || dates.len() == n_dates { break }
        offset += n;
    }

    Ok( dates.into_iter().collect() )
}

/// ImageryProvider for the Sentinel Hub OGC (WFS/WCS) services that caches rasters in
/// `<data_folder>/<request cache name>/<date>.<ext>`
pub struct SentinelHubProvider {
    client: Client,
    config: SentinelHubConfig,
    instance_id: String,
    data_folder: PathBuf,
}

impl SentinelHubProvider {
    pub fn new (config: &SentinelHubConfig, data_folder: impl AsRef<Path>)->Result<Self> {
        let client = Client::builder().timeout( config.timeout).build()?;
        let instance_id = config.instance_id()?;
        let data_folder = data_folder.as_ref().to_path_buf();
        ensure_dir( &data_folder)?;

        Ok( SentinelHubProvider{ client, config: config.clone(), instance_id, data_folder } )
    }

    pub fn data_folder (&self)->&Path { &self.data_folder }

    pub fn cache_path (&self, request: &WcsRequest, date: &DateTime<Utc>)->PathBuf {
        self.data_folder.join( request.cache_name()).join( request.cache_filename( date))
    }

    fn wcs_url (&self)->String { format!("{}/{}", self.config.wcs_url, self.instance_id) }

    fn wfs_url (&self)->String { format!("{}/{}", self.config.wfs_url, self.instance_id) }
}

impl ImageryProvider for SentinelHubProvider {

    fn get_dates (&self, request: &WcsRequest)->Result<Vec<DateTime<Utc>>> {
        let url = self.wfs_url();
        let page_size = self.config.max_features.max(1);

        let dates = collect_paged_dates( page_size, |offset| {
            let query = request.wfs_query_params( page_size, offset);
            Ok( get_json( &self.client, &url, &query)? )
        })?;

        Ok( filter_dates( dates, self.config.time_difference) )
    }

    fn get_raster (&self, request: &WcsRequest, date: &DateTime<Utc>, redownload: bool)->Result<Raster> {
        let path = self.cache_path( request, date);

        let bytes = if !redownload && is_non_empty_file( &path) {
            debug!("using cached {:?}", path);
            set_accessed( &path)?;
            filepath_contents( &path)?

        } else {
            if let Some(dir) = path.parent() { ensure_dir( dir)? }
            let query = request.query_params( date, self.config.max_cc);
            debug!("downloading {} for {}", request.layer, date);
            download_url( &self.client, &self.wcs_url(), &query, &path)?
        };

        Raster::decode( request.format, &bytes)
    }
}

/* #endregion Sentinel Hub OGC implementation */
