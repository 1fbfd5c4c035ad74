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

use std::{fs, io::Cursor};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use image::{Rgb, RgbImage};
use eosat_common::BoundingBox;
use eosat_cloud::{
    CloudSaturationConfig, EosatCloudError, Result, SentinelHubConfig,
    request::{WcsRequest, create_requests},
    series::Raster,
    service::{ImageryProvider, MAX_WFS_PAGES, SentinelHubProvider, WfsFeatureCollection, collect_paged_dates, load_data},
};

// run with "cargo test --test test_service -- --nocapture"

fn test_config ()->CloudSaturationConfig {
    let bbox = BoundingBox::new( 14.45, 45.95, 14.55, 46.05);
    let date = |d| NaiveDate::from_ymd_opt( 2019, 1, d).unwrap();
    CloudSaturationConfig::new( bbox, date(1), Some(date(5)))
}

fn utc (d: u32)->DateTime<Utc> { Utc.with_ymd_and_hms( 2019, 1, d, 10, 0, 0).unwrap() }

#[test]
fn test_cached_raster() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config();
    let service = SentinelHubConfig { instance_id: "test-instance".into(), ..SentinelHubConfig::default() };
    let provider = SentinelHubProvider::new( &service, dir.path()).unwrap();

    let (tc, _) = create_requests( &config);
    let date = utc(3);
    let path = provider.cache_path( &tc, &date);
    println!("cache path: {path:?}");
    assert!( path.starts_with( dir.path()));
    assert!( path.to_string_lossy().ends_with("20190103T100000.png"));

    let img = RgbImage::from_pixel( 5, 4, Rgb([10, 20, 30]));
    fs::create_dir_all( path.parent().unwrap()).unwrap();
    img.save( &path).unwrap();

    // this has to come from the cache since there is no network access to the test instance
    let raster = provider.get_raster( &tc, &date, false).unwrap();
    assert_eq!( raster.dim(), (4,5,3));
    let a = raster.into_u8().unwrap();
    assert_eq!( a[[3,4,2]], 30);
}

#[test]
fn test_missing_instance_id() {
    let service = SentinelHubConfig { instance_id: "$EOSAT_UNDEFINED_INSTANCE_VAR".into(), ..SentinelHubConfig::default() };
    let dir = tempfile::tempdir().unwrap();
    assert!( matches!( SentinelHubProvider::new( &service, dir.path()), Err(EosatCloudError::InvalidConfig(_))));
}

#[test]
fn test_parse_features() {
    let json = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "geometry": null, "properties": { "id": "a", "date": "2019-01-03", "time": "10:07:26.024", "cloudCoverPercentage": 12.5 } },
            { "type": "Feature", "geometry": null, "properties": { "id": "b", "date": "2019-01-01", "time": "10:17:01" } }
        ]
    }"#;
    let fc: WfsFeatureCollection = serde_json::from_str( json).unwrap();
    assert_eq!( fc.features.len(), 2);

    let dates: Vec<DateTime<Utc>> = fc.features.iter().map( |f| f.properties.acquisition_time().unwrap()).collect();
    assert_eq!( dates[0], Utc.with_ymd_and_hms( 2019, 1, 3, 10, 7, 26).unwrap());
    assert_eq!( dates[1], Utc.with_ymd_and_hms( 2019, 1, 1, 10, 17, 1).unwrap());
}

fn feature_page (dates: &[DateTime<Utc>])->WfsFeatureCollection {
    let features: Vec<String> = dates.iter().map( |d| {
        format!(r#"{{ "type": "Feature", "properties": {{ "date": "{}", "time": "{}" }} }}"#, d.format("%Y-%m-%d"), d.format("%H:%M:%S"))
    }).collect();
    let json = format!(r#"{{ "type": "FeatureCollection", "features": [{}] }}"#, features.join(","));
    serde_json::from_str( &json).unwrap()
}

#[test]
fn test_paged_dates() {
    let pages = vec![ vec![utc(1),utc(2)], vec![utc(2),utc(3)], vec![utc(4)] ];
    let mut offsets = Vec::new();

    let dates = collect_paged_dates( 2, |offset| {
        offsets.push( offset);
        Ok( feature_page( &pages[offsets.len()-1]))
    }).unwrap();

    assert_eq!( offsets, vec![0, 2, 4]);
    assert_eq!( dates, vec![utc(1), utc(2), utc(3), utc(4)]);
}

#[test]
fn test_paging_ignored_offset() {
    // a server that ignores FEATURE_OFFSET keeps returning the same full page
    let mut n_requests = 0;
    let dates = collect_paged_dates( 2, |_offset| {
        n_requests += 1;
        Ok( feature_page( &[utc(1), utc(2)]))
    }).unwrap();

    println!("{n_requests} requests");
    assert_eq!( n_requests, 2);
    assert_eq!( dates, vec![utc(1), utc(2)]);
}

#[test]
fn test_paging_limit() {
    // full pages that always have a new acquisition time
    let mut n_requests = 0;
    let dates = collect_paged_dates( 1, |offset| {
        n_requests += 1;
        Ok( feature_page( &[ utc(1) + chrono::TimeDelta::minutes( offset as i64) ]))
    }).unwrap();

    assert_eq!( n_requests, MAX_WFS_PAGES);
    assert_eq!( dates.len(), MAX_WFS_PAGES);
}

#[test]
fn test_paging_error() {
    let res = collect_paged_dates( 2, |_offset| Err( EosatCloudError::NoData("no WFS response".into())));
    assert!( matches!( res, Err(EosatCloudError::NoData(_))));
}

struct EmptyProvider;

impl ImageryProvider for EmptyProvider {
    fn get_dates (&self, _request: &WcsRequest)->Result<Vec<DateTime<Utc>>> { Ok( Vec::new() ) }

    fn get_raster (&self, _request: &WcsRequest, date: &DateTime<Utc>, _redownload: bool)->Result<Raster> {
        Err( EosatCloudError::NoData( format!("{date}")))
    }
}

#[test]
fn test_no_acquisitions() {
    let (tc, bands) = create_requests( &test_config());
    assert!( matches!( load_data( &EmptyProvider, &tc, &bands, false), Err(EosatCloudError::NoData(_))));
}
