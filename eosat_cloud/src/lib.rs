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

//! Sentinel-2 cloud saturation: how often is a pixel of a bounding box covered by clouds over a time range.
//! The `CloudSaturation` estimator retrieves true color and cloud detection band series through an
//! [`ImageryProvider`], runs a per pixel [`CloudClassifier`] over the bands and aggregates the resulting
//! cloud masks into a cloud frequency map, which can then be used to filter per pixel (index) time series

use eosat_build::define_load_config;

pub mod config;
pub use config::*;

pub mod request;
pub mod series;
pub mod service;
pub mod cloud;
pub mod mask;

mod saturation;
pub use saturation::*;

mod errors;
pub use errors::*;

define_load_config!{}
