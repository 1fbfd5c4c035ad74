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
use serde::{Serialize,Deserialize};
use num::{Num,ToPrimitive};
use tracing_subscriber::EnvFilter;

pub mod macros;
pub mod fs;
pub mod datetime;
pub mod net;

/// a generic bounding box without semantics for the coordinate type
#[derive(Debug,Copy,Clone,Serialize,Deserialize,PartialEq)]
pub struct BoundingBox <T: Num> {
    pub west: T,
    pub south: T,
    pub east: T,
    pub north: T
}

impl <T: Num + Copy + ToPrimitive> BoundingBox<T> {
    pub fn new(west: T, south: T, east: T, north: T)->Self {
        BoundingBox{ west, south, east, north}
    }

    pub fn from_wsen<N> (wsen: &[N;4]) -> BoundingBox<T> where N: Num + Copy + Into<T> {
        BoundingBox::<T>{
            west: wsen[0].into(),
            south: wsen[1].into(),
            east: wsen[2].into(),
            north: wsen[3].into()
        }
    }

    /// a new bounding box with `de` added to east and `dn` added to north
    pub fn extended_north_east (&self, de: T, dn: T)->Self {
        BoundingBox{ west: self.west, south: self.south, east: self.east + de, north: self.north + dn }
    }

    pub fn width (&self)->T { self.east - self.west }

    pub fn height (&self)->T { self.north - self.south }
}

/// install a global fmt tracing subscriber that is filtered by RUST_LOG (defaults to `info`).
/// Note this only succeeds if there is no global subscriber set yet, which is not an error
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else( |_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter( filter)
        .with_target(false)
        .try_init();
}
