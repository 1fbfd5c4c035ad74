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

use std::io::Cursor;
use chrono::{DateTime,Utc};
use ndarray::{Array3, Array4, ArrayView3, Axis, stack};
use tiff::decoder::{Decoder, DecodingResult};

use crate::{errors::{EosatCloudError, Result, invalid_dimensions}, request::ImageFormat};

/// a single decoded (height, width, channels) raster as returned by the imagery service
#[derive(Debug,Clone)]
pub enum Raster {
    U8(Array3<u8>),
    F32(Array3<f32>),
}

impl Raster {
    pub fn decode (format: ImageFormat, bytes: &[u8])->Result<Raster> {
        match format {
            ImageFormat::Png => decode_png( bytes).map( Raster::U8),
            ImageFormat::Tiff32f => decode_tiff_f32( bytes).map( Raster::F32),
        }
    }

    pub fn dim (&self)->(usize,usize,usize) {
        match self {
            Raster::U8(a) => a.dim(),
            Raster::F32(a) => a.dim(),
        }
    }

    pub fn into_u8 (self)->Result<Array3<u8>> {
        match self {
            Raster::U8(a) => Ok(a),
            Raster::F32(_) => Err( EosatCloudError::InvalidFormat("expected 8 bit raster, got f32".into()))
        }
    }

    pub fn into_f32 (self)->Result<Array3<f32>> {
        match self {
            Raster::F32(a) => Ok(a),
            Raster::U8(_) => Err( EosatCloudError::InvalidFormat("expected f32 raster, got 8 bit".into()))
        }
    }
}

/// decode a PNG into a (height, width, 3) RGB array. Alpha channels are dropped
pub fn decode_png (bytes: &[u8])->Result<Array3<u8>> {
    let img = image::load_from_memory_with_format( bytes, image::ImageFormat::Png)?.to_rgb8();
    let (w,h) = img.dimensions();
    Ok( Array3::from_shape_vec( (h as usize, w as usize, 3), img.into_raw())? )
}

/// decode a 32 bit float TIFF into a (height, width, samples) array
pub fn decode_tiff_f32 (bytes: &[u8])->Result<Array3<f32>> {
    let mut decoder = Decoder::new( Cursor::new(bytes))?;
    let (w,h) = decoder.dimensions()?;
    let (w,h) = (w as usize, h as usize);

    match decoder.read_image()? {
        DecodingResult::F32(data) => {
            let n_pixels = w * h;
            if n_pixels == 0 || data.is_empty() || data.len() % n_pixels != 0 {
                return Err( invalid_dimensions!("{} samples do not match {}x{} image", data.len(), w, h))
            }
            let n_samples = data.len() / n_pixels;
            Ok( Array3::from_shape_vec( (h, w, n_samples), data)? )
        }
        _ => Err( EosatCloudError::InvalidFormat("not a 32 bit float TIFF".into()))
    }
}

/// an ordered time series of rasters with the same (height, width, channels), stored as a (t, h, w, c) array
#[derive(Debug,Clone)]
pub struct RasterSeries<T> {
    pub dates: Vec<DateTime<Utc>>,
    pub data: Array4<T>,
}

impl <T: Clone> RasterSeries<T> {

    /// stack per-date rasters into a series. All rasters have to have the same dimensions
    pub fn stack (dates: Vec<DateTime<Utc>>, rasters: Vec<Array3<T>>)->Result<Self> {
        if rasters.is_empty() {
            return Err( EosatCloudError::NoData("no rasters for time series".into()))
        }
        if rasters.len() != dates.len() {
            return Err( invalid_dimensions!("{} rasters for {} dates", rasters.len(), dates.len()))
        }

        let dim = rasters[0].dim();
        if let Some((i,r)) = rasters.iter().enumerate().find( |(_,r)| r.dim() != dim) {
            return Err( invalid_dimensions!("raster {} has dimensions {:?}, expected {:?}", i, r.dim(), dim))
        }

        let views: Vec<ArrayView3<T>> = rasters.iter().map( |r| r.view()).collect();
        let data = stack( Axis(0), &views)?;

        Ok( RasterSeries{ dates, data } )
    }

    pub fn len (&self)->usize { self.dates.len() }

    pub fn is_empty (&self)->bool { self.dates.is_empty() }

    /// (height, width, channels) of each raster
    pub fn raster_dim (&self)->(usize,usize,usize) {
        let (_,h,w,c) = self.data.dim();
        (h,w,c)
    }
}
