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

use thiserror::Error;
use eosat_build::EosatBuildError;
use eosat_common::net::EosatNetError;

pub type Result<T> = std::result::Result<T, EosatCloudError>;

#[derive(Error,Debug)]
pub enum EosatCloudError {

    #[error("build error {0}")]
    BuildError( #[from] EosatBuildError),

    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("network error {0}")]
    NetError( #[from] EosatNetError),

    #[error("http error {0}")]
    HttpError( #[from] reqwest::Error),

    #[error("image error {0}")]
    ImageError( #[from] image::ImageError),

    #[error("tiff error {0}")]
    TiffError( #[from] tiff::TiffError),

    #[error("array shape error {0}")]
    ShapeError( #[from] ndarray::ShapeError),

    #[error("npy write error {0}")]
    NpyError( #[from] ndarray_npy::WriteNpyError),

    #[error("onnx runtime error {0}")]
    OrtError( #[from] ort::Error),

    #[error("invalid config {0}")]
    InvalidConfig(String),

    #[error("invalid dimensions {0}")]
    InvalidDimensions(String),

    #[error("invalid pixel {0}")]
    InvalidPixel(String),

    #[error("invalid raster format {0}")]
    InvalidFormat(String),

    #[error("no data {0}")]
    NoData(String),

    #[error("operation failed {0}")]
    OpFailedError(String),
}

macro_rules! op_failed {
    ($fmt:literal $(, $arg:expr )* ) => {
        $crate::errors::EosatCloudError::OpFailedError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use op_failed;

macro_rules! invalid_dimensions {
    ($fmt:literal $(, $arg:expr )* ) => {
        $crate::errors::EosatCloudError::InvalidDimensions( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use invalid_dimensions;
