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

//! read access to EOPatch directories, which store each feature as `<patch>/<feature type>/<name>.npy[.gz]`

use std::{collections::HashMap, fmt, io::Cursor, path::{Path,PathBuf}, str::FromStr};
use ndarray::{ArrayD, IxDyn};
use ndarray_npy::{ReadNpyError, ReadNpyExt};
use serde::{Deserialize,Serialize};
use tracing::debug;
use eosat_common::fs::{filepath_contents, gz_filepath_contents};

use crate::errors::{EosatSamplingError, Result};

#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,Serialize,Deserialize)]
pub enum FeatureType {
    Data,
    Mask,
    Scalar,
    Label,
    DataTimeless,
    MaskTimeless,
    ScalarTimeless,
    LabelTimeless,
}

impl FeatureType {
    pub const ALL: [FeatureType;8] = [
        FeatureType::Data, FeatureType::Mask, FeatureType::Scalar, FeatureType::Label,
        FeatureType::DataTimeless, FeatureType::MaskTimeless, FeatureType::ScalarTimeless, FeatureType::LabelTimeless
    ];

    /// the sub directory of an EOPatch that holds features of this type
    pub fn dir_name (&self)->&'static str {
        match *self {
            FeatureType::Data => "data",
            FeatureType::Mask => "mask",
            FeatureType::Scalar => "scalar",
            FeatureType::Label => "label",
            FeatureType::DataTimeless => "data_timeless",
            FeatureType::MaskTimeless => "mask_timeless",
            FeatureType::ScalarTimeless => "scalar_timeless",
            FeatureType::LabelTimeless => "label_timeless",
        }
    }

    /// features with a value per pixel
    pub fn is_spatial (&self)->bool {
        matches!( self, FeatureType::Data | FeatureType::Mask | FeatureType::DataTimeless | FeatureType::MaskTimeless)
    }
}

impl FromStr for FeatureType {
    type Err = EosatSamplingError;

    fn from_str (s: &str)->Result<Self> {
        FeatureType::ALL.iter()
            .find( |ft| ft.dir_name() == s)
            .copied()
            .ok_or_else( || EosatSamplingError::InvalidConfig( format!("unknown feature type {s}")))
    }
}

/// a (feature type, name) pair that identifies a feature within an EOPatch
#[derive(Debug,Clone,PartialEq,Eq,Hash,Serialize,Deserialize)]
pub struct FeatureRef {
    pub feature_type: FeatureType,
    pub name: String,
}

impl FeatureRef {
    pub fn new (feature_type: FeatureType, name: &str)->Self {
        FeatureRef { feature_type, name: name.to_string() }
    }

    /// the relative path of the (uncompressed) feature file
    pub fn rel_path (&self)->PathBuf {
        Path::new( self.feature_type.dir_name()).join( format!("{}.npy", self.name))
    }
}

impl fmt::Display for FeatureRef {
    fn fmt (&self, f: &mut fmt::Formatter<'_>)->fmt::Result {
        write!( f, "{}/{}", self.feature_type.dir_name(), self.name)
    }
}

/// parses "<feature type>/<name>", e.g. "mask_timeless/LPIS_2017"
impl FromStr for FeatureRef {
    type Err = EosatSamplingError;

    fn from_str (s: &str)->Result<Self> {
        let (ft, name) = s.split_once('/')
            .ok_or_else( || EosatSamplingError::InvalidConfig( format!("feature has to be <type>/<name>: {s}")))?;
        Ok( FeatureRef { feature_type: ft.parse()?, name: name.to_string() } )
    }
}

/// the features we loaded from a single EOPatch directory. Values are converted to f64 regardless of
/// their stored dtype
#[derive(Debug)]
pub struct EOPatch {
    pub path: PathBuf,
    features: HashMap<FeatureRef,ArrayD<f64>>,
}

impl EOPatch {
    /// load the given features from an EOPatch directory
    pub fn load (path: impl AsRef<Path>, feature_refs: &[&FeatureRef])->Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut features = HashMap::new();

        for fr in feature_refs {
            if !features.contains_key( *fr) {
                let array = load_feature( &path, fr)?;
                debug!("loaded {} {:?} from {:?}", fr, array.shape(), path);
                features.insert( (*fr).clone(), array);
            }
        }

        Ok( EOPatch { path, features } )
    }

    pub fn get (&self, fr: &FeatureRef)->Result<&ArrayD<f64>> {
        self.features.get( fr).ok_or_else( || EosatSamplingError::MissingFeature( format!("{} in {:?}", fr, self.path)))
    }

    /// the (height,width) of a spatial feature
    pub fn spatial_dim (&self, fr: &FeatureRef)->Result<(usize,usize)> {
        let a = self.get( fr)?;
        if !fr.feature_type.is_spatial() {
            return Err( EosatSamplingError::UnsupportedShape( format!("{} has no spatial dimensions", fr)))
        }
        match a.shape() {
            [h,w] | [h,w,_] | [_,h,w,_] => Ok( (*h,*w) ),
            shape => Err( EosatSamplingError::UnsupportedShape( format!("{} has shape {:?}", fr, shape)))
        }
    }

    /// the value of a feature at pixel (h,w). We use the first channel and the first frame of spatial features,
    /// and the first value of non-spatial (scalar or label) features for all pixels
    pub fn value_at (&self, fr: &FeatureRef, h: usize, w: usize)->Result<f64> {
        let a = self.get( fr)?;
        let idx: Vec<usize> = if fr.feature_type.is_spatial() {
            match a.ndim() {
                2 => vec![h,w],
                3 => vec![h,w,0],
                4 => vec![0,h,w,0],
                _ => return Err( EosatSamplingError::UnsupportedShape( format!("{} has shape {:?}", fr, a.shape())))
            }
        } else {
            vec![0; a.ndim()]
        };

        a.get( IxDyn(&idx)).copied()
            .ok_or_else( || EosatSamplingError::UnsupportedShape( format!("({h},{w}) outside of {} {:?}", fr, a.shape())))
    }
}

/// the stored dtypes we support
macro_rules! read_as_f64 {
    ($bytes:expr, $( $t:ty ),* ) => {
        {
            $(
                match ArrayD::<$t>::read_npy( Cursor::new( $bytes)) {
                    Ok(a) => return Ok( a.mapv( |v| v as f64)),
                    Err(ReadNpyError::WrongDescriptor(_)) => {} // try next type
                    Err(e) => return Err( e.into())
                }
            )*
        }
    }
}

fn load_feature (patch_dir: &Path, fr: &FeatureRef)->Result<ArrayD<f64>> {
    let path = patch_dir.join( fr.rel_path());
    let bytes = if path.is_file() {
        filepath_contents( &path)?
    } else {
        let mut gz_path = path.clone().into_os_string();
        gz_path.push(".gz");
        let gz_path = PathBuf::from( gz_path);
        if !gz_path.is_file() {
            return Err( EosatSamplingError::MissingFeature( format!("{:?}", path)))
        }
        gz_filepath_contents( &gz_path)?
    };

    npy_to_f64( &bytes, &path)
}

fn npy_to_f64 (bytes: &[u8], path: &Path)->Result<ArrayD<f64>> {
    read_as_f64!( bytes, f64, f32, i64, i32, i16, i8, u64, u32, u16, u8);

    match ArrayD::<bool>::read_npy( Cursor::new( bytes)) {
        Ok(a) => Ok( a.mapv( |v| if v { 1.0 } else { 0.0 })),
        Err(ReadNpyError::WrongDescriptor(_)) => Err( EosatSamplingError::UnsupportedDtype( format!("{:?}", path))),
        Err(e) => Err( e.into())
    }
}
