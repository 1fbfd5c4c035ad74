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

use std::{io::Write, path::{Path,PathBuf}};
use rand::{Rng, seq::index};
use serde::{Deserialize,Serialize};
use tracing::{info,debug};
use eosat_build::deserialize_expand_path;

use crate::{
    errors::{EosatSamplingError, Result},
    patch::{EOPatch, FeatureRef},
};

/// class value we use for pixels without a (valid) class
pub const NO_CLASS: f64 = -1.0;

pub const PATCH_NO_COLUMN: &str = "patch_no";
pub const X_COLUMN: &str = "x";
pub const Y_COLUMN: &str = "y";

/// which patches to sample, how many samples we draw from each of them and what we record per sample
#[derive(Debug,Clone,Serialize,Deserialize)]
pub struct SamplingConfig {
    /// the directory that contains the `eopatch_<i>` patch directories
    #[serde(deserialize_with="deserialize_expand_path")]
    pub path: PathBuf,

    /// we sample `eopatch_0` .. `eopatch_<no_patches-1>`
    pub no_patches: usize,

    /// max number of samples per patch
    pub no_samples: usize,

    /// the feature that holds the class of a pixel (NaN if it has none)
    pub class_feature: FeatureRef,

    /// optional 0/1 feature that restricts sampling to pixels with value 1
    #[serde(default)]
    pub mask_feature: Option<FeatureRef>,

    /// features to record for each sample
    pub features: Vec<FeatureRef>,

    /// if not set we use the least common class count
    #[serde(default)]
    pub samples_per_class: Option<usize>,

    /// record patch number and pixel coordinates
    #[serde(default)]
    pub debug: bool,

    /// random seed for reproducible samples
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SamplingConfig {
    pub fn patch_dir (&self, patch_id: usize)->PathBuf {
        self.path.join( format!("eopatch_{patch_id}"))
    }

    /// the CSV columns: class, features, and provenance if this is a debug config
    pub fn columns (&self)->Vec<String> {
        let mut columns = vec![ self.class_feature.name.clone() ];
        columns.extend( self.features.iter().map( |f| f.name.clone()));
        if self.debug {
            columns.extend( [PATCH_NO_COLUMN, X_COLUMN, Y_COLUMN].iter().map( |c| c.to_string()));
        }
        columns
    }

    pub fn check (&self)->Result<()> {
        if self.samples_per_class == Some(0) {
            return Err( EosatSamplingError::InvalidConfig( "samples_per_class has to be > 0".into()))
        }
        Ok(())
    }
}

/// where a sample came from. Note that x is the column and y the row of the pixel
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub struct Provenance {
    pub patch_id: usize,
    pub x: usize,
    pub y: usize,
}

#[derive(Debug,Clone,PartialEq)]
pub struct SampleRecord {
    pub class: f64,
    /// aligned with the feature columns of the table
    pub values: Vec<f64>,
    pub provenance: Option<Provenance>,
}

impl SampleRecord {
    fn to_fields (&self)->Vec<String> {
        let mut fields = Vec::with_capacity( self.values.len() + 4);
        fields.push( self.class.to_string());
        fields.extend( self.values.iter().map( |v| v.to_string()));
        if let Some(p) = &self.provenance {
            fields.extend( [p.patch_id, p.x, p.y].iter().map( |v| v.to_string()));
        }
        fields
    }
}

#[derive(Debug,Clone,PartialEq)]
pub struct SampleTable {
    pub columns: Vec<String>,
    pub records: Vec<SampleRecord>,
}

impl SampleTable {
    pub fn new (columns: Vec<String>)->Self {
        SampleTable { columns, records: Vec::new() }
    }

    pub fn len (&self)->usize { self.records.len() }

    pub fn is_empty (&self)->bool { self.records.is_empty() }

    /// (class, count) pairs ordered by descending count. Classes with equal counts keep their order of appearance
    pub fn class_counts (&self)->Vec<(f64,usize)> {
        self.class_groups().into_iter().map( |(class,idxs)| (class, idxs.len())).collect()
    }

    /// (class, record indices) ordered by descending number of records
    fn class_groups (&self)->Vec<(f64,Vec<usize>)> {
        let mut groups: Vec<(f64,Vec<usize>)> = Vec::new();
        for (i,r) in self.records.iter().enumerate() {
            match groups.iter_mut().find( |(class,_)| *class == r.class) {
                Some((_,idxs)) => idxs.push(i),
                None => groups.push( (r.class, vec![i]))
            }
        }
        groups.sort_by( |a,b| b.1.len().cmp( &a.1.len())); // stable
        groups
    }

    pub fn write_to<W: Write> (&self, writer: W)->Result<()> {
        let mut wtr = csv::Writer::from_writer( writer);
        wtr.write_record( &self.columns)?;
        for r in &self.records {
            wtr.write_record( r.to_fields())?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv (&self, path: impl AsRef<Path>)->Result<()> {
        let file = std::fs::File::create( path.as_ref())?;
        self.write_to( file)
    }
}

/// the pixels of a (h,w) patch that can be sampled, as (row,column) pairs
fn usable_pixels (patch: &EOPatch, mask: Option<&FeatureRef>, h: usize, w: usize)->Result<Vec<(usize,usize)>> {
    let mut pixels = Vec::with_capacity( h*w);
    for row in 0..h {
        for col in 0..w {
            let usable = match mask {
                Some(fr) => patch.value_at( fr, row, col)? == 1.0,
                None => true
            };
            if usable { pixels.push( (row,col)) }
        }
    }
    Ok(pixels)
}

/// draw up to `no_samples` random pixels (without replacement) from each patch and record their class and features
pub fn collect_samples (config: &SamplingConfig, rng: &mut impl Rng)->Result<SampleTable> {
    let mut table = SampleTable::new( config.columns());

    let mut feature_refs: Vec<&FeatureRef> = vec![ &config.class_feature ];
    feature_refs.extend( config.mask_feature.iter());
    feature_refs.extend( config.features.iter());

    for patch_id in 0..config.no_patches {
        let patch = EOPatch::load( config.patch_dir( patch_id), &feature_refs)?;
        let (h,w) = patch.spatial_dim( &config.class_feature)?;

        if let Some(mask) = &config.mask_feature {
            let mask_dim = patch.spatial_dim( mask)?;
            if mask_dim != (h,w) {
                return Err( EosatSamplingError::UnsupportedShape( format!("mask {:?} does not match class {:?}", mask_dim, (h,w))))
            }
        }

        let pixels = usable_pixels( &patch, config.mask_feature.as_ref(), h, w)?;
        let n = config.no_samples.min( pixels.len());

        for i in index::sample( rng, pixels.len(), n).iter() {
            let (row,col) = pixels[i];

            let class = patch.value_at( &config.class_feature, row, col)?;
            let class = if class.is_nan() { NO_CLASS } else { class };

            let values = config.features.iter()
                .map( |fr| patch.value_at( fr, row, col))
                .collect::<Result<Vec<f64>>>()?;

            let provenance = config.debug.then_some( Provenance { patch_id, x: col, y: row });
            table.records.push( SampleRecord { class, values, provenance });
        }

        info!("drew {} of {} usable pixels from patch {}", n, pixels.len(), patch_id);
    }

    Ok(table)
}

/// resample each class to the same number of records, which is either the least common class count or
/// `samples_per_class`. Classes with fewer records than that are resampled with replacement
pub fn balance_classes (table: SampleTable, samples_per_class: Option<usize>, rng: &mut impl Rng)->Result<SampleTable> {
    if table.is_empty() {
        return Err( EosatSamplingError::EmptyTable( "nothing to balance".into()))
    }

    let groups = table.class_groups();
    let target = match samples_per_class {
        Some(n) => n,
        None => groups.iter().map( |(_,idxs)| idxs.len()).min().unwrap_or(0)
    };
    debug!("balancing {} classes to {} samples", groups.len(), target);

    let mut records = Vec::with_capacity( target * groups.len());
    for (_, idxs) in &groups {
        if target <= idxs.len() {
            records.extend( index::sample( rng, idxs.len(), target).iter().map( |i| table.records[idxs[i]].clone()));
        } else {
            records.extend( (0..target).map( |_| table.records[idxs[rng.random_range( 0..idxs.len())]].clone()));
        }
    }

    Ok( SampleTable { columns: table.columns, records } )
}

/// sample all configured patches and balance the classes of the resulting table
pub fn sample_patches (config: &SamplingConfig, rng: &mut impl Rng)->Result<SampleTable> {
    config.check()?;
    let table = collect_samples( config, rng)?;
    info!("collected {} samples from {} patches", table.len(), config.no_patches);

    let table = balance_classes( table, config.samples_per_class, rng)?;
    for (class, n) in table.class_counts() {
        info!("class {}: {} samples", class, n);
    }
    Ok(table)
}
