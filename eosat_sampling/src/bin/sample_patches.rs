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

use std::path::PathBuf;
use anyhow::Result;
use rand::{SeedableRng, rngs::StdRng};
use tracing::info;

use eosat_build::{expand_path, load_config_path};
use eosat_common::{check_cli, define_cli, init_tracing};
use eosat_sampling::{load_config, sample_patches, SamplingConfig};

define_cli! { ARGS [about="sample_patches - draw class balanced pixel samples from EOPatch directories"] =
    config: Option<String> [help="path of RON config file (default: sample_patches.ron resource)", long, short],
    path: Option<String> [help="directory containing eopatch_<i> dirs (overrides config)", long],
    patches: Option<usize> [help="number of patches to sample (overrides config)", long],
    samples: Option<usize> [help="max number of samples per patch (overrides config)", long],
    samples_per_class: Option<usize> [help="number of samples per class after balancing (overrides config)", long],
    debug: bool [help="include patch number and pixel coordinates", long],
    seed: Option<u64> [help="random seed (overrides config)", long],
    output: String [help="CSV output file", long, short, default_value="samples.csv"]
}

fn main()->Result<()> {
    check_cli!(ARGS);
    init_tracing();
    eosat_build::set_bin_context!();

    let mut config: SamplingConfig = if let Some(path) = &ARGS.config {
        load_config_path( path)?
    } else {
        load_config( "sample_patches.ron")?
    };

    if let Some(path) = &ARGS.path { config.path = expand_path( path) }
    if let Some(n) = ARGS.patches { config.no_patches = n }
    if let Some(n) = ARGS.samples { config.no_samples = n }
    if ARGS.samples_per_class.is_some() { config.samples_per_class = ARGS.samples_per_class }
    if ARGS.debug { config.debug = true }
    if ARGS.seed.is_some() { config.seed = ARGS.seed }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64( seed),
        None => StdRng::from_os_rng()
    };

    let table = sample_patches( &config, &mut rng)?;
    table.write_csv( &ARGS.output)?;
    info!("saved {} samples to {}", table.len(), ARGS.output);

    Ok(())
}
