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

//! runtime resource support for EOSAT crates: the global root/cache/data dirs, the bin context that is
//! used to look up bin specific config overrides, and the `define_load_config!` macro that gives each
//! config defining crate its own `load_config(..)` function

use std::{path::{Path,PathBuf}, sync::OnceLock, env};

mod configs;
pub use configs::*;

mod utils;
pub use utils::*;

mod errors;
pub use errors::*;

pub type EosatBuildResult<T> = errors::Result<T>;

/* #region bin globals *******************************************************************/

#[derive(Debug)]
pub struct BinContext {
    pub bin_name: String,
    pub bin_crate: String,
    pub proc_id: Option<u32>,
}

impl BinContext {
    pub fn set (bin_name: &str, bin_crate: &str, proc_id: Option<u32>) {
        // a second set is a no-op - tests might call the bin init code more than once
        let _ = BIN_CONTEXT.set( Self{ bin_name: bin_name.to_string(), bin_crate: bin_crate.to_string(), proc_id });
    }
}

pub static BIN_CONTEXT: OnceLock<BinContext> = OnceLock::new();

/// this has to be called (once) from the bin source
#[macro_export]
macro_rules! set_bin_context {
    () => {
        eosat_build::BinContext::set( env!("CARGO_BIN_NAME"), env!("CARGO_PKG_NAME"), Some(std::process::id()))
    }
}

/// this is mostly for tests and tools that get an explicit config path
pub fn load_config_path<C,P> (path: P) -> Result<C> where C: for <'a> serde::Deserialize<'a>, P: AsRef<Path> {
    let data = file_contents_as_bytes(path.as_ref())?;
    Ok( ron::de::from_bytes( data.as_slice())? )
}

// the global dirs of the application, which are invariant after init
static ROOT_DIR: OnceLock<PathBuf> = OnceLock::new();
static CACHE_DIR: OnceLock<PathBuf> = OnceLock::new();
static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// the global root dir: `EOSAT_ROOT`
/// this will try to create the directory if it does not exist and panics if that fails
pub fn root_dir()->&'static PathBuf {
    ROOT_DIR.get_or_init(|| get_or_create_root_dir().expect("failed to locate EOSAT root"))
}

/// the global data dir: `EOSAT_ROOT/data`
pub fn data_dir()->&'static PathBuf {
    DATA_DIR.get_or_init(|| ensure_existing_path( root_dir().join( Path::new("data"))))
}

/// the global cache dir: `EOSAT_ROOT/cache`
pub fn cache_dir()->&'static PathBuf {
    CACHE_DIR.get_or_init(|| ensure_existing_path( root_dir().join( Path::new("cache"))))
}

/// the crate cache dir of the caller: `EOSAT_ROOT/cache/<crate>`
/// This is a macro so that it uses the crate name of the caller source
#[macro_export]
macro_rules! pkg_cache_dir {
    () => {
        eosat_build::ensure_dir( eosat_build::cache_dir().join( env!("CARGO_PKG_NAME")))
    }
}

/// Note - this panics if the directory does not exist and can't be created
pub fn ensure_dir (dir: PathBuf)->PathBuf {
    if !&dir.is_dir() {
        std::fs::create_dir_all(&dir).unwrap();
    }
    dir
}

/* #endregion bin globals */

/* #region resource lookup ***************************************************************/

/// locate a resource file and return its PathBuf. Lookup order is
///
/// 1. `$EOSAT_HOME/<resource_dir>/..`
/// 2. `<workspace-parent>/<resource_dir>/..`
/// 3. `~/.eosat/<resource_dir>/..`
/// 4. `<workspace>/<resource_crate>/<resource_dir>/..`
fn find_resource_file (resource_dir: &str, ctx: &Option<&BinContext>, resource_crate: &str, filename: &str) -> Option<PathBuf> {
    if let Ok(eosat_home) = env::var("EOSAT_HOME") {
        let mut path = Path::new( eosat_home.as_str()).to_path_buf();
        if find_external_resource( &mut path, resource_dir, ctx, resource_crate, filename) { return Some(path) }
    }

    if let Some(mut path) = get_workspace_parent() {
        if find_external_resource( &mut path, resource_dir, ctx, resource_crate, filename) { return Some(path) }
    }

    if let Ok(usr_home) = env::var("HOME") {
        let mut path = Path::new(usr_home.as_str()).to_path_buf();
        path.push(".eosat");
        if find_external_resource( &mut path, resource_dir, ctx, resource_crate, filename) { return Some(path) }
    }

    if let Some(mut path) = get_workspace_dir() {
        if find_internal_resource( &mut path, resource_dir, ctx, resource_crate, filename) { return Some(path) }
    }

    None
}

fn find_external_resource (path: &mut PathBuf, resource_dir: &str, bin_ctx: &Option<&BinContext>, resource_crate: &str, filename: &str)->bool {
    // bin specific override first
    if let Some(ctx) = bin_ctx {
        let bin_crate = ctx.bin_crate.as_str();
        let bin_name = ctx.bin_name.as_str();
        if path_cond!( is_file, path, resource_dir, bin_crate, bin_name, resource_crate, filename) { return true }
    }

    path_cond!( is_file, path, resource_dir, resource_crate, filename)
}

fn find_internal_resource (path: &mut PathBuf, resource_dir: &str, bin_ctx: &Option<&BinContext>, resource_crate: &str, filename: &str)->bool {
    if let Some(ctx) = bin_ctx {
        let bin_crate = ctx.bin_crate.as_str();
        let bin_name = ctx.bin_name.as_str();
        if path_cond!( is_file, path, bin_crate, resource_dir, bin_name, resource_crate, filename) { return true }
    }

    path_cond!( is_file, path, resource_crate, resource_dir, filename)
}

/* #endregion resource lookup */
