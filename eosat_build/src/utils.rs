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

use serde::{Deserialize,Deserializer};
use std::{io::Read,path::{Path,PathBuf},fs::{self,File},env};
use crate::errors::Result;

pub fn file_contents_as_bytes (path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let mut contents: Vec<u8> = Vec::with_capacity(len as usize);
    file.read_to_end(&mut contents)?;
    Ok(contents)
}

/// deserialize a path string, expanding `$VAR` path elements from the environment
pub fn deserialize_expand_path <'a,D>(deserializer: D) -> std::result::Result<PathBuf,D::Error> where D: Deserializer<'a> {
    String::deserialize(deserializer).map( |string| expand_path( string.as_str()))
}

pub fn expand_path (pathname: &str)->PathBuf {
    let mut res: PathBuf = PathBuf::new();

    for e in Path::new(pathname).iter() {
        let s = e.to_string_lossy();
        match s.strip_prefix('$').and_then( |var| env::var(var).ok()) {
            Some(se) => res.push(se),
            None => res.push(s.as_ref())
        }
    }

    res
}

/// modify path and check if path condition holds. If not revert the path to its previous state
#[macro_export]
macro_rules! path_cond {
    ( $pred:ident, $path_expr:expr, $($e:expr),* ) => {
        {
            let path: &mut PathBuf = $path_expr;
            let n0 = path.components().count();
            $( path.push($e); )*
            if path.$pred() {
                true
            } else {
                let mut n = path.components().count();
                while n > n0 { path.pop(); n -= 1; }
                false
            }
        }
    }
}

#[macro_export]
macro_rules! has_any_path_cond {
    ($pred:ident, $path_expr:expr, $($e:expr),*) => {
        {
            let path: &mut PathBuf = $path_expr;
            let mut holds = |e| { path.push(e); let res=path.$pred(); path.pop(); res };
            $( holds($e) || )* false
        }
    }
}

/// this is the highest parent from the current dir that still has a Cargo.toml
pub fn get_workspace_dir()->Option<PathBuf> {
    if let Ok(mut path) = env::current_dir() {
        while path_cond!( is_file, &mut path, "..", "Cargo.toml") {
            path.pop(); // pops Cargo.toml
            path.pop(); // pops ".."
            if !path.pop() { return None } // no parent
        }
        return Some(path)
    }
    None
}

pub fn get_workspace_parent()->Option<PathBuf> {
    get_workspace_dir().map( |mut p| { p.pop(); p})
}

pub fn get_env_eosat_root()->Option<PathBuf> {
    env::var("EOSAT_ROOT").ok().map( |root| Path::new(root.as_str()).to_path_buf())
}

pub fn default_eosat_root()->PathBuf {
    let mut path = env::var("HOME").map( |home| Path::new( home.as_str()).to_path_buf()).unwrap_or_else( |_| env::temp_dir());
    path.push( ".eosat");
    path
}

/// get the EOSAT root dir to use. If this returns Ok the path is guaranteed to exist.
/// Lookup is in the following order:
///
/// 1. use $EOSAT_ROOT if set
/// 2. workspace parent if it has any of the eosat dirs {cache,data,configs}
/// 3. $HOME/.eosat
pub fn get_or_create_root_dir()->Result<PathBuf> {
    let path = if let Some(path) = get_env_eosat_root() {
        path
    } else if let Some(mut path) = get_workspace_parent() {
        if has_any_path_cond!( is_dir, &mut path, "cache", "data", "configs") { path } else { default_eosat_root() }
    } else {
        default_eosat_root()
    };

    if !path.is_dir() { fs::create_dir_all(&path)?; }
    Ok( path )
}

pub fn ensure_existing_path<P> (path: P)->P where P: AsRef<Path> {
    let p = path.as_ref();
    if !p.is_dir() {
        fs::create_dir_all(p).expect(&format!("failed to create {:?}", p));
    }
    path
}
