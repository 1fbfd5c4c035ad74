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

use std::fs::{self,File};
use std::io::{self,Read,Write,ErrorKind};
use std::time::SystemTime;
use std::path::{Path,PathBuf};
use flate2::read::GzDecoder;

use crate::macros::io_error;

type Result<T> = std::result::Result<T,std::io::Error>;

pub fn filename<'a,T: AsRef<Path>> (path: &'a T)->Option<&'a str> {
    path.as_ref().file_name().and_then(|ostr| ostr.to_str())
}

pub fn extension<'a,T: AsRef<Path>> (path: &'a T)->Option<&'a str> {
    path.as_ref().extension().and_then(|ostr| ostr.to_str())
}

pub fn filestem <'a,T: AsRef<Path>> (path: &'a T)->Option<&'a str> {
    path.as_ref().file_stem().and_then(|ostr| ostr.to_str())
}

pub fn ensure_dir (path: impl AsRef<Path>)->io::Result<()> {
    let path = path.as_ref();
    if !path.is_dir() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// check if dir pathname exists and is writable, try to create dir otherwise
pub fn ensure_writable_dir (path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    if path.is_dir() {
        let md = fs::metadata(&path)?;
        if md.permissions().readonly() {
            Err(io_error!(ErrorKind::PermissionDenied, "output_dir {:?} not writable", &path))
        } else {
            Ok(())
        }

    } else {
        fs::create_dir_all(path)
    }
}

pub fn filepath_contents <P: AsRef<Path>> (path: &P) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let md = file.metadata()?;
    let len = md.len();
    if len > 0 {
        let mut contents: Vec<u8> = Vec::with_capacity(len as usize);
        file.read_to_end(&mut contents)?;
        Ok(contents)

    } else { Err(io_error!(ErrorKind::Other, "file empty: {:?}", path.as_ref())) }
}

/// read and gunzip the contents of a `*.gz` file
pub fn gz_filepath_contents <P: AsRef<Path>> (path: &P) -> Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut decoder = GzDecoder::new(file);
    let mut contents = Vec::new();
    decoder.read_to_end( &mut contents)?;
    Ok(contents)
}

pub fn file_length <P: AsRef<Path>> (path: P) -> Option<u64> {
    fs::metadata(path).ok().map( |meta| meta.len() )
}

/// an existing file that has content. This is what we consider a valid cache entry
pub fn is_non_empty_file <P: AsRef<Path>> (path: P) -> bool {
    file_length(path).map( |len| len > 0).unwrap_or(false)
}

pub fn set_accessed<P: AsRef<Path>> (path: &P)->Result<()> {
    let f = File::open(path)?;
    f.set_times( fs::FileTimes::new().set_accessed( SystemTime::now()))
}

/// write contents to a `<path>.part` file that gets renamed to `path` once it is complete. This makes sure
/// we never leave truncated files at `path` if writing fails
pub fn write_file_atomic <P: AsRef<Path>> (path: P, contents: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let part_path = part_path(path);
    {
        let mut file = File::create( &part_path)?;
        file.write_all( contents)?;
        file.flush()?;
    }
    fs::rename( &part_path, path)
}

pub fn part_path (path: &Path)->PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".part");
    PathBuf::from(p)
}
