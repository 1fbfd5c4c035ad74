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

//! common utility functions for (blocking) network operations

use std::path::Path;
use reqwest::{blocking::{Client,Response}, StatusCode};
use serde::de::DeserializeOwned;

use crate::{define_error, fs::write_file_atomic};

define_error!{ pub EosatNetError =
    IOError(#[from] std::io::Error) : "IO error: {0}",
    NotFoundError(String) : "not found {0}",
    HttpError(#[from] reqwest::Error) : "http error: {0}",
    OpFailed(String) : "operation failed: {0}",
    ParseError(String) : "parse error: {0}"
}

pub type Result<T> = std::result::Result<T, EosatNetError>;

/// a query is an ordered list of key/value pairs (some OGC servers are picky about parameter order)
pub type Query = Vec<(&'static str,String)>;

/// send a GET request for url and query and check the response status
pub fn get_ok (client: &Client, url: &str, query: &Query) -> Result<Response> {
    let response = client.get(url).query( query).send()?;

    match response.status() {
        StatusCode::OK => Ok(response),
        StatusCode::NOT_FOUND => Err( EosatNetError::NotFoundError(format!("{url}"))),
        other => {
            // OGC services report errors in the body so we include it
            let body = response.text().unwrap_or_default();
            Err( EosatNetError::OpFailed(format!("response status {other:?}: {}", body.trim())))
        }
    }
}

pub fn get_bytes (client: &Client, url: &str, query: &Query) -> Result<Vec<u8>> {
    let response = get_ok( client, url, query)?;
    Ok( response.bytes()?.to_vec() )
}

pub fn get_json<T> (client: &Client, url: &str, query: &Query) -> Result<T> where T: DeserializeOwned {
    let bytes = get_bytes( client, url, query)?;
    serde_json::from_slice( &bytes).map_err(|e| EosatNetError::ParseError(e.to_string()))
}

/// retrieve url into file at path. The file is only created if the complete content was received
pub fn download_url (client: &Client, url: &str, query: &Query, path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let bytes = get_bytes( client, url, query)?;
    write_file_atomic( path, &bytes)?;
    Ok(bytes)
}
