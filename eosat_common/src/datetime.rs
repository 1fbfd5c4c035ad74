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

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use std::time::Duration;

pub const ISO_DATE_FMT: &str = "%Y-%m-%d";
pub const COMPACT_DATETIME_FMT: &str = "%Y%m%dT%H%M%S";

#[inline] pub fn secs (n: u64)->Duration { Duration::from_secs(n) }

/// the current local date, which is what users mean by "until today"
pub fn today()->NaiveDate {
    Local::now().date_naive()
}

pub fn parse_date (s: &str)->Result<NaiveDate,chrono::ParseError> {
    NaiveDate::parse_from_str( s.trim(), ISO_DATE_FMT)
}

/// the first instant of the given date in UTC
pub fn start_of_day (date: &NaiveDate)->DateTime<Utc> {
    date.and_time( NaiveTime::MIN).and_utc()
}

/// the last full second of the given date in UTC
pub fn end_of_day (date: &NaiveDate)->DateTime<Utc> {
    start_of_day(date) + TimeDelta::days(1) - TimeDelta::seconds(1)
}

/// ISO-8601 formatting without sub-second fraction (e.g. `2017-12-01T10:30:00Z`)
pub fn to_iso_string (dt: &DateTime<Utc>)->String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// filename friendly formatting (e.g. `20171201T103000`)
pub fn to_compact_string (dt: &DateTime<Utc>)->String {
    dt.format( COMPACT_DATETIME_FMT).to_string()
}

pub fn parse_compact_string (s: &str)->Result<DateTime<Utc>,chrono::ParseError> {
    NaiveDateTime::parse_from_str( s, COMPACT_DATETIME_FMT).map( |dt| dt.and_utc())
}
