// Copyright 2025 Argiope Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use rocksdb::{Options, ReadOptions, DB};
use std::path::Path;
use thiserror::Error;

/// address -> identifier
pub const REGISTRY_DB_CF: &'static str = "ri";
/// allocation cursor of the identifier registry
pub const REGISTRY_META_DB_CF: &'static str = "rm";
/// dequeued but not yet confirmed done
pub const IN_FLIGHT_DB_CF: &'static str = "if";
/// named durable counters
pub const COUNTER_DB_CF: &'static str = "ct";

/// Errors when opening a database.
#[derive(Debug, Error)]
pub enum OpenDBError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    RocksDB(#[from] rocksdb::Error),
}

#[macro_export]
macro_rules! declare_column_families {
    ($($self:ident.$db:ident => $name: ident($imported_name: ident))+) => {
        $(
            const $imported_name: &'static str = $crate::database::$imported_name;
            fn $name(&$self) -> std::sync::Arc<rocksdb::BoundColumnFamily> {
                unsafe{$self.$db.cf_handle(Self::$imported_name).unwrap_unchecked()}
            }
        )+
    };
}

#[macro_export]
macro_rules! db_health_check {
    ($db: ident: [$($handle_name: expr => (if test $init: ident else $message: literal))+]) => {
        $(
            if $db.cf_handle($handle_name).is_none() {
                if cfg!(test) {
                    $db.create_cf($handle_name, &$crate::database::$init()).expect(
                        format!("Handle {} was not found: '{}'", $handle_name, $message).as_str()
                    );
                } else {
                    panic!("Handle {} was not found: '{}'", $handle_name, $message);
                }
            }
        )*
    };
}

/// Opens the frontier database in a standardized way.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<DB, OpenDBError> {
    let path = path.as_ref();
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    let (opts, cfs) = create_open_options();
    Ok(DB::open_cf_with_opts(&opts, path, cfs)?)
}

/// Drops and recreates every column family. A non-resumable run starts
/// from a blank slate, inherited registrations would wrongly mark fresh
/// seeds as already seen.
pub fn clear_crawl_state(db: &DB) -> Result<(), rocksdb::Error> {
    for (name, options) in [
        (REGISTRY_DB_CF, registry_cf_options()),
        (REGISTRY_META_DB_CF, registry_meta_cf_options()),
        (IN_FLIGHT_DB_CF, in_flight_cf_options()),
        (COUNTER_DB_CF, counter_cf_options()),
    ] {
        db.drop_cf(name)?;
        db.create_cf(name, &options)?;
    }
    Ok(())
}

/// Creates the open option
fn create_open_options() -> (Options, [(&'static str, Options); 4]) {
    let db_options = db_options();
    let cf_options = [
        (REGISTRY_DB_CF, registry_cf_options()),
        (REGISTRY_META_DB_CF, registry_meta_cf_options()),
        (IN_FLIGHT_DB_CF, in_flight_cf_options()),
        (COUNTER_DB_CF, counter_cf_options()),
    ];
    (db_options, cf_options)
}

fn db_options() -> Options {
    let mut options = Options::default();
    options.create_if_missing(true);
    options.create_missing_column_families(true);
    options
}

pub fn registry_cf_options() -> Options {
    let mut options: Options = Default::default();
    options.create_if_missing(true);
    options.create_missing_column_families(true);
    options
}

pub fn registry_meta_cf_options() -> Options {
    let mut options: Options = Default::default();
    options.create_if_missing(true);
    options.create_missing_column_families(true);
    options
}

pub fn in_flight_cf_options() -> Options {
    let mut options: Options = Default::default();
    options.create_if_missing(true);
    options.create_missing_column_families(true);
    options
}

pub fn counter_cf_options() -> Options {
    let mut options: Options = Default::default();
    options.create_if_missing(true);
    options.create_missing_column_families(true);
    options
}

/// Counts the entries of a column family by scanning it.
pub fn get_len(db: &DB, handle: std::sync::Arc<rocksdb::BoundColumnFamily>) -> usize {
    let mut options = ReadOptions::default();
    options.fill_cache(false);
    match db.flush_cf(&handle) {
        Ok(_) => {}
        Err(err) => {
            log::warn!("Failed to flush before scanning {err}");
        }
    };

    let mut iter = db.raw_iterator_cf_opt(&handle, options);
    iter.seek_to_first();
    let mut ct: usize = 0;
    while iter.valid() {
        ct += 1;
        iter.next();
    }
    ct
}

/// Deletes a db
#[cfg(test)]
pub fn destroy_db<P: AsRef<Path>>(path: P) -> Result<(), rocksdb::Error> {
    if path.as_ref().exists() {
        DB::destroy(&db_options(), path)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{
        clear_crawl_state, get_len, open_db, COUNTER_DB_CF, IN_FLIGHT_DB_CF, REGISTRY_DB_CF,
    };

    #[test]
    fn crawl_state_can_be_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(dir.path()).unwrap();
        let cf = db.cf_handle(IN_FLIGHT_DB_CF).unwrap();
        db.put_cf(&cf, b"http://example.com/", b"x").unwrap();
        let ct = db.cf_handle(COUNTER_DB_CF).unwrap();
        db.put_cf(&ct, b"scheduled_pages", 9u64.to_le_bytes()).unwrap();
        let ri = db.cf_handle(REGISTRY_DB_CF).unwrap();
        db.put_cf(&ri, b"http://example.com/", 1i64.to_le_bytes()).unwrap();
        drop(cf);
        drop(ct);
        drop(ri);

        clear_crawl_state(&db).unwrap();
        assert_eq!(0, get_len(&db, db.cf_handle(IN_FLIGHT_DB_CF).unwrap()));
        assert_eq!(0, get_len(&db, db.cf_handle(COUNTER_DB_CF).unwrap()));
        assert_eq!(0, get_len(&db, db.cf_handle(REGISTRY_DB_CF).unwrap()));
    }
}
