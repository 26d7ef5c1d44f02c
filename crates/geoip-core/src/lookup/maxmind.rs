use super::{CountryLookup, LookupError};
use crate::{Error, Result};
use maxminddb::{MaxMindDBError, Reader, geoip2};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Database types that carry a `country.iso_code` record.
const COUNTRY_DATABASE_MARKERS: [&str; 3] = ["Country", "City", "Enterprise"];

/// A MaxMind DB (`.mmdb`) file loaded into memory.
///
/// The reader is immutable once opened; lookups take `&self` and are safe to
/// run concurrently from any number of tasks.
pub struct MaxMindDatabase {
    reader: Reader<Vec<u8>>,
    path: PathBuf,
}

impl MaxMindDatabase {
    /// Opens and validates the database at `path`.
    ///
    /// Fails with [`Error::DatabaseOpen`] when the file is missing, is not a
    /// MaxMind DB, or describes a database without country data.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = Reader::open_readfile(&path).map_err(|e| Error::DatabaseOpen {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let metadata = &reader.metadata;
        if !COUNTRY_DATABASE_MARKERS
            .iter()
            .any(|marker| metadata.database_type.contains(marker))
        {
            return Err(Error::DatabaseOpen {
                path,
                reason: format!(
                    "unsupported database type `{}` (no country data)",
                    metadata.database_type
                ),
            });
        }

        tracing::info!(
            path = %path.display(),
            database_type = %metadata.database_type,
            ip_version = metadata.ip_version,
            node_count = metadata.node_count,
            build_epoch = metadata.build_epoch,
            "GeoIP database loaded successfully"
        );

        Ok(Self { reader, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the database. Consuming `self` guarantees it happens once.
    pub fn close(self) {
        tracing::info!(path = %self.path.display(), "GeoIP database closed");
    }
}

impl CountryLookup for MaxMindDatabase {
    fn lookup_country(&self, ip: IpAddr) -> core::result::Result<Option<String>, LookupError> {
        match self.reader.lookup::<geoip2::Country>(ip) {
            Ok(record) => Ok(record
                .country
                .and_then(|country| country.iso_code)
                .map(str::to_owned)),
            Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(None),
            Err(e) => Err(LookupError::new(e.to_string())),
        }
    }
}

impl core::fmt::Debug for MaxMindDatabase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MaxMindDatabase")
            .field("path", &self.path)
            .field("database_type", &self.reader.metadata.database_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn open_missing_file_fails() {
        let err = MaxMindDatabase::open("/nonexistent/path/GeoLite2-Country.mmdb").unwrap_err();
        match err {
            Error::DatabaseOpen { path, .. } => {
                assert_eq!(path, PathBuf::from("/nonexistent/path/GeoLite2-Country.mmdb"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn open_malformed_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"this is not a maxmind database").unwrap();
        file.flush().unwrap();

        let err = MaxMindDatabase::open(file.path()).unwrap_err();
        assert!(matches!(err, Error::DatabaseOpen { .. }));
        assert!(!err.is_client_error());
    }

    #[test]
    fn open_empty_file_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            MaxMindDatabase::open(file.path()),
            Err(Error::DatabaseOpen { .. })
        ));
    }

    /// Encodes a tiny IPv4 MaxMind DB (record size 24, two tree nodes):
    /// `0.0.0.0/2` resolves to `US`, `64.0.0.0/2` to a record that only has a
    /// continent, and `128.0.0.0/1` is not in the database.
    fn build_database(database_type: &str) -> Vec<u8> {
        const NODE_COUNT: u32 = 2;

        fn string(out: &mut Vec<u8>, value: &str) {
            assert!(value.len() < 29);
            out.push(0x40 | value.len() as u8);
            out.extend_from_slice(value.as_bytes());
        }
        fn map(out: &mut Vec<u8>, entries: u8) {
            out.push(0xE0 | entries);
        }
        fn uint16(out: &mut Vec<u8>, value: u16) {
            out.push(0xA2);
            out.extend_from_slice(&value.to_be_bytes());
        }
        fn uint32(out: &mut Vec<u8>, value: u32) {
            out.push(0xC4);
            out.extend_from_slice(&value.to_be_bytes());
        }
        fn uint64(out: &mut Vec<u8>, value: u64) {
            out.extend_from_slice(&[0x08, 0x02]);
            out.extend_from_slice(&value.to_be_bytes());
        }
        fn array(out: &mut Vec<u8>, len: u8) {
            out.extend_from_slice(&[len, 0x04]);
        }
        fn record(out: &mut Vec<u8>, value: u32) {
            out.extend_from_slice(&value.to_be_bytes()[1..]);
        }

        let mut data = Vec::new();
        map(&mut data, 1);
        string(&mut data, "country");
        map(&mut data, 1);
        string(&mut data, "iso_code");
        string(&mut data, "US");
        let continent_only = data.len() as u32;
        map(&mut data, 1);
        string(&mut data, "continent");
        map(&mut data, 1);
        string(&mut data, "code");
        string(&mut data, "EU");

        let data_pointer = |offset: u32| NODE_COUNT + 16 + offset;
        let mut db = Vec::new();
        record(&mut db, 1);
        record(&mut db, NODE_COUNT);
        record(&mut db, data_pointer(0));
        record(&mut db, data_pointer(continent_only));
        db.extend_from_slice(&[0; 16]);
        db.extend_from_slice(&data);

        db.extend_from_slice(b"\xab\xcd\xefMaxMind.com");
        map(&mut db, 9);
        string(&mut db, "binary_format_major_version");
        uint16(&mut db, 2);
        string(&mut db, "binary_format_minor_version");
        uint16(&mut db, 0);
        string(&mut db, "build_epoch");
        uint64(&mut db, 1_700_000_000);
        string(&mut db, "database_type");
        string(&mut db, database_type);
        string(&mut db, "description");
        map(&mut db, 1);
        string(&mut db, "en");
        string(&mut db, "Test database");
        string(&mut db, "ip_version");
        uint16(&mut db, 4);
        string(&mut db, "languages");
        array(&mut db, 1);
        string(&mut db, "en");
        string(&mut db, "node_count");
        uint32(&mut db, NODE_COUNT);
        string(&mut db, "record_size");
        uint16(&mut db, 24);
        db
    }

    fn write_database(database_type: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&build_database(database_type)).unwrap();
        file.flush().unwrap();
        file
    }

    fn lookup(db: &MaxMindDatabase, ip: &str) -> Option<String> {
        db.lookup_country(ip.parse().unwrap()).unwrap()
    }

    #[test]
    fn resolves_country_code() {
        let file = write_database("GeoLite2-Country");
        let db = MaxMindDatabase::open(file.path()).unwrap();

        assert_eq!(db.path(), file.path());
        assert_eq!(lookup(&db, "1.2.3.4").as_deref(), Some("US"));
        assert_eq!(lookup(&db, "63.255.255.255").as_deref(), Some("US"));
        db.close();
    }

    #[test]
    fn unknown_address_is_none() {
        let file = write_database("GeoLite2-Country");
        let db = MaxMindDatabase::open(file.path()).unwrap();

        assert_eq!(lookup(&db, "200.1.1.1"), None);
        assert_eq!(lookup(&db, "128.0.0.0"), None);
    }

    #[test]
    fn record_without_country_is_none() {
        let file = write_database("GeoLite2-Country");
        let db = MaxMindDatabase::open(file.path()).unwrap();

        assert_eq!(lookup(&db, "64.0.0.1"), None);
    }

    #[test]
    fn city_database_is_accepted() {
        let file = write_database("GeoIP2-City");
        let db = MaxMindDatabase::open(file.path()).unwrap();
        assert_eq!(lookup(&db, "1.2.3.4").as_deref(), Some("US"));
    }

    #[test]
    fn database_without_country_data_is_rejected() {
        let file = write_database("GeoLite2-ASN");
        match MaxMindDatabase::open(file.path()).unwrap_err() {
            Error::DatabaseOpen { path, reason } => {
                assert_eq!(path, file.path());
                assert!(reason.contains("GeoLite2-ASN"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn database_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MaxMindDatabase>();
    }
}
