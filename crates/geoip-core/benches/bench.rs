use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use geoip_core::{
    lookup::{CountryLookup, LookupError},
    service::LookupService,
    types::CheckRequest,
};
use std::{net::IpAddr, sync::Arc};

/// Resolves every IPv4 address to a country derived from its first octet, so
/// the benchmark measures validation and the decision rather than I/O.
struct OctetLookup;

impl CountryLookup for OctetLookup {
    fn lookup_country(&self, ip: IpAddr) -> Result<Option<String>, LookupError> {
        Ok(match ip {
            IpAddr::V4(v4) if v4.octets()[0] % 2 == 0 => Some("US".to_string()),
            IpAddr::V4(_) => Some("DE".to_string()),
            IpAddr::V6(_) => None,
        })
    }
}

fn check_country_bench(c: &mut Criterion) {
    let service = LookupService::new(Arc::new(OctetLookup));
    let countries: Vec<String> = ["FR", "GB", "JP", "US"].map(String::from).to_vec();

    let requests: Vec<CheckRequest> = (0..=255u8)
        .map(|octet| CheckRequest::new(format!("{octet}.1.2.3"), countries.clone()))
        .collect();

    let mut group = c.benchmark_group("check_country");
    group.throughput(Throughput::Elements(requests.len() as u64));

    group.bench_function("ipv4", |b| {
        b.iter(|| {
            for req in &requests {
                let _ = black_box(service.check_country(black_box(req)));
            }
        })
    });

    let invalid = CheckRequest::new("not-an-ip", countries.clone());
    group.throughput(Throughput::Elements(1));
    group.bench_function("invalid_ip", |b| {
        b.iter(|| black_box(service.check_country(black_box(&invalid))))
    });

    group.finish();
}

criterion_group!(benches, check_country_bench);
criterion_main!(benches);
